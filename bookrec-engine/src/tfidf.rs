// ---------------------------------------------------------------------------
// TF-IDF text vocabulary
// ---------------------------------------------------------------------------
//
// Word n-gram TF-IDF with a size-bounded vocabulary. Weighting follows the
// usual smoothed scheme:
//
//   idf(t)   = ln((1 + n) / (1 + df(t))) + 1
//   w(t, d)  = count(t, d) * idf(t), then each row is L2-normalized
//
// A fitted `TextVocabulary` is immutable; refitting builds a new one.
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::sparse::{FeatureMatrix, SparseVector};

/// Default vocabulary bound.
pub const DEFAULT_MAX_FEATURES: usize = 5000;

fn token_regex() -> &'static Regex {
	static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
	TOKEN_RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"))
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TfidfConfig {
	/// Keep only the most frequent n-grams. `None` keeps all of them.
	pub max_features: Option<usize>,
	/// Inclusive (min_n, max_n) n-gram lengths in tokens.
	pub ngram_range: (usize, usize),
}

impl Default for TfidfConfig {
	fn default() -> Self {
		Self {
			max_features: Some(DEFAULT_MAX_FEATURES),
			ngram_range: (1, 2),
		}
	}
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Lowercase and split into word tokens of two or more word characters.
pub fn tokenize(text: &str) -> Vec<String> {
	let lower = text.to_lowercase();
	token_regex()
		.find_iter(&lower)
		.map(|m| m.as_str().to_string())
		.collect()
}

/// Produce all word n-grams of `text` for lengths in `ngram_range`.
/// Multi-token grams are joined by a single space.
pub fn analyze(text: &str, ngram_range: (usize, usize)) -> Vec<String> {
	let tokens = tokenize(text);
	let (min_n, max_n) = ngram_range;
	let min_n = min_n.max(1);
	let mut grams = Vec::new();
	for n in min_n..=max_n {
		if n > tokens.len() {
			break;
		}
		if n == 1 {
			grams.extend(tokens.iter().cloned());
		} else {
			grams.extend(tokens.windows(n).map(|w| w.join(" ")));
		}
	}
	grams
}

fn count_terms(text: &str, ngram_range: (usize, usize)) -> HashMap<String, usize> {
	let mut counts = HashMap::new();
	for gram in analyze(text, ngram_range) {
		*counts.entry(gram).or_insert(0) += 1;
	}
	counts
}

// ---------------------------------------------------------------------------
// TextVocabulary
// ---------------------------------------------------------------------------

/// Frozen n-gram vocabulary with IDF weights.
#[derive(Debug, Clone, PartialEq)]
pub struct TextVocabulary {
	config: TfidfConfig,
	/// column -> n-gram, lexicographic
	terms: Vec<String>,
	/// n-gram -> column
	index: HashMap<String, usize>,
	/// column -> idf weight
	idf: Vec<f64>,
}

impl TextVocabulary {
	/// Learn a vocabulary and IDF weights from `documents`.
	///
	/// When the vocabulary bound applies, n-grams are ranked by total count
	/// across the corpus (ties by lexicographic order) and the top ones kept.
	pub fn fit(documents: &[&str], config: &TfidfConfig) -> Self {
		let n_docs = documents.len() as f64;

		let mut total: HashMap<String, usize> = HashMap::new();
		let mut doc_freq: HashMap<String, usize> = HashMap::new();
		for doc in documents {
			for (gram, count) in count_terms(doc, config.ngram_range) {
				*total.entry(gram.clone()).or_insert(0) += count;
				*doc_freq.entry(gram).or_insert(0) += 1;
			}
		}

		let mut ranked: Vec<(String, usize)> = total.into_iter().collect();
		if let Some(limit) = config.max_features {
			if ranked.len() > limit {
				ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
				ranked.truncate(limit);
			}
		}

		let mut terms: Vec<String> = ranked.into_iter().map(|(t, _)| t).collect();
		terms.sort();

		let index: HashMap<String, usize> = terms
			.iter()
			.enumerate()
			.map(|(i, t)| (t.clone(), i))
			.collect();

		let idf = terms
			.iter()
			.map(|t| {
				let df = *doc_freq.get(t).unwrap_or(&0) as f64;
				((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
			})
			.collect();

		Self {
			config: config.clone(),
			terms,
			index,
			idf,
		}
	}

	/// Encode one document. N-grams outside the vocabulary are ignored.
	pub fn transform_one(&self, text: &str) -> SparseVector {
		let pairs = count_terms(text, self.config.ngram_range)
			.into_iter()
			.filter_map(|(gram, count)| {
				self.index
					.get(&gram)
					.map(|&col| (col, count as f64 * self.idf[col]))
			})
			.collect();
		let mut row = SparseVector::from_pairs(self.terms.len(), pairs);
		row.normalize();
		row
	}

	pub fn transform(&self, documents: &[&str]) -> FeatureMatrix {
		let mut matrix = FeatureMatrix::new(self.terms.len());
		for doc in documents {
			matrix.push(self.transform_one(doc));
		}
		matrix
	}

	pub fn len(&self) -> usize {
		self.terms.len()
	}

	pub fn is_empty(&self) -> bool {
		self.terms.is_empty()
	}

	pub fn terms(&self) -> &[String] {
		&self.terms
	}

	pub fn column(&self, term: &str) -> Option<usize> {
		self.index.get(term).copied()
	}

	pub fn idf(&self, term: &str) -> Option<f64> {
		self.column(term).map(|c| self.idf[c])
	}
}
