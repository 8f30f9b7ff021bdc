// ---------------------------------------------------------------------------
// FeatureEncoder: TF-IDF text columns + one-hot tag columns
// ---------------------------------------------------------------------------
//
// `fit_transform` learns both vocabularies and replaces the previous ones in
// a single assignment. `transform` only reads the frozen snapshot.
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RecommendError;
use crate::sparse::{FeatureMatrix, SparseVector};
use crate::tags::TagVocabulary;
use crate::tfidf::{TextVocabulary, TfidfConfig};

/// Both frozen vocabularies from one fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabularies {
	pub text: TextVocabulary,
	pub tags: TagVocabulary,
}

impl Vocabularies {
	/// Total column count: text columns followed by tag columns.
	pub fn dim(&self) -> usize {
		self.text.len() + self.tags.len()
	}

	/// Encode one document and its tags as a single row.
	pub fn encode(&self, text: &str, tags: &[String]) -> SparseVector {
		self.text.transform_one(text).concat(&self.tags.transform_one(tags))
	}
}

pub struct FeatureEncoder {
	config: TfidfConfig,
	vocabularies: Option<Arc<Vocabularies>>,
}

impl FeatureEncoder {
	pub fn new(config: TfidfConfig) -> Self {
		Self {
			config,
			vocabularies: None,
		}
	}

	/// Learn both vocabularies from the corpus and encode it.
	///
	/// Row order (and the returned ID list) follows `texts_by_id`. Items
	/// with no entry in `tags_by_id` are encoded without tags.
	pub fn fit_transform(
		&mut self,
		texts_by_id: &[(String, String)],
		tags_by_id: &HashMap<String, Vec<String>>,
	) -> (FeatureMatrix, Vec<String>) {
		let ids: Vec<String> = texts_by_id.iter().map(|(id, _)| id.clone()).collect();
		let texts: Vec<&str> = texts_by_id.iter().map(|(_, t)| t.as_str()).collect();
		let tag_lists = collect_tags(&ids, tags_by_id);

		let vocabularies = Vocabularies {
			text: TextVocabulary::fit(&texts, &self.config),
			tags: TagVocabulary::fit(&tag_lists),
		};
		let matrix = encode_all(&vocabularies, &texts, &tag_lists);

		tracing::debug!(
			rows = matrix.len(),
			text_features = vocabularies.text.len(),
			tag_features = vocabularies.tags.len(),
			"Fitted feature vocabularies"
		);

		self.vocabularies = Some(Arc::new(vocabularies));
		(matrix, ids)
	}

	/// Encode with the frozen vocabularies. Unknown n-grams and tags are
	/// dropped.
	pub fn transform(
		&self,
		texts_by_id: &[(String, String)],
		tags_by_id: &HashMap<String, Vec<String>>,
	) -> Result<FeatureMatrix, RecommendError> {
		let vocabularies = self.vocabularies.as_ref().ok_or(RecommendError::NotFitted)?;
		let ids: Vec<String> = texts_by_id.iter().map(|(id, _)| id.clone()).collect();
		let texts: Vec<&str> = texts_by_id.iter().map(|(_, t)| t.as_str()).collect();
		let tag_lists = collect_tags(&ids, tags_by_id);
		Ok(encode_all(vocabularies, &texts, &tag_lists))
	}

	/// Encode a single untagged query text.
	pub fn transform_query(&self, text: &str) -> Result<SparseVector, RecommendError> {
		let vocabularies = self.vocabularies.as_ref().ok_or(RecommendError::NotFitted)?;
		Ok(vocabularies.encode(text, &[]))
	}

	/// The current frozen snapshot, if fitted.
	pub fn vocabularies(&self) -> Option<Arc<Vocabularies>> {
		self.vocabularies.clone()
	}

	pub fn is_fitted(&self) -> bool {
		self.vocabularies.is_some()
	}

	pub fn dim(&self) -> usize {
		self.vocabularies.as_ref().map(|v| v.dim()).unwrap_or(0)
	}

	pub fn text_vocabulary_len(&self) -> usize {
		self.vocabularies.as_ref().map(|v| v.text.len()).unwrap_or(0)
	}

	pub fn tag_vocabulary_len(&self) -> usize {
		self.vocabularies.as_ref().map(|v| v.tags.len()).unwrap_or(0)
	}

	pub fn config(&self) -> &TfidfConfig {
		&self.config
	}
}

impl Default for FeatureEncoder {
	fn default() -> Self {
		Self::new(TfidfConfig::default())
	}
}

fn collect_tags<'a>(
	ids: &[String],
	tags_by_id: &'a HashMap<String, Vec<String>>,
) -> Vec<&'a [String]> {
	ids.iter()
		.map(|id| tags_by_id.get(id).map(|t| t.as_slice()).unwrap_or(&[]))
		.collect()
}

fn encode_all(vocabularies: &Vocabularies, texts: &[&str], tag_lists: &[&[String]]) -> FeatureMatrix {
	let mut matrix = FeatureMatrix::new(vocabularies.dim());
	for (text, tags) in texts.iter().zip(tag_lists) {
		matrix.push(vocabularies.encode(text, tags));
	}
	matrix
}
