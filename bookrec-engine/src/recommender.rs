// ---------------------------------------------------------------------------
// Recommender: fetch -> clean -> encode -> index pipeline
// ---------------------------------------------------------------------------
//
// State machine: Unbuilt -> Built on the first successful `build`; each
// later `build` starts from scratch. Ranking before any build fails with
// `NotFitted`.
//
// A build stages a fresh library and encoder and only swaps them in after
// fetch, encode and fit have all succeeded, so a failed build leaves the
// previous generation fully usable.
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use crate::error::RecommendError;
use crate::features::FeatureEncoder;
use crate::fetcher::{BookSource, Fetch, FetchOptions};
use crate::index::SimilarityIndex;
use crate::library::Library;
use crate::preprocess::{Preprocessor, TextCleaner};
use crate::tfidf::TfidfConfig;
use crate::types::{Book, BuildSummary, Recommendation, Scored};

/// Default number of results for both entry points.
pub const DEFAULT_TOP_N: usize = 5;

pub struct Recommender<F: Fetch, C: TextCleaner = Preprocessor> {
	fetcher: F,
	cleaner: C,
	library: Library,
	encoder: FeatureEncoder,
	index: SimilarityIndex,
}

impl<F: Fetch> Recommender<F, Preprocessor> {
	/// A recommender with the default cleaner and encoder settings.
	pub fn new(fetcher: F) -> Self {
		Self::with_parts(fetcher, Preprocessor::new(), TfidfConfig::default())
	}
}

impl<F: Fetch, C: TextCleaner> Recommender<F, C> {
	pub fn with_parts(fetcher: F, cleaner: C, config: TfidfConfig) -> Self {
		Self {
			fetcher,
			cleaner,
			library: Library::new(),
			encoder: FeatureEncoder::new(config),
			index: SimilarityIndex::new(),
		}
	}

	// -- Build ---------------------------------------------------------------

	/// Fetch a batch, then rebuild the library, vocabularies and index from
	/// it. `source_override` replaces the fetcher's configured source for
	/// this call only.
	pub fn build(
		&mut self,
		source_override: Option<&BookSource>,
		options: &FetchOptions,
	) -> Result<BuildSummary, RecommendError> {
		let books = self.fetcher.fetch(source_override, options)?;
		let fetched = books.len();
		let library: Library = books.into_iter().collect();
		if library.len() < fetched {
			tracing::warn!(
				fetched,
				unique = library.len(),
				"Duplicate book ids in batch, later records replaced earlier ones"
			);
		}

		let mut texts: Vec<(String, String)> = Vec::with_capacity(library.len());
		let mut tags: HashMap<String, Vec<String>> = HashMap::with_capacity(library.len());
		for book in library.all() {
			texts.push((book.id.clone(), self.cleaner.clean(&book.description)));
			tags.insert(book.id.clone(), book.tags.clone());
		}

		let mut encoder = FeatureEncoder::new(self.encoder.config().clone());
		let (matrix, ids) = encoder.fit_transform(&texts, &tags);
		self.index.fit(matrix, ids)?;

		self.library = library;
		self.encoder = encoder;

		let summary = BuildSummary {
			items: self.library.len(),
			text_features: self.encoder.text_vocabulary_len(),
			tag_features: self.encoder.tag_vocabulary_len(),
			version: self.index.version(),
		};
		tracing::info!(
			items = summary.items,
			text_features = summary.text_features,
			tag_features = summary.tag_features,
			version = summary.version,
			"Recommender built"
		);
		Ok(summary)
	}

	// -- Recommendation ------------------------------------------------------

	/// Books most similar to `book_id`. Unknown IDs yield an empty list.
	pub fn recommend(&self, book_id: &str, top_n: usize) -> Result<Vec<Book>, RecommendError> {
		Ok(self
			.recommend_with_scores(book_id, top_n)?
			.into_iter()
			.map(|r| r.book)
			.collect())
	}

	pub fn recommend_with_scores(
		&self,
		book_id: &str,
		top_n: usize,
	) -> Result<Vec<Recommendation>, RecommendError> {
		let ranked = self.index.recommend_scored(book_id, top_n)?;
		tracing::debug!(book_id, top_n, hits = ranked.len(), "recommend");
		Ok(self.resolve(ranked))
	}

	/// Books most similar to a free-text query. Blank queries yield an empty
	/// list without consulting the encoder or index.
	pub fn recommend_by_text(&self, query: &str, top_n: usize) -> Result<Vec<Book>, RecommendError> {
		Ok(self
			.recommend_by_text_with_scores(query, top_n)?
			.into_iter()
			.map(|r| r.book)
			.collect())
	}

	pub fn recommend_by_text_with_scores(
		&self,
		query: &str,
		top_n: usize,
	) -> Result<Vec<Recommendation>, RecommendError> {
		let query = query.trim();
		if query.is_empty() {
			return Ok(Vec::new());
		}
		let cleaned = self.cleaner.clean(query);
		// Free-text queries carry no tags.
		let vector = self.encoder.transform_query(&cleaned)?;
		let ranked = self.index.recommend_for_vector_scored(&vector, top_n)?;
		tracing::debug!(query, top_n, hits = ranked.len(), "recommend_by_text");
		Ok(self.resolve(ranked))
	}

	fn resolve(&self, ranked: Vec<Scored>) -> Vec<Recommendation> {
		ranked
			.into_iter()
			.filter_map(|s| {
				self.library.get_by_id(&s.id).map(|book| Recommendation {
					book: book.clone(),
					score: s.score,
				})
			})
			.collect()
	}

	// -- Accessors -----------------------------------------------------------

	pub fn library(&self) -> &Library {
		&self.library
	}

	pub fn index(&self) -> &SimilarityIndex {
		&self.index
	}

	pub fn encoder(&self) -> &FeatureEncoder {
		&self.encoder
	}

	pub fn is_built(&self) -> bool {
		self.index.is_fitted()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::{Cell, RefCell};

	/// Returns whatever batch is queued, or an error when `fail` is set.
	struct StubFetcher {
		batch: RefCell<Vec<Book>>,
		fail: Cell<bool>,
		last_source: RefCell<Option<BookSource>>,
	}

	impl StubFetcher {
		fn new(books: Vec<Book>) -> Self {
			Self {
				batch: RefCell::new(books),
				fail: Cell::new(false),
				last_source: RefCell::new(None),
			}
		}
	}

	impl Fetch for &StubFetcher {
		fn fetch(
			&self,
			source: Option<&BookSource>,
			_options: &FetchOptions,
		) -> Result<Vec<Book>, RecommendError> {
			*self.last_source.borrow_mut() = source.cloned();
			if self.fail.get() {
				return Err(RecommendError::Fetch("offline".into()));
			}
			Ok(self.batch.borrow().clone())
		}
	}

	/// Counts calls so tests can assert the cleaner was never reached.
	#[derive(Default)]
	struct CountingCleaner {
		calls: Cell<usize>,
	}

	impl TextCleaner for &CountingCleaner {
		fn clean(&self, raw: &str) -> String {
			self.calls.set(self.calls.get() + 1);
			raw.to_lowercase()
		}
	}

	fn book(id: &str, description: &str, tags: &[&str]) -> Book {
		Book::new(
			id,
			format!("Book {id}"),
			vec![format!("Author {id}")],
			description,
			tags.iter().map(|t| t.to_string()).collect(),
		)
	}

	fn scenario_a() -> Vec<Book> {
		vec![
			book("1", "alpha alpha", &["x"]),
			book("2", "beta beta", &["y"]),
			book("3", "alpha beta", &["x", "y"]),
		]
	}

	fn ids(books: &[Book]) -> Vec<&str> {
		books.iter().map(|b| b.id.as_str()).collect()
	}

	#[test]
	fn end_to_end_recommendation() {
		let fetcher = StubFetcher::new(scenario_a());
		let mut rec = Recommender::new(&fetcher);
		let summary = rec.build(None, &FetchOptions::default()).unwrap();
		assert_eq!(summary.items, 3);
		assert_eq!(summary.tag_features, 2);
		assert_eq!(summary.version, 1);

		let recs = rec.recommend("1", 2).unwrap();
		assert_eq!(ids(&recs), vec!["3", "2"]);
	}

	#[test]
	fn unknown_book_id_is_empty() {
		let fetcher = StubFetcher::new(vec![book("1", "alpha", &[]), book("2", "beta", &[])]);
		let mut rec = Recommender::new(&fetcher);
		rec.build(None, &FetchOptions::default()).unwrap();
		assert!(rec.recommend("NON_EXISTENT", 3).unwrap().is_empty());
	}

	#[test]
	fn never_recommends_itself() {
		let fetcher = StubFetcher::new(scenario_a());
		let mut rec = Recommender::new(&fetcher);
		rec.build(None, &FetchOptions::default()).unwrap();
		for id in ["1", "2", "3"] {
			let recs = rec.recommend(id, 10).unwrap();
			assert_eq!(recs.len(), 2);
			assert!(recs.iter().all(|b| b.id != id));
		}
	}

	#[test]
	fn recommend_before_build_is_not_fitted() {
		let fetcher = StubFetcher::new(scenario_a());
		let rec = Recommender::new(&fetcher);
		assert!(!rec.is_built());
		assert!(matches!(rec.recommend("1", 2), Err(RecommendError::NotFitted)));
		assert!(matches!(
			rec.recommend_by_text("alpha", 2),
			Err(RecommendError::NotFitted)
		));
	}

	#[test]
	fn blank_text_query_skips_encoding() {
		let fetcher = StubFetcher::new(scenario_a());
		let cleaner = CountingCleaner::default();
		let rec = Recommender::with_parts(&fetcher, &cleaner, TfidfConfig::default());
		// Not even built: blank queries never reach the index.
		assert!(rec.recommend_by_text("", 5).unwrap().is_empty());
		assert!(rec.recommend_by_text("  \t\n ", 5).unwrap().is_empty());
		assert_eq!(cleaner.calls.get(), 0);
	}

	#[test]
	fn text_query_ranks_by_content() {
		let fetcher = StubFetcher::new(vec![
			book("a", "A dragon hoards gold beneath the mountain", &["fantasy"]),
			book("b", "Spaceships cross the galaxy at warp speed", &["sci-fi"]),
			book("c", "A detective solves a murder in London", &["mystery"]),
		]);
		let mut rec = Recommender::new(&fetcher);
		rec.build(None, &FetchOptions::default()).unwrap();

		let recs = rec.recommend_by_text("Dragon gold!", 1).unwrap();
		assert_eq!(ids(&recs), vec!["a"]);

		let scored = rec.recommend_by_text_with_scores("galaxy warp", 3).unwrap();
		assert_eq!(scored[0].book.id, "b");
		assert!(scored[0].score > scored[1].score);
	}

	#[test]
	fn unknown_words_fall_back_to_row_order() {
		let fetcher = StubFetcher::new(scenario_a());
		let mut rec = Recommender::new(&fetcher);
		rec.build(None, &FetchOptions::default()).unwrap();
		let scored = rec.recommend_by_text_with_scores("zzz qqq", 5).unwrap();
		assert_eq!(scored.len(), 3);
		assert!(scored.iter().all(|r| r.score == 0.0));
		let order: Vec<&str> = scored.iter().map(|r| r.book.id.as_str()).collect();
		assert_eq!(order, vec!["1", "2", "3"]);
	}

	#[test]
	fn rebuild_replaces_everything() {
		let fetcher = StubFetcher::new(scenario_a());
		let mut rec = Recommender::new(&fetcher);
		rec.build(None, &FetchOptions::default()).unwrap();

		*fetcher.batch.borrow_mut() = vec![
			book("p", "gamma delta", &["z"]),
			book("q", "gamma", &[]),
			book("r", "epsilon", &[]),
		];
		let summary = rec.build(None, &FetchOptions::default()).unwrap();
		assert_eq!(summary.version, 2);
		assert_eq!(summary.items, 3);

		assert!(rec.recommend("1", 5).unwrap().is_empty());
		assert!(rec.library().get_by_id("1").is_none());
		assert_eq!(ids(&rec.recommend("p", 2).unwrap()), vec!["q", "r"]);
		// Terms from the first build are gone from the vocabulary.
		let by_text = rec.recommend_by_text_with_scores("alpha beta", 3).unwrap();
		assert!(by_text.iter().all(|r| r.score == 0.0));
	}

	#[test]
	fn failed_build_keeps_previous_state() {
		let fetcher = StubFetcher::new(scenario_a());
		let mut rec = Recommender::new(&fetcher);
		rec.build(None, &FetchOptions::default()).unwrap();

		fetcher.fail.set(true);
		assert!(matches!(
			rec.build(None, &FetchOptions::default()),
			Err(RecommendError::Fetch(_))
		));
		assert_eq!(rec.index().version(), 1);
		assert_eq!(ids(&rec.recommend("1", 2).unwrap()), vec!["3", "2"]);
	}

	#[test]
	fn source_override_is_passed_through() {
		let fetcher = StubFetcher::new(scenario_a());
		let mut rec = Recommender::new(&fetcher);
		rec.build(Some(&BookSource::OpenLibrary), &FetchOptions::with_query("fantasy"))
			.unwrap();
		assert_eq!(*fetcher.last_source.borrow(), Some(BookSource::OpenLibrary));
		rec.build(None, &FetchOptions::default()).unwrap();
		assert_eq!(*fetcher.last_source.borrow(), None);
	}

	#[test]
	fn duplicate_ids_in_batch_are_upserted() {
		let fetcher = StubFetcher::new(vec![
			book("1", "old text", &[]),
			book("2", "beta", &[]),
			book("1", "alpha", &[]),
		]);
		let mut rec = Recommender::new(&fetcher);
		let summary = rec.build(None, &FetchOptions::default()).unwrap();
		assert_eq!(summary.items, 2);
		assert_eq!(rec.library().get_by_id("1").unwrap().description, "alpha");
		assert_eq!(ids(rec.library().all()), vec!["1", "2"]);
	}

	#[test]
	fn empty_batch_builds_empty_index() {
		let fetcher = StubFetcher::new(Vec::new());
		let mut rec = Recommender::new(&fetcher);
		let summary = rec.build(None, &FetchOptions::default()).unwrap();
		assert_eq!(summary.items, 0);
		assert!(rec.is_built());
		assert!(rec.recommend("anything", 3).unwrap().is_empty());
		assert!(rec.recommend_by_text("anything", 3).unwrap().is_empty());
	}
}
