//! Book fetching from a local JSON file, Google Books, or Open Library.
//!
//! Remote calls go through a `ureq` agent with a global timeout; there are
//! no retries here or anywhere above.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ureq::Agent;

use crate::error::RecommendError;
use crate::types::Book;

pub const GOOGLE_BOOKS_ENDPOINT: &str = "https://www.googleapis.com/books/v1/volumes";
pub const OPEN_LIBRARY_ENDPOINT: &str = "https://openlibrary.org/search.json";

/// Default page size for remote sources.
pub const DEFAULT_MAX_RESULTS: usize = 40;

/// Open Library subject lists can be long; only the first few become tags.
const OPEN_LIBRARY_MAX_TAGS: usize = 5;

// ---------------------------------------------------------------------------
// Source + options
// ---------------------------------------------------------------------------

/// Where books come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BookSource {
	/// A local JSON file holding an array of book objects.
	File { path: PathBuf },
	GoogleBooks {
		#[serde(rename = "apiKey", default)]
		api_key: Option<String>,
	},
	OpenLibrary,
}

impl BookSource {
	/// Interpret a CLI-style source string: `google`, `openlibrary`, or a
	/// file path.
	pub fn parse(source: &str, api_key: Option<String>) -> Self {
		match source.to_ascii_lowercase().as_str() {
			"google" | "googlebooks" | "google-books" => Self::GoogleBooks { api_key },
			"openlibrary" | "open-library" => Self::OpenLibrary,
			_ => Self::File {
				path: PathBuf::from(source),
			},
		}
	}

	pub fn is_remote(&self) -> bool {
		!matches!(self, Self::File { .. })
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
	pub query: Option<String>,
	pub max_results: usize,
}

impl Default for FetchOptions {
	fn default() -> Self {
		Self {
			query: None,
			max_results: DEFAULT_MAX_RESULTS,
		}
	}
}

impl FetchOptions {
	pub fn with_query(query: impl Into<String>) -> Self {
		Self {
			query: Some(query.into()),
			..Self::default()
		}
	}
}

/// Anything that can produce a batch of books.
///
/// `source` overrides the implementor's configured source for this call
/// only.
pub trait Fetch {
	fn fetch(
		&self,
		source: Option<&BookSource>,
		options: &FetchOptions,
	) -> Result<Vec<Book>, RecommendError>;
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

pub struct Fetcher {
	source: BookSource,
	agent: Agent,
}

impl Fetcher {
	pub fn new(source: BookSource, timeout_secs: u64) -> Self {
		let agent_config = Agent::config_builder()
			.timeout_global(Some(Duration::from_secs(timeout_secs)))
			.build();
		let agent = Agent::new_with_config(agent_config);
		Self { source, agent }
	}

	pub fn source(&self) -> &BookSource {
		&self.source
	}

	fn fetch_file(&self, path: &Path) -> Result<Vec<Book>, RecommendError> {
		let raw = std::fs::read_to_string(path)?;
		let books: Vec<Book> = serde_json::from_str(&raw)?;
		tracing::debug!(path = %path.display(), count = books.len(), "Loaded books from file");
		Ok(books)
	}

	fn fetch_google(
		&self,
		query: &str,
		max_results: usize,
		api_key: Option<&str>,
	) -> Result<Vec<Book>, RecommendError> {
		tracing::debug!(query, max_results, "Querying Google Books");
		let mut request = self
			.agent
			.get(GOOGLE_BOOKS_ENDPOINT)
			.query("q", query)
			.query("maxResults", max_results.to_string());
		if let Some(key) = api_key {
			request = request.query("key", key);
		}
		let response: GoogleResponse = request
			.call()
			.map_err(|e| RecommendError::Fetch(format!("Google Books request failed: {}", e)))?
			.body_mut()
			.read_json()
			.map_err(|e| RecommendError::Fetch(format!("Google Books response parse error: {}", e)))?;
		Ok(books_from_google(response))
	}

	fn fetch_open_library(&self, query: &str, max_results: usize) -> Result<Vec<Book>, RecommendError> {
		tracing::debug!(query, max_results, "Querying Open Library");
		let response: OpenLibraryResponse = self
			.agent
			.get(OPEN_LIBRARY_ENDPOINT)
			.query("q", query)
			.query("limit", max_results.to_string())
			.call()
			.map_err(|e| RecommendError::Fetch(format!("Open Library request failed: {}", e)))?
			.body_mut()
			.read_json()
			.map_err(|e| RecommendError::Fetch(format!("Open Library response parse error: {}", e)))?;
		Ok(books_from_open_library(response))
	}
}

impl Fetch for Fetcher {
	fn fetch(
		&self,
		source: Option<&BookSource>,
		options: &FetchOptions,
	) -> Result<Vec<Book>, RecommendError> {
		let source = source.unwrap_or(&self.source);
		let query = options
			.query
			.as_deref()
			.map(str::trim)
			.filter(|q| !q.is_empty());

		match source {
			BookSource::File { path } => self.fetch_file(path),
			BookSource::GoogleBooks { api_key } => {
				let query = query.ok_or(RecommendError::MissingQuery)?;
				self.fetch_google(query, options.max_results, api_key.as_deref())
			}
			BookSource::OpenLibrary => {
				let query = query.ok_or(RecommendError::MissingQuery)?;
				self.fetch_open_library(query, options.max_results)
			}
		}
	}
}

// ---------------------------------------------------------------------------
// Remote response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct GoogleResponse {
	#[serde(default)]
	pub items: Vec<GoogleItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GoogleItem {
	#[serde(default)]
	pub id: String,
	#[serde(rename = "volumeInfo", default)]
	pub volume_info: GoogleVolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleVolumeInfo {
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub authors: Vec<String>,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub categories: Vec<String>,
	pub published_date: Option<String>,
	pub page_count: Option<u64>,
	pub info_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenLibraryResponse {
	#[serde(default)]
	pub docs: Vec<OpenLibraryDoc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenLibraryDoc {
	#[serde(default)]
	pub key: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub author_name: Vec<String>,
	pub first_sentence: Option<FirstSentence>,
	#[serde(default)]
	pub subject: Vec<String>,
	pub first_publish_year: Option<i64>,
}

/// Open Library returns `first_sentence` either as a string or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FirstSentence {
	One(String),
	Many(Vec<String>),
}

impl FirstSentence {
	fn into_text(self) -> String {
		match self {
			Self::One(s) => s,
			Self::Many(v) => v.into_iter().next().unwrap_or_default(),
		}
	}
}

pub fn books_from_google(response: GoogleResponse) -> Vec<Book> {
	response
		.items
		.into_iter()
		.map(|item| {
			let info = item.volume_info;
			let mut metadata = HashMap::new();
			metadata.insert("publishedDate".to_string(), serde_json::json!(info.published_date));
			metadata.insert("pageCount".to_string(), serde_json::json!(info.page_count));
			metadata.insert("infoLink".to_string(), serde_json::json!(info.info_link));
			Book {
				id: item.id,
				title: info.title,
				authors: info.authors,
				description: info.description,
				tags: info.categories,
				metadata,
			}
		})
		.collect()
}

pub fn books_from_open_library(response: OpenLibraryResponse) -> Vec<Book> {
	response
		.docs
		.into_iter()
		.map(|doc| {
			let mut metadata = HashMap::new();
			metadata.insert("publish_year".to_string(), serde_json::json!(doc.first_publish_year));
			Book {
				id: doc.key,
				title: doc.title,
				authors: doc.author_name,
				description: doc.first_sentence.map(FirstSentence::into_text).unwrap_or_default(),
				tags: doc.subject.into_iter().take(OPEN_LIBRARY_MAX_TAGS).collect(),
				metadata,
			}
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn parse_source_strings() {
		assert_eq!(
			BookSource::parse("Google", Some("k".into())),
			BookSource::GoogleBooks {
				api_key: Some("k".into())
			}
		);
		assert_eq!(BookSource::parse("openlibrary", None), BookSource::OpenLibrary);
		assert_eq!(
			BookSource::parse("data/books.json", None),
			BookSource::File {
				path: PathBuf::from("data/books.json")
			}
		);
	}

	#[test]
	fn source_serde_is_tagged() {
		let s: BookSource = serde_json::from_str(r#"{"type":"file","path":"/tmp/b.json"}"#).unwrap();
		assert!(matches!(s, BookSource::File { .. }));
		let s: BookSource = serde_json::from_str(r#"{"type":"googleBooks"}"#).unwrap();
		assert_eq!(s, BookSource::GoogleBooks { api_key: None });
		let s: BookSource = serde_json::from_str(r#"{"type":"openLibrary"}"#).unwrap();
		assert!(s.is_remote());
	}

	#[test]
	fn fetch_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"[{{"id":"1","title":"A","description":"first","tags":["x"]}},{{"id":"2","title":"B"}}]"#
		)
		.unwrap();
		let fetcher = Fetcher::new(
			BookSource::File {
				path: file.path().to_path_buf(),
			},
			30,
		);
		let books = fetcher.fetch(None, &FetchOptions::default()).unwrap();
		assert_eq!(books.len(), 2);
		assert_eq!(books[0].tags, vec!["x"]);
		assert!(books[1].description.is_empty());
	}

	#[test]
	fn override_source_wins() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, r#"[{{"id":"o","title":"Override"}}]"#).unwrap();
		let fetcher = Fetcher::new(BookSource::OpenLibrary, 30);
		let over = BookSource::File {
			path: file.path().to_path_buf(),
		};
		let books = fetcher.fetch(Some(&over), &FetchOptions::default()).unwrap();
		assert_eq!(books[0].id, "o");
		// The configured source is unchanged.
		assert_eq!(fetcher.source(), &BookSource::OpenLibrary);
	}

	#[test]
	fn missing_file_is_io_error() {
		let fetcher = Fetcher::new(
			BookSource::File {
				path: PathBuf::from("/definitely/not/here.json"),
			},
			30,
		);
		assert!(matches!(
			fetcher.fetch(None, &FetchOptions::default()),
			Err(RecommendError::Io(_))
		));
	}

	#[test]
	fn remote_without_query_is_rejected() {
		let fetcher = Fetcher::new(BookSource::GoogleBooks { api_key: None }, 30);
		assert!(matches!(
			fetcher.fetch(None, &FetchOptions::default()),
			Err(RecommendError::MissingQuery)
		));
		let blank = FetchOptions::with_query("   ");
		assert!(matches!(
			fetcher.fetch(Some(&BookSource::OpenLibrary), &blank),
			Err(RecommendError::MissingQuery)
		));
	}

	#[test]
	fn maps_google_items() {
		let raw = r#"{"items":[{"id":"g1","volumeInfo":{"title":"T","authors":["A"],
			"description":"D","categories":["Fiction"],"pageCount":320}}]}"#;
		let books = books_from_google(serde_json::from_str(raw).unwrap());
		assert_eq!(books.len(), 1);
		assert_eq!(books[0].id, "g1");
		assert_eq!(books[0].tags, vec!["Fiction"]);
		assert_eq!(books[0].metadata["pageCount"], 320);
		assert!(books[0].metadata["publishedDate"].is_null());
	}

	#[test]
	fn maps_empty_google_response() {
		let books = books_from_google(serde_json::from_str("{}").unwrap());
		assert!(books.is_empty());
	}

	#[test]
	fn maps_open_library_docs() {
		let raw = r#"{"docs":[{"key":"/works/OL1W","title":"T","author_name":["A"],
			"first_sentence":["Once upon a time.","Later."],
			"subject":["a","b","c","d","e","f","g"],"first_publish_year":1954},
			{"key":"/works/OL2W","title":"U","first_sentence":"Single."}]}"#;
		let books = books_from_open_library(serde_json::from_str(raw).unwrap());
		assert_eq!(books[0].description, "Once upon a time.");
		assert_eq!(books[0].tags.len(), 5);
		assert_eq!(books[0].metadata["publish_year"], 1954);
		assert_eq!(books[1].description, "Single.");
		assert!(books[1].authors.is_empty());
	}
}
