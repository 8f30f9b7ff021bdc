use clap::Parser;

use crate::fetcher::{BookSource, FetchOptions, DEFAULT_MAX_RESULTS};
use crate::preprocess::Preprocessor;
use crate::tfidf::{TfidfConfig, DEFAULT_MAX_FEATURES};

#[derive(Parser, Debug)]
#[command(name = "bookrec-engine", about = "Content-based book recommender over JSON-RPC 2.0 / NDJSON stdio")]
pub struct CliArgs {
	/// Default book source: a JSON file path, "google", or "openlibrary"
	#[arg(long, default_value = "books.json", env = "BOOKREC_SOURCE")]
	pub source: String,

	/// Google Books API key (optional, only used with the google source)
	#[arg(long, env = "BOOKREC_API_KEY")]
	pub api_key: Option<String>,

	/// Upper bound on the TF-IDF vocabulary size (0 = unbounded)
	#[arg(long, default_value_t = DEFAULT_MAX_FEATURES, env = "BOOKREC_MAX_FEATURES")]
	pub max_features: usize,

	/// Longest word n-gram to index
	#[arg(long, default_value = "2")]
	pub max_ngram: usize,

	/// Extra stopwords removed during cleaning (comma separated or repeated)
	#[arg(long = "stopword", value_delimiter = ',')]
	pub stopwords: Vec<String>,

	/// Remote fetch timeout in seconds
	#[arg(long, default_value = "30", env = "BOOKREC_FETCH_TIMEOUT")]
	pub fetch_timeout: u64,

	/// Build the index from the default source before serving requests
	#[arg(long)]
	pub build_on_start: bool,

	/// Search query for the startup build (required for remote sources)
	#[arg(long)]
	pub query: Option<String>,

	/// Maximum results requested from remote sources
	#[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
	pub max_results: usize,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, default_value = "info", env = "BOOKREC_LOG_LEVEL")]
	pub log_level: String,
}

impl CliArgs {
	pub fn book_source(&self) -> BookSource {
		BookSource::parse(&self.source, self.api_key.clone())
	}

	pub fn tfidf_config(&self) -> TfidfConfig {
		TfidfConfig {
			max_features: (self.max_features > 0).then_some(self.max_features),
			ngram_range: (1, self.max_ngram.max(1)),
		}
	}

	pub fn preprocessor(&self) -> Preprocessor {
		Preprocessor::with_stopwords(self.stopwords.iter().map(|s| s.to_lowercase()))
	}

	pub fn startup_fetch_options(&self) -> FetchOptions {
		FetchOptions {
			query: self.query.clone(),
			max_results: self.max_results,
		}
	}
}
