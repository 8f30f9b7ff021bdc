pub mod config;
pub mod error;
pub mod features;
pub mod fetcher;
pub mod index;
pub mod library;
pub mod preprocess;
pub mod protocol;
pub mod recommender;
pub mod server;
pub mod sparse;
pub mod tags;
pub mod tfidf;
pub mod transport;
pub mod types;
