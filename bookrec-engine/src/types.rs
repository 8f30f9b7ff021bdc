use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single catalogue record. Identity is `id`; everything else is payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
	pub id: String,
	pub title: String,
	#[serde(default)]
	pub authors: Vec<String>,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub metadata: HashMap<String, serde_json::Value>,
}

impl Book {
	/// Convenience constructor with empty metadata.
	pub fn new(
		id: impl Into<String>,
		title: impl Into<String>,
		authors: Vec<String>,
		description: impl Into<String>,
		tags: Vec<String>,
	) -> Self {
		Self {
			id: id.into(),
			title: title.into(),
			authors,
			description: description.into(),
			tags,
			metadata: HashMap::new(),
		}
	}
}

/// Outcome of a successful `Recommender::build`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
	pub items: usize,
	#[serde(rename = "textFeatures")]
	pub text_features: usize,
	#[serde(rename = "tagFeatures")]
	pub tag_features: usize,
	pub version: u64,
}

/// A ranked candidate with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scored {
	pub id: String,
	pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
	pub book: Book,
	pub score: f64,
}
