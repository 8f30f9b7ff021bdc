use serde::Deserialize;

use crate::fetcher::BookSource;

// ── JSON-RPC 2.0 error codes ────────────────────────────────────────────────

pub const INTERNAL_ERROR: i32 = -32603;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const RECOMMENDER_ERROR: i32 = -32000;

// ── Incoming request ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
	pub id: u64,
	pub method: String,
	#[serde(default)]
	pub params: serde_json::Value,
}

// ── Params ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildParams {
	pub source: Option<BookSource>,
	pub query: Option<String>,
	pub max_results: Option<usize>,
}

/// `topN` is signed on the wire; anything at or below zero means "none".
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendParams {
	pub id: String,
	pub top_n: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendByTextParams {
	pub query: String,
	pub top_n: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct IdParams {
	pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct TitleParams {
	pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthorParams {
	pub author: String,
}

#[derive(Debug, Deserialize)]
pub struct TagParams {
	pub tag: String,
}
