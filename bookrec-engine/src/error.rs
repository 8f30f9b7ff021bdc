use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecommendError {
	#[error("Index not fitted: call build (or fit) before querying")]
	NotFitted,
	#[error("Invalid query: expected dimension {expected}, got {got}")]
	InvalidQuery { expected: usize, got: usize },
	#[error("Duplicate item id: {0}")]
	DuplicateId(String),
	#[error("Missing query: remote sources require a search query")]
	MissingQuery,
	#[error("Fetch failed: {0}")]
	Fetch(String),
	#[error("Invalid params: {0}")]
	InvalidParams(String),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl RecommendError {
	pub fn code(&self) -> &str {
		match self {
			Self::NotFitted => "RECOMMENDER_NOT_FITTED",
			Self::InvalidQuery { .. } => "RECOMMENDER_INVALID_QUERY",
			Self::DuplicateId(_) => "RECOMMENDER_DUPLICATE_ID",
			Self::MissingQuery => "FETCH_MISSING_QUERY",
			Self::Fetch(_) => "FETCH_FAILED",
			Self::InvalidParams(_) => "INVALID_PARAMS",
			Self::Io(_) => "IO_ERROR",
			Self::Json(_) => "JSON_ERROR",
		}
	}

	pub fn to_json_rpc_error(&self) -> serde_json::Value {
		serde_json::json!({
			"code": self.code(),
			"message": self.to_string(),
		})
	}
}
