// ---------------------------------------------------------------------------
// RecommenderServer: JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Reads NDJSON JSON-RPC 2.0 requests from stdin, routes them to the
// Recommender, and writes one response per request to stdout. Requests are
// handled strictly one at a time.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead};

use serde_json::json;

use crate::error::RecommendError;
use crate::fetcher::{Fetch, FetchOptions, DEFAULT_MAX_RESULTS};
use crate::preprocess::TextCleaner;
use crate::protocol::*;
use crate::recommender::{Recommender, DEFAULT_TOP_N};
use crate::transport::NdjsonTransport;
use crate::types::Book;

/// JSON-RPC server that owns a [`Recommender`].
pub struct RecommenderServer<F: Fetch, C: TextCleaner> {
	transport: NdjsonTransport,
	recommender: Recommender<F, C>,
}

impl<F: Fetch, C: TextCleaner> RecommenderServer<F, C> {
	pub fn new(transport: NdjsonTransport, recommender: Recommender<F, C>) -> Self {
		Self {
			transport,
			recommender,
		}
	}

	/// Main loop: read JSON-RPC messages from stdin until EOF.
	pub fn run(&mut self) -> Result<(), RecommendError> {
		let stdin = io::stdin();
		self.serve(stdin.lock())
	}

	/// Serve every request line from `reader`, in order, until EOF.
	pub fn serve<R: BufRead>(&mut self, reader: R) -> Result<(), RecommendError> {
		for line_result in reader.lines() {
			let line = line_result?;
			if line.trim().is_empty() {
				continue;
			}

			let request: JsonRpcRequest = match serde_json::from_str(&line) {
				Ok(r) => r,
				Err(e) => {
					tracing::error!("Failed to parse request: {}", e);
					continue;
				}
			};

			self.dispatch(request);
		}

		Ok(())
	}

	pub fn recommender(&self) -> &Recommender<F, C> {
		&self.recommender
	}

	// ── Dispatch ──────────────────────────────────────────────────────────

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		match self.handle(&req.method, req.params) {
			Some(Ok(value)) => self.transport.write_response(id, value),
			Some(Err(e)) => {
				tracing::debug!(method = %req.method, code = e.code(), "Request failed");
				self.transport
					.write_error(id, rpc_code(&e), e.to_string(), Some(e.to_json_rpc_error()))
			}
			None => self.transport.write_error(
				id,
				METHOD_NOT_FOUND,
				format!("Unknown method: {}", req.method),
				None,
			),
		}
	}

	/// Route one method call. `None` means the method does not exist.
	pub fn handle(
		&mut self,
		method: &str,
		params: serde_json::Value,
	) -> Option<Result<serde_json::Value, RecommendError>> {
		let result = match method {
			// -- Recommender ---------------------------------------------
			"recommender/build" => self.handle_build(params),
			"recommender/recommend" => handle_recommend(&self.recommender, params),
			"recommender/recommendByText" => handle_recommend_by_text(&self.recommender, params),
			"recommender/status" => Ok(json!({
				"built": self.recommender.is_built(),
				"items": self.recommender.library().len(),
				"version": self.recommender.index().version(),
			})),

			// -- Library -------------------------------------------------
			"library/getById" => parse_params::<IdParams>(params).map(|p| {
				json!({ "book": self.recommender.library().get_by_id(&p.id) })
			}),
			"library/all" => Ok(json!({ "books": self.recommender.library().all() })),
			"library/findByTitle" => parse_params::<TitleParams>(params)
				.map(|p| books_json(self.recommender.library().find_by_title(&p.title))),
			"library/findByAuthor" => parse_params::<AuthorParams>(params)
				.map(|p| books_json(self.recommender.library().find_by_author(&p.author))),
			"library/findByTag" => parse_params::<TagParams>(params)
				.map(|p| books_json(self.recommender.library().find_by_tag(&p.tag))),

			_ => return None,
		};
		Some(result)
	}

	fn handle_build(&mut self, params: serde_json::Value) -> Result<serde_json::Value, RecommendError> {
		let p: BuildParams = if params.is_null() {
			BuildParams::default()
		} else {
			parse_params(params)?
		};
		let options = FetchOptions {
			query: p.query,
			max_results: p.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
		};
		let summary = self.recommender.build(p.source.as_ref(), &options)?;
		Ok(serde_json::to_value(summary)?)
	}
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_recommend<F: Fetch, C: TextCleaner>(
	recommender: &Recommender<F, C>,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecommendError> {
	let p: RecommendParams = parse_params(params)?;
	let recs = recommender.recommend_with_scores(&p.id, top_n(p.top_n))?;
	Ok(json!({ "recommendations": recs }))
}

fn handle_recommend_by_text<F: Fetch, C: TextCleaner>(
	recommender: &Recommender<F, C>,
	params: serde_json::Value,
) -> Result<serde_json::Value, RecommendError> {
	let p: RecommendByTextParams = parse_params(params)?;
	let recs = recommender.recommend_by_text_with_scores(&p.query, top_n(p.top_n))?;
	Ok(json!({ "recommendations": recs }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_params<T: serde::de::DeserializeOwned>(
	params: serde_json::Value,
) -> Result<T, RecommendError> {
	serde_json::from_value(params).map_err(|e| RecommendError::InvalidParams(e.to_string()))
}

fn top_n(requested: Option<i64>) -> usize {
	match requested {
		Some(n) if n <= 0 => 0,
		Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
		None => DEFAULT_TOP_N,
	}
}

fn books_json(books: Vec<&Book>) -> serde_json::Value {
	json!({ "books": books })
}

fn rpc_code(e: &RecommendError) -> i32 {
	match e {
		RecommendError::InvalidParams(_) => INVALID_PARAMS,
		RecommendError::Io(_) | RecommendError::Json(_) => INTERNAL_ERROR,
		_ => RECOMMENDER_ERROR,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fetcher::BookSource;
	use crate::preprocess::Preprocessor;
	use crate::tfidf::TfidfConfig;

	struct FixedFetcher(Vec<Book>);

	impl Fetch for FixedFetcher {
		fn fetch(
			&self,
			_source: Option<&BookSource>,
			_options: &FetchOptions,
		) -> Result<Vec<Book>, RecommendError> {
			Ok(self.0.clone())
		}
	}

	fn server() -> RecommenderServer<FixedFetcher, Preprocessor> {
		let books = vec![
			Book::new("1", "Alpha Tale", vec!["Author A".into()], "alpha alpha", vec!["x".into()]),
			Book::new("2", "Beta Story", vec!["Author B".into()], "beta beta", vec!["y".into()]),
			Book::new(
				"3",
				"Alpha Beta Mix",
				vec!["Author C".into()],
				"alpha beta",
				vec!["x".into(), "y".into()],
			),
		];
		let recommender =
			Recommender::with_parts(FixedFetcher(books), Preprocessor::new(), TfidfConfig::default());
		RecommenderServer::new(NdjsonTransport::new(), recommender)
	}

	fn call(s: &mut RecommenderServer<FixedFetcher, Preprocessor>, method: &str, params: serde_json::Value) -> serde_json::Value {
		s.handle(method, params).expect("method exists").expect("call succeeds")
	}

	fn rec_ids(v: &serde_json::Value) -> Vec<String> {
		v["recommendations"]
			.as_array()
			.unwrap()
			.iter()
			.map(|r| r["book"]["id"].as_str().unwrap().to_string())
			.collect()
	}

	#[test]
	fn unknown_method_is_none() {
		let mut s = server();
		assert!(s.handle("nope/nothing", json!({})).is_none());
	}

	#[test]
	fn recommend_before_build_errors() {
		let mut s = server();
		let err = s
			.handle("recommender/recommend", json!({ "id": "1" }))
			.unwrap()
			.unwrap_err();
		assert!(matches!(err, RecommendError::NotFitted));
		assert_eq!(rpc_code(&err), RECOMMENDER_ERROR);
	}

	#[test]
	fn build_then_recommend() {
		let mut s = server();
		let summary = call(&mut s, "recommender/build", serde_json::Value::Null);
		assert_eq!(summary["items"], 3);
		assert_eq!(summary["version"], 1);

		let v = call(&mut s, "recommender/recommend", json!({ "id": "1", "topN": 2 }));
		assert_eq!(rec_ids(&v), vec!["3", "2"]);

		let status = call(&mut s, "recommender/status", json!({}));
		assert_eq!(status["built"], true);
		assert_eq!(status["items"], 3);
	}

	#[test]
	fn non_positive_top_n_is_empty() {
		let mut s = server();
		call(&mut s, "recommender/build", json!({}));
		let v = call(&mut s, "recommender/recommend", json!({ "id": "1", "topN": -3 }));
		assert!(rec_ids(&v).is_empty());
		let v = call(&mut s, "recommender/recommendByText", json!({ "query": "alpha", "topN": 0 }));
		assert!(rec_ids(&v).is_empty());
	}

	#[test]
	fn default_top_n_caps_at_candidates() {
		let mut s = server();
		call(&mut s, "recommender/build", json!({}));
		let v = call(&mut s, "recommender/recommendByText", json!({ "query": "alpha" }));
		assert_eq!(rec_ids(&v).len(), 3);
		assert_eq!(rec_ids(&v)[0], "1");
	}

	#[test]
	fn top_n_conversion() {
		assert_eq!(top_n(None), DEFAULT_TOP_N);
		assert_eq!(top_n(Some(-1)), 0);
		assert_eq!(top_n(Some(3)), 3);
		assert_eq!(top_n(Some(i64::MAX)), usize::try_from(i64::MAX).unwrap_or(usize::MAX));
		assert!(top_n(Some(4_294_967_296)) > 0);
	}

	#[test]
	fn library_lookups() {
		let mut s = server();
		call(&mut s, "recommender/build", json!({}));
		let v = call(&mut s, "library/getById", json!({ "id": "2" }));
		assert_eq!(v["book"]["title"], "Beta Story");
		let v = call(&mut s, "library/getById", json!({ "id": "missing" }));
		assert!(v["book"].is_null());
		let v = call(&mut s, "library/findByTitle", json!({ "title": "alpha" }));
		assert_eq!(v["books"].as_array().unwrap().len(), 2);
		let v = call(&mut s, "library/findByAuthor", json!({ "author": "author b" }));
		assert_eq!(v["books"][0]["id"], "2");
		let v = call(&mut s, "library/findByTag", json!({ "tag": "y" }));
		assert_eq!(v["books"].as_array().unwrap().len(), 2);
		let v = call(&mut s, "library/all", json!({}));
		assert_eq!(v["books"].as_array().unwrap().len(), 3);
	}

	#[test]
	fn serve_answers_each_line() {
		use std::io::Write;
		use std::sync::{Arc, Mutex};

		#[derive(Clone, Default)]
		struct SharedBuf(Arc<Mutex<Vec<u8>>>);
		impl Write for SharedBuf {
			fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
				self.0.lock().unwrap().write(buf)
			}
			fn flush(&mut self) -> io::Result<()> {
				Ok(())
			}
		}

		let buf = SharedBuf::default();
		let mut s = server();
		s.transport = NdjsonTransport::with_writer(Box::new(buf.clone()));

		let input = concat!(
			r#"{"jsonrpc":"2.0","id":1,"method":"recommender/build","params":{}}"#,
			"\n\n",
			"not json\n",
			r#"{"jsonrpc":"2.0","id":2,"method":"recommender/recommend","params":{"id":"2","topN":1}}"#,
			"\n",
			r#"{"jsonrpc":"2.0","id":3,"method":"bogus"}"#,
			"\n",
		);
		s.serve(io::Cursor::new(input)).unwrap();

		let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
		let lines: Vec<serde_json::Value> = text
			.lines()
			.map(|l| serde_json::from_str(l).unwrap())
			.collect();
		assert_eq!(lines.len(), 3);
		assert_eq!(lines[0]["id"], 1);
		assert_eq!(lines[1]["result"]["recommendations"][0]["book"]["id"], "3");
		assert_eq!(lines[2]["error"]["code"], METHOD_NOT_FOUND);
	}

	#[test]
	fn bad_params_map_to_invalid_params() {
		let mut s = server();
		let err = s
			.handle("recommender/recommend", json!({ "topN": 2 }))
			.unwrap()
			.unwrap_err();
		assert!(matches!(err, RecommendError::InvalidParams(_)));
		assert_eq!(rpc_code(&err), INVALID_PARAMS);
	}
}
