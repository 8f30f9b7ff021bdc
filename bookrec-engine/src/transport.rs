use std::io::{self, Write};

use serde::Serialize;

#[derive(Serialize)]
struct JsonRpcResponse<'a> {
	jsonrpc: &'a str,
	id: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	result: Option<serde_json::Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error: Option<JsonRpcErrorBody>,
}

#[derive(Serialize)]
struct JsonRpcErrorBody {
	code: i32,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	data: Option<serde_json::Value>,
}

/// NDJSON transport: one JSON-RPC response per line. Writes to stdout unless
/// built with [`NdjsonTransport::with_writer`].
pub struct NdjsonTransport {
	out: Box<dyn Write + Send>,
}

impl Default for NdjsonTransport {
	fn default() -> Self {
		Self::new()
	}
}

impl NdjsonTransport {
	pub fn new() -> Self {
		Self::with_writer(Box::new(io::stdout()))
	}

	pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
		Self { out }
	}

	pub fn write_response(&mut self, id: u64, result: serde_json::Value) {
		self.write_line(&JsonRpcResponse {
			jsonrpc: "2.0",
			id,
			result: Some(result),
			error: None,
		});
	}

	pub fn write_error(
		&mut self,
		id: u64,
		code: i32,
		message: impl Into<String>,
		data: Option<serde_json::Value>,
	) {
		self.write_line(&JsonRpcResponse {
			jsonrpc: "2.0",
			id,
			result: None,
			error: Some(JsonRpcErrorBody {
				code,
				message: message.into(),
				data,
			}),
		});
	}

	fn write_line(&mut self, value: &impl Serialize) {
		let line = match serde_json::to_string(value) {
			Ok(line) => line,
			Err(e) => {
				tracing::error!("Failed to serialize: {}", e);
				return;
			}
		};
		if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
			tracing::error!("Failed to write response: {}", e);
		}
	}
}
