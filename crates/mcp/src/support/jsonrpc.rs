#![forbid(unsafe_code)]

use serde::Deserialize;
use serde_json::{Value, json};

/// One incoming JSON-RPC message. The `jsonrpc` marker field is tolerated and
/// ignored; `id` stays a raw value since clients use strings and numbers alike.
#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcRequest {
    pub(crate) method: String,
    #[serde(default)]
    pub(crate) id: Option<Value>,
    #[serde(default)]
    pub(crate) params: Option<Value>,
}

pub(crate) fn json_rpc_response(id: Option<Value>, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

pub(crate) fn json_rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

/// Wraps a tool payload as MCP text content, pretty-printed so transcripts
/// stay readable.
pub(crate) fn tool_text_content(payload: &Value) -> Value {
    let rendered = serde_json::to_string_pretty(payload).unwrap_or_else(|_| "{}".to_string());
    json!({ "type": "text", "text": rendered })
}
