#![forbid(unsafe_code)]

use serde_json::{Value, json};
use tt_storage::StoreError;

// Every tool answers in the same envelope: success, intent, result, warnings,
// refs, error. Tooling on the client side switches on `success` and
// `error.code` alone.

pub(crate) fn ai_ok(intent: &str, result: Value) -> Value {
    ai_ok_with_warnings(intent, result, Vec::new(), Vec::new())
}

pub(crate) fn ai_ok_with_warnings(
    intent: &str,
    result: Value,
    warnings: Vec<Value>,
    refs: Vec<Value>,
) -> Value {
    json!({
        "success": true,
        "intent": intent,
        "result": result,
        "warnings": warnings,
        "refs": refs,
        "error": null
    })
}

pub(crate) fn ai_error(code: &str, message: &str) -> Value {
    ai_error_with(code, message, None, Vec::new())
}

pub(crate) fn ai_error_with(
    code: &str,
    message: &str,
    recovery: Option<&str>,
    refs: Vec<Value>,
) -> Value {
    let mut error = json!({
        "code": code,
        "message": message.trim()
    });
    if let Some(recovery) = recovery
        && let Some(fields) = error.as_object_mut()
    {
        fields.insert(
            "recovery".to_string(),
            Value::String(recovery.trim().to_string()),
        );
    }

    json!({
        "success": false,
        "intent": "error",
        "result": {},
        "warnings": [],
        "refs": refs,
        "error": error
    })
}

/// A `refs` entry nudging the client toward a follow-up tool call.
pub(crate) fn suggest_call(tool: &str, reason: &str, priority: &str, args: Value) -> Value {
    json!({
        "action": "call_tool",
        "target": tool,
        "reason": reason,
        "priority": priority,
        "args": args
    })
}

pub(crate) fn format_store_error(err: StoreError) -> String {
    match err {
        StoreError::Io(e) => format!("IO: {e}"),
        StoreError::Sql(e) => format!("SQL: {e}"),
        StoreError::InvalidInput(msg) => format!("Invalid input: {msg}"),
        StoreError::UnknownId => "Unknown id".to_string(),
    }
}
