#![forbid(unsafe_code)]

use super::ai::ai_error;
use serde_json::Value;
use tt_core::ids::WorkspaceId;

pub(crate) fn optional_workspace(
    args: &serde_json::Map<String, Value>,
) -> Result<Option<WorkspaceId>, Value> {
    let Some(value) = args.get("workspace") else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::String(v) => match WorkspaceId::try_new(v.clone()) {
            Ok(workspace) => Ok(Some(workspace)),
            Err(err) => Err(ai_error(
                "INVALID_INPUT",
                &format!("workspace: {}", err.message()),
            )),
        },
        _ => Err(ai_error("INVALID_INPUT", "workspace must be a string")),
    }
}

pub(crate) fn require_string(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<String, Value> {
    let Some(v) = args.get(key).and_then(|v| v.as_str()) else {
        return Err(ai_error("INVALID_INPUT", &format!("{key} is required")));
    };
    Ok(v.to_string())
}

pub(crate) fn optional_string(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<String>, Value> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::String(v) => Ok(Some(v.to_string())),
        _ => Err(ai_error(
            "INVALID_INPUT",
            &format!("{key} must be a string"),
        )),
    }
}

pub(crate) fn optional_bool(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<bool>, Value> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::Bool(v) => Ok(Some(*v)),
        _ => Err(ai_error(
            "INVALID_INPUT",
            &format!("{key} must be a boolean"),
        )),
    }
}

pub(crate) fn optional_usize(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<usize>, Value> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_u64().map(|v| v as usize).map(Some).ok_or_else(|| {
            ai_error(
                "INVALID_INPUT",
                &format!("{key} must be a positive integer"),
            )
        }),
        _ => Err(ai_error(
            "INVALID_INPUT",
            &format!("{key} must be a positive integer"),
        )),
    }
}
