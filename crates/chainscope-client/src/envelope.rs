//! Uniform result extraction from the three explorer response shapes.
//!
//! Module endpoints answer `{status, message, result}`; proxy endpoints
//! mimic JSON-RPC with `{result | error}`; the chainlist endpoint wraps a
//! raw list in `result`. Rate limits arrive in-band as `status == "0"`
//! with rate-limit text; distinguishing those from legitimately empty
//! sets uses the "message starts with no" heuristic.

use serde_json::Value;

use crate::error::ClientError;

const BACKEND: &str = "Etherscan";

/// Extract the `result` list of a module endpoint response.
///
/// `status == "0"` with a message starting "no" means an empty set: that
/// yields `[]` unless `require_non_empty` is asserted. Anything else with
/// `status != "1"` surfaces the upstream detail.
pub fn extract_result_list(
    payload: &Value,
    require_non_empty: bool,
) -> Result<Vec<Value>, ClientError> {
    let Some(object) = payload.as_object() else {
        return Err(ClientError::UnexpectedShape { backend: BACKEND.into() });
    };

    let status = object.get("status").and_then(Value::as_str).unwrap_or("").trim();
    let message = object.get("message").and_then(Value::as_str).unwrap_or("");
    let result = object.get("result");

    // Some endpoints return a bare list with no status at all.
    if status.is_empty() {
        if let Some(list) = result.and_then(Value::as_array) {
            if !list.is_empty() || !require_non_empty {
                return Ok(list.clone());
            }
            return Err(ClientError::EmptyResult { backend: BACKEND.into() });
        }
    }

    if status == "1" {
        if let Some(list) = result.and_then(Value::as_array) {
            if !list.is_empty() {
                return Ok(list.clone());
            }
            if require_non_empty {
                return Err(ClientError::EmptyResult { backend: BACKEND.into() });
            }
            return Ok(Vec::new());
        }
        return Err(ClientError::UnexpectedShape { backend: BACKEND.into() });
    }

    if status == "0" {
        if message.to_ascii_lowercase().starts_with("no") {
            if require_non_empty {
                return Err(ClientError::upstream(BACKEND, message));
            }
            return Ok(Vec::new());
        }
        if matches!(result, Some(Value::Array(list)) if list.is_empty()) && !require_non_empty {
            return Ok(Vec::new());
        }
    }

    Err(ClientError::upstream(BACKEND, upstream_detail(result, message)))
}

/// Extract the `result` of a proxy (JSON-RPC-like) endpoint response.
///
/// `allow_none` preserves a null result (e.g. an unknown transaction hash)
/// instead of raising.
pub fn extract_proxy_result(
    payload: &Value,
    allow_none: bool,
) -> Result<Option<Value>, ClientError> {
    let Some(object) = payload.as_object() else {
        return Err(ClientError::UnexpectedShape { backend: BACKEND.into() });
    };

    if let Some(result) = object.get("result") {
        match result {
            Value::Null if allow_none => return Ok(None),
            Value::String(_) | Value::Object(_) | Value::Array(_) => {
                return Ok(Some(result.clone()))
            }
            _ => {}
        }
    }

    if let Some(error) = object.get("error").and_then(Value::as_object) {
        let mut parts = Vec::new();
        if let Some(code) = error.get("code") {
            if !code.is_null() {
                parts.push(format!("code {code}"));
            }
        }
        for key in ["message", "data"] {
            if let Some(text) = error.get(key).and_then(Value::as_str) {
                if !text.is_empty() {
                    parts.push(text.to_string());
                }
            }
        }
        let detail = if parts.is_empty() { "unknown error".to_string() } else { parts.join(": ") };
        return Err(ClientError::upstream(BACKEND, detail));
    }

    let status = object.get("status").and_then(Value::as_str).unwrap_or("").trim();
    let message = object.get("message").and_then(Value::as_str).unwrap_or("");
    let result = object.get("result");
    if status == "1" {
        return Ok(result.cloned());
    }
    if allow_none && matches!(result, None | Some(Value::Null)) {
        return Ok(None);
    }

    Err(ClientError::upstream(BACKEND, upstream_detail(result, message)))
}

/// Extract the chain list: the payload must be an object whose `result` is
/// a list.
pub fn extract_chainlist(payload: &Value) -> Result<Vec<Value>, ClientError> {
    let Some(object) = payload.as_object() else {
        return Err(ClientError::UnexpectedShape { backend: "chainlist".into() });
    };
    match object.get("result").and_then(Value::as_array) {
        Some(list) => Ok(list.clone()),
        None => Err(ClientError::UnexpectedShape { backend: "chainlist".into() }),
    }
}

fn upstream_detail(result: Option<&Value>, message: &str) -> String {
    let detail = match result {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(list)) => list
            .first()
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default(),
        _ => String::new(),
    };
    if !detail.is_empty() {
        detail
    } else if !message.is_empty() {
        message.to_string()
    } else {
        "unknown error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_ok() {
        let payload = json!({"status": "1", "message": "OK", "result": [{"hash": "0x1"}]});
        let list = extract_result_list(&payload, false).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn list_empty_set_is_not_an_error() {
        let payload = json!({"status": "0", "message": "No transactions found", "result": []});
        assert!(extract_result_list(&payload, false).unwrap().is_empty());
    }

    #[test]
    fn list_empty_set_raises_when_required() {
        let payload = json!({"status": "0", "message": "No data found", "result": []});
        let err = extract_result_list(&payload, true).unwrap_err();
        assert_eq!(err.to_string(), "Etherscan error: No data found.");
    }

    #[test]
    fn list_error_carries_result_detail() {
        let payload = json!({"status": "0", "message": "NOTOK", "result": "Invalid API Key"});
        let err = extract_result_list(&payload, false).unwrap_err();
        assert_eq!(err.to_string(), "Etherscan error: Invalid API Key.");
    }

    #[test]
    fn list_bare_list_without_status() {
        let payload = json!({"result": [1, 2]});
        assert_eq!(extract_result_list(&payload, false).unwrap().len(), 2);
    }

    #[test]
    fn proxy_string_result() {
        let payload = json!({"jsonrpc": "2.0", "id": 1, "result": "0x1234"});
        let value = extract_proxy_result(&payload, false).unwrap().unwrap();
        assert_eq!(value, json!("0x1234"));
    }

    #[test]
    fn proxy_null_result_preserved() {
        let payload = json!({"jsonrpc": "2.0", "id": 1, "result": null});
        assert!(extract_proxy_result(&payload, true).unwrap().is_none());
    }

    #[test]
    fn proxy_null_result_rejected_without_allow_none() {
        let payload = json!({"jsonrpc": "2.0", "id": 1, "result": null});
        assert!(extract_proxy_result(&payload, false).is_err());
    }

    #[test]
    fn proxy_error_object() {
        let payload = json!({"error": {"code": -32000, "message": "execution reverted"}});
        let err = extract_proxy_result(&payload, false).unwrap_err();
        assert_eq!(err.to_string(), "Etherscan error: code -32000: execution reverted.");
    }

    #[test]
    fn proxy_status_one_passthrough() {
        let payload = json!({"status": "1", "message": "OK", "result": "0x1"});
        let value = extract_proxy_result(&payload, false).unwrap().unwrap();
        assert_eq!(value, json!("0x1"));
    }

    #[test]
    fn chainlist_requires_result_list() {
        assert!(extract_chainlist(&json!({"result": []})).unwrap().is_empty());
        assert!(extract_chainlist(&json!({"result": "nope"})).is_err());
        assert!(extract_chainlist(&json!("nope")).is_err());
    }
}
