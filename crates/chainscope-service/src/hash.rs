//! The public Keccak-256 tool.

use serde_json::{json, Value};

use chainscope_core::error::InputError;
use chainscope_core::hex::normalize_hex;
use chainscope_core::keccak::keccak256;

use crate::{ContractService, ServiceError};

impl ContractService {
    /// Keccak-256 of the given value.
    ///
    /// `input_type` is one of `text` (UTF-8, the default), `hex`, or
    /// `bytes`. A sequence input concatenates its elements in order before
    /// hashing.
    pub fn keccak(&self, value: &Value, input_type: Option<&str>) -> Result<Value, ServiceError> {
        keccak_value(value, input_type)
    }
}

pub(crate) fn keccak_value(
    value: &Value,
    input_type: Option<&str>,
) -> Result<Value, ServiceError> {
    let normalized_type = input_type.unwrap_or("text").trim().to_ascii_lowercase();
    if !matches!(normalized_type.as_str(), "text" | "hex" | "bytes") {
        return Err(InputError::other("input_type must be one of: text, hex, bytes.").into());
    }

    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let is_sequence = value.is_array();

    let mut data = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let label = if is_sequence { format!("value[{idx}]") } else { "value".to_string() };
        let part = match normalized_type.as_str() {
            "text" | "bytes" => item
                .as_str()
                .map(|s| s.as_bytes().to_vec())
                .ok_or_else(|| {
                    InputError::other(format!(
                        "For input_type={normalized_type}, {label} must be a string."
                    ))
                })?,
            "hex" => {
                let text = item.as_str().ok_or_else(|| {
                    InputError::other(format!("For input_type=hex, {label} must be a hex string."))
                })?;
                let normalized = normalize_hex(text, &label)?;
                let body = &normalized[2..];
                if body.len() % 2 != 0 {
                    return Err(InputError::OddHexLength { field: label }.into());
                }
                hex::decode(body).map_err(|_| InputError::hex(&label))?
            }
            _ => unreachable!(),
        };
        data.extend_from_slice(&part);
    }

    let digest = keccak256(&data);
    Ok(json!({
        "input_type": normalized_type,
        "data": format!("0x{}", hex::encode(digest)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_text() {
        let result = keccak_value(&json!("hello"), Some("text")).unwrap();
        assert_eq!(
            result["data"],
            json!("0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8")
        );
        assert_eq!(result["input_type"], json!("text"));
    }

    #[test]
    fn hex_input_equivalent_to_text() {
        // "hello" = 0x68656c6c6f
        let from_hex = keccak_value(&json!("0x68656c6c6f"), Some("hex")).unwrap();
        let from_text = keccak_value(&json!("hello"), None).unwrap();
        assert_eq!(from_hex["data"], from_text["data"]);
    }

    #[test]
    fn sequence_concatenates_in_order() {
        let split = keccak_value(&json!(["he", "llo"]), Some("text")).unwrap();
        let whole = keccak_value(&json!("hello"), Some("text")).unwrap();
        assert_eq!(split["data"], whole["data"]);
    }

    #[test]
    fn odd_hex_rejected() {
        let err = keccak_value(&json!("0xf"), Some("hex")).unwrap_err();
        assert!(err.to_string().contains("even"));
    }

    #[test]
    fn bad_input_type_rejected() {
        assert!(keccak_value(&json!("x"), Some("base64")).is_err());
    }

    #[test]
    fn non_string_element_rejected() {
        let err = keccak_value(&json!(["ok", 42]), Some("text")).unwrap_err();
        assert!(err.to_string().contains("value[1]"));
    }
}
