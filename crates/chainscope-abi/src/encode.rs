//! ABI encoding: JSON values in, head/tail call data out.

use alloy_primitives::{I256, U256};
use serde_json::Value;

use crate::error::AbiError;
use crate::signature::parse_signature;
use crate::types::ParamType;

/// Encode one value. Returns the encoding and whether it is dynamic (and so
/// belongs in the tail of the enclosing aggregate).
pub fn encode_value(ty: &ParamType, value: &Value) -> Result<(Vec<u8>, bool), AbiError> {
    match ty {
        ParamType::Address => {
            let text = value
                .as_str()
                .ok_or_else(|| AbiError::value("address", "must be a string"))?;
            let body = text.trim().strip_prefix("0x").unwrap_or_else(|| text.trim());
            if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(AbiError::value("address", "expected 40 hex characters"));
            }
            let bytes = hex::decode(body.to_ascii_lowercase())
                .map_err(|_| AbiError::value("address", "expected 40 hex characters"))?;
            Ok((left_pad32(&bytes), false))
        }
        ParamType::Uint(bits) => {
            let parsed = u256_from_value(value, &format!("uint{bits}"))?;
            if *bits < 256 && parsed >= (U256::from(1u8) << *bits as usize) {
                return Err(AbiError::value(format!("uint{bits}"), "value out of range"));
            }
            Ok((parsed.to_be_bytes::<32>().to_vec(), false))
        }
        ParamType::Int(bits) => {
            let parsed = i256_from_value(value, &format!("int{bits}"))?;
            if *bits < 256 {
                let half = U256::from(1u8) << (*bits as usize - 1);
                let ok = if parsed.is_negative() {
                    parsed.into_raw().wrapping_neg() <= half
                } else {
                    parsed.into_raw() < half
                };
                if !ok {
                    return Err(AbiError::value(format!("int{bits}"), "value out of range"));
                }
            }
            // Two's complement in the full 256-bit word.
            Ok((parsed.into_raw().to_be_bytes::<32>().to_vec(), false))
        }
        ParamType::Bool => {
            let bit = match value {
                Value::Bool(b) => u8::from(*b),
                Value::Number(n) => match n.as_u64() {
                    Some(0) => 0,
                    Some(1) => 1,
                    _ => return Err(AbiError::value("bool", "must be bool or 0/1")),
                },
                _ => return Err(AbiError::value("bool", "must be bool or 0/1")),
            };
            let mut word = [0u8; 32];
            word[31] = bit;
            Ok((word.to_vec(), false))
        }
        ParamType::FixedBytes(size) => {
            let bytes = bytes_from_value(value, &format!("bytes{size}"))?;
            if bytes.len() != *size {
                return Err(AbiError::value(
                    format!("bytes{size}"),
                    format!("requires {size} bytes"),
                ));
            }
            let mut word = [0u8; 32];
            word[..bytes.len()].copy_from_slice(&bytes);
            Ok((word.to_vec(), false))
        }
        ParamType::Bytes => {
            let bytes = bytes_from_value(value, "bytes")?;
            Ok((encode_dynamic_bytes(&bytes), true))
        }
        ParamType::String => {
            let text = value
                .as_str()
                .ok_or_else(|| AbiError::value("string", "must be a string"))?;
            Ok((encode_dynamic_bytes(text.as_bytes()), true))
        }
        ParamType::Tuple(components) => {
            let items = value
                .as_array()
                .ok_or_else(|| AbiError::value("tuple", "must be an array of components"))?;
            if items.len() != components.len() {
                return Err(AbiError::ArgumentCount {
                    expected: components.len(),
                    got: items.len(),
                });
            }
            let pairs: Vec<(&ParamType, &Value)> = components
                .iter()
                .map(|(_, ty)| ty)
                .zip(items.iter())
                .collect();
            let payload = encode_head_tail(&pairs)?;
            Ok((payload, ty.is_dynamic()))
        }
        ParamType::Array { elem, len } => encode_array(elem, *len, value),
    }
}

/// Encode a full argument list in head/tail layout, offsets relative to the
/// start of the head section.
pub fn encode_call(types: &[ParamType], args: &[Value]) -> Result<Vec<u8>, AbiError> {
    if types.len() != args.len() {
        return Err(AbiError::ArgumentCount { expected: types.len(), got: args.len() });
    }
    let pairs: Vec<(&ParamType, &Value)> = types.iter().zip(args.iter()).collect();
    encode_head_tail(&pairs)
}

/// Parse a signature, encode the arguments, and return
/// `(selector_hex, 0x-prefixed call data)`.
pub fn encode_function_data(function: &str, args: &[Value]) -> Result<(String, String), AbiError> {
    let signature = parse_signature(function)?;
    let mut types = Vec::with_capacity(signature.inputs.len());
    for raw in &signature.inputs {
        types.push(ParamType::parse(raw)?);
    }
    let encoded = encode_call(&types, args)?;
    let selector = signature.selector();
    Ok((selector.clone(), format!("0x{selector}{}", hex::encode(encoded))))
}

fn encode_array(
    elem: &ParamType,
    len: Option<usize>,
    value: &Value,
) -> Result<(Vec<u8>, bool), AbiError> {
    let items = value
        .as_array()
        .ok_or_else(|| AbiError::value("array", "must be an array"))?;

    match len {
        None => {
            let pairs: Vec<(&ParamType, &Value)> =
                items.iter().map(|item| (elem, item)).collect();
            let body = encode_head_tail(&pairs)?;
            let mut payload = u256_word(U256::from(items.len()));
            payload.extend_from_slice(&body);
            Ok((payload, true))
        }
        Some(expected) => {
            if items.len() != expected {
                return Err(AbiError::value(
                    "array",
                    format!("expected length {expected}, got {}", items.len()),
                ));
            }
            let pairs: Vec<(&ParamType, &Value)> =
                items.iter().map(|item| (elem, item)).collect();
            let payload = encode_head_tail(&pairs)?;
            // A fixed-size array of dynamic elements is itself dynamic.
            Ok((payload, elem.is_dynamic()))
        }
    }
}

/// Head/tail layout over a sequence of (type, value) pairs. Static
/// encodings inline into the head; dynamic encodings go to the tail behind
/// a 32-byte offset measured from the start of the head.
fn encode_head_tail(pairs: &[(&ParamType, &Value)]) -> Result<Vec<u8>, AbiError> {
    let mut encoded = Vec::with_capacity(pairs.len());
    let mut head_size = 0usize;
    for (ty, value) in pairs {
        let (bytes, dynamic) = encode_value(ty, value)?;
        head_size += if dynamic { 32 } else { bytes.len() };
        encoded.push((bytes, dynamic));
    }

    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();
    let mut offset = head_size;
    for (bytes, dynamic) in encoded {
        if dynamic {
            head.extend_from_slice(&u256_word(U256::from(offset)));
            offset += bytes.len();
            tail.extend_from_slice(&bytes);
        } else {
            head.extend_from_slice(&bytes);
        }
    }
    head.extend_from_slice(&tail);
    Ok(head)
}

fn encode_dynamic_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = u256_word(U256::from(data.len()));
    out.extend_from_slice(data);
    let pad = (32 - data.len() % 32) % 32;
    out.extend(std::iter::repeat(0u8).take(pad));
    out
}

fn u256_word(value: U256) -> Vec<u8> {
    value.to_be_bytes::<32>().to_vec()
}

fn left_pad32(bytes: &[u8]) -> Vec<u8> {
    let mut word = vec![0u8; 32 - bytes.len()];
    word.extend_from_slice(bytes);
    word
}

fn u256_from_value(value: &Value, ty: &str) -> Result<U256, AbiError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| AbiError::value(ty, "must be a non-negative integer")),
        Value::String(s) => {
            let text = s.trim();
            let (body, radix) = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                Some(hex_body) => (hex_body, 16),
                None => (text, 10),
            };
            U256::from_str_radix(body, radix)
                .map_err(|_| AbiError::value(ty, "must be a non-negative integer"))
        }
        _ => Err(AbiError::value(ty, "must be a non-negative integer")),
    }
}

fn i256_from_value(value: &Value, ty: &str) -> Result<I256, AbiError> {
    let text = match value {
        Value::Number(n) => {
            if !n.is_i64() && !n.is_u64() {
                return Err(AbiError::value(ty, "must be an integer"));
            }
            n.to_string()
        }
        Value::String(s) => s.trim().to_string(),
        _ => return Err(AbiError::value(ty, "must be an integer")),
    };

    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(&text)),
    };
    let magnitude = U256::from_str_radix(digits, 10)
        .map_err(|_| AbiError::value(ty, "must be an integer"))?;

    if negative {
        if magnitude > (U256::from(1u8) << 255usize) {
            return Err(AbiError::value(ty, "value out of range"));
        }
        Ok(I256::from_raw(magnitude.wrapping_neg()))
    } else {
        if magnitude > (U256::MAX >> 1usize) {
            return Err(AbiError::value(ty, "value out of range"));
        }
        Ok(I256::from_raw(magnitude))
    }
}

fn bytes_from_value(value: &Value, ty: &str) -> Result<Vec<u8>, AbiError> {
    let text = value
        .as_str()
        .ok_or_else(|| AbiError::value(ty, "must be a hex string"))?;
    let trimmed = text.trim();
    let body = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
    let owned;
    let body = if body.len() % 2 != 0 {
        owned = format!("0{body}");
        &owned
    } else {
        body
    };
    hex::decode(body).map_err(|_| AbiError::value(ty, "must be a hex string"))
}
