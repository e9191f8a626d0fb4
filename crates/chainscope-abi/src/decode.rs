//! ABI decoding: return data in, [`AbiValue`] trees out.
//!
//! Offsets read from head words are added to the enclosing aggregate's data
//! base. A dynamic tuple's data start becomes the base for its components;
//! a dynamic array's element offsets are relative to the first element head
//! (just past the length word).

use alloy_primitives::{I256, U256};

use crate::error::AbiError;
use crate::types::{AbiValue, ParamType};

/// Decode a sequence of named top-level parameters from `data`.
pub fn decode_params(
    params: &[(String, ParamType)],
    data: &[u8],
) -> Result<Vec<AbiValue>, AbiError> {
    let mut values = Vec::with_capacity(params.len());
    let mut cursor = 0usize;
    for (_, ty) in params {
        values.push(decode_value(ty, data, cursor, 0)?);
        cursor += ty.head_size()?;
    }
    Ok(values)
}

fn decode_value(
    ty: &ParamType,
    data: &[u8],
    head: usize,
    base: usize,
) -> Result<AbiValue, AbiError> {
    match ty {
        ParamType::Address => {
            let word = read_word(data, head)?;
            Ok(AbiValue::Address(format!("0x{}", hex::encode(&word[12..]))))
        }
        ParamType::Uint(_) => {
            let word = read_word(data, head)?;
            Ok(AbiValue::Uint(U256::from_be_slice(word)))
        }
        ParamType::Int(bits) => {
            let word = read_word(data, head)?;
            let raw = U256::from_be_slice(word);
            Ok(AbiValue::Int(sign_extend(raw, *bits)))
        }
        ParamType::Bool => {
            let word = read_word(data, head)?;
            Ok(AbiValue::Bool(word.iter().any(|&b| b != 0)))
        }
        ParamType::FixedBytes(size) => {
            let word = read_word(data, head)?;
            Ok(AbiValue::Bytes(word[..*size].to_vec()))
        }
        ParamType::Bytes => {
            let (start, length) = read_tail(data, head, base, "bytes")?;
            Ok(AbiValue::Bytes(data[start..start + length].to_vec()))
        }
        ParamType::String => {
            let (start, length) = read_tail(data, head, base, "string")?;
            let text = String::from_utf8_lossy(&data[start..start + length]).into_owned();
            Ok(AbiValue::Str(text))
        }
        ParamType::Tuple(components) => {
            let tuple_base = if ty.is_dynamic() {
                base + read_offset(data, head)?
            } else {
                head
            };
            let mut fields = Vec::with_capacity(components.len());
            let mut cursor = 0usize;
            for (idx, (name, component)) in components.iter().enumerate() {
                let value = decode_value(component, data, tuple_base + cursor, tuple_base)?;
                cursor += component.head_size()?;
                let field_name = if name.is_empty() { format!("field{idx}") } else { name.clone() };
                fields.push((field_name, value));
            }
            Ok(AbiValue::Tuple(fields))
        }
        ParamType::Array { elem, len } => decode_array(elem, *len, data, head, base),
    }
}

fn decode_array(
    elem: &ParamType,
    len: Option<usize>,
    data: &[u8],
    head: usize,
    base: usize,
) -> Result<AbiValue, AbiError> {
    let elem_dynamic = elem.is_dynamic();

    // Fully static arrays are inlined in the parent's head.
    if let Some(length) = len {
        if !elem_dynamic {
            let elem_size = elem.static_size()?;
            let mut values = Vec::with_capacity(length);
            for idx in 0..length {
                values.push(decode_value(elem, data, head + idx * elem_size, base)?);
            }
            return Ok(AbiValue::Array(values));
        }
    }

    // Dynamic array, or fixed-size array of dynamic elements: behind an offset.
    let array_base = base + read_offset(data, head)?;
    let (length, elem_area) = match len {
        None => {
            let length_word = U256::from_be_slice(read_word(data, array_base)?);
            let length = u256_to_usize(length_word, "array length")?;
            (length, array_base + 32)
        }
        Some(length) => (length, array_base),
    };

    let element_head_size = elem.head_size()?;
    let heads_end = elem_area
        .checked_add(length.checked_mul(element_head_size).ok_or(AbiError::ShortData)?)
        .ok_or(AbiError::ShortData)?;
    if heads_end > data.len() {
        return Err(AbiError::ShortData);
    }

    let mut values = Vec::with_capacity(length);
    for idx in 0..length {
        values.push(decode_value(elem, data, elem_area + idx * element_head_size, elem_area)?);
    }
    Ok(AbiValue::Array(values))
}

fn read_word<'a>(data: &'a [u8], offset: usize) -> Result<&'a [u8], AbiError> {
    let end = offset.checked_add(32).ok_or(AbiError::ShortData)?;
    if end > data.len() {
        return Err(AbiError::ShortData);
    }
    Ok(&data[offset..end])
}

fn read_offset(data: &[u8], head: usize) -> Result<usize, AbiError> {
    let word = U256::from_be_slice(read_word(data, head)?);
    u256_to_usize(word, "offset")
}

fn u256_to_usize(word: U256, what: &str) -> Result<usize, AbiError> {
    u64::try_from(word)
        .ok()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| AbiError::OutOfRange { what: what.to_string() })
}

/// Resolve a dynamic `bytes`/`string` tail: returns (data start, length)
/// with bounds already checked.
fn read_tail(
    data: &[u8],
    head: usize,
    base: usize,
    what: &str,
) -> Result<(usize, usize), AbiError> {
    let start = base + read_offset(data, head)?;
    let length_word = U256::from_be_slice(read_word(data, start)?);
    let length = u256_to_usize(length_word, what)?;
    let data_start = start + 32;
    let data_end = data_start.checked_add(length).ok_or(AbiError::ShortData)?;
    if data_end > data.len() {
        return Err(AbiError::OutOfRange { what: what.to_string() });
    }
    Ok((data_start, length))
}

/// Interpret the low `bits` of a 256-bit word as a signed value.
///
/// Encoders sign-extend `intN` across the whole word, so the word is
/// masked down to `bits` before the sign bit is inspected.
fn sign_extend(raw: U256, bits: u16) -> I256 {
    if bits == 256 {
        return I256::from_raw(raw);
    }
    let width = U256::from(1u8) << bits as usize;
    let low = raw & (width - U256::from(1u8));
    let sign_bit = U256::from(1u8) << (bits as usize - 1);
    if low & sign_bit != U256::ZERO {
        let magnitude = width - low;
        I256::from_raw(magnitude.wrapping_neg())
    } else {
        I256::from_raw(low)
    }
}
