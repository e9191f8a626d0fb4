//! The ABI parameter type tree and decoded value representation.

use alloy_primitives::{I256, U256};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;
use std::fmt;

use crate::error::AbiError;

/// A fully resolved ABI parameter type.
///
/// Array dimensions parse left-to-right into nesting: the outermost
/// `Array` corresponds to the leftmost `[..]` group of the type string.
/// Tuple components keep their declared names (empty when the type came
/// from a bare signature string).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Address,
    /// Width in bits, 8..=256, multiple of 8.
    Uint(u16),
    Int(u16),
    Bool,
    /// `bytesN`, 1..=32.
    FixedBytes(usize),
    Bytes,
    String,
    Tuple(Vec<(std::string::String, ParamType)>),
    Array { elem: Box<ParamType>, len: Option<usize> },
}

impl ParamType {
    /// Parse a type string: elementary types, `tuple(...)` / `(...)`
    /// aggregates, and trailing `[n]` / `[]` dimension groups.
    pub fn parse(s: &str) -> Result<Self, AbiError> {
        let (base, dims) = split_dimensions(s.trim());
        let base_ty = Self::parse_base(base)?;
        Ok(wrap_dimensions(base_ty, &dims))
    }

    fn parse_base(base: &str) -> Result<Self, AbiError> {
        match base {
            "address" => return Ok(Self::Address),
            "bool" => return Ok(Self::Bool),
            "string" => return Ok(Self::String),
            "bytes" => return Ok(Self::Bytes),
            "tuple" => return Ok(Self::Tuple(Vec::new())),
            "" => return Err(AbiError::UnsupportedType { ty: base.to_string() }),
            _ => {}
        }

        if let Some(suffix) = base.strip_prefix("uint") {
            return Ok(Self::Uint(parse_int_bits(suffix, base)?));
        }
        // "int" must be checked after "uint" (shared prefix handled by order).
        if let Some(suffix) = base.strip_prefix("int") {
            return Ok(Self::Int(parse_int_bits(suffix, base)?));
        }
        if let Some(suffix) = base.strip_prefix("bytes") {
            let size: usize = suffix
                .parse()
                .map_err(|_| AbiError::UnsupportedType { ty: base.to_string() })?;
            if size == 0 || size > 32 {
                return Err(AbiError::UnsupportedType { ty: base.to_string() });
            }
            return Ok(Self::FixedBytes(size));
        }

        // tuple(...) or bare (...) aggregates
        let inner = base
            .strip_prefix("tuple")
            .unwrap_or(base)
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'));
        if let Some(inner) = inner {
            let mut components = Vec::new();
            for part in split_top_level(inner) {
                components.push((String::new(), Self::parse(&part)?));
            }
            return Ok(Self::Tuple(components));
        }

        Err(AbiError::UnsupportedType { ty: base.to_string() })
    }

    /// Whether encodings of this type have data-dependent length.
    ///
    /// `bytes`, `string`, dynamically sized arrays, arrays of dynamic
    /// elements, and tuples with any dynamic component (or no components at
    /// all) are dynamic.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Bytes | Self::String => true,
            Self::Array { len: None, .. } => true,
            Self::Array { len: Some(_), elem } => elem.is_dynamic(),
            Self::Tuple(components) => {
                components.is_empty() || components.iter().any(|(_, ty)| ty.is_dynamic())
            }
            _ => false,
        }
    }

    /// Encoded size in bytes of a static type.
    pub fn static_size(&self) -> Result<usize, AbiError> {
        if self.is_dynamic() {
            return Err(AbiError::DynamicSize);
        }
        match self {
            Self::Tuple(components) => {
                let mut size = 0;
                for (_, ty) in components {
                    size += ty.static_size()?;
                }
                Ok(size)
            }
            Self::Array { elem, len: Some(len) } => Ok(len * elem.static_size()?),
            _ => Ok(32),
        }
    }

    /// Size a slot for this type occupies in an aggregate head.
    pub fn head_size(&self) -> Result<usize, AbiError> {
        if self.is_dynamic() {
            Ok(32)
        } else {
            self.static_size()
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => write!(f, "address"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::Bool => write!(f, "bool"),
            Self::FixedBytes(size) => write!(f, "bytes{size}"),
            Self::Bytes => write!(f, "bytes"),
            Self::String => write!(f, "string"),
            Self::Tuple(components) => {
                write!(f, "tuple(")?;
                for (idx, (_, ty)) in components.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{ty}")?;
                }
                write!(f, ")")
            }
            Self::Array { elem, len: Some(len) } => write!(f, "{elem}[{len}]"),
            Self::Array { elem, len: None } => write!(f, "{elem}[]"),
        }
    }
}

fn parse_int_bits(suffix: &str, full: &str) -> Result<u16, AbiError> {
    if suffix.is_empty() {
        return Ok(256);
    }
    let bits: u16 = suffix
        .parse()
        .map_err(|_| AbiError::UnsupportedType { ty: full.to_string() })?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(AbiError::UnsupportedType { ty: full.to_string() });
    }
    Ok(bits)
}

/// Strip trailing `[n]` / `[]` groups right-to-left. The returned list is in
/// left-to-right order, so `dims[0]` is the leftmost (outermost) dimension.
pub(crate) fn split_dimensions(ty: &str) -> (&str, Vec<Option<usize>>) {
    let mut base = ty;
    let mut dims = Vec::new();
    while base.ends_with(']') {
        let Some(open) = base.rfind('[') else { break };
        let dim = &base[open + 1..base.len() - 1];
        if dim.is_empty() {
            dims.insert(0, None);
        } else if let Ok(n) = dim.parse::<usize>() {
            dims.insert(0, Some(n));
        } else {
            break;
        }
        base = &base[..open];
    }
    (base, dims)
}

pub(crate) fn wrap_dimensions(base: ParamType, dims: &[Option<usize>]) -> ParamType {
    dims.iter().rev().fold(base, |elem, dim| ParamType::Array { elem: Box::new(elem), len: *dim })
}

/// Split a parameter list on top-level commas, preserving `(...)` groups.
pub(crate) fn split_top_level(params: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut buf = String::new();
    for ch in params.chars() {
        match ch {
            ',' if depth == 0 => {
                parts.push(buf.trim().to_string());
                buf.clear();
                continue;
            }
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        buf.push(ch);
    }
    if !buf.trim().is_empty() {
        parts.push(buf.trim().to_string());
    }
    parts
}

/// A decoded ABI value.
///
/// Serializes to plain JSON: addresses and byte strings as 0x-hex, integers
/// as numbers when they fit 64 bits and as decimal strings otherwise,
/// tuples as objects keyed by component name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(String),
    Uint(U256),
    Int(I256),
    Bool(bool),
    /// `bytes` and `bytesN` both decode to raw bytes.
    Bytes(Vec<u8>),
    Str(String),
    Array(Vec<AbiValue>),
    Tuple(Vec<(String, AbiValue)>),
}

impl AbiValue {
    /// The unsigned integer value, if this is a `Uint`.
    pub fn as_u256(&self) -> Option<U256> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// The signed integer value, if this is an `Int`.
    pub fn as_i256(&self) -> Option<I256> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl Serialize for AbiValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Address(addr) => serializer.serialize_str(addr),
            Self::Uint(v) => {
                let text = v.to_string();
                match text.parse::<u64>() {
                    Ok(n) => serializer.serialize_u64(n),
                    Err(_) => serializer.serialize_str(&text),
                }
            }
            Self::Int(v) => {
                let text = v.to_string();
                match text.parse::<i64>() {
                    Ok(n) => serializer.serialize_i64(n),
                    Err(_) => serializer.serialize_str(&text),
                }
            }
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Bytes(bytes) => serializer.serialize_str(&format!("0x{}", hex::encode(bytes))),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Tuple(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_elementary() {
        assert_eq!(ParamType::parse("address").unwrap(), ParamType::Address);
        assert_eq!(ParamType::parse("uint").unwrap(), ParamType::Uint(256));
        assert_eq!(ParamType::parse("uint8").unwrap(), ParamType::Uint(8));
        assert_eq!(ParamType::parse("int128").unwrap(), ParamType::Int(128));
        assert_eq!(ParamType::parse("bytes32").unwrap(), ParamType::FixedBytes(32));
        assert_eq!(ParamType::parse("bytes").unwrap(), ParamType::Bytes);
    }

    #[test]
    fn parse_rejects_bad_widths() {
        assert!(ParamType::parse("uint7").is_err());
        assert!(ParamType::parse("uint512").is_err());
        assert!(ParamType::parse("bytes33").is_err());
        assert!(ParamType::parse("bytes0").is_err());
    }

    #[test]
    fn parse_arrays_outermost_first() {
        let ty = ParamType::parse("uint256[2][]").unwrap();
        match ty {
            ParamType::Array { elem, len: Some(2) } => match *elem {
                ParamType::Array { elem: inner, len: None } => {
                    assert_eq!(*inner, ParamType::Uint(256));
                }
                other => panic!("unexpected inner: {other:?}"),
            },
            other => panic!("unexpected outer: {other:?}"),
        }
    }

    #[test]
    fn parse_tuple_with_components() {
        let ty = ParamType::parse("tuple(uint256,address)").unwrap();
        match &ty {
            ParamType::Tuple(components) => {
                assert_eq!(components.len(), 2);
                assert_eq!(components[0].1, ParamType::Uint(256));
                assert_eq!(components[1].1, ParamType::Address);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!ty.is_dynamic());
        assert_eq!(ty.static_size().unwrap(), 64);
    }

    #[test]
    fn dynamic_classification() {
        assert!(ParamType::parse("bytes").unwrap().is_dynamic());
        assert!(ParamType::parse("string").unwrap().is_dynamic());
        assert!(ParamType::parse("uint256[]").unwrap().is_dynamic());
        assert!(ParamType::parse("string[3]").unwrap().is_dynamic());
        assert!(ParamType::parse("tuple()").unwrap().is_dynamic());
        assert!(ParamType::parse("tuple(string,uint8)").unwrap().is_dynamic());
        assert!(!ParamType::parse("uint256[3]").unwrap().is_dynamic());
        assert!(!ParamType::parse("bytes32").unwrap().is_dynamic());
    }

    #[test]
    fn static_sizes() {
        assert_eq!(ParamType::parse("uint256").unwrap().static_size().unwrap(), 32);
        assert_eq!(ParamType::parse("uint256[3]").unwrap().static_size().unwrap(), 96);
        assert_eq!(
            ParamType::parse("tuple(uint256,address)[2]").unwrap().static_size().unwrap(),
            128
        );
        assert!(ParamType::parse("uint256[]").unwrap().static_size().is_err());
    }

    #[test]
    fn split_top_level_preserves_tuples() {
        let parts = split_top_level("uint256,tuple(address,uint256[]),bool");
        assert_eq!(parts, vec!["uint256", "tuple(address,uint256[])", "bool"]);
    }

    #[test]
    fn value_serialization() {
        let small = serde_json::to_value(AbiValue::Uint(U256::from(42u64))).unwrap();
        assert_eq!(small, serde_json::json!(42));

        let big = AbiValue::Uint(U256::from_str_radix("10000000000000000000000", 10).unwrap());
        let json = serde_json::to_value(big).unwrap();
        assert_eq!(json, serde_json::json!("10000000000000000000000"));

        let bytes = serde_json::to_value(AbiValue::Bytes(vec![0xde, 0xad])).unwrap();
        assert_eq!(bytes, serde_json::json!("0xdead"));
    }
}
