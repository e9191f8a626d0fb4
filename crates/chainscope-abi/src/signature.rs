//! Function signature parsing and selector computation.

use chainscope_core::keccak::keccak256;

use crate::error::AbiError;

/// A parsed `name(type1,type2,...)` signature.
///
/// `inputs` holds the raw type strings; resolve them with
/// [`crate::ParamType::parse`] when encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSignature {
    pub name: String,
    pub inputs: Vec<String>,
}

impl ParsedSignature {
    /// The canonical form used for selector computation.
    pub fn canonical(&self) -> String {
        format!("{}({})", self.name, self.inputs.join(","))
    }

    /// The 4-byte selector as 8 lowercase hex characters (no prefix).
    pub fn selector(&self) -> String {
        selector_hex(&self.canonical())
    }
}

/// Parse a function signature string.
///
/// The parameter list splits on top-level commas only, so `tuple(...)`
/// arguments survive intact. A bare `name` with no parentheses denotes an
/// empty parameter list.
pub fn parse_signature(signature: &str) -> Result<ParsedSignature, AbiError> {
    let text = signature.trim();

    let (name, params) = match text.find('(') {
        None => (text, None),
        Some(open) => {
            if !text.ends_with(')') {
                return Err(AbiError::signature("expected name(type1,type2,...)"));
            }
            (&text[..open], Some(&text[open + 1..text.len() - 1]))
        }
    };

    let name = name.trim();
    if !is_valid_identifier(name) {
        return Err(AbiError::signature(format!("invalid function name '{name}'")));
    }

    let inputs = match params {
        None => Vec::new(),
        Some(params) if params.trim().is_empty() => Vec::new(),
        Some(params) => {
            let parts = crate::types::split_top_level(params);
            for part in &parts {
                if part.is_empty() {
                    return Err(AbiError::signature("empty type in parameter list"));
                }
            }
            parts
        }
    };

    Ok(ParsedSignature { name: name.to_string(), inputs })
}

/// First 4 bytes of `keccak256(signature)` as lowercase hex, no prefix.
pub fn selector_hex(signature: &str) -> String {
    let digest = keccak256(signature.as_bytes());
    hex::encode(&digest[..4])
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_selector() {
        assert_eq!(selector_hex("transfer(address,uint256)"), "a9059cbb");
    }

    #[test]
    fn balance_of_selector() {
        assert_eq!(selector_hex("balanceOf(address)"), "70a08231");
    }

    #[test]
    fn parse_basic() {
        let sig = parse_signature("transfer(address, uint256)").unwrap();
        assert_eq!(sig.name, "transfer");
        assert_eq!(sig.inputs, vec!["address", "uint256"]);
        assert_eq!(sig.canonical(), "transfer(address,uint256)");
        assert_eq!(sig.selector(), "a9059cbb");
    }

    #[test]
    fn parse_bare_name() {
        let sig = parse_signature("totalSupply").unwrap();
        assert_eq!(sig.name, "totalSupply");
        assert!(sig.inputs.is_empty());
        assert_eq!(sig.canonical(), "totalSupply()");
    }

    #[test]
    fn parse_tuple_argument_intact() {
        let sig = parse_signature("submit(tuple(address,uint256),bool)").unwrap();
        assert_eq!(sig.inputs, vec!["tuple(address,uint256)", "bool"]);
    }

    #[test]
    fn parse_rejects_bad_names() {
        assert!(parse_signature("9lives(uint256)").is_err());
        assert!(parse_signature("(uint256)").is_err());
        assert!(parse_signature("foo(uint256").is_err());
    }

    #[test]
    fn parse_rejects_empty_type() {
        assert!(parse_signature("foo(uint256,,bool)").is_err());
    }
}
