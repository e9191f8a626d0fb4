//! 0x-hex normalization helpers.
//!
//! Everything user-facing is lowercased and 0x-prefixed after normalization;
//! fixed-width inputs (addresses, tx hashes, storage slots) are validated to
//! their exact width.

use crate::error::InputError;

/// Normalize an address to `0x` + 40 lowercase hex characters.
///
/// Accepts input with or without the `0x` prefix. Idempotent.
pub fn normalize_address(address: &str) -> Result<String, InputError> {
    let trimmed = address.trim();
    let body = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
    if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(InputError::Address);
    }
    Ok(format!("0x{}", body.to_ascii_lowercase()))
}

/// Like [`normalize_address`] but maps any failure (or absent input) to `None`.
pub fn normalize_address_opt(address: Option<&str>) -> Option<String> {
    address.and_then(|a| normalize_address(a).ok())
}

/// Normalize a transaction hash to `0x` + 64 lowercase hex characters.
pub fn normalize_tx_hash(tx_hash: &str) -> Result<String, InputError> {
    let trimmed = tx_hash.trim().to_ascii_lowercase();
    let body = trimmed.strip_prefix("0x").unwrap_or(&trimmed);
    if body.len() != 64 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(InputError::TxHash);
    }
    Ok(format!("0x{body}"))
}

/// Normalize an arbitrary-length hex string: trim, lowercase, 0x-prefix,
/// validate the body. An empty body (`"0x"`) is accepted.
pub fn normalize_hex(value: &str, field: &str) -> Result<String, InputError> {
    let trimmed = value.trim().to_ascii_lowercase();
    let body = trimmed.strip_prefix("0x").unwrap_or(&trimmed);
    if !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(InputError::hex(field));
    }
    Ok(format!("0x{body}"))
}

/// Normalize a hex string and left-pad the body with zeroes to `pad_to`
/// characters. Used for storage slots (64 hex chars = one EVM word).
pub fn normalize_hex_padded(value: &str, field: &str, pad_to: usize) -> Result<String, InputError> {
    let normalized = normalize_hex(value, field)?;
    let body = &normalized[2..];
    if body.len() >= pad_to {
        return Ok(normalized);
    }
    let mut padded = String::with_capacity(2 + pad_to);
    padded.push_str("0x");
    for _ in 0..pad_to - body.len() {
        padded.push('0');
    }
    padded.push_str(body);
    Ok(padded)
}

/// Normalize a storage slot to a full 32-byte word (`0x` + 64 hex chars).
pub fn normalize_slot(slot: &str) -> Result<String, InputError> {
    normalize_hex_padded(slot, "slot", 64)
}

/// Decode a hex string (with or without `0x`) into bytes.
///
/// An odd-length body is left-padded with a single `0` first.
pub fn hex_to_bytes(value: &str, field: &str) -> Result<Vec<u8>, InputError> {
    let trimmed = value.trim();
    let body = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
    let owned;
    let body = if body.len() % 2 != 0 {
        owned = format!("0{body}");
        &owned
    } else {
        body
    };
    hex::decode(body).map_err(|_| InputError::hex(field))
}

/// Parse a hex-encoded quantity (with or without `0x`) into a `u64`.
pub fn parse_hex_u64(value: &str) -> Option<u64> {
    let body = value.trim().strip_prefix("0x").unwrap_or_else(|| value.trim());
    u64::from_str_radix(body, 16).ok()
}

/// Map a 32-byte storage word to the address held in its low 20 bytes.
///
/// Returns `None` for the all-zero word.
pub fn storage_word_to_address(word: &str) -> Result<Option<String>, InputError> {
    let normalized = normalize_hex_padded(word, "storage_word", 64)?;
    let body = &normalized[2..];
    if body.bytes().all(|b| b == b'0') {
        return Ok(None);
    }
    Ok(Some(format!("0x{}", &body[body.len() - 40..])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_normalization_idempotent() {
        let once = normalize_address("0xD8DA6BF26964AF9D7EED9E03E53415D37AA96045").unwrap();
        let twice = normalize_address(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, "0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
    }

    #[test]
    fn address_accepts_bare_hex() {
        let addr = normalize_address("d8da6bf26964af9d7eed9e03e53415d37aa96045").unwrap();
        assert!(addr.starts_with("0x"));
    }

    #[test]
    fn address_rejects_bad_length() {
        assert!(normalize_address("0x1234").is_err());
        assert!(normalize_address("0xzz").is_err());
    }

    #[test]
    fn tx_hash_width_enforced() {
        let h = "0x".to_string() + &"ab".repeat(32);
        assert!(normalize_tx_hash(&h).is_ok());
        assert!(normalize_tx_hash("0xabcd").is_err());
    }

    #[test]
    fn slot_left_padded_to_word() {
        let slot = normalize_slot("0x1").unwrap();
        assert_eq!(slot.len(), 66);
        assert!(slot.ends_with('1'));
        assert!(slot[2..65].bytes().all(|b| b == b'0'));
    }

    #[test]
    fn odd_hex_left_padded() {
        assert_eq!(hex_to_bytes("0xf", "value").unwrap(), vec![0x0f]);
    }

    #[test]
    fn storage_word_low_20_bytes() {
        let word = "0x000000000000000000000000deadbeefdeadbeefdeadbeefdeadbeefdeadbeef";
        let addr = storage_word_to_address(word).unwrap().unwrap();
        assert_eq!(addr, "0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef");
    }

    #[test]
    fn zero_storage_word_is_none() {
        let word = "0x".to_string() + &"0".repeat(64);
        assert!(storage_word_to_address(&word).unwrap().is_none());
    }

    #[test]
    fn short_storage_word_padded_first() {
        let addr = storage_word_to_address("0xdeadbeef").unwrap().unwrap();
        assert_eq!(addr, "0x00000000000000000000000000000000deadbeef");
    }
}
