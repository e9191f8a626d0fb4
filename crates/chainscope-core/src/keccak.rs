//! Keccak-256, the pre-standard variant used by the EVM.
//!
//! Not FIPS-202 SHA3-256: the padding byte is `0x01`, not `0x06`. Selector
//! computation and the public hash tool both go through here.

use tiny_keccak::{Hasher, Keccak};

/// Compute the Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut out = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut out);
    out
}

/// Keccak-256 digest as a 0x-prefixed lowercase hex string.
pub fn keccak256_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(keccak256(data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_digest() {
        assert_eq!(
            keccak256_hex(b"hello"),
            "0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn empty_digest() {
        // keccak256("") differs between Keccak and SHA3-256
        assert_eq!(
            keccak256_hex(b""),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn transfer_signature_digest_prefix() {
        let digest = keccak256_hex(b"transfer(address,uint256)");
        assert!(digest.starts_with("0xa9059cbb"));
    }
}
