//! Solidity ABI codec.
//!
//! Parses signature strings and JSON-ABI descriptors into [`ParamType`]
//! trees, computes 4-byte selectors via Keccak-256, encodes call data in
//! head/tail layout, and decodes return data: value types, fixed and
//! dynamic arrays, and nested tuples.
//!
//! Layout rules:
//! - The head of an aggregate holds inlined static encodings or 32-byte
//!   offsets to dynamic tails; tails concatenate in argument order.
//! - Offsets are relative to the start of the enclosing aggregate's data
//!   area. A dynamic tuple's offset points at its own data start, which
//!   becomes the base for its components; a dynamic array's element offsets
//!   are relative to the first element head (just past the length word).

pub mod decode;
pub mod encode;
pub mod error;
pub mod json;
pub mod signature;
pub mod types;

pub use decode::decode_params;
pub use encode::{encode_call, encode_function_data, encode_value};
pub use error::AbiError;
pub use json::{functions_by_selector, function_signature, selector_for, AbiFunction, AbiParam};
pub use signature::{parse_signature, selector_hex, ParsedSignature};
pub use types::{AbiValue, ParamType};
