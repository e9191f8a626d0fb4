//! ABI codec error types.

use thiserror::Error;

/// Errors raised while parsing, encoding, or decoding ABI data.
#[derive(Debug, Error)]
pub enum AbiError {
    #[error("Invalid function signature: {reason}")]
    Signature { reason: String },

    #[error("Unsupported ABI type '{ty}'.")]
    UnsupportedType { ty: String },

    #[error("Invalid {ty} value: {reason}")]
    Value { ty: String, reason: String },

    #[error("Argument count mismatch: expected {expected}, got {got}.")]
    ArgumentCount { expected: usize, got: usize },

    #[error("Result shorter than expected for ABI decoding.")]
    ShortData,

    #[error("{what} out of range.")]
    OutOfRange { what: String },

    #[error("Type is dynamic; size unknown.")]
    DynamicSize,
}

impl AbiError {
    pub fn signature(reason: impl Into<String>) -> Self {
        Self::Signature { reason: reason.into() }
    }

    pub fn value(ty: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Value { ty: ty.into(), reason: reason.into() }
    }
}
