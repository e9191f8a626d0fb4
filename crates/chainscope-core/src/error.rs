//! Validation errors for user-supplied values.
//!
//! These never touch the network: every variant is raised before the first
//! request is sent and is never retried.

use thiserror::Error;

/// A user-supplied value failed validation.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Invalid address format. Expected 0x-prefixed 40 hex characters.")]
    Address,

    #[error("tx_hash must be 0x-prefixed 64 hex characters.")]
    TxHash,

    #[error("{field} must be a hex string.")]
    Hex { field: String },

    #[error("{field} length must be even (two hex characters per byte).")]
    OddHexLength { field: String },

    #[error("{field} must be a non-negative integer.")]
    NonNegativeInt { field: String },

    #[error("{field} must be a non-negative block number in decimal or 0x-prefixed hexadecimal.")]
    BlockNumber { field: String },

    #[error("block_tag must be latest|pending|earliest|block number.")]
    BlockTag,

    #[error("sort must be 'asc' or 'desc'.")]
    Sort,

    #[error("start_block cannot be greater than end_block.")]
    BlockRange,

    #[error("At most 4 topics are supported.")]
    TooManyTopics,

    #[error("Unsupported token_type '{got}'. Expected erc20|erc721|erc1155.")]
    TokenType { got: String },

    #[error("{0}")]
    Other(String),
}

impl InputError {
    pub fn hex(field: impl Into<String>) -> Self {
        Self::Hex { field: field.into() }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
