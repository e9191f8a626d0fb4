//! The service-level error type.
//!
//! Wraps the per-layer errors and adds the failures only the orchestrator
//! can detect. Input validation short-circuits before any network call;
//! upstream failures preserve the backend's own detail verbatim.

use thiserror::Error;

use chainscope_abi::AbiError;
use chainscope_client::ClientError;
use chainscope_core::config::ConfigError;
use chainscope_core::error::InputError;
use chainscope_registry::RegistryError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("File '{filename}' not found in contract sources. Available: {available}.")]
    SourceFileNotFound { filename: String, available: String },

    #[error("No contract code at {address} (not a contract).")]
    NoCode { address: String },

    #[error(
        "Creation lookup via RPC failed: {detail} (an archive node may be required for historical eth_getCode)."
    )]
    ArchiveRequired { detail: String },

    #[error("Provide either function+args or data, not both.")]
    ConflictingCallInput,

    #[error("Either data or function+args is required.")]
    MissingCallInput,

    #[error("data must include 4-byte function selector.")]
    ShortCallData,

    #[error(
        "data too short for function {name}: expected at least {expected} hex chars (selector + static portion of inputs)."
    )]
    CallDataTooShort { name: String, expected: usize },
}
