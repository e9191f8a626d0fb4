//! Shared primitives for the Chainscope workspace.
//!
//! This crate carries everything the other layers have in common:
//! - [`hex`]: 0x-hex normalization for addresses, hashes, slots and words
//! - [`keccak`]: the pre-standard Keccak-256 used throughout the EVM
//! - [`types`]: the stable record shapes (contract, creation, proxy)
//! - [`cache`]: the (chain-id, address)-keyed in-memory record cache
//! - [`config`]: service configuration and the static chain fallback map

pub mod cache;
pub mod config;
pub mod error;
pub mod hex;
pub mod keccak;
pub mod types;

pub use cache::RecordCache;
pub use config::Config;
pub use error::InputError;
