//! Backend clients for Chainscope.
//!
//! - [`http`]: the shared request engine: per-attempt timeout, linear
//!   backoff, retry on transport failures, 5xx/429, decode failures, and
//!   body-level rate-limit markers
//! - [`envelope`]: uniform result extraction from the three response
//!   shapes (Etherscan module, JSON-RPC-like proxy, raw chainlist)
//! - [`etherscan`]: thin typed wrappers over the module/action REST
//!   surface; chain id is passed per call, the client itself is immutable
//! - [`rpc`]: id-sequenced JSON-RPC 2.0 client and the lazy per-URL pool

pub mod envelope;
pub mod error;
pub mod etherscan;
pub mod http;
pub mod rpc;

pub use error::ClientError;
pub use etherscan::EtherscanClient;
pub use http::{HttpEngine, RetryConfig};
pub use rpc::{RpcClient, RpcPool};
