// Chain adapter framework
//
// This crate defines the uniform interface over chain-specific RPC:
// address prediction, deployment, confirmation, and cost estimation.
// Family-specific implementations live in the `domains/` crates and are
// selected from configuration through the factory and registry here.

pub mod adapter;
pub mod config;
pub mod registry;
pub mod retry;

pub use adapter::{ChainAdapter, ChainAdapterFactory, GasPolicy, TxOutcome};
pub use config::ChainConfig;
pub use registry::ChainAdapterRegistry;
pub use retry::{retry_with_backoff, BackoffPolicy};
