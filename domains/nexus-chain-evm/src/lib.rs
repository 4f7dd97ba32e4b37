// EVM family adapter
//
// Implements the chain adapter interface against EVM JSON-RPC endpoints.
// Address prediction is pure CREATE2 against the configured wallet factory;
// deployment goes through the factory's `deployWallet(address,bytes32)`
// entry point.

pub mod adapter;
pub mod address;
pub mod factory;
mod rpc;

pub use adapter::EvmAdapter;
pub use factory::EvmAdapterFactory;
