// SVM family adapter
//
// Implements the chain adapter interface against SVM JSON-RPC endpoints.
// Address prediction is program-derived-address search under the configured
// wallet program; deployment submits an initialize-wallet instruction
// signed by the configured fee payer.

pub mod adapter;
pub mod factory;
pub mod pda;
mod rpc;
mod tx;

pub use adapter::SvmAdapter;
pub use factory::SvmAdapterFactory;
pub use pda::Pubkey;
