// Nexus Storage
//
// Storage traits for wallet records, the gas tank ledger, correlated
// operations, and deployment leases, plus the in-memory implementation
// the engine runs on.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{LeaseStore, LeaseToken, LedgerStore, OperationStore, OperationUpdate, WalletStore};
