// Keyed identity derivation
//
// Owner keys and deployment salts are derived with HMAC-SHA256 under a
// service-held master secret, domain-separated per chain family and per
// purpose. Nothing spendable is derivable from public identity strings
// alone; the only secretless derivation is the public identity commitment.

mod deriver;
mod master;
mod owner;

pub use deriver::KeyDeriver;
pub use master::MasterKey;
pub use owner::OwnerKey;

pub use nexus_error::{CryptoError, CryptoResult};
