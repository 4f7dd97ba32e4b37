// Wallet records and per-chain deployment state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::{ChainFamily, ChainId, IdentityKey, TxRef};

/// Deterministic deployment salt (CREATE2 salt for EVM, PDA seed for SVM)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Salt(pub [u8; 32]);

impl Salt {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Owner public key bytes in the family's native encoding
/// (33-byte compressed secp256k1 for EVM, 32-byte ed25519 for SVM)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerPublicKey(pub Vec<u8>);

impl OwnerPublicKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for OwnerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

/// Smart-wallet address in the chain family's display form
/// (EIP-55 hex for EVM, base58 for SVM)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(addr: &str) -> Self {
        Self(addr.to_string())
    }
}

/// Deployment status of a wallet on one specific chain.
///
/// Legal transitions: `NotDeployed -> Pending`, `Pending -> Deployed`,
/// `Pending -> Failed`, `Failed -> Pending` (retry). `Deployed` is terminal
/// and never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// No deployment transaction has ever been accepted for this chain
    NotDeployed,
    /// A deployment transaction is in flight
    Pending,
    /// The wallet contract is live on-chain
    Deployed,
    /// The last deployment attempt failed; retryable up to the attempt cap
    Failed,
}

impl DeploymentStatus {
    /// Whether moving to `next` is a legal state transition
    pub fn can_transition_to(self, next: DeploymentStatus) -> bool {
        use DeploymentStatus::*;
        matches!(
            (self, next),
            (NotDeployed, Pending) | (Pending, Deployed) | (Pending, Failed) | (Failed, Pending)
        )
    }

    pub fn is_terminal_success(self) -> bool {
        self == DeploymentStatus::Deployed
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentStatus::NotDeployed => write!(f, "not_deployed"),
            DeploymentStatus::Pending => write!(f, "pending"),
            DeploymentStatus::Deployed => write!(f, "deployed"),
            DeploymentStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Per-chain deployment state inside a wallet record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDeployment {
    pub status: DeploymentStatus,
    /// Reference of the in-flight or last deployment transaction
    pub tx_ref: Option<TxRef>,
    /// Number of deployment attempts made so far
    pub attempts: u32,
    pub updated_at: DateTime<Utc>,
}

impl ChainDeployment {
    pub fn not_deployed() -> Self {
        Self {
            status: DeploymentStatus::NotDeployed,
            tx_ref: None,
            attempts: 0,
            updated_at: Utc::now(),
        }
    }
}

impl Default for ChainDeployment {
    fn default() -> Self {
        Self::not_deployed()
    }
}

/// Authoritative wallet record for one identity on one chain family.
///
/// The predicted address is shared by every chain in the family; deployment
/// is tracked per chain because going live is a separate on-chain action on
/// each chain even when the address is identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub identity_key: IdentityKey,
    pub chain_family: ChainFamily,
    pub owner_public_key: OwnerPublicKey,
    /// Reference to the signing material, e.g. `hmac:v1` (never the key itself)
    pub owner_key_ref: String,
    pub deployment_salt: Salt,
    pub predicted_address: Address,
    pub per_chain: HashMap<ChainId, ChainDeployment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletRecord {
    /// Deployment state for a chain, `NotDeployed` when never touched
    pub fn deployment(&self, chain: &ChainId) -> ChainDeployment {
        self.per_chain.get(chain).cloned().unwrap_or_default()
    }

    pub fn status(&self, chain: &ChainId) -> DeploymentStatus {
        self.per_chain
            .get(chain)
            .map(|d| d.status)
            .unwrap_or(DeploymentStatus::NotDeployed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployed_is_terminal() {
        use DeploymentStatus::*;
        assert!(!Deployed.can_transition_to(NotDeployed));
        assert!(!Deployed.can_transition_to(Pending));
        assert!(!Deployed.can_transition_to(Failed));
    }

    #[test]
    fn legal_transitions() {
        use DeploymentStatus::*;
        assert!(NotDeployed.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Deployed));
        assert!(Pending.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Pending));
        assert!(!NotDeployed.can_transition_to(Deployed));
        assert!(!Failed.can_transition_to(Deployed));
    }
}
