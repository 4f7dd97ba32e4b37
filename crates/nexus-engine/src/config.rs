// Engine configuration

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use nexus_chain::ChainConfig;
use nexus_types::ChainFamily;

use crate::error::{EngineError, EngineResult};

fn default_max_deploy_attempts() -> u32 {
    3
}

fn default_lease_ttl_secs() -> u64 {
    60
}

fn default_confirmation_timeout_secs() -> u64 {
    120
}

fn default_stall_after_secs() -> u64 {
    3_600
}

/// Top-level engine configuration, loaded from TOML.
///
/// The master secret is referenced by version so it can be rotated:
/// records carry the `hmac:v{n}` key ref they were derived under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Version of the master derivation secret
    pub master_key_version: u32,
    /// Hex-encoded master derivation secret, at least 32 bytes
    pub master_key_hex: String,
    /// Deployment attempts per chain before `DeploymentExhausted`
    #[serde(default = "default_max_deploy_attempts")]
    pub max_deploy_attempts: u32,
    /// TTL of the per-identity, per-chain deployment lease
    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: u64,
    /// How long to wait for one deployment confirmation
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    /// Operations without destination progress for this long are stalled
    #[serde(default = "default_stall_after_secs")]
    pub stall_after_secs: u64,
    /// One entry per supported chain
    pub chains: Vec<ChainConfig>,
}

impl EngineConfig {
    pub fn from_toml(raw: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            toml::from_str(raw).map_err(|e| EngineError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::config(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml(&raw)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn stall_after(&self) -> Duration {
        Duration::from_secs(self.stall_after_secs)
    }

    /// Reject configurations the engine cannot run correctly on
    pub fn validate(&self) -> EngineResult<()> {
        if self.chains.is_empty() {
            return Err(EngineError::config("no chains configured"));
        }
        if self.max_deploy_attempts == 0 {
            return Err(EngineError::config("max_deploy_attempts must be positive"));
        }
        let mut seen = HashMap::new();
        for chain in &self.chains {
            if seen.insert(chain.chain_id.clone(), ()).is_some() {
                return Err(EngineError::config(format!(
                    "duplicate chain entry: {}",
                    chain.chain_id
                )));
            }
        }
        validate_family_alignment(&self.chains)
    }
}

/// Every chain of one family must share the parameters that feed address
/// prediction, otherwise the family-shared-address invariant silently
/// breaks for some chains.
pub fn validate_family_alignment(chains: &[ChainConfig]) -> EngineResult<()> {
    let mut evm_params: Option<(&str, Option<&str>)> = None;
    let mut svm_program: Option<&str> = None;

    for chain in chains {
        match chain.family {
            ChainFamily::Evm => {
                let params = (chain.factory_address.as_str(), chain.init_code_hash.as_deref());
                match evm_params {
                    None => evm_params = Some(params),
                    Some(expected) if expected == params => {}
                    Some(_) => {
                        return Err(EngineError::config(format!(
                            "EVM chain {} diverges from the family factory parameters",
                            chain.chain_id
                        )));
                    }
                }
            }
            ChainFamily::Svm => match svm_program {
                None => svm_program = Some(&chain.factory_address),
                Some(expected) if expected == chain.factory_address => {}
                Some(_) => {
                    return Err(EngineError::config(format!(
                        "SVM chain {} diverges from the family wallet program",
                        chain.chain_id
                    )));
                }
            },
        }
    }
    Ok(())
}
