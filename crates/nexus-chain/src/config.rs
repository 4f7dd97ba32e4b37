// Declarative chain configuration

use serde::{Deserialize, Serialize};

use nexus_types::{ChainFamily, ChainId};

fn default_deploy_gas_limit() -> u64 {
    400_000
}

fn default_confirmation_poll_ms() -> u64 {
    2_000
}

/// Configuration for one chain endpoint.
///
/// Adapters are built from these entries by the family factories; chains
/// never get ad hoc singletons. The `dry_run` flag is the only way to get
/// simulated behavior: a dry-run adapter fabricates deterministic tx refs
/// and instant confirmations without network calls, and is never mixed
/// implicitly into live paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub family: ChainFamily,
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Wallet factory contract (EVM, 0x-hex) or wallet program id (SVM,
    /// base58). Must be identical across every chain of one EVM family so
    /// the family shares one predicted address.
    pub factory_address: String,
    /// Keccak-256 of the wallet init code (EVM families only, 0x-hex)
    #[serde(default)]
    pub init_code_hash: Option<String>,
    /// Deployer account: unlocked from-address for EVM endpoints (0x-hex),
    /// hex-encoded 32-byte fee-payer seed for SVM
    pub deployer: String,
    /// Native currency symbol, for logs and cost reporting
    #[serde(default = "default_native_currency")]
    pub native_currency: String,
    /// Gas limit used for deployment transactions (EVM)
    #[serde(default = "default_deploy_gas_limit")]
    pub deploy_gas_limit: u64,
    /// Interval between confirmation polls, in milliseconds
    #[serde(default = "default_confirmation_poll_ms")]
    pub confirmation_poll_ms: u64,
    /// Build a simulated adapter that never touches the network
    #[serde(default)]
    pub dry_run: bool,
}

fn default_native_currency() -> String {
    "ETH".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml() {
        let config: ChainConfig = toml::from_str(
            r#"
            chain_id = "ethereum"
            family = "evm"
            rpc_url = "http://localhost:8545"
            factory_address = "0x00000000000000000000000000000000000000f1"
            init_code_hash = "0x0101010101010101010101010101010101010101010101010101010101010101"
            deployer = "0x00000000000000000000000000000000000000d0"
            "#,
        )
        .unwrap();
        assert_eq!(config.chain_id.as_str(), "ethereum");
        assert_eq!(config.family, ChainFamily::Evm);
        assert_eq!(config.deploy_gas_limit, 400_000);
        assert!(!config.dry_run);
    }

    #[test]
    fn parses_svm_entry() {
        let config: ChainConfig = toml::from_str(
            r#"
            chain_id = "solana"
            family = "svm"
            rpc_url = "http://localhost:8899"
            factory_address = "G4vCcRCeB3rWpaTkkpsPWTf9Ar2a7qoWTJsWboztF6wS"
            deployer = "0101010101010101010101010101010101010101010101010101010101010101"
            dry_run = true
            "#,
        )
        .unwrap();
        assert_eq!(config.family, ChainFamily::Svm);
        assert!(config.init_code_hash.is_none());
        assert!(config.dry_run);
    }
}
