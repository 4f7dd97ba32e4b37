// Chain adapter registry

use std::collections::HashMap;
use std::sync::Arc;

use nexus_error::{ChainError, ChainResult};
use nexus_types::{ChainFamily, ChainId};

use crate::adapter::{factory_for, ChainAdapter, ChainAdapterFactory};
use crate::config::ChainConfig;

/// Registry of chain adapters, keyed by chain id.
///
/// All adapters are built up front from configuration: one factory per
/// family, one adapter per configured chain.
#[derive(Debug, Default)]
pub struct ChainAdapterRegistry {
    adapters: HashMap<ChainId, Arc<dyn ChainAdapter>>,
}

impl ChainAdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Build a registry from chain configs, selecting the factory for each
    /// entry by family.
    pub async fn from_configs(
        configs: Vec<ChainConfig>,
        factories: &[Arc<dyn ChainAdapterFactory>],
    ) -> ChainResult<Self> {
        let mut registry = Self::new();
        for config in configs {
            let factory = factory_for(factories, config.family)?;
            let adapter = factory.create_adapter(config).await?;
            registry.register_adapter(adapter);
        }
        Ok(registry)
    }

    /// Register an adapter, replacing any previous one for the same chain
    pub fn register_adapter(&mut self, adapter: Arc<dyn ChainAdapter>) {
        self.adapters.insert(adapter.chain_id().clone(), adapter);
    }

    /// Get the adapter for a chain
    pub fn adapter(&self, chain_id: &ChainId) -> ChainResult<Arc<dyn ChainAdapter>> {
        self.adapters
            .get(chain_id)
            .cloned()
            .ok_or_else(|| ChainError::UnsupportedChain(chain_id.to_string()))
    }

    /// All adapters belonging to one family
    pub fn adapters_in_family(&self, family: ChainFamily) -> Vec<Arc<dyn ChainAdapter>> {
        let mut adapters: Vec<_> = self
            .adapters
            .values()
            .filter(|a| a.family() == family)
            .cloned()
            .collect();
        adapters.sort_by(|a, b| a.chain_id().as_str().cmp(b.chain_id().as_str()));
        adapters
    }

    /// Any one adapter of a family; used where the result is
    /// family-invariant (address prediction)
    pub fn family_adapter(&self, family: ChainFamily) -> ChainResult<Arc<dyn ChainAdapter>> {
        self.adapters_in_family(family)
            .into_iter()
            .next()
            .ok_or_else(|| {
                ChainError::UnsupportedChain(format!("no chains configured for family {family}"))
            })
    }

    /// The family a configured chain belongs to
    pub fn family_of(&self, chain_id: &ChainId) -> ChainResult<ChainFamily> {
        Ok(self.adapter(chain_id)?.family())
    }

    pub fn chain_ids(&self) -> Vec<ChainId> {
        self.adapters.keys().cloned().collect()
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    pub fn remove_adapter(&mut self, chain_id: &ChainId) -> Option<Arc<dyn ChainAdapter>> {
        self.adapters.remove(chain_id)
    }
}
