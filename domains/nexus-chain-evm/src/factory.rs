// EVM adapter factory

use std::sync::Arc;

use async_trait::async_trait;

use nexus_chain::{ChainAdapter, ChainAdapterFactory, ChainConfig};
use nexus_error::ChainResult;
use nexus_types::ChainFamily;

use crate::adapter::EvmAdapter;

/// Factory for EVM family adapters
#[derive(Debug, Clone, Default)]
pub struct EvmAdapterFactory;

impl EvmAdapterFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChainAdapterFactory for EvmAdapterFactory {
    async fn create_adapter(&self, config: ChainConfig) -> ChainResult<Arc<dyn ChainAdapter>> {
        Ok(Arc::new(EvmAdapter::new(config)?))
    }

    fn supported_families(&self) -> Vec<ChainFamily> {
        vec![ChainFamily::Evm]
    }
}
