// SVM adapter factory

use std::sync::Arc;

use async_trait::async_trait;

use nexus_chain::{ChainAdapter, ChainAdapterFactory, ChainConfig};
use nexus_error::ChainResult;
use nexus_types::ChainFamily;

use crate::adapter::SvmAdapter;

/// Factory for SVM family adapters
#[derive(Debug, Clone, Default)]
pub struct SvmAdapterFactory;

impl SvmAdapterFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChainAdapterFactory for SvmAdapterFactory {
    async fn create_adapter(&self, config: ChainConfig) -> ChainResult<Arc<dyn ChainAdapter>> {
        Ok(Arc::new(SvmAdapter::new(config)?))
    }

    fn supported_families(&self) -> Vec<ChainFamily> {
        vec![ChainFamily::Svm]
    }
}
