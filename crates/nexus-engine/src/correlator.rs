// Cross-chain correlator
//
// Tracks a logical cross-chain action under one operation id from source
// broadcast to destination confirmation. Operations that miss the linking
// SLA are parked as stalled for reconciliation, never dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use nexus_error::CorrelatorError;
use nexus_store::{OperationStore, OperationUpdate};
use nexus_types::{ChainId, CorrelatedOperation, OperationId, OperationStatus, TxRef};

use crate::error::EngineResult;

pub struct CrossChainCorrelator {
    store: Arc<dyn OperationStore>,
    /// Operations without destination progress for this long are stalled
    stall_after: Duration,
}

impl CrossChainCorrelator {
    pub fn new(store: Arc<dyn OperationStore>, stall_after: Duration) -> Self {
        Self { store, stall_after }
    }

    /// Open an operation for a broadcast source transaction
    pub async fn begin_operation(
        &self,
        source_chain: ChainId,
        source_tx: TxRef,
    ) -> EngineResult<OperationId> {
        let op = CorrelatedOperation::new(source_chain.clone(), source_tx.clone());
        let id = op.operation_id;
        self.store.insert_operation(op).await?;
        info!(operation = %id, chain = %source_chain, tx = %source_tx, "operation initiated");
        Ok(id)
    }

    /// Record that the source transaction confirmed on its chain
    pub async fn record_source_confirmed(&self, id: &OperationId) -> EngineResult<()> {
        self.store
            .transition_operation(id, OperationStatus::SourceConfirmed, OperationUpdate::default())
            .await?;
        Ok(())
    }

    /// Attach the destination transaction.
    ///
    /// Legal only after the source confirmed; linking an initiated
    /// operation fails with `SourceNotConfirmed`.
    pub async fn link_destination(
        &self,
        id: &OperationId,
        dest_chain: ChainId,
        dest_tx: TxRef,
    ) -> EngineResult<()> {
        let op = self
            .store
            .get_operation(id)
            .await?
            .ok_or_else(|| CorrelatorError::not_found(id.to_string()))?;
        if op.status == OperationStatus::Initiated {
            return Err(CorrelatorError::SourceNotConfirmed(id.to_string()).into());
        }
        self.store
            .transition_operation(
                id,
                OperationStatus::DestinationLinked,
                OperationUpdate {
                    dest_chain: Some(dest_chain),
                    dest_tx: Some(dest_tx),
                },
            )
            .await?;
        Ok(())
    }

    pub async fn complete(&self, id: &OperationId) -> EngineResult<CorrelatedOperation> {
        let op = self
            .store
            .transition_operation(id, OperationStatus::Completed, OperationUpdate::default())
            .await?;
        info!(operation = %id, "operation completed");
        Ok(op)
    }

    pub async fn fail(&self, id: &OperationId) -> EngineResult<CorrelatedOperation> {
        let op = self
            .store
            .transition_operation(id, OperationStatus::Failed, OperationUpdate::default())
            .await?;
        warn!(operation = %id, "operation failed");
        Ok(op)
    }

    pub async fn get(&self, id: &OperationId) -> EngineResult<CorrelatedOperation> {
        self.store
            .get_operation(id)
            .await?
            .ok_or_else(|| CorrelatorError::not_found(id.to_string()).into())
    }

    /// Park every operation that has been quiet past the SLA as stalled.
    /// Returns the ids that were stalled by this sweep.
    pub async fn sweep_stalled(&self) -> EngineResult<Vec<OperationId>> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.stall_after)
                .unwrap_or_else(|_| chrono::Duration::hours(1));
        let stale = self.store.stale_operations(cutoff).await?;
        let mut stalled = Vec::with_capacity(stale.len());
        for op in stale {
            self.store
                .transition_operation(
                    &op.operation_id,
                    OperationStatus::Stalled,
                    OperationUpdate::default(),
                )
                .await?;
            warn!(operation = %op.operation_id, status = %op.status, "operation stalled");
            stalled.push(op.operation_id);
        }
        Ok(stalled)
    }
}
