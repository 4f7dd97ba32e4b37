// Correlated cross-chain operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{ChainId, TxRef};

/// Identifier of a correlated cross-chain operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub Uuid);

impl OperationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a correlated operation.
///
/// `Initiated -> SourceConfirmed -> DestinationLinked -> Completed | Failed`;
/// operations that miss the linking SLA move to `Stalled` for reconciliation
/// instead of being dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Initiated,
    SourceConfirmed,
    DestinationLinked,
    Completed,
    Failed,
    Stalled,
}

impl OperationStatus {
    /// Whether moving to `next` is a legal transition
    pub fn can_transition_to(self, next: OperationStatus) -> bool {
        use OperationStatus::*;
        match (self, next) {
            (Initiated, SourceConfirmed) => true,
            (SourceConfirmed, DestinationLinked) => true,
            (DestinationLinked, Completed) | (DestinationLinked, Failed) => true,
            // any non-terminal state may stall or fail
            (Initiated | SourceConfirmed | DestinationLinked, Stalled) => true,
            (Initiated | SourceConfirmed, Failed) => true,
            // a stalled operation can be reconciled back into the flow
            (Stalled, SourceConfirmed | DestinationLinked | Completed | Failed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OperationStatus::Completed | OperationStatus::Failed)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationStatus::Initiated => "initiated",
            OperationStatus::SourceConfirmed => "source_confirmed",
            OperationStatus::DestinationLinked => "destination_linked",
            OperationStatus::Completed => "completed",
            OperationStatus::Failed => "failed",
            OperationStatus::Stalled => "stalled",
        };
        write!(f, "{}", s)
    }
}

/// A logical cross-chain action tracked under one id spanning a source and
/// destination transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelatedOperation {
    pub operation_id: OperationId,
    pub source_chain: ChainId,
    pub source_tx: TxRef,
    pub dest_chain: Option<ChainId>,
    /// Set only after the source transaction is confirmed
    pub dest_tx: Option<TxRef>,
    pub status: OperationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CorrelatedOperation {
    pub fn new(source_chain: ChainId, source_tx: TxRef) -> Self {
        let now = Utc::now();
        Self {
            operation_id: OperationId::generate(),
            source_chain,
            source_tx,
            dest_chain: None,
            dest_tx: None,
            status: OperationStatus::Initiated,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        use OperationStatus::*;
        assert!(Initiated.can_transition_to(SourceConfirmed));
        assert!(SourceConfirmed.can_transition_to(DestinationLinked));
        assert!(DestinationLinked.can_transition_to(Completed));
    }

    #[test]
    fn linking_before_confirmation_is_illegal() {
        use OperationStatus::*;
        assert!(!Initiated.can_transition_to(DestinationLinked));
        assert!(!Initiated.can_transition_to(Completed));
    }

    #[test]
    fn terminal_states_stay_terminal() {
        use OperationStatus::*;
        for next in [
            Initiated,
            SourceConfirmed,
            DestinationLinked,
            Completed,
            Failed,
            Stalled,
        ] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
    }
}
