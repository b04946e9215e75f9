use super::actions::ActionKind;
use super::resolver::DependentKey;
use crate::core::{ItemId, MutationFailure};
use std::collections::BTreeSet;

/// Which step of an item's bulk action failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The prerequisite mutation failed; the primary was never attempted.
    Dependent,
    Primary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub id: ItemId,
    /// Message from the failing endpoint, verbatim.
    pub reason: String,
    pub status: u16,
    pub stage: FailureStage,
}

impl BulkFailure {
    pub(crate) fn new(id: ItemId, stage: FailureStage, failure: MutationFailure) -> Self {
        Self {
            id,
            reason: failure.message,
            status: failure.status,
            stage,
        }
    }
}

/// Outcome of one bulk submission (or one retry of its failed subset).
///
/// Full success, full failure and anything in between share this shape;
/// none of them is an error. The result remembers the failed items and the
/// dependent targets already satisfied so a retry can pick up exactly where
/// this attempt left off.
#[derive(Debug, Clone)]
pub struct BulkOperationResult<I> {
    pub succeeded: Vec<ItemId>,
    pub failed: Vec<BulkFailure>,
    pub(crate) kind: ActionKind,
    pub(crate) failed_items: Vec<I>,
    pub(crate) satisfied_dependents: BTreeSet<DependentKey>,
}

impl<I> BulkOperationResult<I> {
    pub(crate) fn empty(kind: ActionKind, satisfied_dependents: BTreeSet<DependentKey>) -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            kind,
            failed_items: Vec::new(),
            satisfied_dependents,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn is_partial_failure(&self) -> bool {
        !self.failed.is_empty() && !self.succeeded.is_empty()
    }

    pub fn is_total_failure(&self) -> bool {
        !self.failed.is_empty() && self.succeeded.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<ItemId> {
        self.failed.iter().map(|f| f.id.clone()).collect()
    }

    pub fn failure_for(&self, id: &ItemId) -> Option<&BulkFailure> {
        self.failed.iter().find(|f| &f.id == id)
    }

    /// Item snapshots that a retry would re-submit.
    pub fn retryable_items(&self) -> &[I] {
        &self.failed_items
    }

    /// Dependent targets confirmed in this attempt or any attempt before it.
    pub fn satisfied_dependents(&self) -> &BTreeSet<DependentKey> {
        &self.satisfied_dependents
    }
}
