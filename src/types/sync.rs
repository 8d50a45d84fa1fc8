use serde::{Deserialize, Serialize};

use super::pending::PendingOperation;

/// What happened to the remote half of a local mutation.
///
/// The local change is applied in every case; `Queued` is advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The remote store acknowledged the mutation.
    Synced,
    /// Saved locally, will sync later.
    Queued { reason: QueueReason },
}

impl SyncOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, SyncOutcome::Queued { .. })
    }
}

/// Why a mutation went to the pending queue instead of the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum QueueReason {
    /// No authenticated session.
    NoSession,
    /// An older mutation for the same bookmark is still queued.
    AwaitingEarlierOperations,
    /// The remote call failed; carries the error text.
    RemoteFailed(String),
}

/// Result of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Operations delivered (or already applied remotely) and removed.
    pub succeeded: usize,
    /// Operations whose replay failed this pass.
    pub failed: usize,
    /// Operations skipped because they reached the attempt cap.
    pub stalled: usize,
    /// True when the pass stopped early on a permanent error.
    pub aborted: bool,
    /// Queue contents after the pass.
    pub remaining: Vec<PendingOperation>,
    pub last_error: Option<String>,
}

/// Observable sync state published by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub pending: usize,
    pub stalled: usize,
    pub draining: bool,
    pub signed_in: bool,
    pub last_error: Option<String>,
    pub last_synced_at: Option<i64>,
}
