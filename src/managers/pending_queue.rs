//! Pending Operation Queue for Linkshelf.
//!
//! A durable, ordered side-log of mutations the remote store has not
//! acknowledged yet. Every mutation coalesces and persists under one lock so
//! concurrent enqueues can never interleave. Nothing leaves the queue before
//! its remote call succeeds, which makes an interrupted drain safe.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::database::connection::Database;
use crate::services::remote_client::{RemoteBookmark, RemoteSyncClient};
use crate::types::errors::{QueueError, RemoteError};
use crate::types::pending::{OperationType, PendingOperation};
use crate::types::sync::DrainReport;

/// Key under which the serialized queue is stored.
pub const QUEUE_STORAGE_KEY: &str = "pending_operations.v1";

/// Durable storage for the serialized queue.
pub trait QueueStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>, QueueError>;
    fn save(&self, serialized: &str) -> Result<(), QueueError>;
}

/// Stores the queue in the SQLite key/value table.
pub struct SqliteQueueStorage {
    db: Arc<Database>,
}

impl SqliteQueueStorage {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl QueueStorage for SqliteQueueStorage {
    fn load(&self) -> Result<Option<String>, QueueError> {
        self.db
            .kv_get(QUEUE_STORAGE_KEY)
            .map_err(|e| QueueError::StorageError(e.to_string()))
    }

    fn save(&self, serialized: &str) -> Result<(), QueueError> {
        self.db
            .kv_set(QUEUE_STORAGE_KEY, serialized)
            .map_err(|e| QueueError::StorageError(e.to_string()))
    }
}

/// Process-local storage, used by tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryQueueStorage {
    value: Mutex<Option<String>>,
}

impl MemoryQueueStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(serialized: &str) -> Self {
        Self {
            value: Mutex::new(Some(serialized.to_string())),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl QueueStorage for MemoryQueueStorage {
    fn load(&self) -> Result<Option<String>, QueueError> {
        Ok(self.contents())
    }

    fn save(&self, serialized: &str) -> Result<(), QueueError> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(serialized.to_string());
        Ok(())
    }
}

impl<T: QueueStorage + ?Sized> QueueStorage for Arc<T> {
    fn load(&self) -> Result<Option<String>, QueueError> {
        (**self).load()
    }

    fn save(&self, serialized: &str) -> Result<(), QueueError> {
        (**self).save(serialized)
    }
}

/// The pending operation queue.
pub struct PendingQueue {
    storage: Box<dyn QueueStorage>,
    ops: Mutex<Vec<PendingOperation>>,
    /// Bumped by `clear_all`; a drain pass stops when it changes.
    generation: AtomicU64,
}

impl PendingQueue {
    /// Loads the queue from storage. Unreadable data yields an empty queue.
    pub fn load(storage: Box<dyn QueueStorage>) -> Self {
        let ops = match storage.load() {
            Ok(Some(serialized)) => match serde_json::from_str::<Vec<PendingOperation>>(&serialized) {
                Ok(ops) => ops,
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable pending queue");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read pending queue, starting empty");
                Vec::new()
            }
        };
        if !ops.is_empty() {
            tracing::info!(count = ops.len(), "restored pending operations");
        }
        Self {
            storage,
            ops: Mutex::new(ops),
            generation: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PendingOperation>> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Writes the queue while the caller still holds the lock.
    fn persist(&self, ops: &[PendingOperation]) -> Result<(), QueueError> {
        let serialized = serde_json::to_string(ops)
            .map_err(|e| QueueError::SerializationError(e.to_string()))?;
        self.storage.save(&serialized)
    }

    /// Coalesces `op` into the queue and persists the result.
    ///
    /// - delete: drops every queued operation for the id, then appends.
    /// - update: drops a queued update for the id (a queued create stays), then appends.
    /// - create: replaces a queued create for the id in place, otherwise appends.
    pub fn enqueue(&self, op: PendingOperation) -> Result<(), QueueError> {
        let mut ops = self.lock();
        let id = op.operation_id;
        let before = ops.len();
        match op.op_type {
            OperationType::Delete => {
                ops.retain(|o| o.operation_id != id);
                ops.push(op);
            }
            OperationType::Update => {
                ops.retain(|o| !(o.operation_id == id && o.op_type == OperationType::Update));
                ops.push(op);
            }
            OperationType::Create => {
                let existing = ops
                    .iter_mut()
                    .find(|o| o.operation_id == id && o.op_type == OperationType::Create);
                match existing {
                    Some(slot) => *slot = op,
                    None => ops.push(op),
                }
            }
        }
        tracing::debug!(%id, queued = ops.len(), coalesced = before + 1 - ops.len(), "enqueued operation");
        self.persist(&ops)
    }

    /// Copy of the queue in replay order.
    pub fn snapshot(&self) -> Vec<PendingOperation> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether any operation for `id` is still queued.
    pub fn contains(&self, id: Uuid) -> bool {
        self.lock().iter().any(|o| o.operation_id == id)
    }

    /// Number of operations that reached `max_attempts`.
    pub fn stalled_count(&self, max_attempts: u32) -> usize {
        self.lock().iter().filter(|o| is_stalled(o, max_attempts)).count()
    }

    /// Discards every queued operation. Called on sign-out.
    pub fn clear_all(&self) -> Result<(), QueueError> {
        let mut ops = self.lock();
        if !ops.is_empty() {
            tracing::info!(count = ops.len(), "clearing pending operations");
        }
        ops.clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.persist(&ops)
    }

    /// Whether `op` is still queued unchanged.
    fn still_queued(&self, op: &PendingOperation) -> bool {
        self.lock().iter().any(|o| o.same_mutation(op))
    }

    /// Gives stalled operations a fresh retry budget.
    pub fn reset_attempts(&self) -> Result<(), QueueError> {
        let mut ops = self.lock();
        if ops.iter().all(|o| o.attempts == 0) {
            return Ok(());
        }
        ops.iter_mut().for_each(|o| o.attempts = 0);
        self.persist(&ops)
    }

    /// Removes a delivered operation, unless coalescing already replaced it.
    fn complete(&self, op: &PendingOperation) -> Result<(), QueueError> {
        let mut ops = self.lock();
        let Some(index) = ops.iter().position(|o| o.same_mutation(op)) else {
            return Ok(());
        };
        ops.remove(index);
        self.persist(&ops)
    }

    fn record_failure(&self, op: &PendingOperation) -> Result<(), QueueError> {
        let mut ops = self.lock();
        let Some(slot) = ops.iter_mut().find(|o| o.same_mutation(op)) else {
            return Ok(());
        };
        slot.attempts = slot.attempts.saturating_add(1);
        self.persist(&ops)
    }

    /// Replays queued operations in FIFO order.
    ///
    /// Delivered operations are removed; failed ones stay queued with their
    /// attempt counter bumped. Operations at `max_attempts` (0 = unlimited)
    /// are skipped and counted as stalled. An authorization failure ends the pass,
    /// and so does `clear_all`. Operations superseded during the pass are skipped.
    pub async fn drain(
        &self,
        remote: &dyn RemoteSyncClient,
        user_id: Uuid,
        max_attempts: u32,
    ) -> DrainReport {
        let mut report = DrainReport::default();
        let generation = self.generation.load(Ordering::SeqCst);

        for op in self.snapshot() {
            if self.generation.load(Ordering::SeqCst) != generation {
                tracing::info!("queue cleared during drain, ending pass");
                break;
            }
            // Coalescing may have replaced or removed it since the pass began.
            if !self.still_queued(&op) {
                continue;
            }
            if is_stalled(&op, max_attempts) {
                report.stalled += 1;
                continue;
            }
            match replay(remote, &op, user_id).await {
                Ok(()) => {
                    report.succeeded += 1;
                    if let Err(e) = self.complete(&op) {
                        tracing::warn!(error = %e, id = %op.operation_id, "failed to persist delivered operation");
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        id = %op.operation_id,
                        op = op.op_type.as_str(),
                        "replay failed, keeping operation queued"
                    );
                    report.failed += 1;
                    report.last_error = Some(err.to_string());
                    if let Err(e) = self.record_failure(&op) {
                        tracing::warn!(error = %e, "failed to persist attempt counter");
                    }
                    if matches!(err, RemoteError::Unauthorized(_) | RemoteError::NoSession) {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        report.remaining = self.snapshot();
        report
    }
}

fn is_stalled(op: &PendingOperation, max_attempts: u32) -> bool {
    max_attempts > 0 && op.attempts >= max_attempts
}

/// Sends one operation to the remote store.
///
/// Already-applied outcomes count as success: `AlreadyExists` for a create
/// and `NotFound` for a delete.
pub(crate) async fn replay(
    remote: &dyn RemoteSyncClient,
    op: &PendingOperation,
    user_id: Uuid,
) -> Result<(), RemoteError> {
    let result = match (op.op_type, &op.payload) {
        (OperationType::Create, Some(bookmark)) => {
            remote
                .create_bookmark(&RemoteBookmark::from_bookmark(bookmark, user_id))
                .await
        }
        (OperationType::Update, Some(bookmark)) => {
            remote
                .update_bookmark(op.operation_id, &RemoteBookmark::from_bookmark(bookmark, user_id))
                .await
        }
        (OperationType::Delete, _) => remote.delete_bookmark(op.operation_id).await,
        (op_type, None) => {
            tracing::error!(id = %op.operation_id, op = op_type.as_str(), "dropping operation without payload");
            return Ok(());
        }
    };

    match result {
        Err(RemoteError::AlreadyExists(_)) if op.op_type == OperationType::Create => Ok(()),
        Err(RemoteError::NotFound(_)) if op.op_type == OperationType::Delete => Ok(()),
        other => other,
    }
}
