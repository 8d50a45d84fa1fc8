//! Sync Orchestrator for Linkshelf.
//!
//! Applies every mutation to the local store first, then tries the remote
//! store. Without a session, or when the remote call fails, the mutation is
//! queued and the caller gets an advisory [`SyncOutcome::Queued`]; the local
//! change is never rolled back. Queued work is replayed on sign-in, on
//! foreground and from the periodic drain task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{watch, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::managers::bookmark_store::LocalBookmarkStore;
use crate::managers::pending_queue::{self, PendingQueue};
use crate::services::remote_client::RemoteSyncClient;
use crate::services::url_canonicalizer;
use crate::types::bookmark::{normalize_tags, Bookmark, Category, NewBookmark};
use crate::types::errors::{BookmarkError, SyncError};
use crate::types::pending::{now, PendingOperation};
use crate::types::sync::{DrainReport, QueueReason, SyncOutcome, SyncStatus};

/// Drives local-first mutations and queue replay.
pub struct SyncOrchestrator {
    store: Arc<dyn LocalBookmarkStore>,
    remote: Arc<dyn RemoteSyncClient>,
    queue: Arc<PendingQueue>,
    max_attempts: AtomicU32,
    user_id: Mutex<Option<Uuid>>,
    drain_lock: tokio::sync::Mutex<()>,
    /// One lock per bookmark id with a mutation in flight.
    id_locks: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
    status: watch::Sender<SyncStatus>,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn LocalBookmarkStore>,
        remote: Arc<dyn RemoteSyncClient>,
        queue: Arc<PendingQueue>,
        max_attempts: u32,
    ) -> Self {
        let initial = SyncStatus {
            pending: queue.len(),
            stalled: queue.stalled_count(max_attempts),
            ..SyncStatus::default()
        };
        let (status, _) = watch::channel(initial);
        Self {
            store,
            remote,
            queue,
            max_attempts: AtomicU32::new(max_attempts),
            user_id: Mutex::new(None),
            drain_lock: tokio::sync::Mutex::new(()),
            id_locks: Arc::new(Mutex::new(HashMap::new())),
            status,
        }
    }

    pub fn store(&self) -> &Arc<dyn LocalBookmarkStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<PendingQueue> {
        &self.queue
    }

    /// Subscribes to sync status changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.load(Ordering::SeqCst)
    }

    /// Changes the retry cap used by later drain passes.
    pub fn set_max_attempts(&self, max_attempts: u32) {
        self.max_attempts.store(max_attempts, Ordering::SeqCst);
        self.publish(|_| {});
    }

    pub fn current_user(&self) -> Option<Uuid> {
        *self.user_id.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ─── Mutations ───

    /// Saves a new link locally and delivers the create.
    ///
    /// Fails with `DuplicateUrl` (carrying the existing id) when a bookmark
    /// with the same dedupe key is already saved.
    pub async fn save_link(&self, draft: NewBookmark) -> Result<(Bookmark, SyncOutcome), BookmarkError> {
        let url = draft.url.trim().to_string();
        if url.is_empty() {
            return Err(BookmarkError::InvalidUrl(draft.url));
        }
        let key = url_canonicalizer::dedupe_key(&url);
        if let Some(existing) = self.store.find_by_dedupe_key(&key)? {
            return Err(BookmarkError::DuplicateUrl(existing.id.to_string()));
        }

        let category = match draft.category.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Category::normalize(raw),
            _ => url_canonicalizer::suggest_category(&url).unwrap_or_default(),
        };
        let title = match draft.title.trim() {
            "" => url.clone(),
            t => t.to_string(),
        };
        let bookmark = Bookmark {
            id: Uuid::new_v4(),
            title,
            url,
            notes: draft.notes,
            category,
            tags: normalize_tags(&draft.tags),
            is_read: false,
            is_favorite: false,
            thumbnail_url: draft.thumbnail_url,
            created_at: now(),
        };

        self.store.upsert(&bookmark)?;
        let outcome = self.deliver(PendingOperation::create(bookmark.clone())).await;
        Ok((bookmark, outcome))
    }

    /// Replaces an existing bookmark's fields and delivers the update.
    pub async fn update_bookmark(&self, bookmark: Bookmark) -> Result<(Bookmark, SyncOutcome), BookmarkError> {
        let _guard = self.lock_id(bookmark.id).await;
        self.apply_update(bookmark).await
    }

    pub async fn toggle_read(&self, id: Uuid) -> Result<(Bookmark, SyncOutcome), BookmarkError> {
        let _guard = self.lock_id(id).await;
        let mut bookmark = self.require(id)?;
        bookmark.is_read = !bookmark.is_read;
        self.apply_update(bookmark).await
    }

    pub async fn toggle_favorite(&self, id: Uuid) -> Result<(Bookmark, SyncOutcome), BookmarkError> {
        let _guard = self.lock_id(id).await;
        let mut bookmark = self.require(id)?;
        bookmark.is_favorite = !bookmark.is_favorite;
        self.apply_update(bookmark).await
    }

    async fn apply_update(&self, bookmark: Bookmark) -> Result<(Bookmark, SyncOutcome), BookmarkError> {
        let existing = self
            .store
            .get(bookmark.id)?
            .ok_or_else(|| BookmarkError::NotFound(bookmark.id.to_string()))?;
        let bookmark = Bookmark {
            created_at: existing.created_at,
            ..bookmark.normalized()
        };
        self.store.upsert(&bookmark)?;
        let outcome = self.deliver(PendingOperation::update(bookmark.clone())).await;
        Ok((bookmark, outcome))
    }

    /// Removes a bookmark locally and delivers the delete.
    pub async fn delete_bookmark(&self, id: Uuid) -> Result<SyncOutcome, BookmarkError> {
        let _guard = self.lock_id(id).await;
        if !self.store.delete(id)? {
            return Err(BookmarkError::NotFound(id.to_string()));
        }
        Ok(self.deliver(PendingOperation::delete(id)).await)
    }

    /// Serializes local writes and deliveries for one bookmark id.
    async fn lock_id(&self, id: Uuid) -> IdGuard {
        let lock = {
            let mut locks = self.id_locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(id).or_default())
        };
        IdGuard {
            locks: Arc::clone(&self.id_locks),
            id,
            guard: Some(lock.lock_owned().await),
        }
    }

    fn require(&self, id: Uuid) -> Result<Bookmark, BookmarkError> {
        self.store
            .get(id)?
            .ok_or_else(|| BookmarkError::NotFound(id.to_string()))
    }

    /// Sends `op` now when possible, otherwise queues it.
    ///
    /// An id that already has queued work is always queued behind it so the
    /// newer mutation cannot overtake the older one. Callers hold the id lock
    /// for `op.operation_id`, so the check and the send cannot interleave with
    /// another mutation of the same bookmark.
    async fn deliver(&self, op: PendingOperation) -> SyncOutcome {
        let user_id = match self.current_user() {
            Some(user_id) if self.remote.has_active_session() => user_id,
            _ => return self.enqueue(op, QueueReason::NoSession),
        };
        if self.queue.contains(op.operation_id) {
            return self.enqueue(op, QueueReason::AwaitingEarlierOperations);
        }

        match pending_queue::replay(self.remote.as_ref(), &op, user_id).await {
            Ok(()) => {
                self.publish(|s| {
                    s.last_synced_at = Some(now());
                    s.last_error = None;
                });
                SyncOutcome::Synced
            }
            Err(err) => {
                tracing::warn!(error = %err, id = %op.operation_id, "remote mutation failed, queueing");
                let reason = QueueReason::RemoteFailed(err.to_string());
                self.publish(|s| s.last_error = Some(err.to_string()));
                self.enqueue(op, reason)
            }
        }
    }

    fn enqueue(&self, op: PendingOperation, reason: QueueReason) -> SyncOutcome {
        if let Err(e) = self.queue.enqueue(op) {
            // The operation is still held in memory and replays this session.
            tracing::error!(error = %e, "failed to persist pending queue");
            self.publish(|s| s.last_error = Some(e.to_string()));
        }
        self.publish(|_| {});
        SyncOutcome::Queued { reason }
    }

    // ─── Session & replay ───

    /// Records the signed-in user and replays everything queued.
    pub async fn sign_in(&self, user_id: Uuid) -> Result<DrainReport, SyncError> {
        *self.user_id.lock().unwrap_or_else(|e| e.into_inner()) = Some(user_id);
        tracing::info!(%user_id, "signed in");
        self.queue.reset_attempts()?;
        self.publish(|s| s.signed_in = true);
        self.drain_pending().await
    }

    /// Forgets the user and discards queued work so it never reaches another account.
    pub fn sign_out(&self) -> Result<(), SyncError> {
        *self.user_id.lock().unwrap_or_else(|e| e.into_inner()) = None;
        let cleared = self.queue.clear_all();
        self.publish(|s| {
            s.signed_in = false;
            s.last_error = None;
        });
        tracing::info!("signed out");
        Ok(cleared?)
    }

    /// App returned to the foreground.
    pub async fn on_foreground(&self) -> Result<DrainReport, SyncError> {
        self.drain_pending().await
    }

    /// Runs one drain pass. Concurrent callers wait for the pass in flight.
    pub async fn drain_pending(&self) -> Result<DrainReport, SyncError> {
        let user_id = match self.current_user() {
            Some(user_id) if self.remote.has_active_session() => user_id,
            _ => return Err(SyncError::NoSession),
        };
        let _guard = self.drain_lock.lock().await;
        if self.queue.is_empty() {
            return Ok(DrainReport::default());
        }

        self.publish(|s| s.draining = true);
        let report = self
            .queue
            .drain(self.remote.as_ref(), user_id, self.max_attempts())
            .await;
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            stalled = report.stalled,
            remaining = report.remaining.len(),
            "drain pass finished"
        );
        if report.aborted {
            tracing::error!(error = ?report.last_error, "drain aborted on authorization failure");
        }
        self.publish(|s| {
            s.draining = false;
            if report.failed == 0 {
                s.last_error = None;
            } else {
                s.last_error = report.last_error.clone();
            }
            if report.succeeded > 0 {
                s.last_synced_at = Some(now());
            }
        });
        Ok(report)
    }

    /// Copies the user's remote bookmarks into the local store.
    ///
    /// Bookmarks with queued operations are skipped so remote data never
    /// overwrites an undelivered local edit. Returns how many were written.
    pub async fn pull_remote(&self) -> Result<usize, SyncError> {
        let user_id = match self.current_user() {
            Some(user_id) if self.remote.has_active_session() => user_id,
            _ => return Err(SyncError::NoSession),
        };
        let rows = self.remote.list_bookmarks(user_id).await?;

        let mut written = 0;
        for row in rows {
            if self.queue.contains(row.id) {
                continue;
            }
            let bookmark = row.into_bookmark();
            if bookmark.url.is_empty() {
                tracing::warn!(id = %bookmark.id, "skipping remote bookmark without url");
                continue;
            }
            if self.store.get(bookmark.id)?.as_ref() == Some(&bookmark) {
                continue;
            }
            self.store.upsert(&bookmark)?;
            written += 1;
        }
        tracing::info!(written, "pulled remote bookmarks");
        Ok(written)
    }

    /// Spawns a task that drains on every `interval` tick until `token` is cancelled.
    pub fn spawn_periodic_drain(
        self: &Arc<Self>,
        interval: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match orchestrator.drain_pending().await {
                            Ok(_) | Err(SyncError::NoSession) => {}
                            Err(e) => tracing::warn!(error = %e, "periodic drain failed"),
                        }
                    }
                    _ = token.cancelled() => {
                        tracing::info!("periodic drain shutting down");
                        break;
                    }
                }
            }
        })
    }

    fn publish(&self, update: impl FnOnce(&mut SyncStatus)) {
        let pending = self.queue.len();
        let stalled = self.queue.stalled_count(self.max_attempts());
        self.status.send_modify(|s| {
            update(s);
            s.pending = pending;
            s.stalled = stalled;
        });
    }
}

/// Holds a per-id mutation lock; forgets the lock once nobody else wants it.
struct IdGuard {
    locks: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for IdGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks.get(&self.id).map_or(false, |l| Arc::strong_count(l) == 1) {
            locks.remove(&self.id);
        }
    }
}
