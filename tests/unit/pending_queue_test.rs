//! Tests for the pending operation queue: coalescing, durability and drain.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use linkshelf::database::Database;
use linkshelf::managers::pending_queue::{
    MemoryQueueStorage, PendingQueue, QueueStorage, SqliteQueueStorage, QUEUE_STORAGE_KEY,
};
use linkshelf::services::remote_client::RemoteBookmark;
use linkshelf::types::errors::RemoteError;
use linkshelf::types::pending::{OperationType, PendingOperation};
use uuid::Uuid;

use common::{sample_bookmark, Call, FakeRemote};

fn memory_queue() -> (PendingQueue, Arc<MemoryQueueStorage>) {
    let storage = Arc::new(MemoryQueueStorage::new());
    (PendingQueue::load(Box::new(storage.clone())), storage)
}

fn kinds(queue: &PendingQueue) -> Vec<(Uuid, OperationType)> {
    queue.snapshot().iter().map(|o| (o.operation_id, o.op_type)).collect()
}

// ─── Coalescing ───

#[test]
fn test_delete_replaces_every_queued_operation_for_the_id() {
    let (queue, _) = memory_queue();
    let a = sample_bookmark("https://example.com/a");
    let b = sample_bookmark("https://example.com/b");

    queue.enqueue(PendingOperation::create(a.clone())).unwrap();
    queue.enqueue(PendingOperation::create(b.clone())).unwrap();
    queue.enqueue(PendingOperation::update(a.clone())).unwrap();
    queue.enqueue(PendingOperation::delete(a.id)).unwrap();

    assert_eq!(
        kinds(&queue),
        vec![(b.id, OperationType::Create), (a.id, OperationType::Delete)]
    );
}

#[test]
fn test_update_replaces_queued_update_but_keeps_create() {
    let (queue, _) = memory_queue();
    let mut a = sample_bookmark("https://example.com/a");

    queue.enqueue(PendingOperation::create(a.clone())).unwrap();
    a.title = "first edit".to_string();
    queue.enqueue(PendingOperation::update(a.clone())).unwrap();
    a.title = "second edit".to_string();
    queue.enqueue(PendingOperation::update(a.clone())).unwrap();

    let ops = queue.snapshot();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].op_type, OperationType::Create);
    assert_eq!(ops[1].op_type, OperationType::Update);
    assert_eq!(ops[1].payload.as_ref().map(|b| b.title.as_str()), Some("second edit"));
}

#[test]
fn test_repeated_create_replaces_in_place() {
    let (queue, _) = memory_queue();
    let mut a = sample_bookmark("https://example.com/a");
    let b = sample_bookmark("https://example.com/b");

    queue.enqueue(PendingOperation::create(a.clone())).unwrap();
    queue.enqueue(PendingOperation::create(b.clone())).unwrap();
    a.title = "newer snapshot".to_string();
    queue.enqueue(PendingOperation::create(a.clone())).unwrap();

    let ops = queue.snapshot();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].operation_id, a.id);
    assert_eq!(ops[0].payload.as_ref().map(|p| p.title.as_str()), Some("newer snapshot"));
    assert_eq!(ops[1].operation_id, b.id);
}

#[test]
fn test_create_after_delete_is_appended() {
    let (queue, _) = memory_queue();
    let a = sample_bookmark("https://example.com/a");

    queue.enqueue(PendingOperation::delete(a.id)).unwrap();
    queue.enqueue(PendingOperation::create(a.clone())).unwrap();

    assert_eq!(
        kinds(&queue),
        vec![(a.id, OperationType::Delete), (a.id, OperationType::Create)]
    );
}

// ─── Durability ───

#[test]
fn test_every_enqueue_is_persisted_in_record_format() {
    let (queue, storage) = memory_queue();
    let a = sample_bookmark("https://example.com/a");
    queue.enqueue(PendingOperation::create(a.clone())).unwrap();

    let raw = storage.contents().expect("queue should be saved");
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = &json[0];
    assert_eq!(record["operationId"], a.id.to_string());
    assert_eq!(record["type"], "create");
    assert_eq!(record["payload"]["url"], "https://example.com/a");
    assert_eq!(record["payload"]["isRead"], false);
    assert!(record["enqueuedAt"].is_i64());
}

#[test]
fn test_reload_restores_order() {
    let storage = Arc::new(MemoryQueueStorage::new());
    let a = sample_bookmark("https://example.com/a");
    let b = sample_bookmark("https://example.com/b");
    {
        let queue = PendingQueue::load(Box::new(storage.clone()));
        queue.enqueue(PendingOperation::create(a.clone())).unwrap();
        queue.enqueue(PendingOperation::delete(b.id)).unwrap();
    }

    let reloaded = PendingQueue::load(Box::new(storage.clone()));
    assert_eq!(
        kinds(&reloaded),
        vec![(a.id, OperationType::Create), (b.id, OperationType::Delete)]
    );
}

#[test]
fn test_records_without_attempts_field_still_load() {
    let id = Uuid::new_v4();
    let raw = format!(
        r#"[{{"operationId":"{}","type":"delete","payload":null,"enqueuedAt":1700000000}}]"#,
        id
    );
    let queue = PendingQueue::load(Box::new(MemoryQueueStorage::with_contents(&raw)));
    let ops = queue.snapshot();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].attempts, 0);
    assert_eq!(ops[0].op_type, OperationType::Delete);
}

#[test]
fn test_corrupt_storage_fails_open_to_empty() {
    let queue = PendingQueue::load(Box::new(MemoryQueueStorage::with_contents("{{not json")));
    assert!(queue.is_empty());

    // The queue keeps working and overwrites the corrupt blob.
    queue.enqueue(PendingOperation::delete(Uuid::new_v4())).unwrap();
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_sqlite_storage_uses_versioned_key() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let storage = SqliteQueueStorage::new(db.clone());
    assert_eq!(storage.load().unwrap(), None);

    let queue = PendingQueue::load(Box::new(SqliteQueueStorage::new(db.clone())));
    queue.enqueue(PendingOperation::delete(Uuid::new_v4())).unwrap();

    assert_eq!(QUEUE_STORAGE_KEY, "pending_operations.v1");
    assert!(db.kv_get(QUEUE_STORAGE_KEY).unwrap().is_some());
    assert_eq!(PendingQueue::load(Box::new(storage)).len(), 1);
}

#[test]
fn test_clear_all_empties_storage() {
    let (queue, storage) = memory_queue();
    queue.enqueue(PendingOperation::delete(Uuid::new_v4())).unwrap();
    queue.clear_all().unwrap();

    assert!(queue.is_empty());
    assert_eq!(storage.contents().as_deref(), Some("[]"));
}

// ─── Drain ───

#[tokio::test]
async fn test_drain_replays_in_fifo_order_and_empties_queue() {
    let (queue, _) = memory_queue();
    let remote = FakeRemote::new(true);
    let user = Uuid::new_v4();
    let a = sample_bookmark("https://example.com/a");
    let b = sample_bookmark("https://example.com/b");

    queue.enqueue(PendingOperation::create(a.clone())).unwrap();
    queue.enqueue(PendingOperation::create(b.clone())).unwrap();
    queue.enqueue(PendingOperation::update(a.clone())).unwrap();

    let report = queue.drain(&remote, user, 10).await;

    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 0);
    assert!(report.remaining.is_empty());
    assert!(queue.is_empty());
    assert_eq!(
        remote.calls(),
        vec![Call::Create(a.id), Call::Create(b.id), Call::Update(a.id)]
    );
    assert!(remote.rows().iter().all(|r| r.user_id == user));
}

#[tokio::test]
async fn test_failed_operations_stay_queued_with_attempts() {
    let (queue, _) = memory_queue();
    let remote = FakeRemote::new(true);
    let a = sample_bookmark("https://example.com/a");
    let b = sample_bookmark("https://example.com/b");
    queue.enqueue(PendingOperation::create(a.clone())).unwrap();
    queue.enqueue(PendingOperation::create(b.clone())).unwrap();

    remote.fail_next(RemoteError::Timeout);
    let report = queue.drain(&remote, Uuid::new_v4(), 10).await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert!(!report.aborted);
    assert_eq!(report.last_error.as_deref(), Some("Remote request timed out"));
    let remaining = queue.snapshot();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].operation_id, a.id);
    assert_eq!(remaining[0].attempts, 1);
}

#[tokio::test]
async fn test_already_applied_outcomes_count_as_success() {
    let (queue, _) = memory_queue();
    let remote = FakeRemote::new(true);
    let user = Uuid::new_v4();
    let a = sample_bookmark("https://example.com/a");
    remote.insert_row(RemoteBookmark::from_bookmark(&a, user));

    queue.enqueue(PendingOperation::create(a.clone())).unwrap();
    queue.enqueue(PendingOperation::delete(Uuid::new_v4())).unwrap();

    let report = queue.drain(&remote, user, 10).await;
    assert_eq!(report.succeeded, 2);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_unauthorized_aborts_the_pass() {
    let (queue, _) = memory_queue();
    let remote = FakeRemote::new(true);
    for url in ["https://example.com/a", "https://example.com/b", "https://example.com/c"] {
        queue.enqueue(PendingOperation::create(sample_bookmark(url))).unwrap();
    }

    remote.fail_next(RemoteError::Unauthorized("jwt expired".to_string()));
    let report = queue.drain(&remote, Uuid::new_v4(), 10).await;

    assert!(report.aborted);
    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded, 0);
    assert_eq!(remote.calls().len(), 1);
    assert_eq!(queue.len(), 3);
}

#[tokio::test]
async fn test_operations_at_attempt_cap_are_skipped_not_dropped() {
    let (queue, _) = memory_queue();
    let remote = FakeRemote::new(true);
    let a = sample_bookmark("https://example.com/a");
    queue.enqueue(PendingOperation::create(a.clone())).unwrap();
    remote.fail_always(Some(RemoteError::Network("offline".to_string())));

    for _ in 0..2 {
        queue.drain(&remote, Uuid::new_v4(), 2).await;
    }
    assert_eq!(queue.stalled_count(2), 1);

    remote.clear_calls();
    remote.fail_always(None);
    let report = queue.drain(&remote, Uuid::new_v4(), 2).await;
    assert_eq!(report.stalled, 1);
    assert!(remote.calls().is_empty(), "stalled operations must not be replayed");
    assert_eq!(queue.len(), 1);

    queue.reset_attempts().unwrap();
    let report = queue.drain(&remote, Uuid::new_v4(), 2).await;
    assert_eq!(report.succeeded, 1);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_zero_max_attempts_means_unlimited() {
    let (queue, _) = memory_queue();
    let remote = FakeRemote::new(true);
    queue.enqueue(PendingOperation::delete(Uuid::new_v4())).unwrap();
    remote.fail_always(Some(RemoteError::Timeout));

    for _ in 0..5 {
        let report = queue.drain(&remote, Uuid::new_v4(), 0).await;
        assert_eq!(report.stalled, 0);
    }
    assert_eq!(remote.calls().len(), 5);
}

#[tokio::test]
async fn test_drain_skips_operations_superseded_mid_pass() {
    let (queue, _) = memory_queue();
    let remote = FakeRemote::new(true);
    let user = Uuid::new_v4();
    let a = sample_bookmark("https://example.com/a");
    let b = sample_bookmark("https://example.com/b");
    remote.insert_row(RemoteBookmark::from_bookmark(&b, user));
    queue.enqueue(PendingOperation::create(a.clone())).unwrap();
    queue.enqueue(PendingOperation::update(b.clone())).unwrap();
    remote.hold_next();

    let supersede = async {
        remote.wait_until_held().await;
        queue.enqueue(PendingOperation::delete(b.id)).unwrap();
        remote.release();
    };
    let (report, ()) = tokio::join!(queue.drain(&remote, user, 10), supersede);

    assert_eq!(report.succeeded, 1);
    assert_eq!(remote.calls(), vec![Call::Create(a.id)]);
    assert_eq!(kinds(&queue), vec![(b.id, OperationType::Delete)]);
}

#[tokio::test]
async fn test_clear_all_ends_a_running_drain() {
    let (queue, storage) = memory_queue();
    let remote = FakeRemote::new(true);
    let user = Uuid::new_v4();
    let ids: Vec<Uuid> = (0..3)
        .map(|i| {
            let bookmark = sample_bookmark(&format!("https://example.com/{}", i));
            queue.enqueue(PendingOperation::create(bookmark.clone())).unwrap();
            bookmark.id
        })
        .collect();
    remote.hold_next();

    let clear = async {
        remote.wait_until_held().await;
        queue.clear_all().unwrap();
        remote.release();
    };
    let (report, ()) = tokio::join!(queue.drain(&remote, user, 10), clear);

    assert_eq!(remote.calls(), vec![Call::Create(ids[0])]);
    assert_eq!(report.failed, 0);
    assert!(report.remaining.is_empty());
    assert!(queue.is_empty());
    assert_eq!(storage.contents().as_deref(), Some("[]"));
}
