use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bookmark::Bookmark;

/// Kind of mutation waiting for remote delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Delete,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
        }
    }
}

/// A queued mutation awaiting remote delivery.
///
/// Serialized as `{operationId, type, payload, enqueuedAt, attempts}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    /// Id of the affected bookmark.
    pub operation_id: Uuid,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    /// Full bookmark snapshot; `None` for deletes.
    #[serde(default)]
    pub payload: Option<Bookmark>,
    pub enqueued_at: i64,
    /// Failed replay attempts so far.
    #[serde(default)]
    pub attempts: u32,
}

impl PendingOperation {
    pub fn create(bookmark: Bookmark) -> Self {
        Self::with_payload(OperationType::Create, bookmark)
    }

    pub fn update(bookmark: Bookmark) -> Self {
        Self::with_payload(OperationType::Update, bookmark)
    }

    pub fn delete(id: Uuid) -> Self {
        Self {
            operation_id: id,
            op_type: OperationType::Delete,
            payload: None,
            enqueued_at: now(),
            attempts: 0,
        }
    }

    fn with_payload(op_type: OperationType, bookmark: Bookmark) -> Self {
        Self {
            operation_id: bookmark.id,
            op_type,
            payload: Some(bookmark),
            enqueued_at: now(),
            attempts: 0,
        }
    }

    /// Id of the bookmark this operation mutates.
    pub fn bookmark_id(&self) -> Uuid {
        self.operation_id
    }

    /// True when two records describe the same queued mutation, ignoring the
    /// attempt counter which changes while the operation is in flight.
    pub fn same_mutation(&self, other: &PendingOperation) -> bool {
        self.operation_id == other.operation_id
            && self.op_type == other.op_type
            && self.enqueued_at == other.enqueued_at
            && self.payload == other.payload
    }
}

/// Returns the current UNIX timestamp in seconds.
pub(crate) fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
