use std::fmt;

// === BookmarkError ===

/// Errors related to the local bookmark store.
#[derive(Debug)]
pub enum BookmarkError {
    /// Bookmark with the given ID was not found.
    NotFound(String),
    /// A bookmark with the same dedupe key already exists. Carries the existing ID.
    DuplicateUrl(String),
    /// The URL is empty or otherwise unusable.
    InvalidUrl(String),
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for BookmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookmarkError::NotFound(id) => write!(f, "Bookmark not found: {}", id),
            BookmarkError::DuplicateUrl(id) => write!(f, "Duplicate bookmark URL: {}", id),
            BookmarkError::InvalidUrl(url) => write!(f, "Invalid bookmark URL: {}", url),
            BookmarkError::DatabaseError(msg) => {
                write!(f, "Bookmark database error: {}", msg)
            }
        }
    }
}

impl std::error::Error for BookmarkError {}

// === QueueError ===

/// Errors related to persisting the pending operation queue.
#[derive(Debug)]
pub enum QueueError {
    /// Reading or writing durable storage failed.
    StorageError(String),
    /// Failed to serialize the queue.
    SerializationError(String),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::StorageError(msg) => write!(f, "Queue storage error: {}", msg),
            QueueError::SerializationError(msg) => {
                write!(f, "Queue serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for QueueError {}

// === RemoteError ===

/// Errors returned by the remote sync client.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// No authenticated session is available.
    NoSession,
    /// The request never reached the server.
    Network(String),
    /// The request did not complete in time.
    Timeout,
    /// The server answered with an error status.
    Server { status: u16, message: String },
    /// The record does not exist remotely.
    NotFound(String),
    /// The record already exists remotely.
    AlreadyExists(String),
    /// The session was rejected.
    Unauthorized(String),
    /// The response body could not be decoded.
    Decode(String),
}

impl RemoteError {
    /// Whether a later retry may succeed without user action.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::NoSession | RemoteError::Network(_) | RemoteError::Timeout => true,
            RemoteError::Server { status, .. } => *status >= 500 || *status == 429,
            RemoteError::NotFound(_) | RemoteError::AlreadyExists(_) => true,
            RemoteError::Unauthorized(_) | RemoteError::Decode(_) => false,
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::NoSession => write!(f, "No active session"),
            RemoteError::Network(msg) => write!(f, "Remote network error: {}", msg),
            RemoteError::Timeout => write!(f, "Remote request timed out"),
            RemoteError::Server { status, message } => {
                write!(f, "Remote server error {}: {}", status, message)
            }
            RemoteError::NotFound(id) => write!(f, "Remote record not found: {}", id),
            RemoteError::AlreadyExists(id) => write!(f, "Remote record already exists: {}", id),
            RemoteError::Unauthorized(msg) => write!(f, "Remote unauthorized: {}", msg),
            RemoteError::Decode(msg) => write!(f, "Remote response decode error: {}", msg),
        }
    }
}

impl std::error::Error for RemoteError {}

// === SyncError ===

/// Errors surfaced by orchestrator entry points that cannot fall back to the queue.
#[derive(Debug)]
pub enum SyncError {
    /// The operation requires a signed-in user.
    NoSession,
    Queue(QueueError),
    Remote(RemoteError),
    Store(BookmarkError),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::NoSession => write!(f, "Sync requires a signed-in user"),
            SyncError::Queue(e) => write!(f, "Sync queue error: {}", e),
            SyncError::Remote(e) => write!(f, "Sync remote error: {}", e),
            SyncError::Store(e) => write!(f, "Sync store error: {}", e),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::NoSession => None,
            SyncError::Queue(e) => Some(e),
            SyncError::Remote(e) => Some(e),
            SyncError::Store(e) => Some(e),
        }
    }
}

impl From<QueueError> for SyncError {
    fn from(error: QueueError) -> Self {
        SyncError::Queue(error)
    }
}

impl From<RemoteError> for SyncError {
    fn from(error: RemoteError) -> Self {
        SyncError::Remote(error)
    }
}

impl From<BookmarkError> for SyncError {
    fn from(error: BookmarkError) -> Self {
        SyncError::Store(error)
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}
