use std::error::Error;

use linkshelf::types::errors::*;

// === BookmarkError Tests ===

#[test]
fn bookmark_error_display_variants() {
    assert_eq!(
        BookmarkError::NotFound("bm-1".to_string()).to_string(),
        "Bookmark not found: bm-1"
    );
    assert_eq!(
        BookmarkError::DuplicateUrl("bm-2".to_string()).to_string(),
        "Duplicate bookmark URL: bm-2"
    );
    assert_eq!(
        BookmarkError::InvalidUrl("".to_string()).to_string(),
        "Invalid bookmark URL: "
    );
    assert_eq!(
        BookmarkError::DatabaseError("disk I/O error".to_string()).to_string(),
        "Bookmark database error: disk I/O error"
    );
}

#[test]
fn bookmark_error_implements_error_trait() {
    let err: Box<dyn Error> = Box::new(BookmarkError::NotFound("id".to_string()));
    assert!(err.source().is_none());
}

// === QueueError Tests ===

#[test]
fn queue_error_display_variants() {
    assert_eq!(
        QueueError::StorageError("locked".to_string()).to_string(),
        "Queue storage error: locked"
    );
    assert_eq!(
        QueueError::SerializationError("eof".to_string()).to_string(),
        "Queue serialization error: eof"
    );
}

// === RemoteError Tests ===

#[test]
fn remote_error_display_variants() {
    assert_eq!(RemoteError::NoSession.to_string(), "No active session");
    assert_eq!(RemoteError::Timeout.to_string(), "Remote request timed out");
    assert_eq!(
        RemoteError::Network("connection reset".to_string()).to_string(),
        "Remote network error: connection reset"
    );
    assert_eq!(
        RemoteError::Server {
            status: 502,
            message: "bad gateway".to_string()
        }
        .to_string(),
        "Remote server error 502: bad gateway"
    );
    assert_eq!(
        RemoteError::NotFound("abc".to_string()).to_string(),
        "Remote record not found: abc"
    );
    assert_eq!(
        RemoteError::AlreadyExists("abc".to_string()).to_string(),
        "Remote record already exists: abc"
    );
    assert_eq!(
        RemoteError::Unauthorized("jwt expired".to_string()).to_string(),
        "Remote unauthorized: jwt expired"
    );
    assert_eq!(
        RemoteError::Decode("expected array".to_string()).to_string(),
        "Remote response decode error: expected array"
    );
}

#[test]
fn remote_error_transience() {
    assert!(RemoteError::Timeout.is_transient());
    assert!(RemoteError::Network("x".to_string()).is_transient());
    assert!(RemoteError::Server { status: 503, message: String::new() }.is_transient());
    assert!(RemoteError::Server { status: 429, message: String::new() }.is_transient());
    assert!(!RemoteError::Server { status: 400, message: String::new() }.is_transient());
    assert!(!RemoteError::Unauthorized("x".to_string()).is_transient());
    assert!(!RemoteError::Decode("x".to_string()).is_transient());
}

// === SyncError Tests ===

#[test]
fn sync_error_wraps_sources() {
    let err = SyncError::from(RemoteError::Timeout);
    assert_eq!(err.to_string(), "Sync remote error: Remote request timed out");
    assert!(err.source().is_some());

    let err: SyncError = QueueError::StorageError("full".to_string()).into();
    assert!(matches!(err, SyncError::Queue(_)));
    assert_eq!(err.source().map(|s| s.to_string()), Some("Queue storage error: full".to_string()));

    let err: SyncError = BookmarkError::NotFound("id".to_string()).into();
    assert!(matches!(err, SyncError::Store(_)));

    assert_eq!(SyncError::NoSession.to_string(), "Sync requires a signed-in user");
    assert!(SyncError::NoSession.source().is_none());
}

// === SettingsError Tests ===

#[test]
fn settings_error_display_variants() {
    assert_eq!(
        SettingsError::IoError("denied".to_string()).to_string(),
        "Settings I/O error: denied"
    );
    assert_eq!(
        SettingsError::SerializationError("bad json".to_string()).to_string(),
        "Settings serialization error: bad json"
    );
    assert_eq!(
        SettingsError::InvalidKey("foo.bar".to_string()).to_string(),
        "Invalid settings key: foo.bar"
    );
    assert_eq!(
        SettingsError::InvalidValue("not a number".to_string()).to_string(),
        "Invalid settings value: not a number"
    );
}
