//! Tests for the SettingsEngine public API: defaults, dot-path updates,
//! persistence, reset and malformed files.

use linkshelf::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use linkshelf::types::errors::SettingsError;
use linkshelf::types::settings::SyncSettings;
use serde_json::json;
use tempfile::TempDir;

/// Engine backed by `settings.json` in a temp directory the caller keeps alive.
fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    let path = dir.path().join("settings.json").to_string_lossy().to_string();
    SettingsEngine::new(Some(path))
}

#[test]
fn test_load_defaults_when_no_config_file_exists() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let settings = engine.load().unwrap();

    assert_eq!(settings, SyncSettings::default());
    assert_eq!(settings.sync.max_attempts, 10);
    assert_eq!(settings.sync.drain_interval_secs, 60);
    assert_eq!(settings.remote.request_timeout_secs, 15);
    assert_eq!(settings.storage.database_file, "linkshelf.db");
}

/// A change made through `set_value` is visible to a fresh engine on the same file.
#[test]
fn test_set_value_persists_changes() {
    let dir = TempDir::new().unwrap();

    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine.set_value("sync.max_attempts", json!(5)).unwrap();
        engine
            .set_value("remote.base_url", json!("https://backend.example.co"))
            .unwrap();
    }

    let mut reopened = engine_in_temp(&dir);
    let loaded = reopened.load().unwrap();
    assert_eq!(loaded.sync.max_attempts, 5);
    assert_eq!(loaded.remote.base_url, "https://backend.example.co");
    assert_eq!(loaded.storage, SyncSettings::default().storage);
}

#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();
    engine.set_value("sync.drain_interval_secs", json!(5)).unwrap();
    engine.set_value("storage.database_file", json!("other.db")).unwrap();

    engine.reset().unwrap();
    assert_eq!(engine.get_settings(), &SyncSettings::default());

    let mut reopened = engine_in_temp(&dir);
    assert_eq!(reopened.load().unwrap(), SyncSettings::default());
}

#[test]
fn test_unknown_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    for key in ["", "sync.retries", "nope.max_attempts", "sync.max_attempts.inner"] {
        let result = engine.set_value(key, json!(1));
        assert!(
            matches!(result, Err(SettingsError::InvalidKey(_))),
            "key {:?} should be rejected, got {:?}",
            key,
            result
        );
    }
    assert_eq!(engine.get_settings(), &SyncSettings::default());
}

#[test]
fn test_wrong_value_type_is_rejected_and_state_kept() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let result = engine.set_value("sync.max_attempts", json!("ten"));
    assert!(matches!(result, Err(SettingsError::InvalidValue(_))));

    let result = engine.set_value("remote", json!(42));
    assert!(matches!(result, Err(SettingsError::InvalidValue(_))));

    assert_eq!(engine.get_settings().sync.max_attempts, 10);
    assert!(!dir.path().join("settings.json").exists(), "rejected values must not be saved");
}

#[test]
fn test_whole_section_can_be_replaced() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    engine
        .set_value("sync", json!({"drain_interval_secs": 0, "max_attempts": 0}))
        .unwrap();
    assert_eq!(engine.get_settings().sync.drain_interval_secs, 0);
    assert_eq!(engine.get_settings().sync.max_attempts, 0);
}

#[test]
fn test_malformed_file_is_a_serialization_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();

    let mut engine = engine_in_temp(&dir);
    assert!(matches!(engine.load(), Err(SettingsError::SerializationError(_))));
}

#[test]
fn test_partial_file_fills_missing_sections_with_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("settings.json"),
        r#"{"remote": {"base_url": "https://a.example", "api_key": "k", "request_timeout_secs": 3}}"#,
    )
    .unwrap();

    let mut engine = engine_in_temp(&dir);
    let settings = engine.load().unwrap();
    assert_eq!(settings.remote.request_timeout_secs, 3);
    assert_eq!(settings.sync, SyncSettings::default().sync);
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("settings.json");
    let engine = SettingsEngine::new(Some(path.to_string_lossy().to_string()));

    engine.save().unwrap();
    assert!(path.exists());
    assert_eq!(engine.get_config_path(), path.to_string_lossy());
}
