// Linkshelf services
// URL canonicalization, page metadata, the remote client, sync orchestration and settings.

pub mod metadata_extractor;
pub mod remote_client;
pub mod settings_engine;
pub mod sync_orchestrator;
pub mod url_canonicalizer;
