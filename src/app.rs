//! App Core for Linkshelf.
//!
//! Wires the database, local store, pending queue, remote client and
//! orchestrator together and owns the tokio runtime the RPC surface drives
//! them with.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::database::connection::Database;
use crate::managers::bookmark_store::BookmarkStore;
use crate::managers::pending_queue::{PendingQueue, SqliteQueueStorage};
use crate::services::metadata_extractor::PageFetcher;
use crate::services::remote_client::{HttpRemoteClient, RemoteSyncClient};
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::sync_orchestrator::SyncOrchestrator;
use crate::types::settings::SyncSettings;

/// Central application struct.
pub struct App {
    pub db: Arc<Database>,
    pub settings_engine: SettingsEngine,
    pub remote: Arc<dyn RemoteSyncClient>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub fetcher: PageFetcher,
    runtime: Runtime,
    background: Option<(CancellationToken, JoinHandle<()>, u64)>,
    background_wanted: bool,
}

impl App {
    /// Opens the database at `db_path` and talks to the backend configured in
    /// `settings_engine` over HTTP.
    pub fn new(db_path: &Path, settings_engine: SettingsEngine) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Arc::new(Database::open(db_path)?);

        let remote_settings = &settings_engine.get_settings().remote;
        if remote_settings.base_url.is_empty() {
            tracing::warn!("remote.base_url is not configured; mutations will stay queued");
        }
        let remote = HttpRemoteClient::new(
            &remote_settings.base_url,
            &remote_settings.api_key,
            Duration::from_secs(remote_settings.request_timeout_secs),
        )
        .map_err(|e| format!("remote client init failed: {}", e))?;

        Self::with_remote(db, settings_engine, Arc::new(remote))
    }

    /// Builds the app around an existing database and remote client.
    pub fn with_remote(
        db: Arc<Database>,
        settings_engine: SettingsEngine,
        remote: Arc<dyn RemoteSyncClient>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let settings = settings_engine.get_settings().clone();

        let store = Arc::new(BookmarkStore::new(db.clone()));
        let queue = Arc::new(PendingQueue::load(Box::new(SqliteQueueStorage::new(db.clone()))));
        let orchestrator = Arc::new(SyncOrchestrator::new(
            store,
            remote.clone(),
            queue,
            settings.sync.max_attempts,
        ));
        let fetcher = PageFetcher::new(Duration::from_secs(settings.remote.request_timeout_secs))
            .map_err(|e| format!("page fetcher init failed: {}", e))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("linkshelf-sync")
            .enable_all()
            .build()?;

        Ok(Self {
            db,
            settings_engine,
            remote,
            orchestrator,
            fetcher,
            runtime,
            background: None,
            background_wanted: false,
        })
    }

    /// Runs `future` to completion on the app runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Starts the periodic drain task if it is not already running.
    /// An interval of zero disables it.
    pub fn start_background_sync(&mut self) {
        self.background_wanted = true;
        if self.background.is_some() {
            return;
        }
        let secs = self.settings_engine.get_settings().sync.drain_interval_secs;
        if secs == 0 {
            tracing::info!("periodic drain disabled");
            return;
        }
        let token = CancellationToken::new();
        let handle = {
            let _guard = self.runtime.enter();
            self.orchestrator
                .spawn_periodic_drain(Duration::from_secs(secs), token.clone())
        };
        tracing::info!(interval_secs = secs, "periodic drain started");
        self.background = Some((token, handle, secs));
    }

    /// Interval of the running periodic drain, if any.
    pub fn background_interval_secs(&self) -> Option<u64> {
        self.background.as_ref().map(|(_, _, secs)| *secs)
    }

    /// Pushes changed settings into the running components.
    ///
    /// The retry cap and drain interval apply immediately. Returns true when
    /// a changed `remote` or `storage` value only takes effect after restart.
    pub fn apply_settings(&mut self, previous: &SyncSettings) -> bool {
        let current = self.settings_engine.get_settings().clone();
        if current.sync.max_attempts != previous.sync.max_attempts {
            self.orchestrator.set_max_attempts(current.sync.max_attempts);
            tracing::info!(max_attempts = current.sync.max_attempts, "retry cap updated");
        }
        if self.background_wanted
            && self.background_interval_secs() != Some(current.sync.drain_interval_secs)
        {
            self.stop_background();
            self.start_background_sync();
        }
        let restart_required = current.remote != previous.remote || current.storage != previous.storage;
        if restart_required {
            tracing::info!("remote or storage settings changed, restart required");
        }
        restart_required
    }

    fn stop_background(&mut self) {
        if let Some((token, handle, _)) = self.background.take() {
            token.cancel();
            if let Err(e) = self.runtime.block_on(handle) {
                tracing::warn!(error = %e, "periodic drain task ended abnormally");
            }
        }
    }

    /// Stops background work and waits for the drain task to exit.
    pub fn shutdown(&mut self) {
        self.background_wanted = false;
        self.stop_background();
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some((token, _, _)) = &self.background {
            token.cancel();
        }
    }
}
