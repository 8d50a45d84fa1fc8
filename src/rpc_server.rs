//! Linkshelf RPC server: JSON-RPC over stdin/stdout for the client shells.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmark.save", "params":{"url":"...","title":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! Logs go to stderr; stdout carries only protocol lines.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;

use linkshelf::app::App;
use linkshelf::platform;
use linkshelf::rpc_handler::handle_method;
use linkshelf::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

/// Fixed-window limiter over all incoming requests.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn write_line(out: &mut impl Write, value: &Value) -> io::Result<()> {
    writeln!(out, "{}", value)?;
    out.flush()
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("linkshelf=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_app() -> Result<App, Box<dyn std::error::Error>> {
    let settings_path = platform::get_settings_path();
    let mut settings_engine = SettingsEngine::new(Some(settings_path.to_string_lossy().to_string()));
    if let Err(e) = settings_engine.load() {
        tracing::warn!(error = %e, path = %settings_path.display(), "using default settings");
    }

    let db_path = platform::get_data_dir().join(&settings_engine.get_settings().storage.database_file);
    tracing::info!(db = %db_path.display(), "opening database");

    let mut app = App::new(&db_path, settings_engine)?;
    app.start_background_sync();
    Ok(app)
}

fn main() -> ExitCode {
    init_logging();

    let app = match build_app() {
        Ok(app) => Mutex::new(app),
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize linkshelf");
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let ready = json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")});
    if write_line(&mut out, &ready).is_err() {
        return ExitCode::FAILURE;
    }

    let mut rate_limiter = RateLimiter::new(200);

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Err(e) => json!({"id": null, "error": format!("parse error: {}", e)}),
            Ok(req) => {
                let id = req.get("id").cloned().unwrap_or(Value::Null);
                if !rate_limiter.check() {
                    json!({"id": id, "error": "rate limit exceeded"})
                } else {
                    let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
                    let params = req.get("params").cloned().unwrap_or(json!({}));
                    tracing::debug!(method, "rpc request");
                    match handle_method(&app, method, &params) {
                        Ok(val) => json!({"id": id, "result": val}),
                        Err(err) => json!({"id": id, "error": err}),
                    }
                }
            }
        };
        if write_line(&mut out, &response).is_err() {
            break;
        }
    }

    if let Ok(mut app) = app.into_inner() {
        app.shutdown();
    }
    tracing::info!("rpc server stopped");
    ExitCode::SUCCESS
}
