//! RPC method handler for the Linkshelf JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be tested without stdin/stdout.
//! `handle_method` dispatches one call to the orchestrator, the URL and
//! metadata services or the settings engine via the `App` struct.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::App;
use crate::services::metadata_extractor;
use crate::services::remote_client::Session;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::services::url_canonicalizer;
use crate::types::bookmark::{Bookmark, NewBookmark};

fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, String> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", name))
}

fn id_param(params: &Value, name: &str) -> Result<Uuid, String> {
    let raw = str_param(params, name)?;
    Uuid::parse_str(raw).map_err(|e| format!("invalid {}: {}", name, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// Dispatch a JSON-RPC method call.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Bookmarks ───
        "bookmark.save" => {
            let draft: NewBookmark = serde_json::from_value(params.clone())
                .map_err(|e| format!("invalid bookmark: {}", e))?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let (bookmark, outcome) = a
                .block_on(a.orchestrator.save_link(draft))
                .map_err(|e| e.to_string())?;
            Ok(json!({"bookmark": to_json(&bookmark)?, "sync": to_json(&outcome)?}))
        }
        "bookmark.update" => {
            let raw = params.get("bookmark").cloned().ok_or("missing bookmark")?;
            let bookmark: Bookmark =
                serde_json::from_value(raw).map_err(|e| format!("invalid bookmark: {}", e))?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let (bookmark, outcome) = a
                .block_on(a.orchestrator.update_bookmark(bookmark))
                .map_err(|e| e.to_string())?;
            Ok(json!({"bookmark": to_json(&bookmark)?, "sync": to_json(&outcome)?}))
        }
        "bookmark.toggle_read" | "bookmark.toggle_favorite" => {
            let id = id_param(params, "id")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let result = if method == "bookmark.toggle_read" {
                a.block_on(a.orchestrator.toggle_read(id))
            } else {
                a.block_on(a.orchestrator.toggle_favorite(id))
            };
            let (bookmark, outcome) = result.map_err(|e| e.to_string())?;
            Ok(json!({"bookmark": to_json(&bookmark)?, "sync": to_json(&outcome)?}))
        }
        "bookmark.delete" => {
            let id = id_param(params, "id")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let outcome = a
                .block_on(a.orchestrator.delete_bookmark(id))
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "sync": to_json(&outcome)?}))
        }
        "bookmark.get" => {
            let id = id_param(params, "id")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let bookmark = a.orchestrator.store().get(id).map_err(|e| e.to_string())?;
            to_json(&bookmark)
        }
        "bookmark.list" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let bookmarks = a.orchestrator.store().list_all().map_err(|e| e.to_string())?;
            to_json(&bookmarks)
        }
        "bookmark.search" => {
            let query = str_param(params, "query")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let bookmarks = a.orchestrator.store().search(query).map_err(|e| e.to_string())?;
            to_json(&bookmarks)
        }

        // ─── URLs & previews ───
        "url.canonicalize" => {
            let url = str_param(params, "url")?;
            Ok(json!({"url": url_canonicalizer::canonicalize(url)}))
        }
        "url.dedupe_key" => {
            let url = str_param(params, "url")?;
            Ok(json!({"key": url_canonicalizer::dedupe_key(url)}))
        }
        "url.suggest_category" => {
            let url = str_param(params, "url")?;
            Ok(json!({"category": url_canonicalizer::suggest_category(url)}))
        }
        "metadata.extract" => {
            let url = str_param(params, "url")?;
            let metadata = match params.get("html").and_then(|v| v.as_str()) {
                Some(html) => metadata_extractor::extract(html, url),
                None => {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        return Err("invalid url: must start with http:// or https://".to_string());
                    }
                    let a = app.lock().map_err(|e| e.to_string())?;
                    a.block_on(a.fetcher.fetch(url)).map_err(|e| e.to_string())?
                }
            };
            to_json(&metadata)
        }

        // ─── Session ───
        "session.sign_in" => {
            let user_id = id_param(params, "user_id")?;
            let access_token = str_param(params, "access_token")?.to_string();
            let a = app.lock().map_err(|e| e.to_string())?;
            a.remote.set_session(Session { user_id, access_token });
            let report = a
                .block_on(a.orchestrator.sign_in(user_id))
                .map_err(|e| e.to_string())?;
            to_json(&report)
        }
        "session.sign_out" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            a.remote.clear_session();
            a.orchestrator.sign_out().map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Sync ───
        "sync.drain" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let report = a
                .block_on(a.orchestrator.drain_pending())
                .map_err(|e| e.to_string())?;
            to_json(&report)
        }
        "sync.status" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            to_json(&a.orchestrator.status())
        }
        "sync.pull" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let written = a
                .block_on(a.orchestrator.pull_remote())
                .map_err(|e| e.to_string())?;
            Ok(json!({"written": written}))
        }

        // ─── Settings ───
        "settings.get" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            to_json(a.settings_engine.get_settings())
        }
        "settings.set" => {
            let key = str_param(params, "key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let previous = a.settings_engine.get_settings().clone();
            a.settings_engine.set_value(key, value).map_err(|e| e.to_string())?;
            let restart_required = a.apply_settings(&previous);
            Ok(json!({"ok": true, "restart_required": restart_required}))
        }
        "settings.reset" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let previous = a.settings_engine.get_settings().clone();
            a.settings_engine.reset().map_err(|e| e.to_string())?;
            let restart_required = a.apply_settings(&previous);
            Ok(json!({"ok": true, "restart_required": restart_required}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
