//! Remote sync client for Linkshelf.
//!
//! [`RemoteSyncClient`] is the seam between the sync core and the hosted
//! backend. Implementations make exactly one request per call and never
//! retry; retry policy belongs to the orchestrator.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::bookmark::{Bookmark, Category};
use crate::types::errors::RemoteError;

/// Request/response interface to the backend.
#[async_trait]
pub trait RemoteSyncClient: Send + Sync {
    fn has_active_session(&self) -> bool;
    /// Installs the credentials used by subsequent requests.
    fn set_session(&self, session: Session);
    fn clear_session(&self);
    async fn create_bookmark(&self, payload: &RemoteBookmark) -> Result<(), RemoteError>;
    async fn update_bookmark(&self, id: Uuid, payload: &RemoteBookmark) -> Result<(), RemoteError>;
    async fn delete_bookmark(&self, id: Uuid) -> Result<(), RemoteError>;
    async fn list_bookmarks(&self, user_id: Uuid) -> Result<Vec<RemoteBookmark>, RemoteError>;
}

/// Bookmark row as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteBookmark {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub notes: String,
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub created_at: i64,
}

impl RemoteBookmark {
    pub fn from_bookmark(bookmark: &Bookmark, user_id: Uuid) -> Self {
        Self {
            id: bookmark.id,
            user_id,
            title: bookmark.title.clone(),
            url: bookmark.url.clone(),
            notes: bookmark.notes.clone(),
            category: bookmark.category,
            tags: bookmark.tags.clone(),
            is_read: bookmark.is_read,
            is_favorite: bookmark.is_favorite,
            thumbnail_url: bookmark.thumbnail_url.clone(),
            created_at: bookmark.created_at,
        }
    }

    pub fn into_bookmark(self) -> Bookmark {
        Bookmark {
            id: self.id,
            title: self.title,
            url: self.url,
            notes: self.notes,
            category: self.category,
            tags: self.tags,
            is_read: self.is_read,
            is_favorite: self.is_favorite,
            thumbnail_url: self.thumbnail_url,
            created_at: self.created_at,
        }
        .normalized()
    }
}

/// Authenticated backend session.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub access_token: String,
}

/// Maps a reqwest transport failure onto the remote error taxonomy.
pub fn map_transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout
    } else if error.is_decode() {
        RemoteError::Decode(error.to_string())
    } else {
        RemoteError::Network(error.to_string())
    }
}

/// Maps a non-success HTTP status onto the remote error taxonomy.
pub fn error_for_status(status: u16, body: &str, id: &str) -> RemoteError {
    match status {
        401 | 403 => RemoteError::Unauthorized(body.to_string()),
        404 => RemoteError::NotFound(id.to_string()),
        409 => RemoteError::AlreadyExists(id.to_string()),
        _ => RemoteError::Server {
            status,
            message: body.to_string(),
        },
    }
}

/// `RemoteSyncClient` over a PostgREST-style HTTP API (`/rest/v1/bookmarks`).
pub struct HttpRemoteClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    session: RwLock<Option<Session>>,
}

impl HttpRemoteClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(map_transport_error)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            session: RwLock::new(None),
        })
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/bookmarks", self.base_url)
    }

    fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, RemoteError> {
        let session = self.session().ok_or(RemoteError::NoSession)?;
        Ok(self
            .client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(session.access_token))
    }

    /// Sends `builder`; non-success statuses become errors keyed by `id`.
    async fn send(&self, builder: RequestBuilder, id: &str) -> Result<reqwest::Response, RemoteError> {
        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), id, "remote request rejected");
        Err(error_for_status(status.as_u16(), &body, id))
    }

    /// Sends a mutation that returns the affected rows; an empty result is a miss.
    async fn send_returning(&self, builder: RequestBuilder, id: &str) -> Result<(), RemoteError> {
        let response = self
            .send(builder.header("Prefer", "return=representation"), id)
            .await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(());
        }
        let rows: Vec<serde_json::Value> = response.json().await.map_err(map_transport_error)?;
        if rows.is_empty() {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSyncClient for HttpRemoteClient {
    fn has_active_session(&self) -> bool {
        self.session().is_some()
    }

    fn set_session(&self, session: Session) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(session);
    }

    fn clear_session(&self) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    async fn create_bookmark(&self, payload: &RemoteBookmark) -> Result<(), RemoteError> {
        let id = payload.id.to_string();
        let builder = self
            .request(Method::POST, &self.table_url())?
            .header("Prefer", "return=minimal")
            .json(payload);
        self.send(builder, &id).await.map(|_| ())
    }

    async fn update_bookmark(&self, id: Uuid, payload: &RemoteBookmark) -> Result<(), RemoteError> {
        let url = format!("{}?id=eq.{}", self.table_url(), id);
        let builder = self.request(Method::PATCH, &url)?.json(payload);
        self.send_returning(builder, &id.to_string()).await
    }

    async fn delete_bookmark(&self, id: Uuid) -> Result<(), RemoteError> {
        let url = format!("{}?id=eq.{}", self.table_url(), id);
        let builder = self.request(Method::DELETE, &url)?;
        self.send_returning(builder, &id.to_string()).await
    }

    async fn list_bookmarks(&self, user_id: Uuid) -> Result<Vec<RemoteBookmark>, RemoteError> {
        let url = format!(
            "{}?user_id=eq.{}&order=created_at.desc",
            self.table_url(),
            user_id
        );
        let builder = self.request(Method::GET, &url)?;
        let response = self.send(builder, &user_id.to_string()).await?;
        response.json().await.map_err(map_transport_error)
    }
}
