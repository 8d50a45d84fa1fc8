//! Local Bookmark Store for Linkshelf.
//!
//! Implements `LocalBookmarkStore`, the on-device source of truth for what the
//! user sees, backed by SQLite via `rusqlite`.

use std::sync::Arc;

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::connection::Database;
use crate::services::url_canonicalizer;
use crate::types::bookmark::{Bookmark, Category};
use crate::types::errors::BookmarkError;

/// Trait defining the local bookmark store consumed by the sync core.
pub trait LocalBookmarkStore: Send + Sync {
    fn get(&self, id: Uuid) -> Result<Option<Bookmark>, BookmarkError>;
    fn upsert(&self, bookmark: &Bookmark) -> Result<(), BookmarkError>;
    /// Removes a bookmark. Returns whether a row existed.
    fn delete(&self, id: Uuid) -> Result<bool, BookmarkError>;
    /// All bookmarks, newest first.
    fn list_all(&self) -> Result<Vec<Bookmark>, BookmarkError>;
    fn find_by_dedupe_key(&self, key: &str) -> Result<Option<Bookmark>, BookmarkError>;
    fn search(&self, query: &str) -> Result<Vec<Bookmark>, BookmarkError>;
}

const SELECT_COLUMNS: &str = "SELECT id, title, url, notes, category, tags, is_read, is_favorite, \
                              thumbnail_url, created_at FROM bookmarks";

/// Bookmark store backed by the shared SQLite database.
pub struct BookmarkStore {
    db: Arc<Database>,
}

impl BookmarkStore {
    /// Creates a new `BookmarkStore` using the provided database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Reads a single `Bookmark` row into a struct.
    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        let id: String = row.get(0)?;
        let id = Uuid::parse_str(&id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let category: String = row.get(4)?;
        let tags: String = row.get(5)?;
        Ok(Bookmark {
            id,
            title: row.get(1)?,
            url: row.get(2)?,
            notes: row.get(3)?,
            category: Category::normalize(&category),
            tags: serde_json::from_str(&tags).unwrap_or_default(),
            is_read: row.get(6)?,
            is_favorite: row.get(7)?,
            thumbnail_url: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn query(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Bookmark>, BookmarkError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| BookmarkError::DatabaseError(e.to_string()))?;
        let rows = stmt
            .query_map(args, Self::row_to_bookmark)
            .map_err(|e| BookmarkError::DatabaseError(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| BookmarkError::DatabaseError(e.to_string()))?);
        }
        Ok(results)
    }
}

impl LocalBookmarkStore for BookmarkStore {
    fn get(&self, id: Uuid) -> Result<Option<Bookmark>, BookmarkError> {
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        self.db
            .connection()
            .query_row(&sql, params![id.to_string()], Self::row_to_bookmark)
            .optional()
            .map_err(|e| BookmarkError::DatabaseError(e.to_string()))
    }

    /// Inserts or replaces a bookmark, refreshing its dedupe key.
    fn upsert(&self, bookmark: &Bookmark) -> Result<(), BookmarkError> {
        if bookmark.url.trim().is_empty() {
            return Err(BookmarkError::InvalidUrl(bookmark.url.clone()));
        }
        let tags = serde_json::to_string(&bookmark.tags)
            .map_err(|e| BookmarkError::DatabaseError(e.to_string()))?;
        let dedupe_key = url_canonicalizer::dedupe_key(&bookmark.url);

        self.db
            .connection()
            .execute(
                "INSERT INTO bookmarks (id, title, url, notes, category, tags, is_read, is_favorite, \
                 thumbnail_url, created_at, dedupe_key) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
                 ON CONFLICT(id) DO UPDATE SET title = excluded.title, url = excluded.url, \
                 notes = excluded.notes, category = excluded.category, tags = excluded.tags, \
                 is_read = excluded.is_read, is_favorite = excluded.is_favorite, \
                 thumbnail_url = excluded.thumbnail_url, dedupe_key = excluded.dedupe_key",
                params![
                    bookmark.id.to_string(),
                    bookmark.title,
                    bookmark.url,
                    bookmark.notes,
                    bookmark.category.as_key(),
                    tags,
                    bookmark.is_read,
                    bookmark.is_favorite,
                    bookmark.thumbnail_url,
                    bookmark.created_at,
                    dedupe_key,
                ],
            )
            .map_err(|e| BookmarkError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<bool, BookmarkError> {
        let affected = self
            .db
            .connection()
            .execute("DELETE FROM bookmarks WHERE id = ?1", params![id.to_string()])
            .map_err(|e| BookmarkError::DatabaseError(e.to_string()))?;
        Ok(affected > 0)
    }

    fn list_all(&self) -> Result<Vec<Bookmark>, BookmarkError> {
        let sql = format!("{} ORDER BY created_at DESC, rowid DESC", SELECT_COLUMNS);
        self.query(&sql, params![])
    }

    fn find_by_dedupe_key(&self, key: &str) -> Result<Option<Bookmark>, BookmarkError> {
        let sql = format!("{} WHERE dedupe_key = ?1 ORDER BY created_at LIMIT 1", SELECT_COLUMNS);
        Ok(self.query(&sql, params![key])?.into_iter().next())
    }

    /// Searches title, URL and notes using SQL LIKE.
    fn search(&self, query: &str) -> Result<Vec<Bookmark>, BookmarkError> {
        let pattern = format!("%{}%", query);
        let sql = format!(
            "{} WHERE title LIKE ?1 OR url LIKE ?1 OR notes LIKE ?1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        );
        self.query(&sql, params![pattern])
    }
}
