//! Tests for the SQLite-backed local bookmark store.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use linkshelf::database::Database;
use linkshelf::managers::bookmark_store::{BookmarkStore, LocalBookmarkStore};
use linkshelf::services::url_canonicalizer::dedupe_key;
use linkshelf::types::bookmark::Category;
use linkshelf::types::errors::BookmarkError;
use tempfile::TempDir;
use uuid::Uuid;

use common::sample_bookmark;

fn store() -> BookmarkStore {
    BookmarkStore::new(Arc::new(Database::open_in_memory().unwrap()))
}

#[test]
fn test_upsert_then_get_roundtrips_every_field() {
    let store = store();
    let mut bookmark = sample_bookmark("https://example.com/a");
    bookmark.notes = "read later".to_string();
    bookmark.category = Category::Article;
    bookmark.tags = vec!["rust".to_string(), "async".to_string()];
    bookmark.is_read = true;
    bookmark.thumbnail_url = Some("https://example.com/t.png".to_string());

    store.upsert(&bookmark).unwrap();
    assert_eq!(store.get(bookmark.id).unwrap(), Some(bookmark));
}

#[test]
fn test_get_missing_returns_none() {
    assert_eq!(store().get(Uuid::new_v4()).unwrap(), None);
}

#[test]
fn test_upsert_replaces_existing_row() {
    let store = store();
    let mut bookmark = sample_bookmark("https://example.com/a");
    store.upsert(&bookmark).unwrap();

    bookmark.title = "Renamed".to_string();
    bookmark.is_favorite = true;
    store.upsert(&bookmark).unwrap();

    let all = store.list_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "Renamed");
    assert!(all[0].is_favorite);
}

#[test]
fn test_upsert_rejects_empty_url() {
    let store = store();
    let bookmark = sample_bookmark("   ");
    assert!(matches!(store.upsert(&bookmark), Err(BookmarkError::InvalidUrl(_))));
}

#[test]
fn test_delete_reports_whether_a_row_existed() {
    let store = store();
    let bookmark = sample_bookmark("https://example.com/a");
    store.upsert(&bookmark).unwrap();

    assert!(store.delete(bookmark.id).unwrap());
    assert!(!store.delete(bookmark.id).unwrap());
    assert_eq!(store.get(bookmark.id).unwrap(), None);
}

#[test]
fn test_list_all_is_newest_first() {
    let store = store();
    let mut old = sample_bookmark("https://example.com/old");
    old.created_at = 100;
    let mut new = sample_bookmark("https://example.com/new");
    new.created_at = 200;
    store.upsert(&old).unwrap();
    store.upsert(&new).unwrap();

    let urls: Vec<String> = store.list_all().unwrap().into_iter().map(|b| b.url).collect();
    assert_eq!(urls, vec!["https://example.com/new", "https://example.com/old"]);
}

#[test]
fn test_find_by_dedupe_key_matches_aliases() {
    let store = store();
    let bookmark = sample_bookmark("https://twitter.com/jack/status/20");
    store.upsert(&bookmark).unwrap();

    let found = store
        .find_by_dedupe_key(&dedupe_key("https://x.com/other/status/20?utm_source=a"))
        .unwrap();
    assert_eq!(found.map(|b| b.id), Some(bookmark.id));

    assert_eq!(store.find_by_dedupe_key("tweet:21").unwrap(), None);
}

#[test]
fn test_search_covers_title_url_and_notes() {
    let store = store();
    let mut a = sample_bookmark("https://example.com/rust-book");
    a.title = "The Book".to_string();
    let mut b = sample_bookmark("https://example.com/other");
    b.title = "Ferris Facts".to_string();
    let mut c = sample_bookmark("https://example.com/third");
    c.notes = "mentions rust in passing".to_string();
    for bookmark in [&a, &b, &c] {
        store.upsert(bookmark).unwrap();
    }

    let mut hits: Vec<Uuid> = store.search("rust").unwrap().into_iter().map(|b| b.id).collect();
    hits.sort();
    let mut expected = vec![a.id, c.id];
    expected.sort();
    assert_eq!(hits, expected);

    assert_eq!(store.search("ferris").unwrap().len(), 1);
    assert!(store.search("nothing-matches").unwrap().is_empty());
}

#[test]
fn test_store_persists_on_disk() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("store.db");
    let bookmark = sample_bookmark("https://example.com/a");

    {
        let store = BookmarkStore::new(Arc::new(Database::open(&path).unwrap()));
        store.upsert(&bookmark).unwrap();
    }

    let store = BookmarkStore::new(Arc::new(Database::open(&path).unwrap()));
    assert_eq!(store.get(bookmark.id).unwrap(), Some(bookmark));
}
