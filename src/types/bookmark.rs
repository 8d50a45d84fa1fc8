use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Represents a saved link.
///
/// This is also the snapshot carried by queued create/update operations,
/// so its serialized form is part of the persisted queue format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: Uuid,
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
    #[serde(default, rename = "thumbnailURL")]
    pub thumbnail_url: Option<String>,
    pub created_at: i64,
}

/// User input for a new bookmark, before an id is assigned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBookmark {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub notes: String,
    /// Free-text category; normalized on save. When absent the category is
    /// suggested from the URL.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// Canonical bookmark categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[default]
    General,
    X,
    Instagram,
    Youtube,
    Article,
    Video,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::General,
        Category::X,
        Category::Instagram,
        Category::Youtube,
        Category::Article,
        Category::Video,
    ];

    /// Returns the canonical storage key.
    pub fn as_key(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::X => "x",
            Category::Instagram => "instagram",
            Category::Youtube => "youtube",
            Category::Article => "article",
            Category::Video => "video",
        }
    }

    /// Maps any stored or user-entered value onto a canonical category.
    ///
    /// Matching is case-insensitive. Legacy labels such as `"Twitter"` or
    /// `"X (Twitter)"` map to [`Category::X`]; anything unrecognised falls
    /// back to [`Category::General`].
    pub fn normalize(raw: &str) -> Category {
        let key = raw.trim().to_lowercase();
        match key.as_str() {
            "x" | "twitter" | "x (twitter)" | "x/twitter" | "tweet" | "tweets" => Category::X,
            "instagram" | "ig" => Category::Instagram,
            "youtube" | "yt" => Category::Youtube,
            "article" | "articles" => Category::Article,
            "video" | "videos" => Category::Video,
            _ => Category::General,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_key())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Category::normalize(&raw))
    }
}

/// Convenience wrapper over [`Category::normalize`] returning the storage key.
pub fn normalize_category(raw: &str) -> &'static str {
    Category::normalize(raw).as_key()
}

/// Lowercases and trims tags, dropping empties and later duplicates.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

impl Bookmark {
    /// Re-applies the field invariants after an edit coming from outside the core.
    pub fn normalized(mut self) -> Self {
        self.url = self.url.trim().to_string();
        self.tags = normalize_tags(&self.tags);
        self
    }
}
