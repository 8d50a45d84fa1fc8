use serde::{Deserialize, Serialize};

/// Best-effort preview data pulled out of a page.
///
/// Every field is optional; a missing field means no usable candidate was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub favicon_url: Option<String>,
}
