//! Link preview extraction for Linkshelf.
//!
//! Pulls title, description, image and favicon candidates out of raw HTML
//! with tolerant pattern matching. Third-party pages are often malformed, so
//! nothing here parses the document; each field is searched independently and
//! a miss on one never affects the others.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use url::Url;

use crate::services::remote_client::map_transport_error;
use crate::types::errors::RemoteError;
use crate::types::metadata::PageMetadata;

/// Entities decoded in extracted text. `&amp;` must stay last.
const ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&#39;", "'"),
    ("&ldquo;", "\u{201C}"),
    ("&rdquo;", "\u{201D}"),
    ("&lsquo;", "\u{2018}"),
    ("&rsquo;", "\u{2019}"),
    ("&nbsp;", " "),
    ("&amp;", "&"),
];

/// Titles served to crawlers instead of the real page title.
const BOILERPLATE_TITLES: &[&str] = &[
    "browser is deprecated",
    "browser deprecated",
    "browser is no longer supported",
    "browser is not supported",
    "unsupported browser",
    "upgrade your browser",
    "update your browser",
    "javascript is not available",
    "please enable javascript",
];

fn meta_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?is)<meta\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).unwrap())
}

fn link_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?is)<link\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).unwrap())
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)([a-z][a-z0-9_:\-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
    })
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap())
}

/// Extracts every preview field from `html`, resolving URLs against `page_url`.
pub fn extract(html: &str, page_url: &str) -> PageMetadata {
    PageMetadata {
        title: extract_title(html),
        description: extract_description(html),
        image_url: extract_image(html, page_url),
        favicon_url: extract_favicon(html, page_url),
    }
}

/// `og:title`, then `twitter:title`, then the `<title>` element.
///
/// Crawler boilerplate ("please upgrade your browser") counts as absent.
pub fn extract_title(html: &str) -> Option<String> {
    meta_content(html, "og:title")
        .filter(|t| !is_boilerplate_title(t))
        .or_else(|| meta_content(html, "twitter:title").filter(|t| !is_boilerplate_title(t)))
        .or_else(|| title_element(html).filter(|t| !is_boilerplate_title(t)))
}

/// `og:description`, then `twitter:description`, then `description`.
pub fn extract_description(html: &str) -> Option<String> {
    meta_content(html, "og:description")
        .or_else(|| meta_content(html, "twitter:description"))
        .or_else(|| meta_content(html, "description"))
}

/// `og:image`, then `twitter:image`, resolved to an absolute URL.
pub fn extract_image(html: &str, page_url: &str) -> Option<String> {
    let base = Url::parse(page_url.trim()).ok();
    meta_content(html, "og:image")
        .and_then(|raw| resolve_url(base.as_ref(), &raw))
        .or_else(|| {
            meta_content(html, "twitter:image").and_then(|raw| resolve_url(base.as_ref(), &raw))
        })
}

/// First `<link rel="icon">` or `rel="shortcut icon"` href, else `{origin}/favicon.ico`.
pub fn extract_favicon(html: &str, page_url: &str) -> Option<String> {
    let base = Url::parse(page_url.trim()).ok();
    let declared = link_tag_re().find_iter(html).find_map(|tag| {
        let attrs = attributes(tag.as_str());
        let rel = attr_value(&attrs, "rel")?;
        let rel = rel.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        if rel != "icon" && rel != "shortcut icon" {
            return None;
        }
        let href = attr_value(&attrs, "href")?;
        resolve_url(base.as_ref(), href)
    });
    declared.or_else(|| base.as_ref().and_then(origin_of).map(|o| format!("{}/favicon.ico", o)))
}

/// Decodes the fixed entity set used by preview text.
pub fn decode_entities(text: &str) -> String {
    ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (entity, replacement)| acc.replace(entity, replacement))
}

/// Case-insensitive check against known crawler boilerplate titles.
pub fn is_boilerplate_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    BOILERPLATE_TITLES.iter().any(|b| lower.contains(b))
}

/// Finds the `content` of the first meta tag whose `property` or `name` is `key`.
fn meta_content(html: &str, key: &str) -> Option<String> {
    meta_tag_re().find_iter(html).find_map(|tag| {
        let attrs = attributes(tag.as_str());
        let names = ["property", "name"];
        let matches_key = names
            .iter()
            .filter_map(|n| attr_value(&attrs, n))
            .any(|v| v.trim().eq_ignore_ascii_case(key));
        if !matches_key {
            return None;
        }
        clean_text(attr_value(&attrs, "content")?)
    })
}

fn title_element(html: &str) -> Option<String> {
    let raw = title_re().captures(html)?.get(1)?.as_str();
    clean_text(raw)
}

/// Decodes entities, collapses whitespace and drops empty results.
fn clean_text(raw: &str) -> Option<String> {
    let decoded = decode_entities(raw);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Lowercased attribute names paired with their raw values, in source order.
fn attributes(tag: &str) -> Vec<(String, &str)> {
    attr_re()
        .captures_iter(tag)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_lowercase();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
            Some((name, value))
        })
        .collect()
}

fn attr_value<'a>(attrs: &[(String, &'a str)], name: &str) -> Option<&'a str> {
    attrs.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
}

fn origin_of(url: &Url) -> Option<String> {
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Resolves an extracted link: absolute http(s) URLs pass through,
/// protocol-relative ones get `https:`, paths are joined onto the origin.
fn resolve_url(base: Option<&Url>, raw: &str) -> Option<String> {
    let value = decode_entities(raw.trim());
    if value.is_empty() {
        return None;
    }
    if let Some(rest) = value.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    if let Ok(absolute) = Url::parse(&value) {
        return matches!(absolute.scheme(), "http" | "https").then_some(value);
    }
    let origin = origin_of(base?)?;
    if value.starts_with('/') {
        Some(format!("{}{}", origin, value))
    } else {
        Some(format!("{}/{}", origin, value))
    }
}

/// Downloads pages and runs the extractor over them.
pub struct PageFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl PageFetcher {
    const USER_AGENT: &'static str = concat!("linkshelf/", env!("CARGO_PKG_VERSION"));

    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(Self::USER_AGENT)
            .build()
            .map_err(map_transport_error)?;
        Ok(Self {
            client,
            max_bytes: 1024 * 1024,
        })
    }

    /// Fetches `url` and extracts its preview. Only the first megabyte is read.
    pub async fn fetch(&self, url: &str) -> Result<PageMetadata, RemoteError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Server {
                status: status.as_u16(),
                message: format!("fetching {}", url),
            });
        }
        let final_url = response.url().to_string();

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(map_transport_error)? {
            body.extend_from_slice(&chunk);
            if body.len() >= self.max_bytes {
                body.truncate(self.max_bytes);
                break;
            }
        }
        let html = String::from_utf8_lossy(&body);
        tracing::debug!(url = %final_url, bytes = body.len(), "extracting page metadata");
        Ok(extract(&html, &final_url))
    }
}
