//! URL canonicalization for Linkshelf.
//!
//! Normalizes links into a comparable form and derives the dedupe key used to
//! decide whether two saved links are the same bookmark. Nothing here returns
//! an error: unparseable input degrades to its trimmed, lowercased text.

use url::{form_urlencoded, Url};

use crate::types::bookmark::Category;

/// Query parameters that only carry campaign tracking.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "igshid",
];

/// Hosts serving the same status posts under different names.
const STATUS_HOSTS: &[&str] = &[
    "twitter.com",
    "x.com",
    "mobile.twitter.com",
    "mobile.x.com",
    "m.twitter.com",
];

const STATUS_KEY_PREFIX: &str = "tweet:";

/// Host to category table, checked in order.
const CATEGORY_HOSTS: &[(&str, Category)] = &[
    ("twitter.com", Category::X),
    ("x.com", Category::X),
    ("instagram.com", Category::Instagram),
    ("youtube.com", Category::Youtube),
    ("youtu.be", Category::Youtube),
    ("medium.com", Category::Article),
    ("dev.to", Category::Article),
    ("substack.com", Category::Article),
    ("vimeo.com", Category::Video),
    ("dailymotion.com", Category::Video),
    ("tiktok.com", Category::Video),
];

/// Normalizes a URL string for stable equality comparison.
///
/// Lowercases scheme and host, strips `www.`, drops default ports, trailing
/// slashes, the fragment and tracking parameters, and sorts the remaining
/// query parameters by name then value. The root path is emitted as the bare
/// origin (`https://example.com`).
pub fn canonicalize(input: &str) -> String {
    let trimmed = input.trim();
    let fallback = || trimmed.to_lowercase();

    let url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => return fallback(),
    };
    let host = match url.host_str() {
        Some(host) if !host.is_empty() => strip_www(&host.to_lowercase()).to_string(),
        _ => return fallback(),
    };

    let mut out = String::with_capacity(trimmed.len());
    out.push_str(&url.scheme().to_lowercase());
    out.push_str("://");
    if !url.username().is_empty() {
        out.push_str(url.username());
        if let Some(password) = url.password() {
            out.push(':');
            out.push_str(password);
        }
        out.push('@');
    }
    out.push_str(&host);
    // `Url` already omits the scheme's default port.
    if let Some(port) = url.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(url.path().trim_end_matches('/'));

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !is_tracking_param(name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    if !pairs.is_empty() {
        pairs.sort();
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish();
        out.push('?');
        out.push_str(&query);
    }

    if Url::parse(&out).is_err() {
        return fallback();
    }
    out
}

/// Returns the identity used to decide whether two links are the same bookmark.
///
/// Status links on any alias host collapse to `tweet:<id>`; everything else
/// uses the canonical URL.
pub fn dedupe_key(input: &str) -> String {
    let canonical = canonicalize(input);
    match status_id(&canonical) {
        Some(id) => format!("{}{}", STATUS_KEY_PREFIX, id),
        None => canonical,
    }
}

/// Whether two links resolve to the same dedupe key.
pub fn is_same_link(a: &str, b: &str) -> bool {
    dedupe_key(a) == dedupe_key(b)
}

/// Suggests a category from the link's host, if it is a known service.
pub fn suggest_category(input: &str) -> Option<Category> {
    let url = Url::parse(input.trim()).ok()?;
    let host = url.host_str()?.to_lowercase();
    let host = strip_www(&host);
    CATEGORY_HOSTS
        .iter()
        .find(|(domain, _)| host_matches(host, domain))
        .map(|(_, category)| *category)
}

/// Extracts the numeric status id from a canonical status URL.
///
/// The first `status`/`statuses` segment followed by an all-digit segment wins.
/// Path matching is case-sensitive.
fn status_id(canonical: &str) -> Option<String> {
    let url = Url::parse(canonical).ok()?;
    let host = url.host_str()?;
    if !STATUS_HOSTS.contains(&host) {
        return None;
    }
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    segments.windows(2).find_map(|pair| {
        let is_status = pair[0] == "status" || pair[0] == "statuses";
        (is_status && is_numeric(pair[1])).then(|| pair[1].to_string())
    })
}

fn strip_www(host: &str) -> &str {
    let mut host = host;
    while let Some(rest) = host.strip_prefix("www.") {
        if rest.is_empty() {
            break;
        }
        host = rest;
    }
    host
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .map_or(false, |prefix| prefix.ends_with('.'))
}

fn is_tracking_param(name: &str) -> bool {
    TRACKING_PARAMS.iter().any(|p| p.eq_ignore_ascii_case(name))
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}
