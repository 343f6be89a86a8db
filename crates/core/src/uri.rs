//! URL normalisation, resolution and archival naming.
//!
//! Every URL that enters the store or an archive goes through this module:
//! [`normalize`] canonicalises bookmark URLs, [`to_absolute`] resolves links
//! found in a page, and [`archival_name`] derives the stable key a resource is
//! stored under inside an archive.
//!
//! # Example
//!
//! ```rust
//! use shelfmark_core::uri::{archival_name, normalize};
//!
//! let url = normalize("https://ex.com/a?utm_source=x&q=1#frag").unwrap();
//! assert_eq!(url, "https://ex.com/a?q=1");
//! assert_eq!(archival_name(&url), "https-ex.com-a-q=1");
//! ```

use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use url::{Position, Url, form_urlencoded};

use crate::{Result, ShelfmarkError};

/// Bucket name of the page an archive was created from.
pub const ARCHIVE_ROOT: &str = "archive-root";

static HTTP_SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^https?://").expect("valid regex"));
static DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("valid regex"));

/// Whether `s` starts with an `http://` or `https://` scheme.
pub fn is_http_url(s: &str) -> bool {
    HTTP_SCHEME.is_match(s)
}

/// Parses `raw` and checks it is an http(s) URL with a host.
pub fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| ShelfmarkError::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ShelfmarkError::InvalidUrl(format!("{raw}: scheme must be http or https")));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ShelfmarkError::InvalidUrl(format!("{raw}: missing host")));
    }
    Ok(url)
}

/// Canonical form of a bookmark URL.
///
/// Drops the fragment and every query parameter whose key starts with
/// `utm_`. Remaining parameters are sorted by key; a parameter with an empty
/// value is written without `=`.
///
/// # Errors
///
/// Returns [`ShelfmarkError::InvalidUrl`] unless the URL is http(s) with a host.
pub fn normalize(raw: &str) -> Result<String> {
    let mut url = parse_http_url(raw)?;
    clean_url(&mut url);
    Ok(url.to_string())
}

fn clean_url(url: &mut Url) {
    url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !k.starts_with("utm_"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if pairs.is_empty() {
        url.set_query(None);
        return;
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let query = pairs
        .iter()
        .map(|(k, v)| {
            let key: String = form_urlencoded::byte_serialize(k.as_bytes()).collect();
            if v.is_empty() {
                key
            } else {
                let value: String = form_urlencoded::byte_serialize(v.as_bytes()).collect();
                format!("{key}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join("&");
    url.set_query(Some(&query));
}

/// Resolves `href` against `base`.
///
/// Fragments (`#...`), `data:` URIs and URLs that already carry a scheme are
/// returned unchanged. An empty `href` yields an empty string.
pub fn to_absolute(href: &str, base: &Url) -> String {
    if href.is_empty() {
        return String::new();
    }
    if href.starts_with('#') || href.starts_with("data:") {
        return href.to_string();
    }
    if Url::parse(href).is_ok_and(|u| u.has_host()) {
        return href.to_string();
    }
    match base.join(href) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Filesystem-safe key for `absolute_url` inside an archive.
///
/// The query and path are unescaped first so the name matches the URL a
/// browser would request. Then `://` becomes `/`, every `:`, `?`, `#`, `/`
/// and space becomes `-`, and runs of `-` collapse into one.
pub fn archival_name(absolute_url: &str) -> String {
    let trimmed = absolute_url.trim().trim_end_matches('/').replace(' ', "+");

    let decoded = match Url::parse(&trimmed) {
        Ok(url) if url.has_host() => {
            let mut s = url[..Position::BeforePath].to_string();
            s.push_str(&percent_decode_str(url.path()).decode_utf8_lossy());
            if let Some(query) = url.query() {
                let unescaped = percent_decode_str(&query.replace('+', " ")).decode_utf8_lossy().into_owned();
                s.push('?');
                s.push_str(if unescaped.is_empty() { query } else { &unescaped });
            }
            if let Some(fragment) = url.fragment() {
                s.push('#');
                s.push_str(fragment);
            }
            s.trim_end_matches('/').to_string()
        }
        _ => trimmed,
    };

    let name = decoded
        .replace("://", "/")
        .replace([':', '?', '#', '/', ' '], "-");
    DASHES.replace_all(&name, "-").trim_end_matches('/').to_string()
}

/// Validates a subresource reference found in a page and resolves it.
///
/// Returns the normalised absolute URL and its archival name. References
/// that are empty, bare fragments, or carry a non-http(s) scheme (such as
/// `data:` or `javascript:`) are rejected.
///
/// # Errors
///
/// Returns [`ShelfmarkError::InvalidUrl`] for rejected references.
pub fn create_resource(raw: &str, base: Option<&Url>) -> Result<(String, String)> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') || (raw.contains(':') && !is_http_url(raw)) {
        return Err(ShelfmarkError::InvalidUrl(raw.to_string()));
    }

    let mut url = match base {
        Some(base) => base.join(raw).map_err(|e| ShelfmarkError::InvalidUrl(format!("{raw}: {e}")))?,
        None => parse_http_url(raw)?,
    };
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(ShelfmarkError::InvalidUrl(raw.to_string()));
    }
    clean_url(&mut url);

    let absolute = url.to_string();
    let name = archival_name(&absolute);
    Ok((absolute, name))
}
