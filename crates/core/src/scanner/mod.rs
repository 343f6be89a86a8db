//! Stylesheet and script scanners used by the archiver.
//!
//! Both scanners walk their input token by token, copy everything through
//! unchanged except URL references, and replace each reference with the
//! archival name of the resource it points to. The references themselves are
//! returned as [`Resource`]s so the archiver can fetch them.
//!
//! # Example
//!
//! ```rust
//! use shelfmark_core::scanner::scan_css;
//! use url::Url;
//!
//! let base = Url::parse("https://ex.com/css/site.css").unwrap();
//! let out = scan_css("body { background: url('../img/bg.png') }", &base);
//! assert_eq!(out.text, r#"body { background: url("https-ex.com-img-bg.png") }"#);
//! assert_eq!(out.resources[0].url, "https://ex.com/img/bg.png");
//! ```

mod css;
mod js;

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::model::Resource;
use crate::uri::create_resource;

pub use css::scan_css;
pub use js::scan_js;

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)^url\((.+)\)$").expect("valid regex"));

/// Rewritten text plus every resource referenced from it, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutput {
    pub text: String,
    pub resources: Vec<Resource>,
}

/// `url(...)` contents without the wrapper, surrounding blanks or quotes.
pub(crate) fn unwrap_css_url(token: &str) -> &str {
    match CSS_URL.captures(token).and_then(|c| c.get(1)) {
        Some(inner) => trim_quotes(inner.as_str().trim()),
        None if token.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("url(")) => "",
        None => trim_quotes(token.trim()),
    }
}

pub(crate) fn trim_quotes(s: &str) -> &str {
    s.trim_matches('\'').trim_matches('"')
}

/// Resolves `raw` against `base` into a resource, `None` for references that cannot be archived.
pub(crate) fn resolve(raw: &str, base: &Url) -> Option<Resource> {
    create_resource(raw, Some(base)).ok().map(|(url, name)| Resource::new(url, name))
}
