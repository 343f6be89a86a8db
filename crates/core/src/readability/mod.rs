//! Main content extraction API.
//!
//! This module isolates the article-like part of an HTML page and returns it
//! scrubbed, together with its metadata. The main entry point is the
//! [`Readability`] struct, along with the convenience functions
//! [`parse_with_url`] and [`is_probably_readable`].
//!
//! Extraction runs in four stages:
//!
//! 1. preparation: scripts, styles and comments go, `<br>` runs become
//!    paragraphs and lazy `<noscript>` images are unwrapped;
//! 2. metadata: `<meta>` tags, the document title and the favicon;
//! 3. candidate selection: paragraphs are scored and their scores flow up to
//!    their ancestors, the best ancestor and its related siblings win;
//! 4. cleanup: junk inside the winner is removed and links made absolute.
//!
//! When stage 3 yields too little text it is retried with the unlikely-node
//! filter, then class weighting, then conditional cleaning switched off.
//!
//! # Example
//!
//! ```rust
//! use shelfmark_core::readability::parse_with_url;
//!
//! let para = "<p>Widgets are small, useful, and surprisingly hard to build well.</p>".repeat(12);
//! let html = format!("<html><head><title>On Widgets</title></head><body><article>{para}</article></body></html>");
//! let article = parse_with_url(&html, "https://example.com/widgets").unwrap();
//! assert_eq!(article.title, "On Widgets");
//! assert!(article.length > 500);
//! ```

mod clean;
mod grab;
pub mod images;
pub mod metadata;
mod prep;
pub mod read_time;
mod readable;
mod regexps;
pub mod scoring;

use std::collections::{HashMap, HashSet};

use tracing::debug;
use url::Url;

use crate::article::{Article, ReadableNode};
use crate::dom::{Dom, NodeId};
use crate::{Result, ShelfmarkError};

pub use images::{fix_lazy_images, fix_relative_uris};
pub use metadata::Metadata;
pub use read_time::estimate_read_time;
pub use readable::is_probably_readable;

/// Configuration for the Readability builder.
///
/// # Example
///
/// ```rust
/// use shelfmark_core::ReadabilityConfig;
///
/// let config = ReadabilityConfig::builder()
///     .char_threshold(250)
///     .keep_classes(true)
///     .build();
/// assert_eq!(config.nb_top_candidates, 5);
/// ```
#[derive(Debug, Clone)]
pub struct ReadabilityConfig {
    /// Minimum character count for a successful attempt (default: 500).
    pub char_threshold: usize,

    /// Number of top candidates compared when looking for a shared ancestor (default: 5).
    pub nb_top_candidates: usize,

    /// Maximum elements to parse (0 = unlimited, default: 0).
    pub max_elems_to_parse: usize,

    /// Whether to keep class attributes in output HTML (default: false).
    pub keep_classes: bool,

    /// Classes kept even when `keep_classes` is off (default: `["page"]`).
    pub classes_to_preserve: Vec<String>,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            char_threshold: 500,
            nb_top_candidates: 5,
            max_elems_to_parse: 0,
            keep_classes: false,
            classes_to_preserve: vec!["page".to_string()],
        }
    }
}

impl ReadabilityConfig {
    /// Creates a new builder for ReadabilityConfig.
    pub fn builder() -> ReadabilityConfigBuilder {
        ReadabilityConfigBuilder::new()
    }
}

/// Builder for ReadabilityConfig.
pub struct ReadabilityConfigBuilder {
    config: ReadabilityConfig,
}

impl ReadabilityConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ReadabilityConfig::default() }
    }

    /// Sets the character threshold.
    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.char_threshold = value;
        self
    }

    /// Sets the number of top candidates.
    pub fn nb_top_candidates(mut self, value: usize) -> Self {
        self.config.nb_top_candidates = value;
        self
    }

    /// Sets the maximum elements to parse.
    pub fn max_elems_to_parse(mut self, value: usize) -> Self {
        self.config.max_elems_to_parse = value;
        self
    }

    /// Sets whether to preserve class attributes in output HTML.
    pub fn keep_classes(mut self, value: bool) -> Self {
        self.config.keep_classes = value;
        self
    }

    /// Adds a class that survives class stripping.
    pub fn preserve_class(mut self, class: impl Into<String>) -> Self {
        self.config.classes_to_preserve.push(class.into());
        self
    }

    /// Builds the config.
    pub fn build(self) -> ReadabilityConfig {
        self.config
    }
}

impl Default for ReadabilityConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Main entry point for content extraction.
///
/// # Example
///
/// ```rust
/// use shelfmark_core::Readability;
///
/// let reader = Readability::new();
/// let html = "<html><body><p>too short</p></body></html>";
/// assert!(reader.parse_with_url(html, "https://example.com").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Readability {
    config: ReadabilityConfig,
}

impl Readability {
    /// Creates a new Readability instance with default settings.
    pub fn new() -> Self {
        Self { config: ReadabilityConfig::default() }
    }

    /// Creates a new Readability instance with a custom configuration.
    pub fn with_config(config: ReadabilityConfig) -> Self {
        Self { config }
    }

    /// Extracts the article of `html`, resolving links against `url`.
    ///
    /// # Arguments
    ///
    /// * `html` - The HTML content to parse
    /// * `url` - The page URL, used as base for relative links
    ///
    /// # Errors
    ///
    /// Returns [`ShelfmarkError::InvalidUrl`] if the URL does not parse and
    /// [`ShelfmarkError::NoReadableContent`] when every attempt came up empty
    /// or the document exceeds `max_elems_to_parse`.
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Article> {
        let base = Url::parse(url).map_err(|e| ShelfmarkError::InvalidUrl(format!("{url}: {e}")))?;
        let mut doc = Dom::parse(html);

        if self.config.max_elems_to_parse > 0 {
            let elements = doc.get_elements_by_tag_name(doc.document(), "*").len();
            if elements > self.config.max_elems_to_parse {
                debug!(elements, limit = self.config.max_elems_to_parse, "document too large");
                return Err(ShelfmarkError::NoReadableContent);
            }
        }

        prep::prep_document(&mut doc);
        let metadata = metadata::get_article_metadata(&doc, &base);

        let mut parser = Parser::new(&self.config, base, metadata.title.clone());
        let (mut dom, content) = parser.grab_article(&doc).ok_or(ShelfmarkError::NoReadableContent)?;
        parser.post_process_content(&mut dom, content);

        let mut excerpt = metadata.excerpt;
        if excerpt.is_empty()
            && let Some(&p) = dom.get_elements_by_tag_name(content, "p").first()
        {
            excerpt = dom.text_content(p).trim().to_string();
        }
        let excerpt = excerpt.split_whitespace().collect::<Vec<_>>().join(" ");

        let byline = if metadata.byline.is_empty() { parser.article_byline.clone() } else { metadata.byline };
        let title = if metadata.title.contains('\u{FFFD}') { url.to_string() } else { metadata.title };

        let text_content = dom.text_content(content).trim().to_string();
        let images = dom.get_elements_by_tag_name(content, "img").len();
        let (min_read_time, max_read_time) = estimate_read_time(&text_content, images);
        let html_content = dom.inner_html(content);
        let root = dom.first_element_child(content);

        Ok(Article {
            title,
            byline,
            excerpt,
            site_name: metadata.site_name,
            image: metadata.image,
            favicon: metadata.favicon,
            language: metadata.language,
            text_direction: metadata.text_direction,
            length: text_content.chars().count(),
            content: html_content,
            text_content,
            min_read_time,
            max_read_time,
            node: root.map(|root| ReadableNode { dom, root }),
        })
    }

    /// Checks if content appears readable without full extraction.
    pub fn is_probably_readable(&self, html: &str) -> bool {
        readable::is_probably_readable(html)
    }
}

/// Convenience function for one-liner extraction with defaults.
///
/// # Errors
///
/// See [`Readability::parse_with_url`].
pub fn parse_with_url(html: &str, url: &str) -> Result<Article> {
    Readability::new().parse_with_url(html, url)
}

/// Heuristics switched off one by one on retry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Flags {
    pub strip_unlikelys: bool,
    pub use_weight_classes: bool,
    pub clean_conditionally: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self { strip_unlikelys: true, use_weight_classes: true, clean_conditionally: true }
    }
}

/// State of one extraction run.
///
/// Scores and data-table marks live in side tables keyed by [`NodeId`], so
/// the tree never carries bookkeeping attributes. Both tables are reset at
/// the start of every attempt.
pub(crate) struct Parser<'a> {
    config: &'a ReadabilityConfig,
    base: Url,
    article_title: String,
    article_byline: String,
    flags: Flags,
    scores: HashMap<NodeId, f64>,
    data_tables: HashSet<NodeId>,
}

impl<'a> Parser<'a> {
    fn new(config: &'a ReadabilityConfig, base: Url, article_title: String) -> Self {
        Self {
            config,
            base,
            article_title,
            article_byline: String::new(),
            flags: Flags::default(),
            scores: HashMap::new(),
            data_tables: HashSet::new(),
        }
    }

    fn score(&self, node: NodeId) -> f64 {
        self.scores.get(&node).copied().unwrap_or(0.0)
    }

    fn has_score(&self, node: NodeId) -> bool {
        self.scores.contains_key(&node)
    }

    fn set_score(&mut self, node: NodeId, score: f64) {
        self.scores.insert(node, score);
    }

    /// Class weight, or 0 once class weighting has been switched off.
    fn class_weight(&self, dom: &Dom, node: NodeId) -> i32 {
        if self.flags.use_weight_classes { scoring::class_id_weight(dom, node) } else { 0 }
    }

    fn initialize_node(&mut self, dom: &Dom, node: NodeId) {
        let score = f64::from(self.class_weight(dom, node)) + scoring::base_tag_score(dom.tag_name(node));
        self.set_score(node, score);
    }

    fn post_process_content(&self, dom: &mut Dom, content: NodeId) {
        fix_relative_uris(dom, content, &self.base);
        if !self.config.keep_classes {
            self.clean_classes(dom, content);
        }
    }

    fn clean_classes(&self, dom: &mut Dom, root: NodeId) {
        let mut nodes = dom.get_elements_by_tag_name(root, "*");
        nodes.insert(0, root);

        for node in nodes {
            let preserved: Vec<&str> = dom
                .get_attribute(node, "class")
                .split_whitespace()
                .filter(|c| self.config.classes_to_preserve.iter().any(|p| p == c))
                .collect();

            if preserved.is_empty() {
                dom.remove_attribute(node, "class");
            } else {
                let class = preserved.join(" ");
                dom.set_attribute(node, "class", &class);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r##"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <title>Greatest Widgets Ever | Acme Corp</title>
            <meta name="author" content="Test Author">
        </head>
        <body>
            <nav class="menu"><a href="/">Home</a><a href="/about">About</a></nav>
            <article class="post-content">
                <h1>Greatest Widgets Ever</h1>
                <p>Widgets have been part of daily life for longer than most of us remember, and their history is long.</p>
                <p>Every widget starts as a sketch, a rough idea, and a lot of stubbornness from the people building it.</p>
                <p>The best widgets balance cost, durability, and charm, which is harder than it sounds in practice.</p>
                <p>Factories in three countries now produce them, each with a distinct style, finish, and reputation.</p>
                <p>Collectors trade rare widgets at fairs, online, and in small shops that smell of oil and sawdust.</p>
                <p>This article walks through the history, the craft, and the future of widgets <a href="more.html">here</a>.</p>
                <img src="images/widget.png">
            </article>
            <div class="sidebar comments"><p>Leave a comment, share this post, and follow us on every network.</p></div>
        </body>
        </html>
    "##;

    #[test]
    fn test_readability_config_default() {
        let config = ReadabilityConfig::default();
        assert_eq!(config.char_threshold, 500);
        assert_eq!(config.nb_top_candidates, 5);
        assert_eq!(config.max_elems_to_parse, 0);
        assert!(!config.keep_classes);
        assert_eq!(config.classes_to_preserve, vec!["page".to_string()]);
    }

    #[test]
    fn test_readability_config_builder() {
        let config = ReadabilityConfig::builder()
            .char_threshold(1000)
            .nb_top_candidates(10)
            .max_elems_to_parse(500)
            .keep_classes(true)
            .preserve_class("caption")
            .build();

        assert_eq!(config.char_threshold, 1000);
        assert_eq!(config.nb_top_candidates, 10);
        assert_eq!(config.max_elems_to_parse, 500);
        assert!(config.keep_classes);
        assert_eq!(config.classes_to_preserve, vec!["page".to_string(), "caption".to_string()]);
    }

    #[test]
    fn test_parse_article() {
        let article = parse_with_url(ARTICLE_HTML, "https://example.com/blog/widgets").unwrap();

        assert_eq!(article.title, "Greatest Widgets Ever");
        assert_eq!(article.byline, "Test Author");
        assert_eq!(article.language, "en");
        assert!(article.text_content.starts_with("Widgets have been part of daily life"));
        assert!(!article.text_content.contains("Leave a comment"));
        assert!(!article.text_content.contains("Home"));
        assert!(article.content.contains(r#"<div id="readability-page-1" class="page">"#));
        assert!(article.content.contains(r#"href="https://example.com/blog/more.html""#));
        assert!(article.content.contains(r#"src="https://example.com/blog/images/widget.png""#));
        assert_eq!(article.length, article.text_content.chars().count());
        assert!(article.min_read_time <= article.max_read_time);
        assert!(article.node.is_some());
    }

    #[test]
    fn test_excerpt_falls_back_to_first_paragraph() {
        let article = parse_with_url(ARTICLE_HTML, "https://example.com/blog/widgets").unwrap();
        assert_eq!(
            article.excerpt,
            "Widgets have been part of daily life for longer than most of us remember, and their history is long."
        );
    }

    #[test]
    fn test_too_short_document_fails() {
        let html = "<html><head></head><body><p>short.</p></body></html>";
        let result = parse_with_url(html, "https://example.com/");
        assert!(matches!(result, Err(ShelfmarkError::NoReadableContent)));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(parse_with_url(ARTICLE_HTML, "not a url"), Err(ShelfmarkError::InvalidUrl(_))));
    }

    #[test]
    fn test_max_elems_to_parse() {
        let reader = Readability::with_config(ReadabilityConfig::builder().max_elems_to_parse(10).build());
        assert!(matches!(
            reader.parse_with_url(ARTICLE_HTML, "https://example.com/"),
            Err(ShelfmarkError::NoReadableContent)
        ));
    }

    #[test]
    fn test_keep_classes() {
        let reader = Readability::with_config(ReadabilityConfig::builder().keep_classes(true).build());
        let html = ARTICLE_HTML.replace("<p>Every widget", r#"<p class="lead">Every widget"#);
        let article = reader.parse_with_url(&html, "https://example.com/").unwrap();
        assert!(article.content.contains(r#"class="lead""#));

        let article = parse_with_url(&html, "https://example.com/").unwrap();
        assert!(!article.content.contains(r#"class="lead""#));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = parse_with_url(ARTICLE_HTML, "https://example.com/").unwrap();
        let b = parse_with_url(ARTICLE_HTML, "https://example.com/").unwrap();
        assert_eq!(a.content, b.content);
        assert_eq!(a.title, b.title);
    }

    #[test]
    fn test_is_probably_readable() {
        let reader = Readability::new();
        assert!(!reader.is_probably_readable("<html><body><nav><a href=\"#\">x</a></nav></body></html>"));
    }
}
