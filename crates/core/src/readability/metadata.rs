//! Article metadata: `<meta>` tags, the document title and the favicon.

use std::collections::HashMap;

use url::Url;

use super::regexps::{
    FAVICON_SIZE, NAME_PATTERN, NORMALIZE, PROPERTY_PATTERN, TITLE_ANY_SEPARATOR, TITLE_HIERARCHY_SEP,
    TITLE_REMOVE_FINAL_PART, TITLE_REMOVE_FIRST_PART, TITLE_SEPARATOR,
};
use super::scoring::{char_count, inner_text, word_count};
use crate::dom::Dom;
use crate::uri::to_absolute;

const TITLE_KEYS: &[&str] =
    &["dc:title", "dcterm:title", "og:title", "weibo:article:title", "weibo:webpage:title", "title", "twitter:title"];
const BYLINE_KEYS: &[&str] = &["dc:creator", "dcterm:creator", "author"];
const EXCERPT_KEYS: &[&str] = &[
    "dc:description",
    "dcterm:description",
    "og:description",
    "weibo:article:description",
    "weibo:webpage:description",
    "description",
    "twitter:description",
];
const IMAGE_KEYS: &[&str] = &["og:image", "image", "twitter:image"];

/// Metadata gathered from the document head before content extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub byline: String,
    pub excerpt: String,
    pub site_name: String,
    pub image: String,
    pub favicon: String,
    pub language: String,
    pub text_direction: String,
}

/// Reads title, byline, excerpt, site name, image and favicon.
///
/// Text values are entity-decoded after they have been extracted.
pub fn get_article_metadata(dom: &Dom, base: &Url) -> Metadata {
    let values = collect_meta_values(dom);
    let first_of = |keys: &[&str]| keys.iter().find_map(|k| values.get(*k).cloned()).unwrap_or_default();

    let mut title = first_of(TITLE_KEYS);
    if title.is_empty() {
        title = get_article_title(dom);
    }

    let image = first_of(IMAGE_KEYS);
    let root = dom.document_element();

    Metadata {
        title: unescape(&title),
        byline: unescape(&first_of(BYLINE_KEYS)),
        excerpt: unescape(&first_of(EXCERPT_KEYS)),
        site_name: unescape(&values.get("og:site_name").cloned().unwrap_or_default()),
        image: if image.is_empty() { image } else { to_absolute(&image, base) },
        favicon: get_article_favicon(dom, base),
        language: root.map(|r| dom.get_attribute(r, "lang").trim().to_string()).unwrap_or_default(),
        text_direction: root.map(|r| dom.get_attribute(r, "dir").trim().to_string()).unwrap_or_default(),
    }
}

fn unescape(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

/// `<meta>` contents keyed by normalised `property` or `name`.
fn collect_meta_values(dom: &Dom) -> HashMap<String, String> {
    let mut values = HashMap::new();

    for meta in dom.get_elements_by_tag_name(dom.document(), "meta") {
        let content = dom.get_attribute(meta, "content");
        if content.is_empty() {
            continue;
        }
        let content = content.trim().to_string();

        let property = dom.get_attribute(meta, "property");
        let matches: Vec<&str> = if property.is_empty() {
            Vec::new()
        } else {
            PROPERTY_PATTERN.find_iter(property).map(|m| m.as_str()).collect()
        };
        for m in matches.iter().rev() {
            let key: String = m.to_lowercase().split_whitespace().collect();
            values.insert(key, content.clone());
        }

        let name = dom.get_attribute(meta, "name");
        if matches.is_empty() && !name.is_empty() && NAME_PATTERN.is_match(name) {
            let key: String = name.to_lowercase().split_whitespace().collect::<String>().replace('.', ":");
            values.insert(key, content);
        }
    }

    values
}

/// Title from `<title>`, with site-name segments removed.
///
/// A segment after ` | `, ` - `, ` \ `, ` / `, ` > ` or ` » ` is dropped,
/// or the first segment when that leaves fewer than three words. Titles with
/// `: ` keep the part after the colon unless a heading repeats the full
/// title. A short or overlong title is replaced by the only `<h1>`. The
/// original is restored when the cleanup left fewer than three words. With
/// hierarchical separators (` / `, ` > `, ` » `, ` \ `) a result of four words
/// or fewer is also reverted, unless the cleanup removed exactly one word.
pub fn get_article_title(dom: &Dom) -> String {
    let doc = dom.document();
    let orig_title = dom
        .get_elements_by_tag_name(doc, "title")
        .first()
        .map(|&t| inner_text(dom, t, true))
        .unwrap_or_default();

    let mut cur_title = orig_title.clone();
    let mut had_hierarchical_separators = false;

    if TITLE_SEPARATOR.is_match(&cur_title) {
        had_hierarchical_separators = TITLE_HIERARCHY_SEP.is_match(&cur_title);
        cur_title = TITLE_REMOVE_FINAL_PART.replace(&orig_title, "$1").into_owned();
        if word_count(&cur_title) < 3 {
            cur_title = TITLE_REMOVE_FIRST_PART.replace(&orig_title, "$1").into_owned();
        }
    } else if let Some(first_colon) = cur_title.find(": ") {
        let trimmed = cur_title.trim();
        let headings = dom.get_all_nodes_with_tag(doc, &["h1", "h2"]);
        let in_heading = dom.some_node(&headings, |dom, h| dom.text_content(h).trim() == trimmed);

        if !in_heading {
            let last_colon = orig_title.rfind(':').unwrap_or(first_colon);
            cur_title = orig_title[last_colon + 1..].to_string();
            if word_count(&cur_title) < 3 {
                let first = orig_title.find(':').unwrap_or(first_colon);
                cur_title = orig_title[first + 1..].to_string();
            } else if word_count(&orig_title[..orig_title.find(':').unwrap_or(first_colon)]) > 5 {
                cur_title = orig_title.clone();
            }
        }
    } else if char_count(&cur_title) > 150 || char_count(&cur_title) < 15 {
        let h1s = dom.get_elements_by_tag_name(doc, "h1");
        if h1s.len() == 1 {
            cur_title = inner_text(dom, h1s[0], true);
        }
    }

    let cur_title = NORMALIZE.replace_all(cur_title.trim(), " ").into_owned();
    let cur_words = word_count(&cur_title);

    let revert = if had_hierarchical_separators {
        let without_separators = TITLE_ANY_SEPARATOR.replace_all(&orig_title, "");
        cur_words <= 4 && cur_words + 1 != word_count(&without_separators)
    } else {
        cur_words < 3
    };

    if revert { orig_title } else { cur_title }
}

/// Largest PNG icon declared with `rel~=icon`, resolved against `base`.
pub fn get_article_favicon(dom: &Dom, base: &Url) -> String {
    let mut favicon = String::new();
    let mut favicon_size: i64 = -1;

    for link in dom.get_elements_by_tag_name(dom.document(), "link") {
        let rel = dom.get_attribute(link, "rel").trim();
        let link_type = dom.get_attribute(link, "type").trim();
        let href = dom.get_attribute(link, "href").trim();
        let sizes = dom.get_attribute(link, "sizes").trim();

        if href.is_empty() || !rel.contains("icon") {
            continue;
        }
        if link_type != "image/png" && !href.contains(".png") {
            continue;
        }

        let size = [sizes, href]
            .into_iter()
            .find_map(|location| {
                let caps = FAVICON_SIZE.captures(location)?;
                (caps[1] == caps[2]).then(|| caps[1].parse::<i64>().ok()).flatten()
            })
            .unwrap_or(0);

        if size > favicon_size {
            favicon_size = size;
            favicon = href.to_string();
        }
    }

    if favicon.is_empty() { favicon } else { to_absolute(&favicon, base) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn base() -> Url {
        Url::parse("https://ex.com/post/1").unwrap()
    }

    fn title_of(html: &str) -> String {
        get_article_title(&Dom::parse(html))
    }

    #[rstest]
    #[case("<title>Greatest Widgets Ever | Acme Corp</title>", "Greatest Widgets Ever")]
    #[case("<title>Fast Widget Tricks Today - Acme</title>", "Fast Widget Tricks Today")]
    #[case("<title>Acme Blog: Fast Widget Tricks</title>", "Fast Widget Tricks")]
    #[case("<title>Big Widgets - Acme</title>", "Big Widgets - Acme")]
    #[case("<title>Acme | Why Widgets Matter So Much</title>", "Why Widgets Matter So Much")]
    #[case("<title>Home / Blog / Building Better Widgets</title>", "Home / Blog / Building Better Widgets")]
    #[case("<title>Widgets: The Complete Guide To Everything</title>", "The Complete Guide To Everything")]
    #[case("<title>A tale of many widgets and the people who make them</title>", "A tale of many widgets and the people who make them")]
    fn test_get_article_title(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(title_of(html), expected);
    }

    #[test]
    fn test_title_colon_kept_when_heading_matches() {
        let html = "<title>Widgets: The Complete Guide</title><body><h1>Widgets: The Complete Guide</h1></body>";
        assert_eq!(title_of(html), "Widgets: The Complete Guide");
    }

    #[test]
    fn test_short_title_uses_single_h1() {
        let html = "<title>Blog</title><body><h1>How We Rebuilt The Widget Factory</h1></body>";
        assert_eq!(title_of(html), "How We Rebuilt The Widget Factory");
    }

    #[test]
    fn test_metadata_priorities_and_unescape() {
        let html = r#"<html lang="en"><head>
            <title>Ignored Title Here | Site</title>
            <meta property="og:title" content="Open &amp; Graph">
            <meta name="author" content="Jane Doe">
            <meta name="description" content="plain description">
            <meta property="og:description" content="og description">
            <meta property="og:site_name" content="Example">
            <meta property="og:image" content="/img/cover.jpg">
            </head><body></body></html>"#;
        let meta = get_article_metadata(&Dom::parse(html), &base());
        assert_eq!(meta.title, "Open & Graph");
        assert_eq!(meta.byline, "Jane Doe");
        assert_eq!(meta.excerpt, "og description");
        assert_eq!(meta.site_name, "Example");
        assert_eq!(meta.image, "https://ex.com/img/cover.jpg");
        assert_eq!(meta.language, "en");
    }

    #[test]
    fn test_dc_name_keys_use_colons() {
        let html = r#"<head><meta name="DC.title" content="Dublin Core Title"></head>"#;
        let meta = get_article_metadata(&Dom::parse(html), &base());
        assert_eq!(meta.title, "Dublin Core Title");
    }

    #[test]
    fn test_favicon_picks_largest_png() {
        let html = r#"<head>
            <link rel="icon" href="/favicon.ico">
            <link rel="icon" type="image/png" sizes="32x32" href="/icon-32.png">
            <link rel="apple-touch-icon" href="/icon-180x180.png">
            </head>"#;
        assert_eq!(get_article_favicon(&Dom::parse(html), &base()), "https://ex.com/icon-180x180.png");
    }
}
