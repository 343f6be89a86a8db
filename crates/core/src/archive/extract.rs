//! Subresource extraction from HTML pages.
//!
//! Every URL-bearing element or attribute is rewritten to the archival name
//! of the resource it references, so the stored page resolves its assets
//! from inside the archive.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::dom::{Dom, NodeId};
use crate::model::Resource;
use crate::readability::images::rewrite_srcset;
use crate::readability::{fix_lazy_images, fix_relative_uris};
use crate::scanner::{scan_css, scan_js};
use crate::uri::{create_resource, parse_http_url};

static IMAGE_META: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)image|thumbnail").expect("valid regex"));

/// A page rewritten for the archive, with the resources it references.
///
/// `resources` may contain the same URL several times; the archiver dedups.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub html: String,
    pub resources: Vec<Resource>,
}

/// Parses `html`, rewrites its references and serialises it back.
///
/// Lazy images are promoted and links made absolute before extraction, so
/// the archived page matches the readable view.
///
/// # Example
///
/// ```rust
/// use shelfmark_core::archive::extract_html;
/// use url::Url;
///
/// let page = Url::parse("https://ex.com/post").unwrap();
/// let out = extract_html(r#"<img src="/a.png">"#, &page);
/// assert!(out.html.contains(r#"<img src="https-ex.com-a.png">"#));
/// assert_eq!(out.resources[0].url, "https://ex.com/a.png");
/// ```
pub fn extract_html(html: &str, page_url: &Url) -> Extraction {
    let mut dom = Dom::parse(html);
    let root = dom.document();
    fix_lazy_images(&mut dom, root);
    fix_relative_uris(&mut dom, root, page_url);

    let resources = extract_resources(&mut dom, page_url);
    debug!(url = %page_url, resources = resources.len(), "extracted subresources");

    Extraction { html: dom.to_html(), resources }
}

/// Rewrites the references of every element in `dom` in document order.
pub fn extract_resources(dom: &mut Dom, page_url: &Url) -> Vec<Resource> {
    let mut resources = Vec::new();

    for node in dom.get_elements_by_tag_name(dom.document(), "*") {
        extract_inline_style(dom, node, page_url, &mut resources);

        let tag = dom.tag_name(node).to_string();
        match tag.as_str() {
            "style" => extract_style_tag(dom, node, page_url, &mut resources),
            "script" => extract_script_tag(dom, node, page_url, &mut resources),
            "meta" => extract_meta_tag(dom, node, page_url, &mut resources),
            "img" | "picture" | "figure" | "video" | "audio" | "source" => {
                extract_media_tag(dom, node, page_url, &mut resources)
            }
            "link" => extract_attribute(dom, node, "href", page_url, &mut resources),
            "iframe" => extract_attribute(dom, node, "src", page_url, &mut resources),
            "object" => extract_attribute(dom, node, "data", page_url, &mut resources),
            _ => {}
        }
    }

    resources
}

fn extract_inline_style(dom: &mut Dom, node: NodeId, page_url: &Url, resources: &mut Vec<Resource>) {
    let style = dom.get_attribute(node, "style");
    if style.is_empty() {
        return;
    }
    let out = scan_css(style, page_url);
    dom.set_attribute(node, "style", &out.text);
    resources.extend(out.resources);
}

fn extract_style_tag(dom: &mut Dom, node: NodeId, page_url: &Url, resources: &mut Vec<Resource>) {
    let rules = dom.text_content(node);
    let rules = rules.trim();
    if rules.is_empty() {
        return;
    }
    let out = scan_css(rules, page_url);
    dom.set_text_content(node, &out.text);
    resources.extend(out.resources);
}

fn extract_script_tag(dom: &mut Dom, node: NodeId, page_url: &Url, resources: &mut Vec<Resource>) {
    extract_attribute(dom, node, "src", page_url, resources);

    let script = dom.text_content(node);
    let script = script.trim();
    if script.is_empty() {
        return;
    }
    let out = scan_js(script, page_url);
    dom.set_text_content(node, &out.text);
    resources.extend(out.resources);
}

/// `og:image`, `twitter:image` and similar hero-image declarations.
fn extract_meta_tag(dom: &mut Dom, node: NodeId, page_url: &Url, resources: &mut Vec<Resource>) {
    let key = format!("{} {}", dom.get_attribute(node, "name"), dom.get_attribute(node, "property"));
    if !IMAGE_META.is_match(&key) {
        return;
    }

    // Absolute URLs and absolute paths only.
    let content = dom.get_attribute(node, "content");
    if parse_http_url(content).is_err() && !content.starts_with('/') {
        return;
    }
    if let Ok((url, name)) = create_resource(content, Some(page_url)) {
        dom.set_attribute(node, "content", &name);
        resources.push(Resource::new(url, name));
    }
}

fn extract_media_tag(dom: &mut Dom, node: NodeId, page_url: &Url, resources: &mut Vec<Resource>) {
    for attr in ["src", "poster"] {
        let value = dom.get_attribute(node, attr);
        if value.is_empty() {
            continue;
        }
        if let Ok((url, name)) = create_resource(value, Some(page_url)) {
            dom.set_attribute(node, attr, &name);
            resources.push(Resource::new(url, name));
        }
    }

    let srcset = dom.get_attribute(node, "srcset");
    if srcset.is_empty() {
        return;
    }
    let rewritten = rewrite_srcset(srcset, |candidate| match create_resource(candidate, Some(page_url)) {
        Ok((url, name)) => {
            resources.push(Resource::new(url, name.clone()));
            name
        }
        Err(_) => candidate.to_string(),
    });
    dom.set_attribute(node, "srcset", &rewritten);
}

/// Single-URL attributes. Iframe sources are marked as embeds.
fn extract_attribute(dom: &mut Dom, node: NodeId, attr: &str, page_url: &Url, resources: &mut Vec<Resource>) {
    let value = dom.get_attribute(node, attr);
    if value.is_empty() {
        return;
    }
    let Ok((url, name)) = create_resource(value, Some(page_url)) else {
        return;
    };

    dom.set_attribute(node, attr, &name);
    let resource = if dom.tag_name(node) == "iframe" { Resource::embed(url, name) } else { Resource::new(url, name) };
    resources.push(resource);
}
