//! Quick "is this worth extracting" check that does not run the full algorithm.

use std::collections::HashSet;

use super::regexps::{MAYBE_CANDIDATE, UNLIKELY_CANDIDATES};
use super::scoring::{char_count, has_ancestor_tag, is_probably_visible};
use crate::dom::{Dom, NodeId};

const MIN_CONTENT_LENGTH: usize = 140;
const MIN_SCORE: f64 = 20.0;

/// Whether the page has enough paragraph-like text to be an article.
///
/// Looks at `<p>`, `<pre>` and every `<div>` holding a `<br>`, skipping
/// hidden or unlikely nodes and list items. Each node with more than 140
/// characters adds `sqrt(len - 140)`; the page is readable once the sum
/// passes 20.
pub fn is_probably_readable(html: &str) -> bool {
    let dom = Dom::parse(html);
    let mut score = 0.0;

    candidate_nodes(&dom).into_iter().any(|node| {
        if !is_probably_visible(&dom, node) {
            return false;
        }

        let match_string = dom.class_and_id(node);
        if UNLIKELY_CANDIDATES.is_match(&match_string) && !MAYBE_CANDIDATE.is_match(&match_string) {
            return false;
        }

        if dom.tag_name(node) == "p" && has_ancestor_tag(&dom, node, "li", -1) {
            return false;
        }

        let length = char_count(dom.text_content(node).trim());
        if length < MIN_CONTENT_LENGTH {
            return false;
        }

        score += ((length - MIN_CONTENT_LENGTH) as f64).sqrt();
        score > MIN_SCORE
    })
}

/// `<p>`, `<pre>` and parents of `<br>` that are divs, once each, in document order.
fn candidate_nodes(dom: &Dom) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();

    for node in dom.get_elements_by_tag_name(dom.document(), "*") {
        let candidate = match dom.tag_name(node) {
            "p" | "pre" => Some(node),
            "br" => dom.parent(node).filter(|&p| dom.tag_name(p) == "div"),
            _ => None,
        };
        if let Some(c) = candidate
            && seen.insert(c)
        {
            nodes.push(c);
        }
    }
    nodes
}
