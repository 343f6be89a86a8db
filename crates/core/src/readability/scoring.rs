//! Node measurements shared by the extraction passes.
//!
//! Everything here is a pure function of a [`Dom`] node: text length, link
//! density, class weight, visibility and the structural predicates the
//! candidate walk relies on.

use url::Url;

use super::regexps::{
    DISPLAY_NONE, DIV_TO_P_ELEMS, HAS_CONTENT, NEGATIVE, NORMALIZE, PHRASING_ELEMS, POSITIVE, WHITESPACE,
};
use crate::dom::{Dom, NodeData, NodeId};

/// Initial score of a candidate by tag.
///
/// - ARTICLE: +10
/// - SECTION: +8
/// - DIV: +5
/// - PRE, TD, BLOCKQUOTE: +3
/// - ADDRESS, OL, UL, DL, DD, DT, LI, FORM: -3
/// - H1-H6, TH: -5
pub fn base_tag_score(tag: &str) -> f64 {
    match tag {
        "article" => 10.0,
        "section" => 8.0,
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    }
}

/// Class and id weight: class and id are judged separately, each adding
/// -25 for a negative match and +25 for a positive one.
pub fn class_id_weight(dom: &Dom, node: NodeId) -> i32 {
    let mut weight = 0;
    for value in [dom.get_attribute(node, "class"), dom.get_attribute(node, "id")] {
        if value.is_empty() {
            continue;
        }
        if NEGATIVE.is_match(value) {
            weight -= 25;
        }
        if POSITIVE.is_match(value) {
            weight += 25;
        }
    }
    weight
}

pub fn char_count(s: &str) -> usize {
    s.chars().count()
}

pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Trimmed text of `node`, with runs of whitespace collapsed when `normalize` is set.
pub fn inner_text(dom: &Dom, node: NodeId, normalize: bool) -> String {
    let text = dom.text_content(node);
    let trimmed = text.trim();
    if normalize { NORMALIZE.replace_all(trimmed, " ").into_owned() } else { trimmed.to_string() }
}

/// Share of the node's text that sits inside `<a>` elements.
pub fn link_density(dom: &Dom, node: NodeId) -> f64 {
    let text_length = char_count(&inner_text(dom, node, true));
    if text_length == 0 {
        return 0.0;
    }

    let link_length: usize = dom
        .get_elements_by_tag_name(node, "a")
        .into_iter()
        .map(|a| char_count(&inner_text(dom, a, true)))
        .sum();

    link_length as f64 / text_length as f64
}

/// `false` for `display:none`, the `hidden` attribute and `aria-hidden="true"`.
/// Wikimedia math fallbacks are kept visible.
pub fn is_probably_visible(dom: &Dom, node: NodeId) -> bool {
    let style = dom.get_attribute(node, "style");
    let aria_hidden = dom.get_attribute(node, "aria-hidden");
    let class = dom.get_attribute(node, "class");

    (style.is_empty() || !DISPLAY_NONE.is_match(style))
        && !dom.has_attribute(node, "hidden")
        && (aria_hidden != "true" || class.contains("fallback-image"))
}

/// Walks up at most `max_depth` levels (unbounded when `max_depth <= 0`)
/// looking for an ancestor with `tag` that also satisfies `filter`.
pub fn has_ancestor_tag_where<F>(dom: &Dom, node: NodeId, tag: &str, max_depth: i32, filter: F) -> bool
where
    F: Fn(NodeId) -> bool,
{
    let mut depth = 0;
    let mut cur = node;
    while let Some(parent) = dom.parent(cur) {
        if max_depth > 0 && depth > max_depth {
            return false;
        }
        if dom.tag_name(parent) == tag && filter(parent) {
            return true;
        }
        cur = parent;
        depth += 1;
    }
    false
}

pub fn has_ancestor_tag(dom: &Dom, node: NodeId, tag: &str, max_depth: i32) -> bool {
    has_ancestor_tag_where(dom, node, tag, max_depth, |_| true)
}

/// Text nodes, inline elements, and `a`/`del`/`ins` made only of phrasing content.
pub fn is_phrasing_content(dom: &Dom, node: NodeId) -> bool {
    if dom.is_text(node) {
        return true;
    }
    let tag = dom.tag_name(node);
    PHRASING_ELEMS.contains(&tag)
        || (matches!(tag, "a" | "del" | "ins")
            && dom.children(node).into_iter().all(|c| is_phrasing_content(dom, c)))
}

/// Blank text or a `<br>`.
pub fn is_whitespace(dom: &Dom, node: NodeId) -> bool {
    match dom.data(node) {
        NodeData::Text(text) => text.trim().is_empty(),
        NodeData::Element { name, .. } => name == "br",
        _ => false,
    }
}

/// First node from `start` on that is an element or carries non-blank text.
pub fn next_element(dom: &Dom, start: Option<NodeId>) -> Option<NodeId> {
    let mut next = start;
    while let Some(n) = next {
        if dom.is_element(n) || !WHITESPACE.is_match(&dom.text_content(n)) {
            break;
        }
        next = dom.next_sibling(n);
    }
    next
}

/// Exactly one element child, tagged `tag`, and no text with real content.
pub fn has_single_tag_inside_element(dom: &Dom, node: NodeId, tag: &str) -> bool {
    let children = dom.element_children(node);
    if children.len() != 1 || dom.tag_name(children[0]) != tag {
        return false;
    }
    !dom.children(node)
        .into_iter()
        .any(|c| dom.text(c).is_some_and(|t| HAS_CONTENT.is_match(t)))
}

/// No text and nothing but `<br>`/`<hr>` inside.
pub fn is_element_without_content(dom: &Dom, node: NodeId) -> bool {
    if !dom.is_element(node) || !dom.text_content(node).trim().is_empty() {
        return false;
    }
    let children = dom.element_children(node).len();
    let brs = dom.get_elements_by_tag_name(node, "br").len();
    let hrs = dom.get_elements_by_tag_name(node, "hr").len();
    children == 0 || children == brs + hrs
}

pub fn has_child_block_element(dom: &Dom, node: NodeId) -> bool {
    dom.get_elements_by_tag_name(node, "*").into_iter().any(|c| DIV_TO_P_ELEMS.contains(&dom.tag_name(c)))
}

/// An `<img>`, or an element whose only content is a single image.
pub fn is_single_image(dom: &Dom, mut node: NodeId) -> bool {
    loop {
        if dom.tag_name(node) == "img" {
            return true;
        }
        let children = dom.element_children(node);
        if children.len() != 1 || !dom.text_content(node).trim().is_empty() {
            return false;
        }
        node = children[0];
    }
}

/// Element-only depth-first traversal. With `ignore_self_and_kids` the
/// subtree of `node` is skipped.
pub fn get_next_node(dom: &Dom, node: NodeId, ignore_self_and_kids: bool) -> Option<NodeId> {
    if !ignore_self_and_kids && let Some(first) = dom.first_element_child(node) {
        return Some(first);
    }
    if let Some(sibling) = dom.next_element_sibling(node) {
        return Some(sibling);
    }
    let mut cur = dom.parent(node);
    while let Some(p) = cur {
        if let Some(sibling) = dom.next_element_sibling(p) {
            return Some(sibling);
        }
        cur = dom.parent(p);
    }
    None
}

/// Detaches `node` and returns the node the walk continues with.
pub fn remove_and_get_next(dom: &mut Dom, node: NodeId) -> Option<NodeId> {
    let next = get_next_node(dom, node, true);
    dom.detach(node);
    next
}

/// Absolute URL or an absolute path.
pub fn is_valid_url(s: &str) -> bool {
    s.starts_with('/') || Url::parse(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn first_in_body(html: &str) -> (Dom, NodeId) {
        let dom = Dom::parse(html);
        let body = dom.body().unwrap();
        let node = dom.first_element_child(body).unwrap();
        (dom, node)
    }

    #[rstest]
    #[case("article", 10.0)]
    #[case("section", 8.0)]
    #[case("div", 5.0)]
    #[case("blockquote", 3.0)]
    #[case("li", -3.0)]
    #[case("th", -5.0)]
    #[case("span", 0.0)]
    fn test_base_tag_score(#[case] tag: &str, #[case] expected: f64) {
        assert_eq!(base_tag_score(tag), expected);
    }

    #[test]
    fn test_class_id_weight_sums_class_and_id() {
        let (dom, div) = first_in_body(r#"<div class="post-body" id="sidebar">x</div>"#);
        assert_eq!(class_id_weight(&dom, div), 0);

        let (dom, div) = first_in_body(r#"<div class="article" id="main">x</div>"#);
        assert_eq!(class_id_weight(&dom, div), 50);

        let (dom, div) = first_in_body(r#"<div class="comment">x</div>"#);
        assert_eq!(class_id_weight(&dom, div), -25);
    }

    #[test]
    fn test_link_density() {
        let (dom, p) = first_in_body(r#"<p>0123456789<a href="/x">0123456789</a></p>"#);
        assert!((link_density(&dom, p) - 0.5).abs() < f64::EPSILON);

        let (dom, p) = first_in_body("<p></p>");
        assert_eq!(link_density(&dom, p), 0.0);
    }

    #[test]
    fn test_inner_text_normalizes() {
        let (dom, p) = first_in_body("<p>  a \n\n  b  </p>");
        assert_eq!(inner_text(&dom, p, true), "a b");
        assert_eq!(inner_text(&dom, p, false), "a \n\n  b");
    }

    #[rstest]
    #[case(r#"<div style="display: none">x</div>"#, false)]
    #[case(r#"<div hidden>x</div>"#, false)]
    #[case(r#"<div aria-hidden="true">x</div>"#, false)]
    #[case(r#"<div aria-hidden="true" class="mwe-math-fallback-image-inline">x</div>"#, true)]
    #[case(r#"<div style="color: red">x</div>"#, true)]
    fn test_is_probably_visible(#[case] html: &str, #[case] visible: bool) {
        let (dom, div) = first_in_body(html);
        assert_eq!(is_probably_visible(&dom, div), visible);
    }

    #[test]
    fn test_phrasing_content() {
        let (dom, div) = first_in_body(r#"<div>text<a href="x"><b>bold</b></a><a><p>block</p></a></div>"#);
        let kids = dom.children(div);
        assert!(is_phrasing_content(&dom, kids[0]));
        assert!(is_phrasing_content(&dom, kids[1]));
        assert!(!is_phrasing_content(&dom, kids[2]));
    }

    #[test]
    fn test_has_ancestor_tag_depth() {
        let dom = Dom::parse("<table><tr><td><div><span id=s>x</span></div></td></tr></table>");
        let span = dom.get_elements_by_tag_name(dom.document(), "span")[0];
        assert!(has_ancestor_tag(&dom, span, "table", 0));
        assert!(!has_ancestor_tag(&dom, span, "table", 2));
    }

    #[test]
    fn test_single_tag_and_empty_checks() {
        let (dom, div) = first_in_body("<div>  <p>x</p> </div>");
        assert!(has_single_tag_inside_element(&dom, div, "p"));

        let (dom, div) = first_in_body("<div>text<p>x</p></div>");
        assert!(!has_single_tag_inside_element(&dom, div, "p"));

        // Trailing whitespace is not content.
        let (dom, div) = first_in_body("<div>text <p>x</p></div>");
        assert!(has_single_tag_inside_element(&dom, div, "p"));

        let (dom, div) = first_in_body("<div> <br><hr> </div>");
        assert!(is_element_without_content(&dom, div));

        let (dom, div) = first_in_body("<div><img src=a.png></div>");
        assert!(!is_element_without_content(&dom, div));
        assert!(is_single_image(&dom, div));
    }

    #[test]
    fn test_get_next_node_skips_text() {
        let (dom, div) = first_in_body("<div>t<p>a</p></div><span></span>");
        let p = get_next_node(&dom, div, false).unwrap();
        assert_eq!(dom.tag_name(p), "p");
        let span = get_next_node(&dom, p, false).unwrap();
        assert_eq!(dom.tag_name(span), "span");
        assert_eq!(get_next_node(&dom, span, false), None);
    }
}
