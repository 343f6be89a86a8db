//! Cleanup of the selected content before it is serialised.

use super::Parser;
use super::images::fix_lazy_images;
use super::regexps::{DEPRECATED_SIZE_ATTRIBUTE_ELEMS, PRESENTATIONAL_ATTRIBUTES, SHARE_ELEMENTS, VIDEOS};
use super::scoring::{
    char_count, get_next_node, has_ancestor_tag, has_ancestor_tag_where, has_single_tag_inside_element,
    inner_text, is_phrasing_content, link_density, next_element, remove_and_get_next,
};
use crate::dom::{Dom, NodeId};

impl Parser<'_> {
    /// Removes what is left of page chrome inside the article container.
    pub(super) fn prep_article(&mut self, dom: &mut Dom, content: NodeId) {
        clean_styles(dom, content);
        self.mark_data_tables(dom, content);
        fix_lazy_images(dom, content);

        self.clean_conditionally(dom, content, "form");
        self.clean_conditionally(dom, content, "fieldset");
        for tag in ["object", "embed", "h1", "footer", "link", "aside"] {
            clean(dom, content, tag);
        }

        // Top-level children are spared even when they look like share widgets.
        let share_threshold = self.config.char_threshold;
        for child in dom.element_children(content) {
            clean_matched_nodes(dom, child, |dom, node, class_and_id| {
                SHARE_ELEMENTS.is_match(class_and_id) && char_count(&dom.text_content(node)) < share_threshold
            });
        }

        if self.lone_h2_repeats_title(dom, content) {
            clean(dom, content, "h2");
        }

        for tag in ["iframe", "input", "textarea", "select", "button"] {
            clean(dom, content, tag);
        }
        self.clean_headers(dom, content);

        self.clean_conditionally(dom, content, "table");
        self.clean_conditionally(dom, content, "ul");
        self.clean_conditionally(dom, content, "div");

        let paragraphs = dom.get_elements_by_tag_name(content, "p");
        dom.remove_nodes(&paragraphs, |dom, p| {
            let media = dom.get_all_nodes_with_tag(p, &["img", "embed", "object", "iframe"]).len();
            media == 0 && inner_text(dom, p, false).is_empty()
        });

        for br in dom.get_elements_by_tag_name(content, "br") {
            let next = next_element(dom, dom.next_sibling(br));
            if next.is_some_and(|n| dom.tag_name(n) == "p") {
                dom.detach(br);
            }
        }

        for table in dom.get_elements_by_tag_name(content, "table") {
            collapse_single_cell_table(dom, table);
        }
    }

    fn lone_h2_repeats_title(&self, dom: &Dom, content: NodeId) -> bool {
        let h2s = dom.get_elements_by_tag_name(content, "h2");
        let title_length = char_count(&self.article_title);
        if h2s.len() != 1 || title_length == 0 {
            return false;
        }

        let h2_text = dom.text_content(h2s[0]);
        let similarity = (char_count(&h2_text) as f64 - title_length as f64) / title_length as f64;
        if similarity.abs() >= 0.5 {
            return false;
        }

        if similarity > 0.0 {
            h2_text.contains(self.article_title.as_str())
        } else {
            self.article_title.contains(h2_text.as_str())
        }
    }

    /// Records tables that hold data rather than layout so conditional
    /// cleaning leaves them and their contents alone.
    fn mark_data_tables(&mut self, dom: &Dom, root: NodeId) {
        for table in dom.get_elements_by_tag_name(root, "table") {
            if is_data_table(dom, table) {
                self.data_tables.insert(table);
            } else {
                self.data_tables.remove(&table);
            }
        }
    }

    /// Removes `tag` elements that look like boilerplate: a negative class
    /// weight, or few commas together with too many images, list items,
    /// inputs, links or embeds for the amount of text.
    fn clean_conditionally(&self, dom: &mut Dom, root: NodeId, tag: &str) {
        if !self.flags.clean_conditionally {
            return;
        }

        let is_list = matches!(tag, "ul" | "ol");
        let nodes = dom.get_elements_by_tag_name(root, tag);

        dom.remove_nodes(&nodes, |dom, node| {
            if tag == "table" && self.data_tables.contains(&node) {
                return false;
            }
            if has_ancestor_tag_where(dom, node, "table", -1, |t| self.data_tables.contains(&t)) {
                return false;
            }

            let weight = self.class_weight(dom, node);
            if weight < 0 {
                return true;
            }

            let text = inner_text(dom, node, true);
            if text.matches(',').count() >= 10 {
                return false;
            }

            let p = dom.get_elements_by_tag_name(node, "p").len() as f64;
            let img = dom.get_elements_by_tag_name(node, "img").len() as f64;
            let li = dom.get_elements_by_tag_name(node, "li").len() as f64;
            let input = dom.get_elements_by_tag_name(node, "input").len() as f64;

            let embeds = dom.get_all_nodes_with_tag(node, &["object", "embed", "iframe"]);
            if embeds.iter().any(|&e| is_video_embed(dom, e)) {
                return false;
            }
            let embed_count = embeds.len();

            let density = link_density(dom, node);
            let length = char_count(&text);
            let in_figure = has_ancestor_tag(dom, node, "figure", 3);

            (img > 1.0 && p / img < 0.5 && !in_figure)
                || (!is_list && li > p)
                || (input > (p / 3.0).floor())
                || (!is_list && length < 25 && (img == 0.0 || img > 2.0) && !in_figure)
                || (!is_list && weight < 25 && density > 0.2)
                || (weight >= 25 && density > 0.5)
                || (embed_count == 1 && length < 75)
                || embed_count > 1
        });
    }

    /// Drops `<h1>` and `<h2>` with a negative class weight.
    fn clean_headers(&self, dom: &mut Dom, root: NodeId) {
        for tag in ["h1", "h2"] {
            let headers = dom.get_elements_by_tag_name(root, tag);
            dom.remove_nodes(&headers, |dom, header| self.class_weight(dom, header) < 0);
        }
    }
}

/// Strips presentational attributes, and sizes on legacy sized elements.
/// `<svg>` subtrees are left untouched.
fn clean_styles(dom: &mut Dom, root: NodeId) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let tag = dom.tag_name(node).to_string();
        if tag == "svg" {
            continue;
        }

        for attr in PRESENTATIONAL_ATTRIBUTES {
            dom.remove_attribute(node, attr);
        }
        if DEPRECATED_SIZE_ATTRIBUTE_ELEMS.contains(&tag.as_str()) {
            dom.remove_attribute(node, "width");
            dom.remove_attribute(node, "height");
        }
        stack.extend(dom.element_children(node));
    }
}

/// Removes every `tag` element under `root`. Embeds pointing at a known
/// video host stay.
fn clean(dom: &mut Dom, root: NodeId, tag: &str) {
    let is_embed = matches!(tag, "object" | "embed" | "iframe");
    let nodes = dom.get_elements_by_tag_name(root, tag);
    dom.remove_nodes(&nodes, |dom, node| !(is_embed && is_video_embed(dom, node)));
}

fn is_video_embed(dom: &Dom, node: NodeId) -> bool {
    dom.attributes(node).iter().any(|a| VIDEOS.is_match(&a.value))
        || (dom.tag_name(node) == "object" && VIDEOS.is_match(&dom.inner_html(node)))
}

/// Removes descendants of `root` for which `filter(dom, node, "class id")` holds.
fn clean_matched_nodes<F>(dom: &mut Dom, root: NodeId, filter: F)
where
    F: Fn(&Dom, NodeId, &str) -> bool,
{
    let end = get_next_node(dom, root, true);
    let mut next = get_next_node(dom, root, false);

    while let Some(node) = next
        && Some(node) != end
    {
        next = if filter(dom, node, &dom.class_and_id(node)) {
            remove_and_get_next(dom, node)
        } else {
            get_next_node(dom, node, false)
        };
    }
}

fn is_data_table(dom: &Dom, table: NodeId) -> bool {
    if dom.get_attribute(table, "role") == "presentation" || dom.get_attribute(table, "datatable") == "0" {
        return false;
    }
    if dom.has_attribute(table, "summary") {
        return true;
    }
    if let Some(&caption) = dom.get_elements_by_tag_name(table, "caption").first()
        && dom.first_child(caption).is_some()
    {
        return true;
    }
    if !dom.get_all_nodes_with_tag(table, &["col", "colgroup", "tfoot", "thead", "th"]).is_empty() {
        return true;
    }
    if !dom.get_elements_by_tag_name(table, "table").is_empty() {
        return false;
    }

    let (rows, columns) = row_and_column_count(dom, table);
    rows >= 10 || columns > 4 || rows * columns > 10
}

/// Rows (honouring `rowspan`) and the widest row's cell count (honouring `colspan`).
fn row_and_column_count(dom: &Dom, table: NodeId) -> (usize, usize) {
    let span = |node: NodeId, attr: &str| match dom.get_attribute(node, attr).trim().parse::<usize>() {
        Ok(0) | Err(_) => 1,
        Ok(n) => n,
    };

    let mut rows = 0;
    let mut columns = 0;
    for tr in dom.get_elements_by_tag_name(table, "tr") {
        rows += span(tr, "rowspan");
        let in_row: usize = dom.get_elements_by_tag_name(tr, "td").into_iter().map(|td| span(td, "colspan")).sum();
        columns = columns.max(in_row);
    }
    (rows, columns)
}

/// Replaces a table with one row and one cell by that cell, retagged
/// `<p>` when it holds only phrasing content and `<div>` otherwise.
fn collapse_single_cell_table(dom: &mut Dom, table: NodeId) {
    let tbody = if has_single_tag_inside_element(dom, table, "tbody") {
        dom.first_element_child(table).unwrap_or(table)
    } else {
        table
    };
    if !has_single_tag_inside_element(dom, tbody, "tr") {
        return;
    }
    let Some(row) = dom.first_element_child(tbody) else {
        return;
    };
    if !has_single_tag_inside_element(dom, row, "td") {
        return;
    }
    let Some(cell) = dom.first_element_child(row) else {
        return;
    };

    let phrasing = dom.children(cell).into_iter().all(|c| is_phrasing_content(dom, c));
    dom.set_tag_name(cell, if phrasing { "p" } else { "div" });
    dom.replace_node(table, cell);
}
