//! Mutable HTML tree.
//!
//! This module provides [`Dom`], an arena of element, text and comment nodes
//! addressed by [`NodeId`]. Every node keeps explicit parent, first/last child
//! and previous/next sibling links, so in-place rewrites (retagging, moving
//! subtrees, replacing nodes) never need shared ownership.
//!
//! Detached nodes stay in the arena until the [`Dom`] is dropped; they are
//! simply unreachable from the document root.
//!
//! # Example
//!
//! ```rust
//! use shelfmark_core::dom::Dom;
//!
//! let mut dom = Dom::parse("<html><body><p>Hello</p></body></html>");
//! let body = dom.body().unwrap();
//! let p = dom.get_elements_by_tag_name(body, "p")[0];
//! dom.set_tag_name(p, "div");
//! assert_eq!(dom.inner_html(body), "<div>Hello</div>");
//! ```

mod parse;
mod serialize;

/// Index of a node inside a [`Dom`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A single `name="value"` pair on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    Doctype(String),
    Element { name: String, attrs: Vec<Attribute> },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self { data, parent: None, first_child: None, last_child: None, prev_sibling: None, next_sibling: None }
    }
}

/// Arena-backed HTML document.
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    document: NodeId,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// Creates an empty document containing only the document node.
    pub fn new() -> Self {
        Self { nodes: vec![Node::new(NodeData::Document)], document: NodeId(0) }
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(data));
        id
    }

    /// The document node.
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.document).into_iter().next()
    }

    pub fn head(&self) -> Option<NodeId> {
        let root = self.document_element()?;
        self.element_children(root).into_iter().find(|&n| self.tag_name(n) == "head")
    }

    pub fn body(&self) -> Option<NodeId> {
        let root = self.document_element()?;
        self.element_children(root).into_iter().find(|&n| self.tag_name(n) == "body")
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element { name: name.to_ascii_lowercase(), attrs: Vec::new() })
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub(crate) fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    pub(crate) fn create_doctype(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Doctype(name.to_string()))
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].data, NodeData::Element { .. })
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].data, NodeData::Text(_))
    }

    /// Lowercase tag name, or `""` for anything that is not an element.
    pub fn tag_name(&self, id: NodeId) -> &str {
        match &self.nodes[id.0].data {
            NodeData::Element { name, .. } => name,
            _ => "",
        }
    }

    /// Retags an element in place, keeping its attributes and children.
    pub fn set_tag_name(&mut self, id: NodeId, tag: &str) {
        if let NodeData::Element { name, .. } = &mut self.nodes[id.0].data {
            *name = tag.to_ascii_lowercase();
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.nodes[id.0].data {
            NodeData::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id).iter().find(|a| a.name == name).map(|a| a.value.as_str())
    }

    /// Attribute value, or `""` when absent.
    pub fn get_attribute(&self, id: NodeId, name: &str) -> &str {
        self.attr(id, name).unwrap_or("")
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            match attrs.iter_mut().find(|a| a.name == name) {
                Some(attr) => attr.value = value.to_string(),
                None => attrs.push(Attribute { name: name.to_string(), value: value.to_string() }),
            }
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            attrs.retain(|a| a.name != name);
        }
    }

    /// `class` and `id` joined with a space, the string most heuristics match against.
    pub fn class_and_id(&self, id: NodeId) -> String {
        format!("{} {}", self.get_attribute(id, "class"), self.get_attribute(id, "id"))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].next_sibling
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].prev_sibling
    }

    /// Snapshot of the direct children, safe to iterate while mutating.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.first_child(id);
        while let Some(c) = cur {
            out.push(c);
            cur = self.next_sibling(c);
        }
        out
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).into_iter().filter(|&c| self.is_element(c)).collect()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.first_child(id);
        while let Some(c) = cur {
            if self.is_element(c) {
                return Some(c);
            }
            cur = self.next_sibling(c);
        }
        None
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.next_sibling(id);
        while let Some(c) = cur {
            if self.is_element(c) {
                return Some(c);
            }
            cur = self.next_sibling(c);
        }
        None
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.prev_sibling(id);
        while let Some(c) = cur {
            if self.is_element(c) {
                return Some(c);
            }
            cur = self.prev_sibling(c);
        }
        None
    }

    /// Ancestors from the parent upwards, `max_depth == 0` meaning unbounded.
    pub fn ancestors(&self, id: NodeId, max_depth: usize) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            out.push(p);
            if max_depth > 0 && out.len() == max_depth {
                break;
            }
            cur = self.parent(p);
        }
        out
    }

    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.parent(p);
        }
        false
    }

    /// Next node in document order, descending into children first.
    pub fn next_in_order(&self, id: NodeId, skip_children: bool) -> Option<NodeId> {
        if !skip_children && let Some(first) = self.first_child(id) {
            return Some(first);
        }
        let mut cur = Some(id);
        while let Some(n) = cur {
            if let Some(next) = self.next_sibling(n) {
                return Some(next);
            }
            cur = self.parent(n);
        }
        None
    }

    /// Descendant elements with the given tag in document order. `"*"` matches every element.
    pub fn get_elements_by_tag_name(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(n) = stack.pop() {
            if self.is_element(n) && (tag == "*" || self.tag_name(n) == tag) {
                out.push(n);
            }
            let mut child = self.last_child(n);
            while let Some(c) = child {
                stack.push(c);
                child = self.prev_sibling(c);
            }
        }
        out
    }

    /// Descendant elements for each tag of `tags`, grouped by tag in the given order.
    pub fn get_all_nodes_with_tag(&self, id: NodeId, tags: &[&str]) -> Vec<NodeId> {
        tags.iter().flat_map(|tag| self.get_elements_by_tag_name(id, tag)).collect()
    }

    /// Unlinks a node from its parent. A detached node is left untouched.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.0].parent else {
            return;
        };
        let prev = self.nodes[id.0].prev_sibling;
        let next = self.nodes[id.0].next_sibling;

        match prev {
            Some(p) => self.nodes[p.0].next_sibling = next,
            None => self.nodes[parent.0].first_child = next,
        }
        match next {
            Some(n) => self.nodes[n.0].prev_sibling = prev,
            None => self.nodes[parent.0].last_child = prev,
        }

        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    fn would_cycle(&self, parent: NodeId, child: NodeId) -> bool {
        parent == child || self.is_descendant_of(parent, child)
    }

    /// Appends `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.would_cycle(parent, child) {
            return;
        }
        self.detach(child);
        self.link_last(parent, child);
    }

    /// Links a detached `child` after the last child of `parent`.
    fn link_last(&mut self, parent: NodeId, child: NodeId) {
        let last = self.nodes[parent.0].last_child;
        {
            let node = &mut self.nodes[child.0];
            node.parent = Some(parent);
            node.prev_sibling = last;
        }
        match last {
            Some(l) => self.nodes[l.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    /// Inserts `child` as the first child of `parent`, detaching it first.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        match self.first_child(parent) {
            Some(first) => self.insert_before(child, first),
            None => self.append_child(parent, child),
        }
    }

    /// Inserts `node` right before `reference`, which must be attached.
    pub fn insert_before(&mut self, node: NodeId, reference: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        if node == reference || self.would_cycle(parent, node) {
            return;
        }
        self.detach(node);
        let prev = self.nodes[reference.0].prev_sibling;
        {
            let n = &mut self.nodes[node.0];
            n.parent = Some(parent);
            n.prev_sibling = prev;
            n.next_sibling = Some(reference);
        }
        self.nodes[reference.0].prev_sibling = Some(node);
        match prev {
            Some(p) => self.nodes[p.0].next_sibling = Some(node),
            None => self.nodes[parent.0].first_child = Some(node),
        }
    }

    /// Puts `new_node` where `old` was and detaches `old`.
    pub fn replace_node(&mut self, old: NodeId, new_node: NodeId) {
        if old == new_node || self.parent(old).is_none() {
            return;
        }
        self.detach(new_node);
        self.insert_before(new_node, old);
        self.detach(old);
    }

    /// Moves every child of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        while let Some(child) = self.first_child(from) {
            self.append_child(to, child);
        }
    }

    /// Deep (or shallow) copy of a node. The copy is detached.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> NodeId {
        let data = self.nodes[id.0].data.clone();
        let copy = self.push(data);
        if !deep {
            return copy;
        }

        let mut stack: Vec<(NodeId, NodeId)> = self.children(id).into_iter().rev().map(|c| (c, copy)).collect();
        while let Some((source, parent)) = stack.pop() {
            let data = self.nodes[source.0].data.clone();
            let node = self.push(data);
            self.link_last(parent, node);
            stack.extend(self.children(source).into_iter().rev().map(|c| (c, node)));
        }
        copy
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            match &self.nodes[n.0].data {
                NodeData::Text(t) => out.push_str(t),
                NodeData::Element { .. } | NodeData::Document => {
                    let mut cur = self.last_child(n);
                    while let Some(c) = cur {
                        stack.push(c);
                        cur = self.prev_sibling(c);
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Replaces all children with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        for child in self.children(id) {
            self.detach(child);
        }
        let node = self.create_text(text);
        self.append_child(id, node);
    }

    /// Text of a text node, `None` for other node kinds.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Detaches every node in `nodes` for which `filter` holds, last to first.
    pub fn remove_nodes<F>(&mut self, nodes: &[NodeId], mut filter: F)
    where
        F: FnMut(&Dom, NodeId) -> bool,
    {
        for &n in nodes.iter().rev() {
            if self.parent(n).is_some() && filter(self, n) {
                self.detach(n);
            }
        }
    }

    /// Runs `f` on every node of `nodes` in order, allowing mutation.
    pub fn for_each_node<F>(&mut self, nodes: &[NodeId], mut f: F)
    where
        F: FnMut(&mut Dom, NodeId),
    {
        for &n in nodes {
            f(self, n);
        }
    }

    pub fn some_node<F>(&self, nodes: &[NodeId], f: F) -> bool
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        nodes.iter().any(|&n| f(self, n))
    }

    pub fn every_node<F>(&self, nodes: &[NodeId], f: F) -> bool
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        nodes.iter().all(|&n| f(self, n))
    }
}

/// Whether `node` is one of `nodes`.
pub fn include_node(nodes: &[NodeId], node: NodeId) -> bool {
    nodes.contains(&node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(html: &str) -> (Dom, NodeId) {
        let dom = Dom::parse(html);
        let body = dom.body().unwrap();
        (dom, body)
    }

    #[test]
    fn test_get_elements_by_tag_name_document_order() {
        let (dom, body) = body_of("<div><p>a</p><section><p>b</p></section></div><p>c</p>");
        let ps = dom.get_elements_by_tag_name(body, "p");
        let texts: Vec<String> = ps.iter().map(|&p| dom.text_content(p)).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(dom.get_elements_by_tag_name(body, "*").len(), 5);
    }

    #[test]
    fn test_append_child_detaches_from_previous_parent() {
        let (mut dom, body) = body_of("<div id=a><span>x</span></div><div id=b></div>");
        let divs = dom.get_elements_by_tag_name(body, "div");
        let span = dom.get_elements_by_tag_name(divs[0], "span")[0];
        dom.append_child(divs[1], span);

        assert!(dom.children(divs[0]).is_empty());
        assert_eq!(dom.parent(span), Some(divs[1]));
        assert_eq!(dom.first_child(divs[1]), Some(span));
        assert_eq!(dom.last_child(divs[1]), Some(span));
    }

    #[test]
    fn test_sibling_links_stay_consistent() {
        let (mut dom, body) = body_of("<p>1</p><p>2</p><p>3</p>");
        let ps = dom.get_elements_by_tag_name(body, "p");
        dom.detach(ps[1]);
        assert_eq!(dom.next_sibling(ps[0]), Some(ps[2]));
        assert_eq!(dom.prev_sibling(ps[2]), Some(ps[0]));

        dom.prepend_child(body, ps[1]);
        assert_eq!(dom.first_child(body), Some(ps[1]));
        assert_eq!(dom.prev_sibling(ps[0]), Some(ps[1]));
        assert_eq!(dom.inner_html(body), "<p>2</p><p>1</p><p>3</p>");
    }

    #[test]
    fn test_replace_node_with_own_child() {
        let (mut dom, body) = body_of("<div><p>keep</p></div>");
        let div = dom.first_element_child(body).unwrap();
        let p = dom.first_element_child(div).unwrap();
        dom.replace_node(div, p);
        assert_eq!(dom.inner_html(body), "<p>keep</p>");
        assert_eq!(dom.parent(div), None);
    }

    #[test]
    fn test_append_child_refuses_cycles() {
        let (mut dom, body) = body_of("<div><span></span></div>");
        let div = dom.first_element_child(body).unwrap();
        let span = dom.first_element_child(div).unwrap();
        dom.append_child(span, div);
        assert_eq!(dom.parent(div), Some(body));
    }

    #[test]
    fn test_clone_node_is_deep_and_detached() {
        let (mut dom, body) = body_of(r#"<div class="x"><b>bold</b> text</div>"#);
        let div = dom.first_element_child(body).unwrap();
        let copy = dom.clone_node(div, true);
        assert_eq!(dom.parent(copy), None);
        assert_eq!(dom.outer_html(copy), dom.outer_html(div));

        let shallow = dom.clone_node(div, false);
        assert_eq!(dom.outer_html(shallow), r#"<div class="x"></div>"#);
    }

    #[test]
    fn test_attributes() {
        let (mut dom, body) = body_of(r#"<a href="/x">link</a>"#);
        let a = dom.first_element_child(body).unwrap();
        assert_eq!(dom.get_attribute(a, "href"), "/x");
        assert_eq!(dom.get_attribute(a, "title"), "");
        dom.set_attribute(a, "href", "/y");
        dom.set_attribute(a, "rel", "nofollow");
        assert_eq!(dom.outer_html(a), r#"<a href="/y" rel="nofollow">link</a>"#);
        dom.remove_attribute(a, "href");
        assert!(!dom.has_attribute(a, "href"));
    }

    #[test]
    fn test_text_content_and_set_text_content() {
        let (mut dom, body) = body_of("<div>a<b>b</b><!-- c -->d</div>");
        let div = dom.first_element_child(body).unwrap();
        assert_eq!(dom.text_content(div), "abd");
        dom.set_text_content(div, "x < y");
        assert_eq!(dom.inner_html(div), "x &lt; y");
    }

    #[test]
    fn test_remove_nodes_with_filter() {
        let (mut dom, body) = body_of("<p>keep</p><p></p><p>also</p>");
        let ps = dom.get_elements_by_tag_name(body, "p");
        dom.remove_nodes(&ps, |dom, p| dom.text_content(p).is_empty());
        assert_eq!(dom.get_elements_by_tag_name(body, "p").len(), 2);
        assert!(include_node(&ps, ps[0]));
    }

    #[test]
    fn test_some_every_for_each() {
        let (mut dom, body) = body_of("<p>a</p><p>b</p>");
        let ps = dom.get_elements_by_tag_name(body, "p");
        assert!(dom.every_node(&ps, |dom, p| dom.tag_name(p) == "p"));
        assert!(!dom.some_node(&ps, |dom, p| dom.text_content(p) == "z"));
        dom.for_each_node(&ps, |dom, p| dom.set_tag_name(p, "span"));
        assert_eq!(dom.inner_html(body), "<span>a</span><span>b</span>");
    }

    #[test]
    fn test_next_in_order_walks_document() {
        let (dom, body) = body_of("<div><p>a</p></div><span></span>");
        let div = dom.first_element_child(body).unwrap();
        let p = dom.next_in_order(div, false).unwrap();
        assert_eq!(dom.tag_name(p), "p");
        let span = dom.next_in_order(div, true).unwrap();
        assert_eq!(dom.tag_name(span), "span");
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        const DEPTH: usize = 100_000;
        let mut dom = Dom::new();
        let mut node = dom.create_text("leaf");
        for _ in 0..DEPTH {
            let div = dom.create_element("div");
            dom.append_child(div, node);
            node = div;
        }

        assert_eq!(dom.text_content(node), "leaf");

        let html = dom.outer_html(node);
        assert_eq!(html.len(), DEPTH * "<div></div>".len() + "leaf".len());
        assert!(html.starts_with("<div><div>") && html.ends_with("leaf</div></div>"));

        let copy = dom.clone_node(node, true);
        assert_eq!(dom.parent(copy), None);
        assert_eq!(dom.text_content(copy), "leaf");
        assert_eq!(dom.outer_html(copy), html);
    }
}
