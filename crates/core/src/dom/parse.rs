use std::collections::HashMap;

use scraper::{Html, Node};

use super::{Attribute, Dom, NodeData, NodeId};

impl Dom {
    /// Parses a full HTML document with html5ever (through `scraper`).
    ///
    /// Parsing never fails; malformed markup is repaired the same way a browser
    /// would repair it.
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut dom = Dom::new();
        let document = dom.document;
        dom.import(&parsed, document, false);
        dom
    }

    /// Parses `html` as a body fragment and returns its top-level nodes, detached.
    pub fn parse_fragment(&mut self, html: &str) -> Vec<NodeId> {
        let parsed = Html::parse_fragment(html);
        let holder = self.create_element("div");
        self.import(&parsed, holder, true);
        let nodes = self.children(holder);
        for &n in &nodes {
            self.detach(n);
        }
        nodes
    }

    /// Replaces the children of `id` with the parsed fragment.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        for child in self.children(id) {
            self.detach(child);
        }
        for node in self.parse_fragment(html) {
            self.append_child(id, node);
        }
    }

    fn import(&mut self, parsed: &Html, target: NodeId, fragment: bool) {
        let root = parsed.tree.root();
        let mut mapped = HashMap::new();
        mapped.insert(root.id(), target);

        for node in root.descendants().skip(1) {
            let Some(parent) = node.parent().and_then(|p| mapped.get(&p.id()).copied()) else {
                continue;
            };

            // Fragments are wrapped in a synthetic <html> element.
            if fragment && parent == target && let Node::Element(el) = node.value() && el.name() == "html" {
                mapped.insert(node.id(), target);
                continue;
            }

            let id = match node.value() {
                Node::Element(el) => {
                    let attrs = el
                        .attrs()
                        .map(|(name, value)| Attribute { name: name.to_string(), value: value.to_string() })
                        .collect();
                    self.push(NodeData::Element { name: el.name().to_ascii_lowercase(), attrs })
                }
                Node::Text(text) => self.create_text(text),
                Node::Comment(comment) => self.create_comment(comment),
                Node::Doctype(doctype) => self.create_doctype(doctype.name()),
                _ => continue,
            };
            self.append_child(parent, id);
            mapped.insert(node.id(), id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repairs_structure() {
        let dom = Dom::parse("<title>T</title><p>body text");
        assert!(dom.head().is_some());
        let body = dom.body().unwrap();
        assert_eq!(dom.inner_html(body), "<p>body text</p>");
    }

    #[test]
    fn test_parse_fragment_returns_detached_nodes() {
        let mut dom = Dom::new();
        let nodes = dom.parse_fragment("<img src=a.jpg>text");
        assert_eq!(nodes.len(), 2);
        assert_eq!(dom.tag_name(nodes[0]), "img");
        assert_eq!(dom.parent(nodes[0]), None);
        assert_eq!(dom.text(nodes[1]), Some("text"));
    }

    #[test]
    fn test_set_inner_html() {
        let mut dom = Dom::parse("<div id=x>old</div>");
        let body = dom.body().unwrap();
        let div = dom.first_element_child(body).unwrap();
        dom.set_inner_html(div, "<b>new</b>");
        assert_eq!(dom.outer_html(div), r#"<div id="x"><b>new</b></div>"#);
    }

    #[test]
    fn test_attributes_keep_source_order() {
        let dom = Dom::parse(r#"<img width="10" src="a.png" alt="x" class="wide">"#);
        let body = dom.body().unwrap();
        assert_eq!(dom.inner_html(body), r#"<img width="10" src="a.png" alt="x" class="wide">"#);
    }

    #[test]
    fn test_noscript_content_is_text() {
        let dom = Dom::parse("<body><noscript><img src=a.jpg></noscript></body>");
        let body = dom.body().unwrap();
        let noscript = dom.first_element_child(body).unwrap();
        assert_eq!(dom.text_content(noscript), "<img src=a.jpg>");
    }
}
