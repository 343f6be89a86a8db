use super::{Dom, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param", "source", "track",
    "wbr",
];

/// Elements whose text children are written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript"];

enum Step<'a> {
    Open(NodeId),
    Close(&'a str),
}

impl Dom {
    /// Serialises the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_nodes(self.children(id), &mut out);
        out
    }

    /// Serialises `id` itself, including its start and end tags.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_nodes(vec![id], &mut out);
        out
    }

    /// Serialises the whole document, doctype included.
    pub fn to_html(&self) -> String {
        self.inner_html(self.document())
    }

    /// Writes `nodes` and their subtrees in order, without recursion.
    fn write_nodes(&self, nodes: Vec<NodeId>, out: &mut String) {
        let mut stack: Vec<Step<'_>> = nodes.into_iter().rev().map(Step::Open).collect();

        while let Some(step) = stack.pop() {
            let id = match step {
                Step::Open(id) => id,
                Step::Close(name) => {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                    continue;
                }
            };

            match self.data(id) {
                NodeData::Document => self.push_children(id, &mut stack),
                NodeData::Doctype(name) => {
                    out.push_str("<!DOCTYPE ");
                    out.push_str(name);
                    out.push('>');
                }
                NodeData::Comment(text) => {
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->");
                }
                NodeData::Text(text) => {
                    let raw = self.parent(id).is_some_and(|p| RAW_TEXT_ELEMENTS.contains(&self.tag_name(p)));
                    if raw {
                        out.push_str(text);
                    } else {
                        escape_text(text, out);
                    }
                }
                NodeData::Element { name, attrs } => {
                    out.push('<');
                    out.push_str(name);
                    for attr in attrs {
                        out.push(' ');
                        out.push_str(&attr.name);
                        out.push_str("=\"");
                        escape_attribute(&attr.value, out);
                        out.push('"');
                    }
                    out.push('>');

                    if !VOID_ELEMENTS.contains(&name.as_str()) {
                        stack.push(Step::Close(name.as_str()));
                        self.push_children(id, &mut stack);
                    }
                }
            }
        }
    }

    fn push_children(&self, id: NodeId, stack: &mut Vec<Step<'_>>) {
        let mut cur = self.last_child(id);
        while let Some(c) = cur {
            stack.push(Step::Open(c));
            cur = self.prev_sibling(c);
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_elements_have_no_end_tag() {
        let dom = Dom::parse(r#"<p>a<br>b<img src="x.png"></p>"#);
        let body = dom.body().unwrap();
        assert_eq!(dom.inner_html(body), r#"<p>a<br>b<img src="x.png"></p>"#);
    }

    #[test]
    fn test_escaping() {
        let dom = Dom::parse(r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp;&nbsp;3</p>"#);
        let body = dom.body().unwrap();
        assert_eq!(
            dom.inner_html(body),
            r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp;&nbsp;3</p>"#
        );
    }

    #[test]
    fn test_script_text_is_raw() {
        let dom = Dom::parse("<body><script>if (a < b && c) {}</script></body>");
        let body = dom.body().unwrap();
        assert_eq!(dom.inner_html(body), "<script>if (a < b && c) {}</script>");
    }

    #[test]
    fn test_to_html_keeps_doctype() {
        let dom = Dom::parse("<!DOCTYPE html><html><head></head><body></body></html>");
        assert_eq!(dom.to_html(), "<!DOCTYPE html><html><head></head><body></body></html>");
    }
}
