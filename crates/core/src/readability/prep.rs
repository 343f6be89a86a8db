//! Document preparation run once before metadata extraction and scoring.

use super::regexps::IMG_EXTENSIONS;
use super::scoring::{is_phrasing_content, is_single_image, is_whitespace, next_element};
use crate::dom::{Dom, NodeData, NodeId};

/// Full preparation sequence: noscript images, scripts, comments, styles,
/// `<br>` runs and `<font>` tags.
pub(crate) fn prep_document(dom: &mut Dom) {
    unwrap_noscript_images(dom);
    remove_scripts(dom);
    remove_comments(dom);

    let styles = dom.get_elements_by_tag_name(dom.document(), "style");
    dom.remove_nodes(&styles, |_, _| true);

    if let Some(body) = dom.body() {
        replace_brs(dom, body);
    }

    for font in dom.get_elements_by_tag_name(dom.document(), "font").into_iter().rev() {
        dom.set_tag_name(font, "span");
    }
}

pub(crate) fn remove_comments(dom: &mut Dom) {
    let mut comments = Vec::new();
    let mut stack = vec![dom.document()];
    while let Some(n) = stack.pop() {
        if matches!(dom.data(n), NodeData::Comment(_)) {
            comments.push(n);
        }
        stack.extend(dom.children(n));
    }
    for c in comments {
        dom.detach(c);
    }
}

pub(crate) fn remove_scripts(dom: &mut Dom) {
    let scripts = dom.get_elements_by_tag_name(dom.document(), "script");
    dom.remove_nodes(&scripts, |_, _| true);
    let noscripts = dom.get_elements_by_tag_name(dom.document(), "noscript");
    dom.remove_nodes(&noscripts, |_, _| true);
}

/// Replaces a placeholder image with the real one its following `<noscript>` holds.
///
/// Images carrying no source at all are dropped first so a bare placeholder
/// cannot shadow the noscript copy. Image-bearing attributes of the old image
/// are carried over, prefixed with `data-old-` on conflict.
pub(crate) fn unwrap_noscript_images(dom: &mut Dom) {
    let imgs = dom.get_elements_by_tag_name(dom.document(), "img");
    dom.remove_nodes(&imgs, |dom, img| {
        !dom.attributes(img).iter().any(|a| {
            matches!(a.name.as_str(), "src" | "data-src" | "srcset" | "data-srcset") || IMG_EXTENSIONS.is_match(&a.value)
        })
    });

    for noscript in dom.get_elements_by_tag_name(dom.document(), "noscript") {
        let content = dom.text_content(noscript);
        let holder = dom.create_element("div");
        for node in dom.parse_fragment(&content) {
            dom.append_child(holder, node);
        }
        if !is_single_image(dom, holder) {
            continue;
        }

        let Some(prev) = dom.previous_element_sibling(noscript) else {
            continue;
        };
        if !is_single_image(dom, prev) {
            continue;
        }

        let prev_img = if dom.tag_name(prev) == "img" {
            Some(prev)
        } else {
            dom.get_elements_by_tag_name(prev, "img").first().copied()
        };
        let (Some(prev_img), Some(&new_img)) = (prev_img, dom.get_elements_by_tag_name(holder, "img").first()) else {
            continue;
        };

        let carried: Vec<(String, String)> = dom
            .attributes(prev_img)
            .iter()
            .filter(|a| !a.value.is_empty())
            .filter(|a| a.name == "src" || a.name == "srcset" || IMG_EXTENSIONS.is_match(&a.value))
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        for (name, value) in carried {
            if dom.get_attribute(new_img, &name) == value {
                continue;
            }
            let target = if dom.has_attribute(new_img, &name) { format!("data-old-{name}") } else { name };
            dom.set_attribute(new_img, &target, &value);
        }

        if let Some(replacement) = dom.first_element_child(holder) {
            dom.replace_node(prev, replacement);
        }
    }
}

/// Turns runs of two or more `<br>` into a `<p>` holding the phrasing
/// content that follows, up to the next run.
pub(crate) fn replace_brs(dom: &mut Dom, root: NodeId) {
    for br in dom.get_elements_by_tag_name(root, "br") {
        if dom.parent(br).is_none() {
            continue;
        }

        let mut next = dom.next_sibling(br);
        let mut replaced = false;
        loop {
            next = next_element(dom, next);
            let Some(n) = next else { break };
            if dom.tag_name(n) != "br" {
                break;
            }
            replaced = true;
            let after = dom.next_sibling(n);
            dom.detach(n);
            next = after;
        }

        if !replaced {
            continue;
        }

        let p = dom.create_element("p");
        dom.replace_node(br, p);

        let mut next = dom.next_sibling(p);
        while let Some(n) = next {
            if dom.tag_name(n) == "br" {
                let after = next_element(dom, dom.next_sibling(n));
                if after.is_some_and(|a| dom.tag_name(a) == "br") {
                    break;
                }
            }
            if !is_phrasing_content(dom, n) {
                break;
            }
            let sibling = dom.next_sibling(n);
            dom.append_child(p, n);
            next = sibling;
        }

        while let Some(last) = dom.last_child(p) {
            if !is_whitespace(dom, last) {
                break;
            }
            dom.detach(last);
        }

        if let Some(parent) = dom.parent(p)
            && dom.tag_name(parent) == "p"
        {
            dom.set_tag_name(parent, "div");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_html(dom: &Dom) -> String {
        dom.inner_html(dom.body().unwrap())
    }

    #[test]
    fn test_replace_brs() {
        let mut dom = Dom::parse("<div>foo<br>bar<br> <br><br>abc</div>");
        let body = dom.body().unwrap();
        replace_brs(&mut dom, body);
        assert_eq!(body_html(&dom), "<div>foo<br>bar<p> abc</p></div>");
    }

    #[test]
    fn test_replace_brs_stops_at_next_run() {
        let mut dom = Dom::parse("<div>a<br><br>b<br><br>c</div>");
        let body = dom.body().unwrap();
        replace_brs(&mut dom, body);
        assert_eq!(body_html(&dom), "<div>a<p>b</p><p>c</p></div>");
    }

    #[test]
    fn test_prep_document_removes_noise() {
        let mut dom = Dom::parse(
            "<html><head><style>p{}</style><script>x()</script></head>\
             <body><!-- c --><font color=red>t</font><noscript>n</noscript></body></html>",
        );
        prep_document(&mut dom);
        assert_eq!(body_html(&dom), r#"<span color="red">t</span>"#);
        assert!(dom.get_elements_by_tag_name(dom.document(), "style").is_empty());
        assert!(dom.get_elements_by_tag_name(dom.document(), "script").is_empty());
    }

    #[test]
    fn test_unwrap_noscript_images() {
        let mut dom = Dom::parse(
            r#"<body><img src="placeholder.gif" data-lazy="real.jpg"><noscript><img src="real.jpg"></noscript></body>"#,
        );
        unwrap_noscript_images(&mut dom);
        let imgs = dom.get_elements_by_tag_name(dom.document(), "img");
        assert_eq!(imgs.len(), 1);
        assert_eq!(dom.get_attribute(imgs[0], "src"), "real.jpg");
        assert_eq!(dom.get_attribute(imgs[0], "data-old-src"), "placeholder.gif");
        assert_eq!(dom.get_attribute(imgs[0], "data-lazy"), "real.jpg");
    }

    #[test]
    fn test_unwrap_removes_sourceless_images() {
        let mut dom = Dom::parse(r#"<body><img alt="x"><img src="a.png"></body>"#);
        unwrap_noscript_images(&mut dom);
        assert_eq!(dom.get_elements_by_tag_name(dom.document(), "img").len(), 1);
    }
}
