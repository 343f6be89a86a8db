//! Image and link rewriting shared by the readability engine and the archiver.

use url::Url;

use super::regexps::{B64_DATA_URL, IMG_EXTENSIONS, LAZY_IMAGE_SRC, LAZY_IMAGE_SRCSET, SRCSET_URL};
use super::scoring::is_valid_url;
use crate::dom::{Dom, NodeId};
use crate::uri::to_absolute;

/// Base64 payloads shorter than this are treated as placeholders.
const MIN_B64_PAYLOAD: usize = 133;

/// Promotes lazy-loading attributes (`data-src` and friends) into `src`/`srcset`.
///
/// Tiny base64 placeholders are dropped when another attribute points at a
/// real image. A `<figure>` with no image gets one.
pub fn fix_lazy_images(dom: &mut Dom, root: NodeId) {
    for elem in dom.get_all_nodes_with_tag(root, &["img", "picture", "figure"]) {
        let mut src = dom.get_attribute(elem, "src").to_string();
        let srcset = dom.get_attribute(elem, "srcset").to_string();
        let tag = dom.tag_name(elem).to_string();
        let class = dom.get_attribute(elem, "class").to_lowercase();

        if let Some(caps) = B64_DATA_URL.captures(&src) {
            if &caps[1] == "image/svg+xml" {
                continue;
            }

            let can_remove = dom
                .attributes(elem)
                .iter()
                .any(|a| a.name != "src" && IMG_EXTENSIONS.is_match(&a.value) && is_valid_url(&a.value));

            if can_remove {
                let payload_start = src.find("base64").map_or(0, |i| i + 7);
                if src.len().saturating_sub(payload_start) < MIN_B64_PAYLOAD {
                    src.clear();
                    dom.remove_attribute(elem, "src");
                }
            }
        }

        if (!src.is_empty() || !srcset.is_empty()) && !class.contains("lazy") {
            continue;
        }

        let candidates: Vec<(String, String)> = dom
            .attributes(elem)
            .iter()
            .filter(|a| a.name != "src" && a.name != "srcset")
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();

        for (_, value) in candidates {
            let copy_to = if LAZY_IMAGE_SRCSET.is_match(&value) {
                "srcset"
            } else if LAZY_IMAGE_SRC.is_match(&value) {
                "src"
            } else {
                continue;
            };
            if !is_valid_url(&value) {
                continue;
            }

            match tag.as_str() {
                "img" | "picture" => dom.set_attribute(elem, copy_to, &value),
                "figure" if dom.get_all_nodes_with_tag(elem, &["img", "picture"]).is_empty() => {
                    let img = dom.create_element("img");
                    dom.set_attribute(img, copy_to, &value);
                    dom.append_child(elem, img);
                }
                _ => {}
            }
        }
    }
}

/// Makes every link and media reference under `root` absolute.
///
/// `javascript:` links are unwrapped: a link holding only text becomes that
/// text, anything richer becomes a `<span>` with the link's children.
pub fn fix_relative_uris(dom: &mut Dom, root: NodeId, base: &Url) {
    for link in dom.get_elements_by_tag_name(root, "a") {
        let href = dom.get_attribute(link, "href").to_string();
        if href.is_empty() {
            continue;
        }

        if href.starts_with("javascript:") {
            let children = dom.children(link);
            let replacement = if children.len() == 1 && dom.is_text(children[0]) {
                let text = dom.text_content(link);
                dom.create_text(&text)
            } else {
                let span = dom.create_element("span");
                for child in children {
                    let copy = dom.clone_node(child, true);
                    dom.append_child(span, copy);
                }
                span
            };
            dom.replace_node(link, replacement);
        } else {
            let absolute = to_absolute(&href, base);
            if absolute.is_empty() {
                dom.remove_attribute(link, "href");
            } else {
                dom.set_attribute(link, "href", &absolute);
            }
        }
    }

    for media in dom.get_all_nodes_with_tag(root, &["img", "picture", "figure", "video", "audio", "source"]) {
        for name in ["src", "poster"] {
            let value = dom.get_attribute(media, name);
            if !value.is_empty() {
                let absolute = to_absolute(value, base);
                dom.set_attribute(media, name, &absolute);
            }
        }

        let srcset = dom.get_attribute(media, "srcset");
        if !srcset.is_empty() {
            let rewritten = rewrite_srcset(srcset, |url| to_absolute(url, base));
            dom.set_attribute(media, "srcset", &rewritten);
        }
    }
}

/// Applies `f` to the URL of every `srcset` candidate, keeping descriptors and separators.
pub fn rewrite_srcset<F>(srcset: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    SRCSET_URL
        .replace_all(srcset, |caps: &regex::Captures<'_>| {
            let descriptor = caps.get(2).map_or("", |m| m.as_str());
            let separator = caps.get(3).map_or("", |m| m.as_str());
            format!("{}{descriptor}{separator}", f(&caps[1]))
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://ex.com/blog/post.html").unwrap()
    }

    #[test]
    fn test_fix_lazy_images_promotes_data_src() {
        let mut dom = Dom::parse(r#"<img class="lazy" data-src="/img/a.jpg"><figure data-src="/img/b.png"></figure>"#);
        let body = dom.body().unwrap();
        fix_lazy_images(&mut dom, body);
        assert_eq!(
            dom.inner_html(body),
            r#"<img class="lazy" data-src="/img/a.jpg" src="/img/a.jpg"><figure data-src="/img/b.png"><img src="/img/b.png"></figure>"#
        );
    }

    #[test]
    fn test_fix_lazy_images_drops_tiny_placeholder() {
        let mut dom = Dom::parse(r#"<img src="data:image/gif;base64,R0lGODlhAQABAAAAACw=" data-src="/real.jpg">"#);
        let body = dom.body().unwrap();
        fix_lazy_images(&mut dom, body);
        let img = dom.first_element_child(body).unwrap();
        assert_eq!(dom.get_attribute(img, "src"), "/real.jpg");
    }

    #[test]
    fn test_fix_lazy_images_keeps_svg_data() {
        let html = r#"<img src="data:image/svg+xml;base64,PHN2Zz4=" data-src="/real.jpg">"#;
        let mut dom = Dom::parse(html);
        let body = dom.body().unwrap();
        fix_lazy_images(&mut dom, body);
        let img = dom.first_element_child(body).unwrap();
        assert!(dom.get_attribute(img, "src").starts_with("data:image/svg+xml"));
    }

    #[test]
    fn test_fix_relative_uris() {
        let mut dom = Dom::parse(
            r##"<a href="../about">about</a><a href="javascript:go()">run</a><a href="javascript:x()"><b>rich</b></a>
               <img src="pic.png" srcset="a.jpg 1x, /b.jpg 2x"><a href="#top">top</a>"##,
        );
        let body = dom.body().unwrap();
        fix_relative_uris(&mut dom, body, &base());
        let html = dom.inner_html(body);
        assert!(html.contains(r#"<a href="https://ex.com/about">about</a>"#));
        assert!(html.contains("run<span><b>rich</b></span>"));
        assert!(html.contains(r#"src="https://ex.com/blog/pic.png""#));
        assert!(html.contains(r#"srcset="https://ex.com/blog/a.jpg 1x, https://ex.com/b.jpg 2x""#));
        assert!(html.contains(r##"<a href="#top">top</a>"##));
    }
}
