//! Candidate selection: the walk, the scoring and the sibling join.

use tracing::debug;

use super::Parser;
use super::regexps::{
    ALTER_TO_DIV_EXCEPTIONS, BYLINE, MAYBE_CANDIDATE, SENTENCE_PERIOD, TAGS_TO_SCORE, UNLIKELY_CANDIDATES,
    UNLIKELY_ROLES,
};
use super::scoring::{
    char_count, get_next_node, has_ancestor_tag, has_child_block_element, has_single_tag_inside_element,
    inner_text, is_element_without_content, is_phrasing_content, is_probably_visible, is_whitespace,
    link_density, remove_and_get_next,
};
use crate::dom::{Dom, NodeId, include_node};

/// Attempts shorter than this never count as content, even as the last resort.
const MIN_ATTEMPT_LENGTH: usize = 25;
const MIN_PARAGRAPH_LENGTH: usize = 25;
const MIN_SHARED_ANCESTORS: usize = 3;

struct Attempt {
    dom: Dom,
    content: NodeId,
    text_length: usize,
}

impl Parser<'_> {
    /// Runs the extraction on a copy of `doc`, relaxing one heuristic per
    /// failed attempt. Returns the copy and the detached article container.
    pub(super) fn grab_article(&mut self, doc: &Dom) -> Option<(Dom, NodeId)> {
        let mut attempts: Vec<Attempt> = Vec::new();

        loop {
            let mut dom = doc.clone();
            self.scores.clear();
            self.data_tables.clear();

            let content = self.grab_attempt(&mut dom)?;
            let text_length = char_count(&inner_text(&dom, content, true));

            if text_length >= self.config.char_threshold {
                return Some((dom, content));
            }

            debug!(text_length, flags = ?self.flags, "extraction attempt below threshold");
            attempts.push(Attempt { dom, content, text_length });

            if self.flags.strip_unlikelys {
                self.flags.strip_unlikelys = false;
            } else if self.flags.use_weight_classes {
                self.flags.use_weight_classes = false;
            } else if self.flags.clean_conditionally {
                self.flags.clean_conditionally = false;
            } else {
                let best = attempts.into_iter().max_by_key(|a| a.text_length)?;
                if best.text_length < MIN_ATTEMPT_LENGTH {
                    return None;
                }
                return Some((best.dom, best.content));
            }
        }
    }

    fn grab_attempt(&mut self, dom: &mut Dom) -> Option<NodeId> {
        let page = dom.body()?;
        let elements_to_score = self.prepare_nodes(dom);
        let candidates = self.score_elements(dom, &elements_to_score);

        let (top, created) = self.select_top_candidate(dom, page, &candidates);
        let content = self.join_siblings(dom, top);

        self.prep_article(dom, content);

        if created {
            if let Some(first) = dom.first_element_child(content)
                && dom.tag_name(first) == "div"
            {
                dom.set_attribute(first, "id", "readability-page-1");
                dom.set_attribute(first, "class", "page");
            }
        } else {
            let page_div = dom.create_element("div");
            dom.set_attribute(page_div, "id", "readability-page-1");
            dom.set_attribute(page_div, "class", "page");
            dom.move_children(content, page_div);
            dom.append_child(content, page_div);
        }

        Some(content)
    }

    /// Walks the document removing junk and turning text-only divs into
    /// paragraphs. Returns the nodes worth scoring.
    fn prepare_nodes(&mut self, dom: &mut Dom) -> Vec<NodeId> {
        let mut elements_to_score = Vec::new();
        let mut node = dom.document_element();

        while let Some(n) = node {
            let match_string = dom.class_and_id(n);

            if !is_probably_visible(dom, n) || self.check_byline(dom, n, &match_string) {
                node = remove_and_get_next(dom, n);
                continue;
            }

            let tag = dom.tag_name(n).to_string();

            if self.flags.strip_unlikelys {
                if UNLIKELY_CANDIDATES.is_match(&match_string)
                    && !MAYBE_CANDIDATE.is_match(&match_string)
                    && !has_ancestor_tag(dom, n, "table", 3)
                    && tag != "body"
                    && tag != "a"
                {
                    node = remove_and_get_next(dom, n);
                    continue;
                }

                if UNLIKELY_ROLES.contains(&dom.get_attribute(n, "role")) {
                    node = remove_and_get_next(dom, n);
                    continue;
                }
            }

            if matches!(tag.as_str(), "div" | "section" | "header" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
                && is_element_without_content(dom, n)
            {
                node = remove_and_get_next(dom, n);
                continue;
            }

            if TAGS_TO_SCORE.contains(&tag.as_str()) {
                elements_to_score.push(n);
            }

            let mut current = n;
            if tag == "div" {
                wrap_phrasing_runs(dom, n);

                if has_single_tag_inside_element(dom, n, "p") && link_density(dom, n) < 0.25 {
                    if let Some(child) = dom.first_element_child(n) {
                        dom.replace_node(n, child);
                        current = child;
                        elements_to_score.push(child);
                    }
                } else if !has_child_block_element(dom, n) {
                    dom.set_tag_name(n, "p");
                    elements_to_score.push(n);
                }
            }

            node = get_next_node(dom, current, false);
        }

        elements_to_score
    }

    /// Scores paragraphs and spreads their score to up to three ancestors.
    /// Returns every ancestor that received a score, in discovery order.
    fn score_elements(&mut self, dom: &Dom, elements: &[NodeId]) -> Vec<NodeId> {
        let mut candidates = Vec::new();

        for &element in elements {
            if dom.parent(element).is_none_or(|p| !dom.is_element(p)) {
                continue;
            }

            let text = inner_text(dom, element, true);
            let length = char_count(&text);
            if length < MIN_PARAGRAPH_LENGTH {
                continue;
            }

            let ancestors = dom.ancestors(element, 3);
            if ancestors.is_empty() {
                continue;
            }

            let commas = text.chars().filter(|&c| c == ',' || c == '，').count();
            let content_score = 1.0 + commas as f64 + (length / 100).min(3) as f64;

            for (level, &ancestor) in ancestors.iter().enumerate() {
                if !dom.is_element(ancestor) || dom.parent(ancestor).is_none_or(|p| !dom.is_element(p)) {
                    continue;
                }

                if !self.has_score(ancestor) {
                    self.initialize_node(dom, ancestor);
                    candidates.push(ancestor);
                }

                let divider = match level {
                    0 => 1.0,
                    1 => 2.0,
                    _ => level as f64 * 3.0,
                };
                let score = self.score(ancestor) + content_score / divider;
                self.set_score(ancestor, score);
            }
        }

        for &candidate in &candidates {
            let scaled = self.score(candidate) * (1.0 - link_density(dom, candidate));
            self.set_score(candidate, scaled);
        }

        candidates
    }

    /// Picks the node the article is built around. The flag is set when no
    /// candidate qualified and the whole body was wrapped instead.
    fn select_top_candidate(&mut self, dom: &mut Dom, page: NodeId, candidates: &[NodeId]) -> (NodeId, bool) {
        let mut ranked = candidates.to_vec();
        ranked.sort_by(|a, b| self.score(*b).total_cmp(&self.score(*a)));
        ranked.truncate(self.config.nb_top_candidates);

        let Some(mut top) = ranked.first().copied().filter(|&t| dom.tag_name(t) != "body") else {
            let top = dom.create_element("div");
            dom.move_children(page, top);
            dom.append_child(page, top);
            self.initialize_node(dom, top);
            return (top, true);
        };

        let top_score = self.score(top);
        let alternative_ancestors: Vec<Vec<NodeId>> = ranked[1..]
            .iter()
            .filter(|&&c| self.score(c) / top_score >= 0.75)
            .map(|&c| dom.ancestors(c, 0))
            .collect();

        if alternative_ancestors.len() >= MIN_SHARED_ANCESTORS {
            let mut parent = dom.parent(top);
            while let Some(p) = parent
                && dom.tag_name(p) != "body"
            {
                let containing = alternative_ancestors.iter().filter(|list| include_node(list, p)).count();
                if containing >= MIN_SHARED_ANCESTORS {
                    top = p;
                    break;
                }
                parent = dom.parent(p);
            }
        }

        if !self.has_score(top) {
            self.initialize_node(dom, top);
        }

        // A parent scoring higher than its child marks content spread over several children.
        let mut last_score = self.score(top);
        let score_threshold = last_score / 3.0;
        let mut parent = dom.parent(top);
        while let Some(p) = parent
            && dom.is_element(p)
            && dom.tag_name(p) != "body"
        {
            if !self.has_score(p) {
                parent = dom.parent(p);
                continue;
            }
            let parent_score = self.score(p);
            if parent_score < score_threshold {
                break;
            }
            if parent_score > last_score {
                top = p;
                break;
            }
            last_score = parent_score;
            parent = dom.parent(p);
        }

        while let Some(p) = dom.parent(top)
            && dom.is_element(p)
            && dom.tag_name(p) != "body"
            && dom.element_children(p).len() == 1
        {
            top = p;
        }

        if !self.has_score(top) {
            self.initialize_node(dom, top);
        }

        (top, false)
    }

    /// Collects `top` and its related siblings into a new detached `<div>`.
    fn join_siblings(&mut self, dom: &mut Dom, top: NodeId) -> NodeId {
        let content = dom.create_element("div");
        let top_score = self.score(top);
        let threshold = f64::max(10.0, top_score * 0.2);
        let top_class = dom.get_attribute(top, "class").to_string();

        let siblings = match dom.parent(top) {
            Some(parent) => dom.element_children(parent),
            None => vec![top],
        };

        for sibling in siblings {
            let append = sibling == top || {
                let bonus = if !top_class.is_empty() && dom.get_attribute(sibling, "class") == top_class {
                    top_score * 0.2
                } else {
                    0.0
                };

                if self.has_score(sibling) && self.score(sibling) + bonus >= threshold {
                    true
                } else if dom.tag_name(sibling) == "p" {
                    let density = link_density(dom, sibling);
                    let text = inner_text(dom, sibling, true);
                    let length = char_count(&text);
                    (length > 80 && density < 0.25)
                        || (length < 80 && length > 0 && density == 0.0 && SENTENCE_PERIOD.is_match(&text))
                } else {
                    false
                }
            };

            if append {
                if !ALTER_TO_DIV_EXCEPTIONS.contains(&dom.tag_name(sibling)) {
                    dom.set_tag_name(sibling, "div");
                }
                dom.append_child(content, sibling);
            }
        }

        content
    }

    /// Captures the first plausible byline. Returns whether `node` was one.
    fn check_byline(&mut self, dom: &Dom, node: NodeId, match_string: &str) -> bool {
        if !self.article_byline.is_empty() {
            return false;
        }

        let marked = dom.get_attribute(node, "rel") == "author"
            || dom.get_attribute(node, "itemprop").contains("author")
            || BYLINE.is_match(match_string);
        if !marked {
            return false;
        }

        let text = dom.text_content(node);
        let length = char_count(text.trim());
        if length == 0 || length >= 100 {
            return false;
        }

        self.article_byline = text.split_whitespace().collect::<Vec<_>>().join(" ");
        true
    }
}

/// Wraps each run of phrasing children of `div` in a `<p>`, dropping
/// trailing whitespace from every run.
fn wrap_phrasing_runs(dom: &mut Dom, div: NodeId) {
    let mut paragraph: Option<NodeId> = None;
    let mut child = dom.first_child(div);

    while let Some(c) = child {
        let next = dom.next_sibling(c);

        if is_phrasing_content(dom, c) {
            if let Some(p) = paragraph {
                dom.append_child(p, c);
            } else if !is_whitespace(dom, c) {
                let p = dom.create_element("p");
                dom.insert_before(p, c);
                dom.append_child(p, c);
                paragraph = Some(p);
            }
        } else if let Some(p) = paragraph.take() {
            while let Some(last) = dom.last_child(p)
                && is_whitespace(dom, last)
            {
                dom.detach(last);
            }
        }

        child = next;
    }
}
