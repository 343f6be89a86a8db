//! Patterns and tag lists used by the readability heuristics.

use std::sync::LazyLock;

use regex::Regex;

fn rx(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

pub(crate) static UNLIKELY_CANDIDATES: LazyLock<Regex> = LazyLock::new(|| {
    rx(r"(?i)-ad-|ai2html|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote")
});
pub(crate) static MAYBE_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| rx(r"(?i)and|article|body|column|content|main|shadow"));
pub(crate) static POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    rx(r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story")
});
pub(crate) static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    rx(r"(?i)hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|foot|footer|footnote|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|tool|widget")
});
pub(crate) static BYLINE: LazyLock<Regex> = LazyLock::new(|| rx(r"(?i)byline|author|dateline|writtenby|p-author"));
pub(crate) static NORMALIZE: LazyLock<Regex> = LazyLock::new(|| rx(r"\s{2,}"));
pub(crate) static VIDEOS: LazyLock<Regex> = LazyLock::new(|| {
    rx(r"(?i)//(www\.)?((dailymotion|youtube|youtube-nocookie|player\.vimeo|v\.qq)\.com|(archive|upload\.wikimedia)\.org|player\.twitch\.tv)")
});
pub(crate) static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| rx(r"^\s*$"));
pub(crate) static HAS_CONTENT: LazyLock<Regex> = LazyLock::new(|| rx(r"\S$"));
pub(crate) static PROPERTY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    rx(r"(?i)\s*(dc|dcterm|og|twitter)\s*:\s*(author|creator|description|title|site_name|image\S*)\s*")
});
pub(crate) static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    rx(r"(?i)^\s*(?:(dc|dcterm|og|twitter|weibo:(article|webpage))\s*[\.:]\s*)?(author|creator|description|title|site_name|image)\s*$")
});
pub(crate) static TITLE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| rx(r" [\|\-\\/>»] "));
pub(crate) static TITLE_HIERARCHY_SEP: LazyLock<Regex> = LazyLock::new(|| rx(r" [\\/>»] "));
pub(crate) static TITLE_REMOVE_FINAL_PART: LazyLock<Regex> = LazyLock::new(|| rx(r"^(.*)[\|\-\\/>»] .*$"));
pub(crate) static TITLE_REMOVE_FIRST_PART: LazyLock<Regex> = LazyLock::new(|| rx(r"^[^\|\-\\/>»]*[\|\-\\/>»](.*)$"));
pub(crate) static TITLE_ANY_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| rx(r"[\|\-\\/>»]+"));
pub(crate) static DISPLAY_NONE: LazyLock<Regex> = LazyLock::new(|| rx(r"(?i)display\s*:\s*none"));
pub(crate) static SENTENCE_PERIOD: LazyLock<Regex> = LazyLock::new(|| rx(r"\.( |$)"));
pub(crate) static SHARE_ELEMENTS: LazyLock<Regex> = LazyLock::new(|| rx(r"(?i)(\b|_)(share|sharedaddy)(\b|_)"));
pub(crate) static FAVICON_SIZE: LazyLock<Regex> = LazyLock::new(|| rx(r"(\d+)x(\d+)"));
pub(crate) static LAZY_IMAGE_SRCSET: LazyLock<Regex> = LazyLock::new(|| rx(r"(?i)\.(jpg|jpeg|png|webp)\s+\d"));
pub(crate) static LAZY_IMAGE_SRC: LazyLock<Regex> = LazyLock::new(|| rx(r"(?i)^\s*\S+\.(jpg|jpeg|png|webp)\S*\s*$"));
pub(crate) static IMG_EXTENSIONS: LazyLock<Regex> = LazyLock::new(|| rx(r"(?i)\.(jpg|jpeg|png|webp)"));
pub(crate) static SRCSET_URL: LazyLock<Regex> = LazyLock::new(|| rx(r"(\S+)(\s+[\d.]+[xw])?(\s*(?:,|$))"));
pub(crate) static B64_DATA_URL: LazyLock<Regex> = LazyLock::new(|| rx(r"(?i)^data:\s*([^\s;,]+)\s*;\s*base64\s*"));

/// Roles whose subtrees are never article content.
pub(crate) const UNLIKELY_ROLES: &[&str] =
    &["menu", "menubar", "complementary", "navigation", "alert", "alertdialog", "dialog"];

pub(crate) const TAGS_TO_SCORE: &[&str] = &["section", "h2", "h3", "h4", "h5", "h6", "p", "td", "pre"];

pub(crate) const DIV_TO_P_ELEMS: &[&str] = &["a", "blockquote", "dl", "div", "img", "ol", "p", "pre", "table", "ul", "select"];

pub(crate) const ALTER_TO_DIV_EXCEPTIONS: &[&str] = &["div", "article", "section", "p"];

pub(crate) const PRESENTATIONAL_ATTRIBUTES: &[&str] = &[
    "align", "background", "bgcolor", "border", "cellpadding", "cellspacing", "frame", "hspace", "rules", "style", "valign",
    "vspace",
];

pub(crate) const DEPRECATED_SIZE_ATTRIBUTE_ELEMS: &[&str] = &["table", "th", "td", "hr", "pre"];

pub(crate) const PHRASING_ELEMS: &[&str] = &[
    "abbr", "audio", "b", "bdo", "br", "button", "cite", "code", "data", "datalist", "dfn", "em", "embed", "i", "img", "input",
    "kbd", "label", "mark", "math", "meter", "noscript", "object", "output", "progress", "q", "ruby", "samp", "script",
    "select", "small", "span", "strong", "sub", "sup", "textarea", "time", "var", "wbr",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlikely_and_maybe() {
        assert!(UNLIKELY_CANDIDATES.is_match("sidebar left"));
        assert!(!MAYBE_CANDIDATE.is_match("sidebar left"));
        assert!(MAYBE_CANDIDATE.is_match("main-sidebar"));
    }

    #[test]
    fn test_title_parts() {
        let title = "Greatest Widgets Ever | Acme Corp";
        assert!(TITLE_SEPARATOR.is_match(title));
        assert!(!TITLE_HIERARCHY_SEP.is_match(title));
        assert_eq!(TITLE_REMOVE_FINAL_PART.replace(title, "$1"), "Greatest Widgets Ever ");
        assert_eq!(TITLE_REMOVE_FIRST_PART.replace(title, "$1"), " Acme Corp");
    }

    #[test]
    fn test_srcset_entries() {
        let caps: Vec<&str> = SRCSET_URL
            .captures_iter("a.jpg 1x, b.jpg 2x")
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        assert_eq!(caps, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_b64_data_url() {
        let caps = B64_DATA_URL.captures("data:image/gif;base64,R0lGOD").unwrap();
        assert_eq!(&caps[1], "image/gif");
    }
}
