use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::{ScanOutput, resolve, trim_quotes, unwrap_css_url};
use crate::model::Resource;
use crate::uri::is_http_url;

static ARCHIVABLE_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((text|application)/(java|ecma)script|text/css|image/|audio/|video/)").expect("valid regex")
});

/// Identifiers after which a `/` starts a regular expression rather than a division.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "await", "case", "delete", "do", "else", "in", "instanceof", "new", "of", "return", "throw", "typeof", "void",
    "yield",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Blank,
    Str,
    Word,
    Punct,
    Literal,
}

/// Rewrites URL-bearing string literals in a script to archival names.
///
/// Only single- and double-quoted strings are considered. A string holding a
/// CSS `url(...)` is rewritten to `"url('<name>')"`. A string starting with
/// `/` or an http(s) scheme is rewritten to `"<name>"` when its path names a
/// script, stylesheet, image, audio or video file. Everything else, including
/// comments, template literals and regular expressions, is copied through.
pub fn scan_js(input: &str, base: &Url) -> ScanOutput {
    let mut out = ScanOutput { text: String::with_capacity(input.len()), resources: Vec::new() };
    let mut rest = input;
    let mut regex_allowed = true;

    while !rest.is_empty() {
        let (token, len) = next_token(rest, regex_allowed);
        let (text, tail) = rest.split_at(len);
        rest = tail;

        regex_allowed = match token {
            Token::Blank => regex_allowed,
            Token::Word => EXPRESSION_KEYWORDS.contains(&text),
            Token::Punct => !matches!(text, ")" | "]" | "++" | "--"),
            Token::Str | Token::Literal => false,
        };

        if token == Token::Str
            && let Some((replacement, resource)) = rewrite_string(text, base)
        {
            out.text.push_str(&replacement);
            out.resources.push(resource);
            continue;
        }
        out.text.push_str(text);
    }

    out
}

fn rewrite_string(token: &str, base: &Url) -> Option<(String, Resource)> {
    let value = trim_quotes(token.trim());

    if value.starts_with("url(") {
        let resource = resolve(unwrap_css_url(value), base)?;
        return Some((format!("\"url('{}')\"", resource.name), resource));
    }

    if value.starts_with('/') || is_http_url(value) {
        let resource = resolve(value, base)?;
        if !is_archivable_type(&resource.url) {
            return None;
        }
        return Some((format!("\"{}\"", resource.name), resource));
    }

    None
}

fn is_archivable_type(url: &str) -> bool {
    let Ok(url) = Url::parse(url) else {
        return false;
    };
    mime_guess::from_path(url.path())
        .first_raw()
        .is_some_and(|mime| ARCHIVABLE_TYPE.is_match(mime))
}

fn next_token(s: &str, regex_allowed: bool) -> (Token, usize) {
    let bytes = s.as_bytes();
    match bytes[0] {
        b'/' if bytes.get(1) == Some(&b'/') => (Token::Blank, s.find('\n').unwrap_or(s.len())),
        b'/' if bytes.get(1) == Some(&b'*') => (Token::Blank, s[2..].find("*/").map_or(s.len(), |end| end + 4)),
        b'/' if regex_allowed => match regex_len(s) {
            Some(len) => (Token::Literal, len),
            None => (Token::Punct, 1),
        },
        quote @ (b'"' | b'\'') => (Token::Str, string_len(s, quote)),
        b'`' => (Token::Literal, template_len(s)),
        c if c.is_ascii_whitespace() => {
            let len = s.find(|c: char| !c.is_ascii_whitespace()).unwrap_or(s.len());
            (Token::Blank, len)
        }
        c if is_word_byte(c) => {
            let len = s
                .char_indices()
                .find(|&(_, c)| !(c.is_ascii_alphanumeric() || c == '$' || c == '_' || !c.is_ascii()))
                .map_or(s.len(), |(i, _)| i);
            (Token::Word, len)
        }
        b'+' | b'-' if bytes.get(1) == Some(&bytes[0]) => (Token::Punct, 2),
        _ => (Token::Punct, s.chars().next().map_or(1, char::len_utf8)),
    }
}

fn is_word_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'$' || c == b'_' || c >= 0x80
}

/// Length of a quoted string. Unterminated strings run to the end of the line.
fn string_len(s: &str, quote: u8) -> usize {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    s.len()
}

/// Length of a template literal, skipping over `${...}` substitutions.
fn template_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'$' if depth == 0 && bytes.get(i + 1) == Some(&b'{') => {
                depth = 1;
                i += 1;
            }
            b'{' if depth > 0 => depth += 1,
            b'}' if depth > 0 => depth -= 1,
            b'`' if depth == 0 => return i + 1,
            _ => {}
        }
        i += 1;
    }
    s.len()
}

/// Length of a regular expression literal with its flags, `None` if the line ends first.
fn regex_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut in_class = false;
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'\n' | b'\r' => return None,
            b'[' => in_class = true,
            b']' => in_class = false,
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                return Some(i);
            }
            _ => {}
        }
        i += 1;
    }
    None
}
