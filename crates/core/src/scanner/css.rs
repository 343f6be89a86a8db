use std::fmt::Write as _;

use url::Url;

use super::{ScanOutput, resolve, unwrap_css_url};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Url,
    /// `@import` followed by a quoted string starting at the given offset.
    Import(usize),
    Other,
}

/// Rewrites every `url(...)` and `@import "..."` in a stylesheet to its archival name.
///
/// Comments and quoted strings are copied through untouched, so a `url(`
/// that appears inside either is not treated as a reference. References that
/// cannot be archived (empty, `data:` URIs, fragments) are left as written.
pub fn scan_css(input: &str, base: &Url) -> ScanOutput {
    let mut out = ScanOutput { text: String::with_capacity(input.len()), resources: Vec::new() };
    let mut rest = input;

    while !rest.is_empty() {
        let (token, len) = next_token(rest);
        let (text, tail) = rest.split_at(len);
        rest = tail;

        if token == Token::Url
            && let Some(resource) = resolve(unwrap_css_url(text), base)
        {
            let _ = write!(out.text, "url(\"{}\")", resource.name);
            out.resources.push(resource);
            continue;
        }
        if let Token::Import(quote) = token
            && let Some(resource) = resolve(&text[quote + 1..text.len() - 1], base)
        {
            let _ = write!(out.text, "{}\"{}\"", &text[..quote], resource.name);
            out.resources.push(resource);
            continue;
        }
        out.text.push_str(text);
    }

    out
}

/// Classifies the token at the start of `s`, returning it with its byte length.
fn next_token(s: &str) -> (Token, usize) {
    let bytes = s.as_bytes();
    match bytes[0] {
        b'/' if bytes.get(1) == Some(&b'*') => {
            let len = s[2..].find("*/").map_or(s.len(), |end| end + 4);
            (Token::Other, len)
        }
        b'@' => import_len(s).map_or((Token::Other, 1), |(quote, len)| (Token::Import(quote), len)),
        quote @ (b'"' | b'\'') => (Token::Other, string_len(s, quote)),
        b'\\' => (Token::Other, escape_len(s)),
        c if is_ident_byte(c) => {
            let ident = ident_len(s);
            if s[..ident].eq_ignore_ascii_case("url")
                && bytes.get(ident) == Some(&b'(')
                && let Some(len) = url_len(s, ident + 1)
            {
                return (Token::Url, len);
            }
            (Token::Other, ident)
        }
        _ => (Token::Other, s.chars().next().map_or(1, char::len_utf8)),
    }
}

fn is_ident_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_' || c >= 0x80
}

fn ident_len(s: &str) -> usize {
    s.char_indices()
        .find(|&(_, c)| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()))
        .map_or(s.len(), |(i, _)| i)
}

/// A backslash and the character it escapes.
fn escape_len(s: &str) -> usize {
    1 + s[1..].chars().next().map_or(0, char::len_utf8)
}

/// Length of a quoted string, ending at the closing quote or an unescaped newline.
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

/// Offset of the string and total length of an `@import "..."` rule head.
///
/// The string must be closed; `@import url(...)` is left to the `url(` scanner.
fn import_len(s: &str) -> Option<(usize, usize)> {
    let ident = 1 + ident_len(&s[1..]);
    if !s[1..ident].eq_ignore_ascii_case("import") {
        return None;
    }
    let bytes = s.as_bytes();
    let mut i = ident;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    let quote @ (b'"' | b'\'') = *bytes.get(i)? else {
        return None;
    };
    let len = string_len(&s[i..], quote);
    (len >= 2 && bytes[i + len - 1] == quote).then_some((i, i + len))
}

/// Length of a `url(` token whose argument starts at `start`, `None` when it never closes.
fn url_len(s: &str, start: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    if let Some(&quote @ (b'"' | b'\'')) = bytes.get(i) {
        i += string_len(&s[i..], quote);
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        return (bytes.get(i) == Some(&b')')).then_some(i + 1);
    }

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b')' => return Some(i + 1),
            b'"' | b'\'' | b'(' => return None,
            _ => i += 1,
        }
    }
    None
}
