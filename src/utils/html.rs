//! Markup helpers shared by the template tree.
//!
//! `tl` tokenizes the content of `script` and `style` like any other
//! markup, so [`MaskedMarkup`] swaps those bodies out before parsing and
//! [`start_tag_attrs`] reads attributes back in source order.

use std::borrow::Cow;

/// How an element's content is parsed and written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentModel {
    /// No content and no end tag (`<br />`, `<meta />`).
    Void,
    /// Content kept verbatim, never treated as markup (`script`, `style`,
    /// `textarea`, `title`).
    RawText,
    Normal,
}

impl ContentModel {
    pub fn of(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link"
            | "meta" | "source" | "track" | "wbr" => Self::Void,
            "script" | "style" | "textarea" | "title" => Self::RawText,
            _ => Self::Normal,
        }
    }
}

/// Make a raw attribute value safe inside double quotes.
///
/// Values come straight from the source markup with entities already
/// encoded, so only `"` is escaped.
#[inline]
pub fn quote_attr(s: &str) -> Cow<'_, str> {
    if s.contains('"') {
        Cow::Owned(s.replace('"', "&quot;"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Delimits a body placeholder; a private-use character never produced
/// by `tl` itself.
const MASK: char = '\u{E000}';

/// Markup whose raw-text bodies are replaced by numbered placeholders.
#[derive(Debug, Default)]
pub struct MaskedMarkup {
    pub markup: String,
    bodies: Vec<String>,
}

impl MaskedMarkup {
    pub fn new(source: &str) -> Self {
        let mut masked = Self::default();
        let mut copied = 0;
        let mut pos = 0;

        while let Some(offset) = source[pos..].find('<') {
            let lt = pos + offset;
            let rest = &source[lt..];

            if rest.starts_with("<!--") {
                match rest.find("-->") {
                    Some(end) => pos = lt + end + 3,
                    None => break,
                }
                continue;
            }

            let Some(name) = raw_text_name(rest) else {
                pos = lt + 1;
                continue;
            };
            let Some(open_end) = tag_end(source, lt) else {
                break;
            };
            let close = find_end_tag(source, open_end, &name).unwrap_or(source.len());

            if close > open_end {
                masked.markup.push_str(&source[copied..open_end]);
                masked.markup.push(MASK);
                masked.markup.push_str(&masked.bodies.len().to_string());
                masked.markup.push(MASK);
                masked.bodies.push(source[open_end..close].to_owned());
                copied = close;
            }
            pos = close.max(open_end);
        }

        masked.markup.push_str(&source[copied..]);
        masked
    }

    /// Original body behind `text`, or `text` itself when it is not a
    /// placeholder.
    pub fn restore<'a>(&'a self, text: &'a str) -> &'a str {
        text.strip_prefix(MASK)
            .and_then(|t| t.strip_suffix(MASK))
            .and_then(|index| index.parse::<usize>().ok())
            .and_then(|index| self.bodies.get(index))
            .map_or(text, String::as_str)
    }
}

/// Lowercase name of a raw-text start tag at the beginning of `rest`.
fn raw_text_name(rest: &str) -> Option<String> {
    let name: String = rest[1..]
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect();
    let boundary = rest[1 + name.len()..].chars().next();
    let ends_name = matches!(boundary, None | Some('>' | '/')) || boundary.is_some_and(|c| c.is_ascii_whitespace());

    let name = name.to_ascii_lowercase();
    (ends_name && ContentModel::of(&name) == ContentModel::RawText).then_some(name)
}

/// Byte index just past the `>` closing the tag that starts at `lt`.
fn tag_end(source: &str, lt: usize) -> Option<usize> {
    let mut quote = None;
    for (i, b) in source.bytes().enumerate().skip(lt + 1) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(i + 1),
            (None, _) => {}
        }
    }
    None
}

/// Byte index of the `</name` that ends a raw-text body starting at `from`.
fn find_end_tag(source: &str, from: usize, name: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut pos = from;
    while let Some(offset) = source[pos..].find("</") {
        let start = pos + offset;
        let name_end = start + 2 + name.len();
        if let Some(candidate) = bytes.get(start + 2..name_end)
            && candidate.eq_ignore_ascii_case(name.as_bytes())
            && bytes
                .get(name_end)
                .is_none_or(|&b| b.is_ascii_whitespace() || matches!(b, b'>' | b'/'))
        {
            return Some(start);
        }
        pos = start + 2;
    }
    None
}

/// Attributes of the start tag at the beginning of `raw`, in source order.
/// Values are returned as written, without entity decoding.
pub fn start_tag_attrs(raw: &str) -> Vec<(String, Option<String>)> {
    let mut attrs = Vec::new();
    let bytes = raw.as_bytes();
    let is_space = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_whitespace);

    // Skip `<` and the tag name
    let mut i = 1;
    while i < bytes.len() && !is_space(i) && !matches!(bytes[i], b'>' | b'/') {
        i += 1;
    }

    loop {
        while is_space(i) || bytes.get(i) == Some(&b'/') {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'>' {
            break;
        }

        let name_start = i;
        while i < bytes.len() && !is_space(i) && !matches!(bytes[i], b'=' | b'>' | b'/') {
            i += 1;
        }
        let name = raw[name_start..i].to_owned();

        let mut j = i;
        while is_space(j) {
            j += 1;
        }
        if bytes.get(j) != Some(&b'=') {
            attrs.push((name, None));
            continue;
        }
        i = j + 1;
        while is_space(i) {
            i += 1;
        }

        let value = match bytes.get(i) {
            Some(&q @ (b'"' | b'\'')) => {
                let start = i + 1;
                let end = raw[start..].find(q as char).map_or(raw.len(), |e| start + e);
                i = (end + 1).min(raw.len());
                &raw[start..end]
            }
            _ => {
                let start = i;
                while i < bytes.len() && !is_space(i) && bytes[i] != b'>' {
                    i += 1;
                }
                &raw[start..i]
            }
        };
        attrs.push((name, Some(value.to_owned())));
    }
    attrs
}
