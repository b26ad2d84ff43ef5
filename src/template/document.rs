//! Owned, mutable markup tree.
//!
//! `tl` gives a borrowed, read-only DOM. Templates need nodes removed and
//! appended, so the parsed DOM is converted into [`Node`]s once and
//! serialized back by hand. Raw-text bodies are masked before `tl` sees
//! them and attributes are read from the start tag, so both come back
//! exactly as written.

use super::groups::ScriptGroups;
use crate::utils::html::{ContentModel, MaskedMarkup, quote_attr, start_tag_attrs};
use regex::Regex;
use std::sync::LazyLock;

/// Leading doctype; kept aside because `tl` does not model it.
static DOCTYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t\r\n\x0C]*<![dD][oO][cC][tT][yY][pP][eE][^>]*>").expect("doctype pattern is valid")
});

/// Attribute names of injected aggregate references.
const TYPE_ATTR: &str = "type";
const SRC_ATTR: &str = "src";
const SCRIPT_TYPE: &str = "application/javascript";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Text exactly as written (entities left encoded).
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, Option<String>)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_owned(), Some(value.to_owned())));
        self
    }

    /// Attribute value (names compare case-insensitively).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_deref())
    }

    fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A parsed markup document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    doctype: Option<String>,
    nodes: Vec<Node>,
}

impl Document {
    /// Parse markup. `keep_comments = false` drops comment nodes.
    pub fn parse(source: &str, keep_comments: bool) -> Result<Self, String> {
        let (doctype, body) = match DOCTYPE.find(source) {
            Some(m) => (Some(m.as_str().to_owned()), &source[m.end()..]),
            None => (None, source),
        };

        let masked = MaskedMarkup::new(body);
        let dom = tl::parse(&masked.markup, tl::ParserOptions::default())
            .map_err(|e| format!("{e:?}"))?;
        let cx = Convert {
            parser: dom.parser(),
            masked: &masked,
            keep_comments,
        };
        let nodes = dom
            .children()
            .iter()
            .filter_map(|handle| cx.node(*handle))
            .collect();

        Ok(Self { doctype, nodes })
    }

    /// Remove every eligible grouped `script` node and collect its group.
    ///
    /// Eligible: a non-empty `attribute` value and a `src`. Scripts carrying
    /// the attribute without a usable pair stay in place.
    pub fn extract_groups(&mut self, attribute: &str) -> ScriptGroups {
        let mut groups = ScriptGroups::default();
        extract(&mut self.nodes, attribute, &mut groups);
        groups
    }

    /// Append one aggregate `script` per key as last children of `<body>`
    /// (or `<html>`, or the document when neither exists).
    pub fn append_scripts<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) {
        let scripts = keys.into_iter().map(|key| {
            Node::Element(
                Element::new("script")
                    .with_attr(TYPE_ATTR, SCRIPT_TYPE)
                    .with_attr(SRC_ATTR, key),
            )
        });

        let container = ["body", "html"]
            .into_iter()
            .find(|name| contains_element(&self.nodes, name));
        if let Some(name) = container
            && let Some(elem) = find_element(&mut self.nodes, name)
        {
            elem.children.extend(scripts);
        } else {
            self.nodes.extend(scripts);
        }
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        if let Some(doctype) = &self.doctype {
            out.push_str(doctype);
        }
        for node in &self.nodes {
            write_node(&mut out, node);
        }
        out
    }

    #[cfg(test)]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

// ============================================================================
// tl conversion
// ============================================================================

struct Convert<'p, 'a> {
    parser: &'p tl::Parser<'a>,
    masked: &'p MaskedMarkup,
    keep_comments: bool,
}

impl Convert<'_, '_> {
    fn node(&self, handle: tl::NodeHandle) -> Option<Node> {
        match handle.get(self.parser)? {
            tl::Node::Tag(tag) => {
                let name = tag.name().as_utf8_str().to_lowercase();
                let attrs = start_tag_attrs(&tag.raw().as_utf8_str());

                let children = if ContentModel::of(&name) == ContentModel::RawText {
                    let inner = tag.inner_html(self.parser);
                    let text = self.masked.restore(&inner);
                    if text.is_empty() {
                        Vec::new()
                    } else {
                        vec![Node::Text(text.to_owned())]
                    }
                } else {
                    tag.children()
                        .top()
                        .iter()
                        .filter_map(|child| self.node(*child))
                        .collect()
                };

                Some(Node::Element(Element {
                    name,
                    attrs,
                    children,
                }))
            }
            tl::Node::Raw(bytes) => Some(Node::Text(bytes.as_utf8_str().to_string())),
            tl::Node::Comment(bytes) => self
                .keep_comments
                .then(|| Node::Comment(bytes.as_utf8_str().to_string())),
        }
    }
}

// ============================================================================
// mutation
// ============================================================================

fn extract(nodes: &mut Vec<Node>, attribute: &str, groups: &mut ScriptGroups) {
    nodes.retain_mut(|node| {
        let Node::Element(elem) = node else {
            return true;
        };
        if !elem.is("script") {
            extract(&mut elem.children, attribute, groups);
            return true;
        }

        let Some(key) = elem.attr(attribute) else {
            return true;
        };
        match elem.attr(SRC_ATTR) {
            Some(src) if !key.trim().is_empty() && !src.trim().is_empty() => {
                groups.push(key.trim(), src.trim());
                false
            }
            _ => {
                crate::debug!("template"; "script with {}=\"{}\" has no usable src, left in place", attribute, key);
                true
            }
        }
    });
}

fn contains_element(nodes: &[Node], name: &str) -> bool {
    nodes.iter().any(|node| match node {
        Node::Element(elem) => elem.is(name) || contains_element(&elem.children, name),
        _ => false,
    })
}

fn find_element<'a>(nodes: &'a mut [Node], name: &str) -> Option<&'a mut Element> {
    for node in nodes {
        if let Node::Element(elem) = node {
            if elem.is(name) {
                return Some(elem);
            }
            if let Some(found) = find_element(&mut elem.children, name) {
                return Some(found);
            }
        }
    }
    None
}

// ============================================================================
// serialization
// ============================================================================

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(text) => out.push_str(text),
        Node::Comment(text) if text.starts_with("<!--") => out.push_str(text),
        Node::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Node::Element(elem) => write_element(out, elem),
    }
}

fn write_element(out: &mut String, elem: &Element) {
    out.push('<');
    out.push_str(&elem.name);
    for (name, value) in &elem.attrs {
        out.push(' ');
        out.push_str(name);
        if let Some(value) = value {
            out.push_str("=\"");
            out.push_str(&quote_attr(value));
            out.push('"');
        }
    }

    if ContentModel::of(&elem.name) == ContentModel::Void {
        out.push_str(" />");
        return;
    }

    out.push('>');
    for child in &elem.children {
        write_node(out, child);
    }
    out.push_str("</");
    out.push_str(&elem.name);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Document {
        Document::parse(html, false).unwrap()
    }

    #[test]
    fn test_serialize_roundtrip_simple() {
        let html = r#"<html><head><title>T</title></head><body><p class="x">a &amp; b</p></body></html>"#;
        assert_eq!(parse(html).serialize(), html);
    }

    #[test]
    fn test_doctype_kept() {
        let doc = parse("<!DOCTYPE html>\n<html><body></body></html>");
        assert!(doc.serialize().starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_void_elements() {
        let doc = parse(r#"<div><br><img src="a.png"></div>"#);
        assert_eq!(doc.serialize(), r#"<div><br /><img src="a.png" /></div>"#);
    }

    #[test]
    fn test_script_body_untouched() {
        let html = "<body><script>var s = 'x';\ngo(s);</script></body>";
        assert_eq!(parse(html).serialize(), html);
    }

    #[test]
    fn test_inline_script_with_markup_characters_untouched() {
        let html = concat!(
            "<body><script>if (a < b && c > d) { x = \"<p>hi</p>\"; document.write(\"</div>\"); }</script>",
            "<p>after</p></body>"
        );
        assert_eq!(parse(html).serialize(), html);
    }

    #[test]
    fn test_group_after_inline_script_with_less_than() {
        let mut doc = parse(concat!(
            "<html><body><script>if (a < b) { go(); }</script>",
            r#"<script data-script-min="/min/a.min.js" src="/js/a.js"></script>"#,
            "</body></html>"
        ));
        let groups = doc.extract_groups("data-script-min");
        assert_eq!(groups.get("/min/a.min.js").unwrap(), ["/js/a.js"]);
        assert_eq!(
            doc.serialize(),
            "<html><body><script>if (a < b) { go(); }</script></body></html>"
        );
    }

    #[test]
    fn test_attribute_order_preserved() {
        let html = r#"<div id="i" class="c" data-a="1" lang="en" data-b="2" title="t" data-c="3" dir="ltr">x</div>"#;
        for _ in 0..4 {
            assert_eq!(parse(html).serialize(), html);
        }
    }

    #[test]
    fn test_lowercase_doctype_with_leading_whitespace() {
        let doc = parse("\n  <!doctype html><p>x</p>");
        assert_eq!(doc.serialize(), "\n  <!doctype html><p>x</p>");
    }

    #[test]
    fn test_comments_dropped_unless_kept() {
        let html = "<body><!-- note --><p>x</p></body>";
        assert_eq!(parse(html).serialize(), "<body><p>x</p></body>");
        let kept = Document::parse(html, true).unwrap();
        assert!(kept.serialize().contains("note"));
    }

    #[test]
    fn test_extract_groups_removes_nodes() {
        let mut doc = parse(concat!(
            "<body><div>",
            r#"<script data-script-min="/min/a.js" src="/js/1.js"></script>"#,
            "</div>",
            r#"<script data-script-min="/min/b.js" src="/js/2.js"></script>"#,
            r#"<script data-script-min="/min/a.js" src="/js/3.js"></script>"#,
            r#"<script src="/js/keep.js"></script>"#,
            "</body>"
        ));
        let groups = doc.extract_groups("data-script-min");

        assert_eq!(groups.keys().collect::<Vec<_>>(), ["/min/a.js", "/min/b.js"]);
        assert_eq!(groups.get("/min/a.js").unwrap(), ["/js/1.js", "/js/3.js"]);
        let html = doc.serialize();
        assert!(!html.contains("/js/1.js"));
        assert!(html.contains("/js/keep.js"));
    }

    #[test]
    fn test_ineligible_scripts_stay() {
        let mut doc = parse(concat!(
            "<body>",
            r#"<script data-script-min="/min/a.js">inline()</script>"#,
            r#"<script data-script-min="" src="/js/1.js"></script>"#,
            "</body>"
        ));
        assert!(doc.extract_groups("data-script-min").is_empty());
        assert_eq!(doc.nodes().len(), 1);
    }

    #[test]
    fn test_append_scripts_to_body() {
        let mut doc = parse("<html><body><p>x</p></body></html>");
        doc.append_scripts(["/min/a.js", "/min/b.js"]);
        assert_eq!(
            doc.serialize(),
            concat!(
                "<html><body><p>x</p>",
                r#"<script type="application/javascript" src="/min/a.js"></script>"#,
                r#"<script type="application/javascript" src="/min/b.js"></script>"#,
                "</body></html>"
            )
        );
    }

    #[test]
    fn test_append_scripts_without_body() {
        let mut doc = parse("<p>x</p>");
        doc.append_scripts(["a.js"]);
        assert!(doc.serialize().ends_with(r#"<script type="application/javascript" src="a.js"></script>"#));
    }
}
