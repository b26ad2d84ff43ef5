//! Template classification and rewriting.
//!
//! A [`Template`] is a markup file whose grouped `script` references are
//! pulled out into [`ScriptGroups`] and replaced by one aggregate
//! reference per group at the end of `<body>`.
//!
//! ```text
//! <script data-script-min="/min/app.js" src="/js/a.js"></script>   ─┐
//! <script data-script-min="/min/app.js" src="/js/b.js"></script>   ─┴─> {"/min/app.js": ["/js/a.js", "/js/b.js"]}
//!
//! <body>...<script type="application/javascript" src="/min/app.js"></script></body>
//! ```

mod document;
mod groups;
mod scan;

use document::Document;
pub use groups::{ScriptGroup, ScriptGroups};
pub use scan::{Traversal, Visitor, WalkStats};

use crate::asset::Asset;
use crate::config::BuildSectionConfig;
use crate::config::section::build::DEFAULT_ATTRIBUTE;
use crate::pipeline::{PipelineError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A markup file of the source tree.
#[derive(Debug)]
pub struct Template {
    path: PathBuf,
    attribute: String,
    keep_comments: bool,
    parsed: Option<Parsed>,
    rendered: Option<Vec<u8>>,
}

#[derive(Debug)]
struct Parsed {
    original: Vec<u8>,
    document: Document,
    groups: ScriptGroups,
}

impl Template {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            attribute: DEFAULT_ATTRIBUTE.to_owned(),
            keep_comments: false,
            parsed: None,
            rendered: None,
        }
    }

    pub fn from_config(path: impl Into<PathBuf>, build: &BuildSectionConfig) -> Self {
        Self::new(path)
            .attribute(&build.attribute)
            .keep_comments(build.keep_comments)
    }

    pub fn attribute(mut self, attribute: &str) -> Self {
        self.attribute = attribute.to_owned();
        self
    }

    pub fn keep_comments(mut self, keep: bool) -> Self {
        self.keep_comments = keep;
        self
    }

    fn parse(&self) -> Result<Parsed> {
        let original = fs::read(&self.path).map_err(PipelineError::io(&self.path))?;
        let text = std::str::from_utf8(&original).map_err(|err| PipelineError::Parse {
            path: self.path.clone(),
            message: format!("not valid UTF-8: {err}"),
        })?;

        let mut document =
            Document::parse(text, self.keep_comments).map_err(|message| PipelineError::Parse {
                path: self.path.clone(),
                message,
            })?;
        let groups = document.extract_groups(&self.attribute);

        Ok(Parsed {
            original,
            document,
            groups,
        })
    }

    fn parsed(&mut self) -> Result<&mut Parsed> {
        let parsed = match self.parsed.take() {
            Some(parsed) => parsed,
            None => self.parse()?,
        };
        Ok(self.parsed.insert(parsed))
    }
}

impl Asset for Template {
    fn path(&self) -> &Path {
        &self.path
    }

    fn scripts(&mut self) -> Result<&ScriptGroups> {
        Ok(&self.parsed()?.groups)
    }

    /// Rewritten markup, or the original bytes when there are no groups.
    fn stream(&mut self) -> Result<Vec<u8>> {
        if let Some(rendered) = &self.rendered {
            return Ok(rendered.clone());
        }

        let parsed = self.parsed()?;
        let rendered = if parsed.groups.is_empty() {
            parsed.original.clone()
        } else {
            let keys: Vec<String> = parsed.groups.keys().map(str::to_owned).collect();
            parsed.document.append_scripts(keys.iter().map(String::as_str));
            parsed.document.serialize().into_bytes()
        };

        self.rendered = Some(rendered.clone());
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn template(dir: &TempDir, html: &str) -> Template {
        let path = dir.path().join("index.html");
        fs::write(&path, html).unwrap();
        Template::new(path)
    }

    #[test]
    fn test_no_groups_streams_original_bytes() {
        let dir = TempDir::new().unwrap();
        let html = "<!doctype html>\n<html>\n  <body><!-- c --><script src=\"/js/a.js\"></script></body>\n</html>\n";
        let mut template = template(&dir, html);

        assert!(template.scripts().unwrap().is_empty());
        assert_eq!(template.stream().unwrap(), html.as_bytes());
    }

    #[test]
    fn test_single_group_rewrite() {
        let dir = TempDir::new().unwrap();
        let mut template = template(
            &dir,
            r#"<html><body><p>hi</p><script data-script-min="/min/test.min.js" src="/js/test.js"></script></body></html>"#,
        );

        let groups = template.scripts().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get("/min/test.min.js").unwrap(), ["/js/test.js"]);

        let out = String::from_utf8(template.stream().unwrap()).unwrap();
        assert!(!out.contains(r#"src="/js/test.js""#));
        assert!(out.ends_with(
            r#"<script type="application/javascript" src="/min/test.min.js"></script></body></html>"#
        ));
    }

    #[test]
    fn test_full_page_rewrite() {
        let dir = TempDir::new().unwrap();
        let mut template = template(
            &dir,
            concat!(
                "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">",
                "<script>if (a < b) { go(); }</script>",
                r#"<script data-script-min="/min/a.min.js" src="/js/a.js"></script>"#,
                "</head><body><p>x</p></body></html>\n"
            ),
        );

        assert_eq!(template.scripts().unwrap().get("/min/a.min.js").unwrap(), ["/js/a.js"]);
        let out = String::from_utf8(template.stream().unwrap()).unwrap();
        assert!(out.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(out.contains("<script>if (a < b) { go(); }</script>"));
        assert!(out.contains(
            r#"<p>x</p><script type="application/javascript" src="/min/a.min.js"></script></body>"#
        ));
    }

    #[test]
    fn test_multiple_keys_in_discovery_order() {
        let dir = TempDir::new().unwrap();
        let mut template = template(
            &dir,
            concat!(
                "<html><head>",
                r#"<script data-script-min="/min/b.js" src="/js/1.js"></script>"#,
                "</head><body>",
                r#"<script data-script-min="/min/a.js" src="/js/2.js"></script>"#,
                r#"<script data-script-min="/min/b.js" src="/js/3.js"></script>"#,
                "</body></html>"
            ),
        );

        let out = String::from_utf8(template.stream().unwrap()).unwrap();
        let b = out.find(r#"src="/min/b.js""#).unwrap();
        let a = out.find(r#"src="/min/a.js""#).unwrap();
        assert!(b < a);
        assert_eq!(out.matches("/min/b.js").count(), 1);
        assert_eq!(out.matches("<script").count(), 2);
    }

    #[test]
    fn test_stream_is_stable() {
        let dir = TempDir::new().unwrap();
        let mut template = template(
            &dir,
            r#"<body><script data-script-min="k.js" src="a.js"></script></body>"#,
        );
        let first = template.stream().unwrap();
        let second = template.stream().unwrap();
        assert_eq!(first, second);
        assert_eq!(String::from_utf8(first).unwrap().matches("k.js").count(), 1);
    }

    #[test]
    fn test_custom_attribute() {
        let dir = TempDir::new().unwrap();
        let mut template = template(
            &dir,
            r#"<body><script data-bundle="b.js" src="a.js"></script><script data-script-min="x.js" src="y.js"></script></body>"#,
        )
        .attribute("data-bundle");
        let groups = template.scripts().unwrap();
        assert_eq!(groups.keys().collect::<Vec<_>>(), ["b.js"]);
    }

    #[test]
    fn test_invalid_utf8_is_parse_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.html");
        fs::write(&path, [0x3c, 0x70, 0x3e, 0xff, 0xfe]).unwrap();

        let err = Template::new(&path).scripts().unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
        assert!(err.to_string().contains("bad.html"));
    }
}
