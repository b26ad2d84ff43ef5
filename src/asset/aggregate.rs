//! Source aggregation: trimmed sources joined by a separator.

use crate::pipeline::{PipelineError, Result};
use crate::utils::path::join_reference;
use std::fs;
use std::path::PathBuf;

/// Joins group sources resolved against a root directory.
#[derive(Debug, Clone)]
pub struct Concatenator {
    root: PathBuf,
    separator: String,
}

impl Concatenator {
    pub fn new(root: impl Into<PathBuf>, separator: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            separator: separator.into(),
        }
    }

    /// Read every source as text, trim it, and join with the separator.
    ///
    /// Order is kept and duplicates are not removed. No sources yields no bytes.
    pub fn concat(&self, sources: &[String]) -> Result<Vec<u8>> {
        let parts = sources
            .iter()
            .map(|source| {
                let path = join_reference(&self.root, source);
                fs::read_to_string(&path).map_err(PipelineError::io(&path))
            })
            .collect::<Result<Vec<_>>>()?;

        let joined = parts
            .iter()
            .map(|part| part.trim())
            .collect::<Vec<_>>()
            .join(&self.separator);
        Ok(joined.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const COMMENT: &str = "/*\n * a two-line comment\n */";

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("file1.js"), "alert('truc');\n").unwrap();
        fs::write(dir.path().join("file2.js"), format!("\n{COMMENT}\n\n")).unwrap();
        dir
    }

    #[test]
    fn test_concat_trims_and_joins() {
        let dir = fixture();
        let concat = Concatenator::new(dir.path(), "\n");
        let out = concat
            .concat(&["file1.js".into(), "/file2.js".into()])
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("alert('truc');\n{COMMENT}")
        );
    }

    #[test]
    fn test_concat_empty() {
        let dir = fixture();
        let out = Concatenator::new(dir.path(), "\n").concat(&[]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_concat_splits_consistently() {
        let dir = fixture();
        let concat = Concatenator::new(dir.path(), "\n");
        let a = concat.concat(&["file1.js".into()]).unwrap();
        let b = concat.concat(&["file2.js".into()]).unwrap();
        let both = concat
            .concat(&["file1.js".into(), "file2.js".into()])
            .unwrap();
        assert_eq!([a, b].join(&b'\n'), both);
    }

    #[test]
    fn test_concat_keeps_duplicates_and_custom_separator() {
        let dir = fixture();
        let out = Concatenator::new(dir.path(), ";\n")
            .concat(&["file1.js".into(), "file1.js".into()])
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "alert('truc');;\nalert('truc');"
        );
    }

    #[test]
    fn test_concat_missing_source() {
        let dir = fixture();
        let err = Concatenator::new(dir.path(), "\n")
            .concat(&["missing.js".into()])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
