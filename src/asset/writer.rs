//! Output placement: source tree locations mapped into the destination tree.

use crate::pipeline::{PipelineError, Result};
use crate::utils::path::contained_reference;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
    dest: PathBuf,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dest: dest.into(),
        }
    }

    /// Destination of a file under the source root.
    pub fn map(&self, path: &Path) -> Result<PathBuf> {
        let relative = path.strip_prefix(&self.root).map_err(|_| PipelineError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not under {}", self.root.display()),
            ),
        })?;
        Ok(self.dest.join(relative))
    }

    /// Destination of a group's target key. Keys may not leave the
    /// output directory.
    pub fn map_key(&self, key: &str) -> Result<PathBuf> {
        contained_reference(&self.dest, key)
            .ok_or_else(|| PipelineError::config(key, "target resolves outside the output directory"))
    }

    /// Copy a source file verbatim to its mapped destination.
    pub fn copy(&self, path: &Path) -> Result<PathBuf> {
        let dest = self.map(path)?;
        Self::ensure_parent(&dest)?;
        fs::copy(path, &dest).map_err(PipelineError::io(path))?;
        Ok(dest)
    }

    /// Write `bytes` to `dest`, replacing any existing file.
    pub fn write(&self, dest: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_parent(dest)?;
        fs::write(dest, bytes).map_err(PipelineError::io(dest))
    }

    fn ensure_parent(dest: &Path) -> Result<()> {
        match dest.parent() {
            Some(parent) => fs::create_dir_all(parent).map_err(PipelineError::io(parent)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_map() {
        let writer = OutputWriter::new("/site/src", "/site/dist");
        assert_eq!(
            writer.map(Path::new("/site/src/a/index.html")).unwrap(),
            PathBuf::from("/site/dist/a/index.html")
        );
        assert!(writer.map(Path::new("/elsewhere/x.html")).is_err());
        assert_eq!(
            writer.map_key("/min/app.min.js").unwrap(),
            PathBuf::from("/site/dist/min/app.min.js")
        );
    }

    #[test]
    fn test_key_outside_output_rejected() {
        let writer = OutputWriter::new("/site/src", "/site/dist");
        let err = writer.map_key("../../x.js").unwrap_err();
        assert!(err.is_group_local());
        assert!(err.to_string().contains("../../x.js"));
    }

    #[test]
    fn test_copy_creates_parents() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("img/icons")).unwrap();
        fs::write(src.join("img/icons/a.png"), [0u8, 159, 146, 150]).unwrap();

        let writer = OutputWriter::new(&src, dir.path().join("out"));
        let dest = writer.copy(&src.join("img/icons/a.png")).unwrap();
        assert_eq!(fs::read(dest).unwrap(), vec![0u8, 159, 146, 150]);
    }

    #[test]
    fn test_write_overwrites() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::new(dir.path(), dir.path().join("out"));
        let dest = writer.map_key("min/a.js").unwrap();
        writer.write(&dest, b"first").unwrap();
        writer.write(&dest, b"").unwrap();
        assert_eq!(fs::read(&dest).unwrap().len(), 0);
    }
}
