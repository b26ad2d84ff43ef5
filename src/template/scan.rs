//! Source tree traversal.
//!
//! Files are visited breadth-first: every file of a directory before any
//! file of its subdirectories, names sorted within a directory.

use super::Template;
use crate::asset::PlainAsset;
use crate::config::BuildSectionConfig;
use crate::pipeline::{PipelineError, Result};
use jwalk::WalkDir;
use std::path::{Path, PathBuf};

const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Handlers invoked for each file. Both default to doing nothing.
pub trait Visitor {
    fn on_template(&mut self, template: &mut Template) -> Result<()> {
        let _ = template;
        Ok(())
    }

    fn on_asset(&mut self, asset: &mut PlainAsset) -> Result<()> {
        let _ = asset;
        Ok(())
    }
}

/// Files visited by a walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    pub templates: usize,
    pub assets: usize,
}

pub struct Traversal<'a> {
    build: &'a BuildSectionConfig,
    excluded: Vec<PathBuf>,
}

impl<'a> Traversal<'a> {
    pub fn new(build: &'a BuildSectionConfig) -> Self {
        Self {
            build,
            excluded: Vec::new(),
        }
    }

    /// Skip everything below `dir` (e.g. a staging directory inside the source).
    pub fn exclude(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    /// All files in visiting order.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let root = &self.build.source;
        let mut entries = Vec::new();
        for entry in WalkDir::new(root).sort(true) {
            let entry = entry.map_err(|err| PipelineError::Io {
                path: root.clone(),
                source: std::io::Error::other(err),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_str().unwrap_or_default();
            if IGNORED_FILES.contains(&name) {
                continue;
            }
            let path = entry.path();
            if self.excluded.iter().any(|dir| path.starts_with(dir)) {
                continue;
            }
            entries.push((entry.depth, path));
        }

        // Stable: keeps name order within one depth
        entries.sort_by_key(|(depth, _)| *depth);
        Ok(entries.into_iter().map(|(_, path)| path).collect())
    }

    /// Visit every file, dispatching on the template extensions.
    pub fn walk(&self, visitor: &mut impl Visitor) -> Result<WalkStats> {
        let files = self.files()?;
        self.walk_files(&files, visitor)
    }

    /// Visit a precomputed file list (see [`Traversal::files`]).
    pub fn walk_files(&self, files: &[PathBuf], visitor: &mut impl Visitor) -> Result<WalkStats> {
        let mut stats = WalkStats::default();
        for path in files {
            if self.is_template(path) {
                let mut template = Template::from_config(path, self.build);
                visitor.on_template(&mut template)?;
                stats.templates += 1;
            } else {
                visitor.on_asset(&mut PlainAsset::new(path))?;
                stats.assets += 1;
            }
        }
        Ok(stats)
    }

    pub fn is_template(&self, path: &Path) -> bool {
        self.build.is_template(path)
    }
}
