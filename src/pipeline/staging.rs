//! Sources staged for the external transform.
//!
//! Each `transform` group copies its source into the staging input
//! directory under the source's root-relative path. After the transform,
//! the same relative path under the staging output holds the result.

use super::{PipelineError, Result};
use crate::utils::path::{contained_reference, join_reference};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSource {
    pub key: String,
    /// Root-relative source reference, as written in the template.
    pub source: String,
    /// Copy inside the staging input directory.
    pub staged: PathBuf,
}

/// `key → staged source`, in staging order.
#[derive(Debug)]
pub struct StagingSet {
    input: PathBuf,
    output: PathBuf,
    entries: Vec<StagedSource>,
}

impl StagingSet {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            entries: Vec::new(),
        }
    }

    /// Empty both staging directories.
    pub fn reset(&self) -> Result<()> {
        for dir in [&self.input, &self.output] {
            if dir.exists() {
                fs::remove_dir_all(dir).map_err(PipelineError::io(dir))?;
            }
            fs::create_dir_all(dir).map_err(PipelineError::io(dir))?;
        }
        Ok(())
    }

    /// Copy `source` (resolved against `root`) into staging for `key`.
    ///
    /// Staging the same key twice is fine when the source is the same; a
    /// different source for an already staged key is a group failure.
    pub fn stage(&mut self, root: &Path, key: &str, source: &str) -> Result<&StagedSource> {
        if let Some(i) = self.entries.iter().position(|e| e.key == key) {
            let existing = &self.entries[i];
            if existing.source != source {
                return Err(PipelineError::config(
                    key,
                    format!(
                        "already staged from `{}`, refusing `{}`",
                        existing.source, source
                    ),
                ));
            }
            return Ok(&self.entries[i]);
        }

        let from = join_reference(root, source);
        let staged = contained_reference(&self.input, source).ok_or_else(|| {
            PipelineError::config(key, format!("`{source}` resolves outside the staging directory"))
        })?;
        if let Some(parent) = staged.parent() {
            fs::create_dir_all(parent).map_err(PipelineError::io(parent))?;
        }
        fs::copy(&from, &staged).map_err(PipelineError::io(&from))?;

        self.entries.push(StagedSource {
            key: key.to_owned(),
            source: source.to_owned(),
            staged,
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Where the transform is expected to leave the result for `entry`.
    pub fn transformed(&self, entry: &StagedSource) -> PathBuf {
        join_reference(&self.output, &entry.source)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagedSource> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}
