//! Assets of the source tree and the collaborators that produce output.
//!
//! | Module      | Purpose                                        |
//! |-------------|------------------------------------------------|
//! | `aggregate` | Trimmed, separator-joined concatenation        |
//! | `minify`    | Minifier adapter and oxc strategies            |
//! | `writer`    | Source-to-destination path mapping and writes  |

mod aggregate;
pub mod minify;
mod writer;

pub use aggregate::Concatenator;
pub use minify::{Minifier, MinifierVariant, TextTransform};
pub use writer::OutputWriter;

use crate::pipeline::{PipelineError, Result};
use crate::template::ScriptGroups;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// A readable file of the source tree.
///
/// Templates and plain files share this contract: a plain file has no
/// script groups and streams its bytes unchanged.
pub trait Asset {
    /// Absolute path in the source tree.
    fn path(&self) -> &Path;

    /// Script groups found in the asset (discovered on first call).
    fn scripts(&mut self) -> Result<&ScriptGroups>;

    /// Bytes to place in the output tree.
    fn stream(&mut self) -> Result<Vec<u8>>;

    /// `file://` form of [`Asset::path`].
    fn url(&self) -> Option<Url> {
        Url::from_file_path(self.path()).ok()
    }
}

/// Any non-template file.
#[derive(Debug)]
pub struct PlainAsset {
    path: PathBuf,
    groups: ScriptGroups,
}

impl PlainAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            groups: ScriptGroups::default(),
        }
    }
}

impl Asset for PlainAsset {
    fn path(&self) -> &Path {
        &self.path
    }

    fn scripts(&mut self) -> Result<&ScriptGroups> {
        Ok(&self.groups)
    }

    fn stream(&mut self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(PipelineError::io(&self.path))
    }
}
