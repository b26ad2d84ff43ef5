//! Pipeline error taxonomy.
//!
//! | Variant           | Scope                | Effect                        |
//! |-------------------|----------------------|-------------------------------|
//! | `Parse`           | one template         | aborts the build              |
//! | `Io`              | one file or group    | aborts the build              |
//! | `Config`          | one group            | group skipped, build fails    |
//! | `Transform`       | one group            | group skipped, build fails    |
//! | `ExternalProcess` | deferred pass        | per `transform.on_failure`    |

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to parse `{}`: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("I/O error on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot process group `{key}`: {message}")]
    Config { key: String, message: String },

    #[error("transform of `{}` failed: {message}", path.display())]
    Transform { path: PathBuf, message: String },

    #[error("external transform `{program}` {status}")]
    ExternalProcess {
        program: String,
        status: String,
        output: String,
    },
}

impl PipelineError {
    /// Adapter for `map_err` on I/O results.
    pub fn io(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| Self::Io { path, source }
    }

    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether the error only invalidates the group it came from.
    pub const fn is_group_local(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Transform { .. })
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
