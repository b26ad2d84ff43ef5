//! `[transform]` section configuration.
//!
//! The external source-to-source step run once over every staged
//! `transform` group before the final minification.
//!
//! # Example
//!
//! ```toml
//! [transform]
//! enable = true
//! command = ["jsx", "--source-charset", "utf8", "--output-charset", "utf8", "--no-cache-dir"]
//! workdir = "."                    # Working directory (relative to project root)
//! source = "target/jsx/source"     # Staging input
//! output = "target/jsx/dest"       # Staging output
//! on_failure = "warn"              # warn | fail
//! pty = false                      # Run inside a pseudo terminal
//! ```
//!
//! `$SCRIPTMIN_SOURCE_DIR`, `$SCRIPTMIN_OUTPUT_DIR` and `$SCRIPTMIN_ROOT`
//! are substituted in `command`. If neither staging variable appears, the
//! two staging directories are appended as the last arguments.

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Whether `transform` groups may be processed at all.
    pub enable: bool,

    /// Program and fixed arguments.
    pub command: Vec<String>,

    /// Working directory for the process.
    pub workdir: PathBuf,

    /// Staging input directory.
    pub source: PathBuf,

    /// Staging output directory.
    pub output: PathBuf,

    /// What a non-zero exit does to the build.
    pub on_failure: OnFailure,

    /// Run through a PTY so stdout and stderr interleave naturally.
    pub pty: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            enable: true,
            command: [
                "jsx",
                "--source-charset",
                "utf8",
                "--output-charset",
                "utf8",
                "--no-cache-dir",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            workdir: ".".into(),
            source: "target/jsx/source".into(),
            output: "target/jsx/dest".into(),
            on_failure: OnFailure::Warn,
            pty: false,
        }
    }
}

/// Reaction to a failed external transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnFailure {
    /// Log the exit status and keep going.
    #[default]
    Warn,
    /// Abort the deferred pass.
    Fail,
}

impl TransformConfig {
    /// Whether the external step can run.
    pub fn is_available(&self) -> bool {
        self.enable && !self.command.is_empty()
    }

    /// Validate transform configuration (paths already absolute).
    ///
    /// Staging directories are wiped at the start of each build, so none
    /// of them may be or enclose the project root, the workdir or a build
    /// directory.
    pub fn validate(
        &self,
        root: &std::path::Path,
        source: &std::path::Path,
        output: &std::path::Path,
        diag: &mut ConfigDiagnostics,
    ) {
        if self.enable && self.command.is_empty() {
            diag.error_with_hint(
                FieldPath::new("transform.command"),
                "command is empty",
                "set a command or disable the step with `enable = false`",
            );
        }

        for (field, staging) in [
            (FieldPath::new("transform.source"), &self.source),
            (FieldPath::new("transform.output"), &self.output),
        ] {
            let protected = [root, self.workdir.as_path(), source, output];
            if protected.iter().any(|dir| dir.starts_with(staging)) {
                diag.error_with_hint(
                    field,
                    format!(
                        "staging directory `{}` is, or contains, a build or project directory and would be wiped",
                        staging.display()
                    ),
                    "point it at a dedicated directory such as `target/jsx/source`",
                );
            } else if self.enable && staging.starts_with(source) {
                diag.warn(
                    field,
                    "staging directory is inside build.source and is skipped while scanning",
                );
            }
        }

        if self.source == self.output {
            diag.error(
                FieldPath::new("transform.output"),
                "staging output must differ from staging source",
            );
        }
    }
}
