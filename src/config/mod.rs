//! Pipeline configuration management for `scriptmin.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build] and [build.actions]
//! │   └── transform  # [transform]
//! ├── diagnostics    # ConfigError, ConfigDiagnostics, FieldPath
//! ├── util           # Config file discovery
//! └── mod.rs         # PipelineConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section            | Purpose                                          |
//! |--------------------|--------------------------------------------------|
//! | `[build]`          | Source/output trees, extensions, minifier        |
//! | `[build.actions]`  | Target key to action rules                       |
//! | `[transform]`      | External transform command and staging dirs      |
//!
//! The config file is optional: without one, `--source` and `--output`
//! supply the two required values and everything else keeps its default.

mod diagnostics;
pub mod section;
mod util;

use util::find_config_file;

pub use section::{ActionRule, ActionsConfig, BuildSectionConfig, OnFailure, TransformConfig};
pub use diagnostics::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{
    cli::{BuildArgs, Cli, Commands},
    log,
    utils::path::{expand_path, normalize_path},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing scriptmin.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Absolute path to the config file, empty when none was found
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory: parent of the config file, or cwd
    #[serde(skip)]
    pub root: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildSectionConfig,

    /// External transform settings
    #[serde(default)]
    pub transform: TransformConfig,
}

impl PipelineConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. Paths in the file are
    /// relative to the file's directory; CLI paths are relative to cwd.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
                config.config_path = path;
                config
            }
            None => {
                crate::debug!("config"; "no {} found, using defaults", cli.config.display());
                Self {
                    root: cwd.clone(),
                    ..Self::default()
                }
            }
        };

        config.apply_cli(cli, &cwd);
        config.validate_required()?;
        config.normalize_paths();
        config.validate(cli)?;

        Ok(config)
    }

    /// Read and parse a config file. Unknown keys are reported, not fatal.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if !ignored.is_empty() {
            log!("warning"; "ignoring unknown keys in {}: {}", path.display(), ignored.join(", "));
        }

        Ok(config)
    }

    /// Deserialize, recording the dotted path of every key nothing consumed.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply CLI overrides. CLI paths are resolved against `cwd` right away
    /// so that the later root-relative resolution leaves them untouched.
    fn apply_cli(&mut self, cli: &Cli, cwd: &Path) {
        if let Some(source) = &cli.source {
            self.build.source = expand_path(source, cwd);
        }
        if let Some(output) = &cli.output {
            self.build.output = expand_path(output, cwd);
        }

        match &cli.command {
            Commands::Build { build_args } => self.apply_build_args(build_args),
            Commands::Scan { .. } => {}
        }
    }

    fn apply_build_args(&mut self, args: &BuildArgs) {
        if let Some(processor) = args.processor {
            self.build.processor = processor;
        }
        self.build.clean |= args.clean;
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Make every configured path absolute against the project root.
    fn normalize_paths(&mut self) {
        let root = normalize_path(&self.root);
        if !self.config_path.as_os_str().is_empty() {
            self.config_path = normalize_path(&self.config_path);
        }

        self.build.source = expand_path(&self.build.source, &root);
        self.build.output = expand_path(&self.build.output, &root);

        let workdir = expand_path(&self.transform.workdir, &root);
        self.transform.source = expand_path(&self.transform.source, &workdir);
        self.transform.output = expand_path(&self.transform.output, &workdir);
        self.transform.workdir = workdir;

        self.root = root;
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Check required values before normalization.
    ///
    /// Normalization joins an empty path onto the root, which would make a
    /// missing value indistinguishable from the root itself.
    fn validate_required(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();
        self.build.validate_required(&mut diag);
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Validate configuration for the current command.
    fn validate(&self, cli: &Cli) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.build.validate(&mut diag);
        if cli.is_build() {
            self.transform
                .validate(&self.root, &self.build.source, &self.build.output, &mut diag);
        }

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config text.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> PipelineConfig {
    let (parsed, ignored) = PipelineConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Ready-to-use config rooted at `root`, as `load` would produce it.
#[cfg(test)]
pub fn test_config(root: &Path, source: &str, output: &str) -> PipelineConfig {
    let mut config = PipelineConfig {
        root: root.to_path_buf(),
        ..PipelineConfig::default()
    };
    config.build.source = source.into();
    config.build.output = output.into();
    config.normalize_paths();
    config
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_invalid_toml() {
        let err = PipelineConfig::parse_with_ignored("[build\nsource = \"web\"").unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[build]\nsource = \"web\"\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = PipelineConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.build.source, PathBuf::from("web"));
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_no_unknown_fields() {
        let content = "[build]\nsource = \"web\"\noutput = \"dist\"";
        let (_, ignored) = PipelineConfig::parse_with_ignored(content).unwrap();
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_normalize_paths() {
        let config = test_config(Path::new("/project"), "web", "/abs/dist");
        assert_eq!(config.build.source, PathBuf::from("/project/web"));
        assert_eq!(config.build.output, PathBuf::from("/abs/dist"));
        assert_eq!(config.transform.workdir, PathBuf::from("/project"));
        assert_eq!(
            config.transform.source,
            PathBuf::from("/project/target/jsx/source")
        );
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "scriptmin", "-s", "web", "-o", "out", "build", "-p", "compress", "--clean",
        ]);
        let mut config = test_parse_config("[build]\nsource = \"ignored\"\n");
        config.apply_cli(&cli, Path::new("/cwd"));

        assert_eq!(config.build.source, PathBuf::from("/cwd/web"));
        assert_eq!(config.build.output, PathBuf::from("/cwd/out"));
        assert_eq!(
            config.build.processor,
            crate::asset::MinifierVariant::Compress
        );
        assert!(config.build.clean);
    }

    #[test]
    fn test_staging_at_project_root_rejected() {
        let mut config = test_config(Path::new("/project"), "web", "dist");
        config.transform.source = PathBuf::from("/project");

        let cli = Cli::parse_from(["scriptmin", "build"]);
        let err = config.validate(&cli).unwrap_err();
        assert!(err.to_string().contains("transform.source"));
    }

    #[test]
    fn test_missing_required_values() {
        let config = PipelineConfig::default();
        let err = config.validate_required().unwrap_err();
        assert!(err.to_string().contains("build.source"));
    }
}
