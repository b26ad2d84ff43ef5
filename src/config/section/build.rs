//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = "src/main/webapp"       # Source tree (relative to project root)
//! output = "target/webapp"         # Destination tree (relative to project root)
//! extensions = ["html", "htm"]     # Files treated as templates
//! processor = "minify"             # minify | beautify | compress
//! separator = "\n"                 # Joiner for concatenated groups
//! attribute = "data-script-min"    # Attribute naming a script's target key
//! keep_comments = false            # Keep comments in rewritten templates
//!
//! [build.actions]
//! default = "minify"               # Used when no rule matches (optional)
//!
//! [[build.actions.rules]]
//! pattern = "^/?vendor/"           # Regex over the target key
//! action = "concatenate"           # minify | concatenate | delete | transform
//! ```

use crate::asset::MinifierVariant;
use crate::config::{ConfigDiagnostics, FieldPath};
use crate::pipeline::Action;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Grouping attribute understood by default.
pub const DEFAULT_ATTRIBUTE: &str = "data-script-min";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    /// Source tree to walk. Required.
    pub source: PathBuf,

    /// Destination tree. Required.
    pub output: PathBuf,

    /// File extensions (without dot) treated as templates.
    pub extensions: Vec<String>,

    /// Strategy used by every minify step.
    pub processor: MinifierVariant,

    /// Separator placed between trimmed sources when concatenating.
    pub separator: String,

    /// Attribute on `<script>` naming the group's target key.
    pub attribute: String,

    /// Keep markup comments when a template is rewritten.
    pub keep_comments: bool,

    /// Action rules. When absent the naming convention applies.
    pub actions: Option<ActionsConfig>,

    /// Remove the output directory before building (CLI only).
    #[serde(skip)]
    pub clean: bool,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            output: PathBuf::new(),
            extensions: vec!["html".into()],
            processor: MinifierVariant::default(),
            separator: "\n".into(),
            attribute: DEFAULT_ATTRIBUTE.into(),
            keep_comments: false,
            actions: None,
            clean: false,
        }
    }
}

/// `[build.actions]`: how a target key picks its action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    /// Action for keys no rule matches. `None` makes such keys an error.
    pub default: Option<Action>,

    /// Rules tried in order; the first matching pattern wins.
    pub rules: Vec<ActionRule>,
}

/// A single `[[build.actions.rules]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRule {
    /// Regular expression matched against the target key.
    pub pattern: String,
    /// Action for matching keys.
    pub action: Action,
}

impl BuildSectionConfig {
    /// Check whether `path` has one of the template extensions.
    pub fn is_template(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    /// Pre-validate raw values (before paths are made absolute).
    pub fn validate_required(&self, diag: &mut ConfigDiagnostics) {
        if self.source.as_os_str().is_empty() {
            diag.error_with_hint(
                FieldPath::new("build.source"),
                "source directory is required",
                "set it in scriptmin.toml or pass --source",
            );
        }
        if self.output.as_os_str().is_empty() {
            diag.error_with_hint(
                FieldPath::new("build.output"),
                "output directory is required",
                "set it in scriptmin.toml or pass --output",
            );
        }
    }

    /// Validate build configuration (paths already absolute).
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.source.is_dir() {
            diag.error(
                FieldPath::new("build.source"),
                format!("'{}' is not a directory", self.source.display()),
            );
        }

        if self.output == self.source {
            diag.error(
                FieldPath::new("build.output"),
                "output directory must differ from the source directory",
            );
        } else if self.output.starts_with(&self.source) {
            diag.error_with_hint(
                FieldPath::new("build.output"),
                "output directory is inside the source directory",
                "the build would pick up its own output on the next run",
            );
        } else if self.source.starts_with(&self.output) {
            diag.error(
                FieldPath::new("build.output"),
                "source directory is inside the output directory",
            );
        }

        if self.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            diag.error(
                FieldPath::new("build.extensions"),
                "at least one template extension is required",
            );
        }

        if self.attribute.trim().is_empty() {
            diag.error(
                FieldPath::new("build.attribute"),
                "grouping attribute must not be empty",
            );
        }

        if let Some(actions) = &self.actions {
            for rule in &actions.rules {
                if let Err(err) = Regex::new(&rule.pattern) {
                    diag.error(
                        FieldPath::new("build.actions.rules"),
                        format!("invalid pattern `{}`: {}", rule.pattern, err),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert!(config.build.source.as_os_str().is_empty());
        assert_eq!(config.build.extensions, vec!["html".to_string()]);
        assert_eq!(config.build.processor, MinifierVariant::Minify);
        assert_eq!(config.build.separator, "\n");
        assert_eq!(config.build.attribute, DEFAULT_ATTRIBUTE);
        assert!(!config.build.keep_comments);
        assert!(config.build.actions.is_none());
    }

    #[test]
    fn test_actions_section() {
        let config = test_parse_config(
            r#"
[build.actions]
default = "concat"

[[build.actions.rules]]
pattern = "\\.min\\.js$"
action = "minify"

[[build.actions.rules]]
pattern = "^/?dead/"
action = "delete"
"#,
        );
        let actions = config.build.actions.unwrap();
        assert_eq!(actions.default, Some(Action::Concatenate));
        assert_eq!(actions.rules.len(), 2);
        assert_eq!(actions.rules[1].action, Action::Delete);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result = crate::config::PipelineConfig::parse_with_ignored(
            "[build.actions]\ndefault = \"explode\"\n",
        );
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("explode"));
    }

    #[test]
    fn test_is_template() {
        let mut build = BuildSectionConfig::default();
        build.extensions = vec!["html".into(), ".htm".into()];
        assert!(build.is_template(Path::new("a/index.html")));
        assert!(build.is_template(Path::new("a/INDEX.HTML")));
        assert!(build.is_template(Path::new("page.htm")));
        assert!(!build.is_template(Path::new("data.json")));
        assert!(!build.is_template(Path::new("Makefile")));
    }

    #[test]
    fn test_validate_required() {
        let build = BuildSectionConfig::default();
        let mut diag = ConfigDiagnostics::new();
        build.validate_required(&mut diag);
        assert_eq!(diag.len(), 2);
    }

    #[test]
    fn test_validate_paths_and_patterns() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut build = BuildSectionConfig::default();
        build.source = dir.path().to_path_buf();
        build.output = dir.path().join("dist");
        build.actions = Some(ActionsConfig {
            default: None,
            rules: vec![ActionRule {
                pattern: "(".into(),
                action: Action::Minify,
            }],
        });

        let mut diag = ConfigDiagnostics::new();
        build.validate(&mut diag);
        // output inside source + broken regex
        assert_eq!(diag.len(), 2);
    }
}
