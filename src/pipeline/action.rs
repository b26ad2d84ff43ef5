//! Per-group actions and the policy that picks them.

use super::{PipelineError, Result};
use crate::config::ActionsConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happens to one script group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Minify the raw concatenation of the sources.
    Minify,
    /// Join trimmed sources with the separator.
    #[serde(alias = "concat")]
    Concatenate,
    /// Emit an empty artifact.
    Delete,
    /// Stage the single source for the external transform, minify later.
    #[serde(alias = "jsx")]
    Transform,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minify => "minify",
            Self::Concatenate => "concat",
            Self::Delete => "delete",
            Self::Transform => "transform",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a target key to its action.
pub trait ActionPolicy {
    fn resolve(&self, key: &str) -> Result<Action>;
}

/// Ordered regex rules with an optional fallback.
#[derive(Debug, Clone)]
pub struct RulePolicy {
    rules: Vec<(Regex, Action)>,
    default: Option<Action>,
}

impl RulePolicy {
    /// Policy from `[build.actions]`, or the naming convention when absent.
    pub fn from_config(actions: Option<&ActionsConfig>) -> Result<Self, regex::Error> {
        let Some(actions) = actions else {
            return Ok(Self::convention());
        };
        let rules = actions
            .rules
            .iter()
            .map(|rule| Ok((Regex::new(&rule.pattern)?, rule.action)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self {
            rules,
            default: actions.default,
        })
    }

    /// `*.min.js` minifies, `*.jsx.js` goes through the transform, the
    /// rest is concatenated.
    pub fn convention() -> Self {
        let rule = |pattern: &str, action| {
            (
                Regex::new(pattern).expect("convention patterns are valid"),
                action,
            )
        };
        Self {
            rules: vec![
                rule(r"\.min\.js$", Action::Minify),
                rule(r"\.jsx\.js$", Action::Transform),
            ],
            default: Some(Action::Concatenate),
        }
    }
}

impl ActionPolicy for RulePolicy {
    fn resolve(&self, key: &str) -> Result<Action> {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.is_match(key))
            .map(|(_, action)| *action)
            .or(self.default)
            .ok_or_else(|| PipelineError::config(key, "no action rule matches and no default is set"))
    }
}

impl<F> ActionPolicy for F
where
    F: Fn(&str) -> Result<Action>,
{
    fn resolve(&self, key: &str) -> Result<Action> {
        self(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActionRule;

    #[test]
    fn test_convention() {
        let policy = RulePolicy::convention();
        assert_eq!(policy.resolve("/min/app.min.js").unwrap(), Action::Minify);
        assert_eq!(policy.resolve("/min/view.jsx.js").unwrap(), Action::Transform);
        assert_eq!(policy.resolve("/min/all.js").unwrap(), Action::Concatenate);
    }

    #[test]
    fn test_rules_first_match_wins() {
        let actions = ActionsConfig {
            default: None,
            rules: vec![
                ActionRule {
                    pattern: "^/?dead/".into(),
                    action: Action::Delete,
                },
                ActionRule {
                    pattern: r"\.js$".into(),
                    action: Action::Minify,
                },
            ],
        };
        let policy = RulePolicy::from_config(Some(&actions)).unwrap();
        assert_eq!(policy.resolve("/dead/a.js").unwrap(), Action::Delete);
        assert_eq!(policy.resolve("live/a.js").unwrap(), Action::Minify);

        let err = policy.resolve("style.css").unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
        assert!(err.to_string().contains("style.css"));
    }

    #[test]
    fn test_default_fallback() {
        let actions = ActionsConfig {
            default: Some(Action::Concatenate),
            rules: Vec::new(),
        };
        let policy = RulePolicy::from_config(Some(&actions)).unwrap();
        assert_eq!(policy.resolve("anything").unwrap(), Action::Concatenate);
    }

    #[test]
    fn test_invalid_pattern() {
        let actions = ActionsConfig {
            default: None,
            rules: vec![ActionRule {
                pattern: "(".into(),
                action: Action::Minify,
            }],
        };
        assert!(RulePolicy::from_config(Some(&actions)).is_err());
    }

    #[test]
    fn test_closure_policy() {
        let policy = |_: &str| -> Result<Action> { Ok(Action::Delete) };
        assert_eq!(policy.resolve("x.js").unwrap(), Action::Delete);
    }

    #[test]
    fn test_aliases() {
        #[derive(Deserialize)]
        struct Wrapper {
            action: Action,
        }
        let parse = |s: &str| toml::from_str::<Wrapper>(&format!("action = \"{s}\"")).map(|w| w.action);
        assert_eq!(parse("concat").unwrap(), Action::Concatenate);
        assert_eq!(parse("jsx").unwrap(), Action::Transform);
        assert!(parse("explode").is_err());
    }
}
