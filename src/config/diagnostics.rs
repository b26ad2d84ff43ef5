//! Config errors and validation diagnostics.
//!
//! Validation does not stop at the first problem: every section reports
//! into one [`ConfigDiagnostics`], which is printed as a whole.

use crate::logger::styled;
use owo_colors::{Stream, Style};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading `scriptmin.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid TOML")]
    Toml(#[from] toml::de::Error),

    // No #[from]: source() would print the diagnostics twice
    #[error("{0}")]
    Diagnostics(ConfigDiagnostics),
}

/// Dotted path of a config field, e.g. `build.actions.rules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath(&'static str);

impl FieldPath {
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
struct Diagnostic {
    severity: Severity,
    field: FieldPath,
    message: String,
    hint: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = styled(Stream::Stderr, format_args!("[{}]", self.field.as_str()), Style::new().cyan());
        write!(f, "{} {}", field, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  {} {}", styled(Stream::Stderr, "hint:", Style::new().yellow()), hint)?;
        }
        Ok(())
    }
}

/// Errors and warnings collected across all sections.
#[derive(Debug, Default)]
pub struct ConfigDiagnostics {
    items: Vec<Diagnostic>,
}

impl ConfigDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, severity: Severity, field: FieldPath, message: String, hint: Option<String>) {
        self.items.push(Diagnostic {
            severity,
            field,
            message,
            hint,
        });
    }

    pub fn error(&mut self, field: FieldPath, message: impl Into<String>) {
        self.push(Severity::Error, field, message.into(), None);
    }

    pub fn error_with_hint(
        &mut self,
        field: FieldPath,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.push(Severity::Error, field, message.into(), Some(hint.into()));
    }

    /// Something legal but probably unintended; printed, never fatal.
    pub fn warn(&mut self, field: FieldPath, message: impl Into<String>) {
        self.push(Severity::Warning, field, message.into(), None);
    }

    fn of(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.severity == severity)
    }

    /// Number of errors.
    pub fn len(&self) -> usize {
        self.of(Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.of(Severity::Warning).count()
    }

    pub fn print_warnings(&self) {
        for warning in self.of(Severity::Warning) {
            crate::log!("warning"; "{}", warning);
        }
    }

    /// `Err(self)` when at least one error was reported.
    pub fn into_result(self) -> Result<(), Self> {
        if self.len() == 0 { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ConfigDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.len();
        write!(f, "{}", styled(Stream::Stderr, "invalid configuration:", Style::new().red().bold()))?;
        for error in self.of(Severity::Error) {
            write!(f, "\n\n{error}")?;
        }
        if count > 1 {
            write!(f, "\n\n{}", styled(Stream::Stderr, format_args!("{count} errors"), Style::new().dimmed()))?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigDiagnostics {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_error_names_file() {
        let err = ConfigError::Io(
            PathBuf::from("scriptmin.toml"),
            Error::new(ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("scriptmin.toml"));
    }

    #[test]
    fn test_display_lists_every_error() {
        owo_colors::set_override(false);
        let mut diag = ConfigDiagnostics::new();
        diag.error(FieldPath::new("build.source"), "source directory is required");
        diag.error_with_hint(FieldPath::new("build.output"), "missing", "pass --output");
        diag.warn(FieldPath::new("transform.source"), "not shown");

        let display = diag.to_string();
        assert!(display.contains("[build.source] source directory is required"));
        assert!(display.contains("hint: pass --output"));
        assert!(display.contains("2 errors"));
        assert!(!display.contains("not shown"));
    }

    #[test]
    fn test_warnings_are_not_fatal() {
        let mut diag = ConfigDiagnostics::new();
        diag.warn(FieldPath::new("transform.source"), "inside source");
        assert_eq!((diag.len(), diag.warning_count()), (0, 1));
        assert!(diag.into_result().is_ok());

        let mut diag = ConfigDiagnostics::new();
        diag.error(FieldPath::new("build.source"), "bad");
        assert!(diag.into_result().is_err());
    }
}
