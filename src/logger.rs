//! Terminal output: prefixed log lines and a single progress line.
//!
//! ```ignore
//! log!("build"; "{} -> {}", source, output);
//! debug!("copy"; "{}", path);          // only with --verbose
//!
//! let progress = ProgressLine::new(&[("templates", 7), ("assets", 22)]);
//! progress.inc("templates");
//! progress.finish();                    // [build] templates(7/7) assets(22/22)
//! ```
//!
//! While a progress line is on screen, log lines overwrite it and the next
//! `inc` draws it again below them.

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::{OwoColorize, Stream, Style};
use parking_lot::Mutex;
use std::{
    fmt::Display,
    io::{Write, stdout},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

static VERBOSE: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);
/// Whether a [`ProgressLine`] currently owns the last terminal line.
static PROGRESS_ACTIVE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Quiet mode hides everything except `error` and `warning` lines.
pub fn set_quiet(q: bool) {
    QUIET.store(q, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Log a message with a colored module prefix.
///
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like [`log!`], printed only with `--verbose`.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// `text` in `style` when `stream` takes colors. Honours `--color`.
pub fn styled(stream: Stream, text: impl Display, style: Style) -> String {
    text.if_supports_color(stream, |t| t.style(style)).to_string()
}

pub fn log(module: &str, message: &str) {
    let kind = PrefixKind::of(module);
    if is_quiet() && !kind.is_alert() {
        return;
    }

    let mut out = stdout().lock();
    if PROGRESS_ACTIVE.load(Ordering::Relaxed) {
        execute!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
    }
    writeln!(out, "{} {}", kind.paint(module), message).ok();
    out.flush().ok();
}

/// Coloring group of a module prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrefixKind {
    Phase,
    External,
    Error,
    Warning,
    Other,
}

impl PrefixKind {
    fn of(module: &str) -> Self {
        match module.to_ascii_lowercase().as_str() {
            "build" | "scan" => Self::Phase,
            "transform" | "stage" => Self::External,
            "error" => Self::Error,
            "warning" => Self::Warning,
            _ => Self::Other,
        }
    }

    const fn is_alert(self) -> bool {
        matches!(self, Self::Error | Self::Warning)
    }

    fn paint(self, module: &str) -> String {
        let style = match self {
            Self::Phase => Style::new().bright_blue(),
            Self::External => Style::new().bright_magenta(),
            Self::Error => Style::new().bright_red(),
            Self::Warning | Self::Other => Style::new().bright_yellow(),
        };
        styled(Stream::Stdout, format_args!("[{module}]"), style.bold())
    }
}

/// Named counters redrawn in place: `[build] templates(3/7) assets(10/22)`.
pub struct ProgressLine {
    counters: Vec<(&'static str, usize, AtomicUsize)>,
    redraw: Mutex<()>,
}

impl ProgressLine {
    /// Counters with a zero total are left out.
    pub fn new(items: &[(&'static str, usize)]) -> Self {
        let counters = items
            .iter()
            .filter(|(_, total)| *total > 0)
            .map(|&(name, total)| (name, total, AtomicUsize::new(0)))
            .collect();

        PROGRESS_ACTIVE.store(true, Ordering::Relaxed);
        let progress = Self {
            counters,
            redraw: Mutex::new(()),
        };
        progress.draw(false);
        progress
    }

    /// Advance `name` by one. Unknown names are ignored.
    pub fn inc(&self, name: &str) {
        let Some((_, _, current)) = self.counters.iter().find(|(n, ..)| *n == name) else {
            return;
        };
        current.fetch_add(1, Ordering::Relaxed);
        // Skip the redraw if another one is in flight
        if self.redraw.try_lock().is_some() {
            self.draw(false);
        }
    }

    fn line(&self) -> String {
        self.counters
            .iter()
            .map(|(name, total, current)| format!("{name}({}/{total})", current.load(Ordering::Relaxed)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn draw(&self, keep: bool) {
        let mut out = stdout().lock();
        execute!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
        let text = format!("{} {}", PrefixKind::Phase.paint("build"), self.line());
        if keep {
            writeln!(out, "{text}").ok();
        } else {
            write!(out, "{text}").ok();
        }
        out.flush().ok();
    }

    /// Leave the final counts on screen.
    pub fn finish(self) {
        PROGRESS_ACTIVE.store(false, Ordering::Relaxed);
        {
            let _guard = self.redraw.lock();
            self.draw(true);
        }
        std::mem::forget(self);
    }
}

impl Drop for ProgressLine {
    /// Abandoned (e.g. on error): erase the partial line.
    fn drop(&mut self) {
        PROGRESS_ACTIVE.store(false, Ordering::Relaxed);
        let mut out = stdout().lock();
        execute!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
        out.flush().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_counts() {
        let progress = ProgressLine::new(&[("templates", 2), ("assets", 0)]);
        assert_eq!(progress.counters.len(), 1);
        progress.inc("templates");
        progress.inc("assets");
        assert_eq!(progress.line(), "templates(1/2)");
        drop(progress);
        assert!(!PROGRESS_ACTIVE.load(Ordering::Relaxed));
    }

    #[test]
    fn test_prefix_kinds() {
        assert!(PrefixKind::of("error").is_alert());
        assert!(PrefixKind::of("Warning").is_alert());
        assert!(!PrefixKind::of("build").is_alert());
        assert_eq!(PrefixKind::of("stage"), PrefixKind::External);
        assert!(PrefixKind::of("copy").paint("copy").contains("[copy]"));
    }

    #[test]
    fn test_styled_plain_without_color() {
        owo_colors::set_override(false);
        assert_eq!(PrefixKind::Error.paint("error"), "[error]");
        assert_eq!(styled(Stream::Stdout, "x", Style::new().red()), "x");
    }
}
