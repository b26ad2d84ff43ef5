//! Pluralization for log lines.

/// Format count with noun, handling pluralization
///
/// - `plural_count(0, "group")` -> `"0 groups"`
/// - `plural_count(1, "group")` -> `"1 group"`
/// - `plural_count(3, "template")` -> `"3 templates"`
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    let suffix = if count == 1 { "" } else { "s" };
    format!("{count} {noun}{suffix}")
}
