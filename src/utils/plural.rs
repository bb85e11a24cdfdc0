//! Pluralization for log lines.

/// Format count with noun, e.g. `1 archive`, `3 archives`.
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    let suffix = if count == 1 { "" } else { "s" };
    format!("{count} {noun}{suffix}")
}
