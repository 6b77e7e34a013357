//! Parsers for cgroup pids controller files.

/// Parses pids.max file.
/// Format: number, or "max" (v2) / "unlimited"; `None` means no ceiling.
///
/// An unparseable value is also reported as no ceiling.
pub fn parse_pids_max(content: &str) -> Option<i64> {
    match content.trim() {
        "max" | "unlimited" => None,
        trimmed => trimmed.parse().ok(),
    }
}

/// Parses pids.current file.
/// Format: number; unparseable or negative values read as 0.
pub fn parse_pids_current(content: &str) -> i64 {
    content.trim().parse::<i64>().unwrap_or(0).max(0)
}
