/// Chooses the PID to inspect.
///
/// A requested value is used only when it is a positive integer that fits a
/// PID; anything else (absent, zero, negative, too large) falls back to
/// `self_pid`. This never fails.
pub fn resolve_target_pid(requested: Option<i64>, self_pid: u32) -> u32 {
    requested
        .filter(|&pid| pid > 0)
        .and_then(|pid| u32::try_from(pid).ok())
        .unwrap_or(self_pid)
}
