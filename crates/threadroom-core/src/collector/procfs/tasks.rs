//! Task (thread) counting from `/proc/[pid]/task`.

use crate::collector::traits::FileSystem;
use std::path::Path;
use tracing::trace;

/// Number of entries in `<proc_dir>/task`.
///
/// Returns 0 when the directory cannot be listed; callers treat 0 as
/// "unknown", never as a real thread count.
pub fn count_process_tasks<F: FileSystem>(fs: &F, proc_dir: &Path) -> u64 {
    match fs.read_dir(&proc_dir.join("task")) {
        Ok(entries) => entries.len() as u64,
        Err(e) => {
            trace!("cannot list {}/task: {}", proc_dir.display(), e);
            0
        }
    }
}

/// Sums task entries across every numeric entry under `proc_path`.
///
/// Processes that vanish or deny access while being walked are skipped.
pub fn count_table_tasks<F: FileSystem>(fs: &F, proc_path: &Path) -> std::io::Result<u64> {
    let mut total = 0u64;
    for entry in fs.read_dir(proc_path)? {
        let is_pid = entry
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.parse::<u32>().is_ok());
        if !is_pid || !fs.is_dir(&entry) {
            continue;
        }
        if let Ok(tasks) = fs.read_dir(&entry.join("task")) {
            total += tasks.len() as u64;
        }
    }
    Ok(total)
}
