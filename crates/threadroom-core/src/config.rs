//! Runtime configuration: where to find the host's pseudo-filesystems and
//! how to list threads.
//!
//! The CLI fills this from flags and `THREADROOM_*` environment variables;
//! `Default` matches a stock Linux host.

use std::path::PathBuf;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::collector::{SystemThreadCounter, ThreadCountStrategy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root of the proc filesystem.
    pub proc_path: PathBuf,
    /// Root of the cgroup filesystem (v2 mount, or parent of the v1 `pids` mount).
    pub cgroup_path: PathBuf,
    /// Process-listing command printing one line per thread.
    pub ps_program: String,
    pub ps_args: Vec<String>,
    /// Upper bound on the whole run, enforced on the listing command.
    pub command_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_path: PathBuf::from("/proc"),
            cgroup_path: PathBuf::from("/sys/fs/cgroup"),
            ps_program: "ps".to_string(),
            ps_args: vec!["-eLf".to_string()],
            command_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Listing command first, proc-table walk as fallback.
    pub fn thread_counter(&self) -> SystemThreadCounter {
        SystemThreadCounter::new(vec![
            ThreadCountStrategy::command(self.ps_program.clone(), self.ps_args.iter().cloned()),
            ThreadCountStrategy::ProcTable,
        ])
    }

    /// A fresh token that expires after `command_timeout`.
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken::with_timeout(self.command_timeout)
    }
}
