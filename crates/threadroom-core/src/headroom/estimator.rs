//! The headroom estimator: reads the four limit domains for one process.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::HeadroomReport;
use super::constraints::{
    cgroup_pids_reading, kernel_threads_reading, nproc_reading, virtual_memory_reading,
};
use crate::cancel::CancelToken;
use crate::collector::cgroup::read_pids_controller;
use crate::collector::procfs::count_process_tasks;
use crate::collector::procfs::parser::{
    MAX_ADDRESS_SPACE, MAX_PROCESSES, MAX_STACK_SIZE, ProcLimits, parse_proc_limits,
    parse_single_int, parse_vm_size_kb,
};
use crate::collector::{CgroupVersion, FileSystem, SystemThreadCounter};
use crate::config::Config;

/// The only failure surfaced by the estimator.
#[derive(Debug, thiserror::Error)]
pub enum EstimateError {
    #[error("process {pid} does not exist or {} is not accessible", .path.display())]
    ProcessNotFound { pid: u32, path: PathBuf },
}

/// Estimates thread-creation headroom for processes on one host.
///
/// Holds no per-call state; concurrent calls for different PIDs are safe.
pub struct HeadroomEstimator<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    cgroup_path: PathBuf,
    counter: SystemThreadCounter,
}

impl<F: FileSystem> HeadroomEstimator<F> {
    /// Creates an estimator reading `/proc` at `proc_path` and the cgroup
    /// tree at `/sys/fs/cgroup`.
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            cgroup_path: PathBuf::from("/sys/fs/cgroup"),
            counter: SystemThreadCounter::default(),
        }
    }

    pub fn from_config(fs: F, config: &Config) -> Self {
        Self::new(fs, &config.proc_path)
            .with_cgroup_path(&config.cgroup_path)
            .with_counter(config.thread_counter())
    }

    pub fn with_cgroup_path(mut self, cgroup_path: impl Into<PathBuf>) -> Self {
        self.cgroup_path = cgroup_path.into();
        self
    }

    pub fn with_counter(mut self, counter: SystemThreadCounter) -> Self {
        self.counter = counter;
        self
    }

    pub fn proc_path(&self) -> &Path {
        &self.proc_path
    }

    /// Reads every limit domain for `pid` and selects the binding one.
    ///
    /// Fails only when `<proc>/<pid>` is not a visible directory; in that
    /// case nothing else is read. `cancel` bounds the external listing
    /// command used for the host-wide thread count.
    pub fn estimate(&self, pid: u32, cancel: &CancelToken) -> Result<HeadroomReport, EstimateError> {
        let proc_dir = self.proc_path.join(pid.to_string());
        if !self.fs.is_dir(&proc_dir) {
            debug!("{} is not a directory", proc_dir.display());
            return Err(EstimateError::ProcessNotFound {
                pid,
                path: proc_dir,
            });
        }

        let threads = to_i64(count_process_tasks(&self.fs, &proc_dir));
        let limits = self.read_limits(&proc_dir);
        let vm_size_kib = self
            .fs
            .read_to_string(&proc_dir.join("status"))
            .ok()
            .and_then(|c| parse_vm_size_kb(&c));
        let controller = read_pids_controller(&self.fs, &self.cgroup_path, &proc_dir);
        let threads_max = self
            .fs
            .read_to_string(&self.proc_path.join("sys/kernel/threads-max"))
            .ok()
            .and_then(|c| parse_single_int(&c))
            .unwrap_or(0);
        let system_threads = to_i64(self.counter.count(&self.fs, &self.proc_path, cancel));

        trace!(
            pid,
            threads,
            threads_max,
            system_threads,
            ?vm_size_kib,
            ?controller,
            "limit inputs"
        );

        let readings = vec![
            nproc_reading(
                threads,
                limits
                    .soft_limited(MAX_PROCESSES)
                    .and_then(|v| i64::try_from(v).ok()),
            ),
            cgroup_pids_reading(threads, controller.as_ref()),
            kernel_threads_reading(threads_max, system_threads),
            virtual_memory_reading(
                limits.soft_limited(MAX_ADDRESS_SPACE),
                limits.soft_limited(MAX_STACK_SIZE),
                vm_size_kib,
            ),
        ];

        let report = HeadroomReport::from_readings(
            pid,
            threads,
            controller.map_or(CgroupVersion::None, |c| c.version),
            readings,
        );
        debug!(
            pid,
            remaining = report.remaining,
            binding = %report.binding,
            "thread headroom estimated"
        );
        Ok(report)
    }

    /// Missing or unreadable limits parse as empty, which makes every
    /// limit-derived domain unlimited.
    fn read_limits(&self, proc_dir: &Path) -> ProcLimits {
        match self.fs.read_to_string(&proc_dir.join("limits")) {
            Ok(content) => parse_proc_limits(&content),
            Err(e) => {
                debug!("cannot read {}/limits: {}", proc_dir.display(), e);
                ProcLimits::default()
            }
        }
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
