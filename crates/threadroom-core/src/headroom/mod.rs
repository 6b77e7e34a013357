//! Thread-creation headroom.
//!
//! Answers "how many more threads can this process create, and which limit
//! stops it first?" by reading four independent limits, turning each into a
//! remaining thread count, and picking the smallest:
//!
//! | Tag | Kind                | Remaining                                  |
//! |-----|---------------------|--------------------------------------------|
//! | A   | `Max processes`     | `limit - threads`                          |
//! | B   | cgroup `pids.max`   | `pids.max - pids.current + threads`        |
//! | C   | `threads-max`       | `threads-max - host threads`               |
//! | D   | address space/stack | `(as_limit - VmSize) / stack_limit`        |
//!
//! Limits that are unlimited or unreadable become [`UNLIMITED_HEADROOM`] and
//! never win the minimum.

pub mod constraints;
mod estimator;
mod select;
mod target;

use serde::Serialize;
use std::fmt;

use crate::collector::CgroupVersion;

pub use estimator::{EstimateError, HeadroomEstimator};
pub use select::select_binding;
pub use target::resolve_target_pid;

/// Remaining capacity substituted for limits that are unlimited or unknown.
pub const UNLIMITED_HEADROOM: i64 = 999_999_999;

/// The four limit domains, in evaluation (and tie-break) order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// A: per-user process/thread soft limit.
    Nproc,
    /// B: cgroup pids controller.
    CgroupPids,
    /// C: kernel-wide `threads-max`.
    KernelThreadsMax,
    /// D: address space divided by stack size.
    VirtualMemory,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 4] = [
        ConstraintKind::Nproc,
        ConstraintKind::CgroupPids,
        ConstraintKind::KernelThreadsMax,
        ConstraintKind::VirtualMemory,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ConstraintKind::Nproc => "nproc",
            ConstraintKind::CgroupPids => "cgroup pids",
            ConstraintKind::KernelThreadsMax => "kernel threads-max",
            ConstraintKind::VirtualMemory => "virtual memory / stack",
        }
    }

    /// Single-letter tag used in report breakdowns.
    pub fn tag(self) -> char {
        match self {
            ConstraintKind::Nproc => 'A',
            ConstraintKind::CgroupPids => 'B',
            ConstraintKind::KernelThreadsMax => 'C',
            ConstraintKind::VirtualMemory => 'D',
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One limit domain's state for the target process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ConstraintReading {
    pub kind: ConstraintKind,
    /// The limit, when known. For D this is the address-space limit in KiB.
    pub limit: Option<i64>,
    /// Usage counted against the limit. For D this is `VmSize` in KiB.
    pub current: i64,
    /// Additional threads allowed; [`UNLIMITED_HEADROOM`] when excluded.
    pub remaining: i64,
    /// Set when the domain is excluded from the minimum.
    pub unlimited: bool,
}

impl ConstraintReading {
    pub fn limited(kind: ConstraintKind, limit: i64, current: i64, remaining: i64) -> Self {
        Self {
            kind,
            limit: Some(limit),
            current,
            remaining,
            unlimited: false,
        }
    }

    pub fn unlimited(kind: ConstraintKind, limit: Option<i64>, current: i64) -> Self {
        Self {
            kind,
            limit,
            current,
            remaining: UNLIMITED_HEADROOM,
            unlimited: true,
        }
    }
}

/// Point-in-time headroom of one process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HeadroomReport {
    pub pid: u32,
    /// Threads the process runs now; 0 when its task list was unreadable.
    pub current_threads: i64,
    /// Smallest remaining count; `<= 0` means thread creation already fails.
    pub remaining: i64,
    pub binding: ConstraintKind,
    pub cgroup_version: CgroupVersion,
    /// Per-domain readings in A, B, C, D order.
    pub readings: Vec<ConstraintReading>,
}

impl HeadroomReport {
    /// Builds the report and selects the binding constraint.
    pub fn from_readings(
        pid: u32,
        current_threads: i64,
        cgroup_version: CgroupVersion,
        readings: Vec<ConstraintReading>,
    ) -> Self {
        let (remaining, binding) = select_binding(&readings);
        Self {
            pid,
            current_threads,
            remaining,
            binding,
            cgroup_version,
            readings,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.remaining <= 0
    }

    /// True when every domain was excluded as unlimited.
    pub fn is_unconstrained(&self) -> bool {
        self.readings.iter().all(|r| r.unlimited)
    }

    pub fn reading(&self, kind: ConstraintKind) -> Option<&ConstraintReading> {
        self.readings.iter().find(|r| r.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_order_and_labels() {
        let tags: String = ConstraintKind::ALL.iter().map(|k| k.tag()).collect();
        assert_eq!(tags, "ABCD");
        assert_eq!(ConstraintKind::KernelThreadsMax.to_string(), "kernel threads-max");
    }

    #[test]
    fn test_report_flags() {
        let readings = vec![
            ConstraintReading::limited(ConstraintKind::Nproc, 10, 10, 0),
            ConstraintReading::unlimited(ConstraintKind::CgroupPids, None, 0),
        ];
        let report = HeadroomReport::from_readings(1, 10, CgroupVersion::None, readings);
        assert!(report.is_blocking());
        assert!(!report.is_unconstrained());
        assert_eq!(report.reading(ConstraintKind::Nproc).unwrap().remaining, 0);
        assert!(report.reading(ConstraintKind::VirtualMemory).is_none());
    }

    #[test]
    fn test_report_serializes_kinds_snake_case() {
        let report = HeadroomReport::from_readings(
            7,
            1,
            CgroupVersion::V2,
            vec![ConstraintReading::unlimited(ConstraintKind::KernelThreadsMax, None, 0)],
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["binding"], "kernel_threads_max");
        assert_eq!(json["cgroup_version"], "v2");
        assert_eq!(json["remaining"], UNLIMITED_HEADROOM);
    }
}
