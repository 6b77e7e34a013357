//! Per-domain remaining-capacity rules.
//!
//! Each function turns already-read values into a [`ConstraintReading`].
//! Unknown inputs exclude the domain (fail-open) instead of producing 0.

use super::{ConstraintKind, ConstraintReading};
use crate::collector::PidsController;

/// A: `Max processes` soft limit minus the process's own threads.
///
/// Excluded when the limit is unlimited/unknown or the thread count is 0
/// (task list unreadable).
pub fn nproc_reading(threads: i64, max_processes: Option<i64>) -> ConstraintReading {
    match max_processes {
        Some(limit) if threads > 0 => {
            ConstraintReading::limited(ConstraintKind::Nproc, limit, threads, limit - threads)
        }
        _ => ConstraintReading::unlimited(ConstraintKind::Nproc, max_processes, threads),
    }
}

/// B: `pids.max - pids.current + threads`.
///
/// Only this process is assumed to grow; the rest of the cgroup's usage is
/// held fixed, so the process's own threads are added back. Excluded when
/// there is no controller, no ceiling, or the thread count is 0.
pub fn cgroup_pids_reading(threads: i64, controller: Option<&PidsController>) -> ConstraintReading {
    let kind = ConstraintKind::CgroupPids;
    match controller {
        Some(PidsController {
            max: Some(max),
            current,
            ..
        }) if threads > 0 => {
            let remaining = max.saturating_sub(*current).saturating_add(threads);
            ConstraintReading::limited(kind, *max, *current, remaining)
        }
        Some(ctl) => ConstraintReading::unlimited(kind, ctl.max, ctl.current),
        None => ConstraintReading::unlimited(kind, None, 0),
    }
}

/// C: `threads-max` minus every thread on the host.
///
/// Excluded when either value is not positive, which includes a failed
/// system-wide count.
pub fn kernel_threads_reading(threads_max: i64, system_threads: i64) -> ConstraintReading {
    let kind = ConstraintKind::KernelThreadsMax;
    if threads_max > 0 && system_threads > 0 {
        ConstraintReading::limited(kind, threads_max, system_threads, threads_max - system_threads)
    } else {
        ConstraintReading::unlimited(kind, (threads_max > 0).then_some(threads_max), system_threads)
    }
}

/// D: how many more stack-sized mappings fit in the remaining address space.
///
/// `floor((as_limit_kib - vm_size_kib) / stack_kib)`, with both limits
/// converted from bytes to KiB first. A non-positive numerator is a hard 0.
/// Excluded when either limit is unlimited, the stack limit is below 1 KiB,
/// or `VmSize` is unknown or 0.
pub fn virtual_memory_reading(
    address_space_bytes: Option<u64>,
    stack_bytes: Option<u64>,
    vm_size_kib: Option<u64>,
) -> ConstraintReading {
    let kind = ConstraintKind::VirtualMemory;
    let as_limit_kib = address_space_bytes.and_then(|b| i64::try_from(b / 1024).ok());
    let vm_kib = vm_size_kib.and_then(|v| i64::try_from(v).ok()).unwrap_or(0);
    let stack_kib = stack_bytes
        .and_then(|b| i64::try_from(b / 1024).ok())
        .unwrap_or(0);

    let Some(as_limit_kib) = as_limit_kib else {
        return ConstraintReading::unlimited(kind, None, vm_kib);
    };
    if stack_kib <= 0 || vm_kib <= 0 {
        return ConstraintReading::unlimited(kind, Some(as_limit_kib), vm_kib);
    }

    let free_kib = as_limit_kib - vm_kib;
    let remaining = if free_kib <= 0 { 0 } else { free_kib / stack_kib };
    ConstraintReading::limited(kind, as_limit_kib, vm_kib, remaining)
}
