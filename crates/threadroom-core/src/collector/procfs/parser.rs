//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions over file contents. They never fail: lines that
//! do not match the expected layout are skipped, and callers decide what a
//! missing value means.

/// `Max processes` row of `/proc/[pid]/limits`.
pub const MAX_PROCESSES: &str = "Max processes";
/// `Max stack size` row of `/proc/[pid]/limits` (bytes).
pub const MAX_STACK_SIZE: &str = "Max stack size";
/// `Max address space` row of `/proc/[pid]/limits` (bytes).
pub const MAX_ADDRESS_SPACE: &str = "Max address space";
/// `Max open files` row of `/proc/[pid]/limits`.
pub const MAX_OPEN_FILES: &str = "Max open files";

/// A single soft or hard resource limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitValue {
    Limited(u64),
    Unlimited,
}

impl LimitValue {
    fn parse(token: &str) -> Option<Self> {
        if token == "unlimited" {
            Some(LimitValue::Unlimited)
        } else {
            token.parse().ok().map(LimitValue::Limited)
        }
    }

    /// Returns the numeric value, or `None` when unlimited.
    pub fn limited(self) -> Option<u64> {
        match self {
            LimitValue::Limited(v) => Some(v),
            LimitValue::Unlimited => None,
        }
    }
}

/// One row of `/proc/[pid]/limits`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitEntry {
    pub name: String,
    pub soft: LimitValue,
    pub hard: LimitValue,
    pub units: Option<String>,
}

/// Parsed `/proc/[pid]/limits`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcLimits {
    pub entries: Vec<LimitEntry>,
}

impl ProcLimits {
    /// Returns the soft limit of the named row, if the row was present and
    /// parseable.
    pub fn soft(&self, name: &str) -> Option<LimitValue> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.soft)
    }

    /// Soft limit as a number; `None` when unlimited, missing or unparseable.
    pub fn soft_limited(&self, name: &str) -> Option<u64> {
        self.soft(name).and_then(LimitValue::limited)
    }
}

/// Parses `/proc/[pid]/limits` content.
///
/// Format: a header row, then `<name> <soft> <hard> [units]` with the name
/// padded to a fixed column. Names contain spaces, so the name ends at the
/// first token that is a number or `unlimited`. Rows whose values cannot be
/// parsed are dropped.
pub fn parse_proc_limits(content: &str) -> ProcLimits {
    let mut limits = ProcLimits::default();

    for line in content.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first().is_none_or(|t| *t == "Limit") {
            continue;
        }

        let Some(idx) = tokens
            .iter()
            .position(|t| LimitValue::parse(t).is_some())
        else {
            continue;
        };
        if idx == 0 {
            continue;
        }

        let (Some(soft), Some(hard)) = (
            LimitValue::parse(tokens[idx]),
            tokens.get(idx + 1).and_then(|t| LimitValue::parse(t)),
        ) else {
            continue;
        };

        limits.entries.push(LimitEntry {
            name: tokens[..idx].join(" "),
            soft,
            hard,
            units: tokens.get(idx + 2).map(|u| u.to_string()),
        });
    }

    limits
}

/// Extracts `VmSize` (kB) from `/proc/[pid]/status` content.
///
/// Returns `None` when the field is absent or not a number. Kernel threads
/// have no `VmSize` line at all.
pub fn parse_vm_size_kb(content: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim() != "VmSize" {
            return None;
        }
        value.split_whitespace().next()?.parse().ok()
    })
}

/// One line of `/proc/[pid]/cgroup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupMembership {
    pub hierarchy_id: String,
    /// Controllers bound to the hierarchy; empty for the v2 unified line.
    pub controllers: Vec<String>,
    pub path: String,
}

/// Parses `/proc/[pid]/cgroup` content.
///
/// Format: `hierarchy-ID:controller-list:cgroup-path`, one per line. The path
/// may itself contain `:`.
pub fn parse_cgroup_membership(content: &str) -> Vec<CgroupMembership> {
    content
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, ':');
            let hierarchy_id = parts.next()?;
            let controllers = parts.next()?;
            let path = parts.next()?;
            Some(CgroupMembership {
                hierarchy_id: hierarchy_id.to_string(),
                controllers: controllers
                    .split(',')
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect(),
                path: path.to_string(),
            })
        })
        .collect()
}

/// Path of the v1 hierarchy carrying the `pids` controller, if any.
pub fn pids_cgroup_path(memberships: &[CgroupMembership]) -> Option<&str> {
    memberships
        .iter()
        .find(|m| m.controllers.iter().any(|c| c == "pids"))
        .map(|m| m.path.as_str())
}

/// Parses a single integer file such as `/proc/sys/kernel/threads-max`.
pub fn parse_single_int(content: &str) -> Option<i64> {
    content.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::LimitsFixture;

    const LIMITS: &str = "\
Limit                     Soft Limit           Hard Limit           Units     
Max cpu time              unlimited            unlimited            seconds   
Max stack size            8388608              unlimited            bytes     
Max processes             4096                 63432                processes 
Max open files            1024                 1048576              files     
Max address space         unlimited            unlimited            bytes     
Max nice priority         0                    0                    
";

    #[test]
    fn test_parse_proc_limits_rows() {
        let limits = parse_proc_limits(LIMITS);
        assert_eq!(limits.entries.len(), 6);
        assert_eq!(limits.soft(MAX_PROCESSES), Some(LimitValue::Limited(4096)));
        assert_eq!(limits.soft(MAX_STACK_SIZE), Some(LimitValue::Limited(8388608)));
        assert_eq!(limits.soft(MAX_ADDRESS_SPACE), Some(LimitValue::Unlimited));
        assert_eq!(limits.soft_limited(MAX_OPEN_FILES), Some(1024));
        assert_eq!(limits.soft_limited(MAX_ADDRESS_SPACE), None);
    }

    #[test]
    fn test_parse_proc_limits_hard_and_units() {
        let limits = parse_proc_limits(LIMITS);
        let nproc = limits
            .entries
            .iter()
            .find(|e| e.name == MAX_PROCESSES)
            .unwrap();
        assert_eq!(nproc.hard, LimitValue::Limited(63432));
        assert_eq!(nproc.units.as_deref(), Some("processes"));

        let nice = limits
            .entries
            .iter()
            .find(|e| e.name == "Max nice priority")
            .unwrap();
        assert_eq!(nice.units, None);
    }

    #[test]
    fn test_parse_proc_limits_garbage_value_drops_row() {
        let limits = parse_proc_limits("Max processes             lots                 lots                 processes\n");
        assert_eq!(limits.soft(MAX_PROCESSES), None);
    }

    #[test]
    fn test_parse_proc_limits_fixture_round() {
        let limits = parse_proc_limits(&LimitsFixture::default().render());
        assert_eq!(limits.soft_limited(MAX_PROCESSES), Some(63432));
        assert_eq!(limits.soft_limited(MAX_STACK_SIZE), Some(8 * 1024 * 1024));
        assert_eq!(limits.soft(MAX_ADDRESS_SPACE), Some(LimitValue::Unlimited));
    }

    #[test]
    fn test_parse_proc_limits_empty() {
        assert!(parse_proc_limits("").entries.is_empty());
    }

    #[test]
    fn test_parse_vm_size_kb() {
        let status = "Name:\tbash\nVmPeak:\t  30000 kB\nVmSize:\t  25000 kB\nVmRSS:\t 5000 kB\n";
        assert_eq!(parse_vm_size_kb(status), Some(25000));
        assert_eq!(parse_vm_size_kb("Name:\tkthreadd\nThreads:\t1\n"), None);
        assert_eq!(parse_vm_size_kb("VmSize:\tabc kB\n"), None);
    }

    #[test]
    fn test_parse_cgroup_membership_v1() {
        let content = "12:memory:/docker/abc\n5:pids:/docker/abc\n3:cpu,cpuacct:/docker/abc\n";
        let memberships = parse_cgroup_membership(content);
        assert_eq!(memberships.len(), 3);
        assert_eq!(memberships[2].controllers, ["cpu", "cpuacct"]);
        assert_eq!(pids_cgroup_path(&memberships), Some("/docker/abc"));
    }

    #[test]
    fn test_parse_cgroup_membership_v2_only() {
        let memberships = parse_cgroup_membership("0::/user.slice/user-1000.slice\n");
        assert_eq!(memberships.len(), 1);
        assert!(memberships[0].controllers.is_empty());
        assert_eq!(pids_cgroup_path(&memberships), None);
    }

    #[test]
    fn test_parse_cgroup_membership_path_with_colon() {
        let memberships = parse_cgroup_membership("5:pids:/kubepods/pod:1\n");
        assert_eq!(memberships[0].path, "/kubepods/pod:1");
    }

    #[test]
    fn test_parse_single_int() {
        assert_eq!(parse_single_int("126864\n"), Some(126864));
        assert_eq!(parse_single_int(""), None);
        assert_eq!(parse_single_int("max\n"), None);
    }
}
