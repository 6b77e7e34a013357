//! Locates and reads the pids controller governing a process.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::collector::procfs::parser::{parse_cgroup_membership, pids_cgroup_path};
use crate::collector::traits::FileSystem;

use super::parser;

/// Which cgroup hierarchy supplied the pids numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CgroupVersion {
    V1,
    V2,
    None,
}

impl fmt::Display for CgroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CgroupVersion::V1 => "v1",
            CgroupVersion::V2 => "v2",
            CgroupVersion::None => "none",
        })
    }
}

/// State of a pids controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidsController {
    pub version: CgroupVersion,
    /// `pids.max`; `None` when the controller has no ceiling.
    pub max: Option<i64>,
    /// `pids.current`; 0 when unreadable.
    pub current: i64,
}

/// Finds the pids controller for the process at `proc_dir`.
///
/// The v2 control file at `<cgroup_root>/pids.max` is probed first. Without
/// it, the v1 `pids` hierarchy path is taken from `<proc_dir>/cgroup` and
/// looked up under `<cgroup_root>/pids`. Returns `None` when neither exists.
pub fn read_pids_controller<F: FileSystem>(
    fs: &F,
    cgroup_root: &Path,
    proc_dir: &Path,
) -> Option<PidsController> {
    if fs.is_file(&cgroup_root.join("pids.max")) {
        return Some(read_controller_dir(fs, cgroup_root, CgroupVersion::V2));
    }

    let membership = fs.read_to_string(&proc_dir.join("cgroup")).ok()?;
    let memberships = parse_cgroup_membership(&membership);
    let path = pids_cgroup_path(&memberships).filter(|p| !p.is_empty())?;

    let dir = cgroup_root
        .join("pids")
        .join(path.trim_start_matches('/'));
    if !fs.is_file(&dir.join("pids.max")) {
        debug!("pids hierarchy {} has no pids.max", dir.display());
        return None;
    }
    Some(read_controller_dir(fs, &dir, CgroupVersion::V1))
}

fn read_controller_dir<F: FileSystem>(fs: &F, dir: &Path, version: CgroupVersion) -> PidsController {
    let max = fs
        .read_to_string(&dir.join("pids.max"))
        .ok()
        .and_then(|c| parser::parse_pids_max(&c));
    let current = fs
        .read_to_string(&dir.join("pids.current"))
        .map(|c| parser::parse_pids_current(&c))
        .unwrap_or(0);

    PidsController {
        version,
        max,
        current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;

    const ROOT: &str = "/sys/fs/cgroup";

    #[test]
    fn test_v2_controller() {
        let mut fs = MockFs::new();
        fs.add_cgroup_v2("1024", 37);

        let ctl = read_pids_controller(&fs, Path::new(ROOT), Path::new("/proc/1")).unwrap();
        assert_eq!(ctl.version, CgroupVersion::V2);
        assert_eq!(ctl.max, Some(1024));
        assert_eq!(ctl.current, 37);
    }

    #[test]
    fn test_v2_takes_precedence_over_v1() {
        let mut fs = MockFs::new();
        fs.add_cgroup_v2("max", 3);
        fs.add_cgroup_v1(9, "/docker/abc", "100", 10);

        let ctl = read_pids_controller(&fs, Path::new(ROOT), Path::new("/proc/9")).unwrap();
        assert_eq!(ctl.version, CgroupVersion::V2);
        assert_eq!(ctl.max, None);
    }

    #[test]
    fn test_v1_controller_from_membership() {
        let mut fs = MockFs::new();
        fs.add_cgroup_v1(9, "/docker/abc", "100", 10);

        let ctl = read_pids_controller(&fs, Path::new(ROOT), Path::new("/proc/9")).unwrap();
        assert_eq!(ctl.version, CgroupVersion::V1);
        assert_eq!(ctl.max, Some(100));
        assert_eq!(ctl.current, 10);
    }

    #[test]
    fn test_v1_hierarchy_without_control_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/9/cgroup", "5:pids:/missing\n");
        assert!(read_pids_controller(&fs, Path::new(ROOT), Path::new("/proc/9")).is_none());
    }

    #[test]
    fn test_no_controller() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/9/cgroup", "0::/user.slice\n");
        assert!(read_pids_controller(&fs, Path::new(ROOT), Path::new("/proc/9")).is_none());
        assert!(read_pids_controller(&fs, Path::new(ROOT), Path::new("/proc/10")).is_none());
    }

    #[test]
    fn test_unreadable_current_is_zero() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/fs/cgroup/pids.max", "64\n");

        let ctl = read_pids_controller(&fs, Path::new(ROOT), Path::new("/proc/1")).unwrap();
        assert_eq!(ctl.max, Some(64));
        assert_eq!(ctl.current, 0);
    }

    #[test]
    fn test_version_display() {
        assert_eq!(CgroupVersion::V1.to_string(), "v1");
        assert_eq!(CgroupVersion::None.to_string(), "none");
    }
}
