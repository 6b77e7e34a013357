//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` and `/sys/fs/cgroup` states for
//! the thread-creation limits a process can run into.

use super::filesystem::MockFs;
use std::fmt::Display;

/// Soft limits rendered into a fixture `/proc/[pid]/limits` file.
///
/// `None` renders as `unlimited`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitsFixture {
    pub max_processes: Option<u64>,
    pub max_stack_bytes: Option<u64>,
    pub max_address_space_bytes: Option<u64>,
    pub max_open_files: Option<u64>,
}

impl Default for LimitsFixture {
    /// Limits of a login shell on a stock distribution.
    fn default() -> Self {
        Self {
            max_processes: Some(63432),
            max_stack_bytes: Some(8 * 1024 * 1024),
            max_address_space_bytes: None,
            max_open_files: Some(1024),
        }
    }
}

impl LimitsFixture {
    /// Every limit set to `unlimited`.
    pub fn unlimited() -> Self {
        Self {
            max_processes: None,
            max_stack_bytes: None,
            max_address_space_bytes: None,
            max_open_files: None,
        }
    }

    /// Renders the file in the kernel's column layout.
    pub fn render(&self) -> String {
        fn value(v: Option<u64>) -> String {
            v.map_or_else(|| "unlimited".to_string(), |n| n.to_string())
        }
        let row = |name: &str, soft: String, hard: String, units: &str| {
            format!("{:<25} {:<20} {:<20} {:<10}\n", name, soft, hard, units)
        };

        let mut out = row("Limit", "Soft Limit".into(), "Hard Limit".into(), "Units");
        out += &row("Max cpu time", value(None), value(None), "seconds");
        out += &row("Max file size", value(None), value(None), "bytes");
        out += &row("Max data size", value(None), value(None), "bytes");
        out += &row(
            "Max stack size",
            value(self.max_stack_bytes),
            value(None),
            "bytes",
        );
        out += &row("Max core file size", "0".into(), value(None), "bytes");
        out += &row("Max resident set", value(None), value(None), "bytes");
        out += &row(
            "Max processes",
            value(self.max_processes),
            value(self.max_processes),
            "processes",
        );
        out += &row(
            "Max open files",
            value(self.max_open_files),
            "1048576".into(),
            "files",
        );
        out += &row("Max locked memory", "8388608".into(), "8388608".into(), "bytes");
        out += &row(
            "Max address space",
            value(self.max_address_space_bytes),
            value(None),
            "bytes",
        );
        out += &row("Max file locks", value(None), value(None), "locks");
        out += &row("Max pending signals", "63432".into(), "63432".into(), "signals");
        out += &row("Max msgqueue size", "819200".into(), "819200".into(), "bytes");
        out += &row("Max nice priority", "0".into(), "0".into(), "");
        out += &row("Max realtime priority", "0".into(), "0".into(), "");
        out += &row("Max realtime timeout", value(None), value(None), "us");
        out
    }
}

impl MockFs {
    /// PID of the process under test in the pre-built scenarios.
    pub const TARGET_PID: u32 = 4242;

    /// Adds `count` task entries under `/proc/[pid]/task`.
    ///
    /// Thread IDs are `pid, pid + 1, ...`. A count of zero leaves only the
    /// process directory, which reads as an unreadable task list.
    pub fn add_threads(&mut self, pid: u32, count: u32) {
        if count == 0 {
            self.add_dir(format!("/proc/{}", pid));
            return;
        }
        for tid in pid..pid + count {
            self.add_dir(format!("/proc/{}/task/{}", pid, tid));
        }
    }

    /// Writes `/proc/[entry]/limits`, where `entry` is a PID or `self`.
    pub fn add_limits(&mut self, entry: impl Display, limits: &LimitsFixture) {
        self.add_file(format!("/proc/{}/limits", entry), limits.render());
    }

    /// Writes a `/proc/[pid]/status` reporting the given virtual size.
    pub fn add_vm_size(&mut self, pid: u32, vm_size_kb: u64) {
        self.add_file(
            format!("/proc/{}/status", pid),
            format!(
                "Name:\tworker\nUmask:\t0022\nState:\tS (sleeping)\nTgid:\t{pid}\nPid:\t{pid}\n\
                 PPid:\t1\nVmPeak:\t{vm_size_kb} kB\nVmSize:\t{vm_size_kb} kB\nVmRSS:\t20480 kB\n\
                 VmStk:\t132 kB\nThreads:\t1\n"
            ),
        );
    }

    /// Sets `/proc/sys/kernel/threads-max`.
    pub fn add_threads_max(&mut self, threads_max: u64) {
        self.add_file("/proc/sys/kernel/threads-max", format!("{}\n", threads_max));
    }

    /// Sets a sysctl value under `/proc/sys`, e.g. `net.core.somaxconn`.
    pub fn add_sysctl(&mut self, key: &str, value: &str) {
        self.add_file(
            format!("/proc/sys/{}", key.replace('.', "/")),
            format!("{}\n", value),
        );
    }

    /// Adds a unified (v2) pids controller at the cgroup root.
    pub fn add_cgroup_v2(&mut self, pids_max: &str, pids_current: u64) {
        self.add_file("/sys/fs/cgroup/pids.max", format!("{}\n", pids_max));
        self.add_file("/sys/fs/cgroup/pids.current", format!("{}\n", pids_current));
    }

    /// Adds a v1 pids hierarchy containing `pid` at `cgroup_path`.
    pub fn add_cgroup_v1(&mut self, pid: u32, cgroup_path: &str, pids_max: &str, pids_current: u64) {
        self.add_file(
            format!("/proc/{}/cgroup", pid),
            format!(
                "12:memory:{path}\n11:cpu,cpuacct:{path}\n5:pids:{path}\n1:name=systemd:{path}\n",
                path = cgroup_path
            ),
        );
        let dir = format!("/sys/fs/cgroup/pids{}", cgroup_path);
        self.add_file(format!("{}/pids.max", dir), format!("{}\n", pids_max));
        self.add_file(format!("{}/pids.current", dir), format!("{}\n", pids_current));
    }

    /// A host with generous limits and a v2 cgroup without a pids ceiling.
    ///
    /// The target runs 12 threads next to init (1) and a 40-thread daemon,
    /// so the proc table holds 53 tasks.
    pub fn typical_host() -> Self {
        let mut fs = Self::new();
        let pid = Self::TARGET_PID;

        fs.add_threads(1, 1);
        fs.add_threads(800, 40);
        fs.add_threads(pid, 12);
        fs.add_limits(pid, &LimitsFixture::default());
        fs.add_vm_size(pid, 2_400_000);
        fs.add_file(format!("/proc/{}/cgroup", pid), "0::/user.slice\n");
        fs.add_cgroup_v2("max", 310);
        fs.add_threads_max(126864);
        fs
    }

    /// A host where the kernel-wide thread table is nearly full.
    ///
    /// Target: 10 threads, `Max processes` 50, no pids controller,
    /// `threads-max` 1000 with 995 threads on the host, unlimited address
    /// space.
    pub fn thread_limited_host() -> Self {
        let mut fs = Self::new();
        let pid = Self::TARGET_PID;

        fs.add_threads(1, 985);
        fs.add_threads(pid, 10);
        fs.add_limits(
            pid,
            &LimitsFixture {
                max_processes: Some(50),
                ..LimitsFixture::default()
            },
        );
        fs.add_vm_size(pid, 1_048_576);
        fs.add_threads_max(1000);
        fs
    }

    /// A host where nothing limits thread creation.
    pub fn unconstrained_host() -> Self {
        let mut fs = Self::new();
        let pid = Self::TARGET_PID;

        fs.add_threads(1, 1);
        fs.add_threads(pid, 4);
        fs.add_limits(pid, &LimitsFixture::unlimited());
        fs.add_vm_size(pid, 65_536);
        fs.add_cgroup_v2("max", 5);
        fs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::FileSystem;
    use std::path::Path;

    #[test]
    fn test_limits_fixture_render_layout() {
        let rendered = LimitsFixture::default().render();
        let line = rendered
            .lines()
            .find(|l| l.starts_with("Max processes"))
            .unwrap();
        let fields: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(fields, ["Max", "processes", "63432", "63432", "processes"]);
        assert!(rendered.contains("Max address space         unlimited"));
    }

    #[test]
    fn test_typical_host_layout() {
        let fs = MockFs::typical_host();
        let tasks = fs.read_dir(Path::new("/proc/4242/task")).unwrap();
        assert_eq!(tasks.len(), 12);
        assert!(fs.is_file(Path::new("/sys/fs/cgroup/pids.max")));
        assert!(fs.is_file(Path::new("/proc/4242/limits")));

        let proc_entries = fs.read_dir(Path::new("/proc")).unwrap();
        assert_eq!(
            proc_entries,
            ["/proc/1", "/proc/4242", "/proc/800", "/proc/sys"].map(std::path::PathBuf::from)
        );
    }

    #[test]
    fn test_add_cgroup_v1_layout() {
        let mut fs = MockFs::new();
        fs.add_cgroup_v1(7, "/docker/abc", "512", 20);
        assert!(fs.is_file(Path::new("/sys/fs/cgroup/pids/docker/abc/pids.max")));
        let membership = fs.read_to_string(Path::new("/proc/7/cgroup")).unwrap();
        assert!(membership.contains("5:pids:/docker/abc"));
    }

    #[test]
    fn test_add_sysctl_path() {
        let mut fs = MockFs::new();
        fs.add_sysctl("net.ipv4.ip_local_port_range", "1024\t65000");
        let content = fs
            .read_to_string(Path::new("/proc/sys/net/ipv4/ip_local_port_range"))
            .unwrap();
        assert_eq!(content, "1024\t65000\n");
    }
}
