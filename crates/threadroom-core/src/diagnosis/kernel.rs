//! The `kernel` plugin: network sysctl and ulimit baselines.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::collector::procfs::parser::{
    LimitValue, MAX_OPEN_FILES, MAX_PROCESSES, parse_proc_limits,
};
use crate::collector::{FileSystem, RealFs};
use crate::config::Config;

use super::{DiagnosisResult, Finding, Plugin, PluginError, RunContext, Severity, Suggestion};

pub const PLUGIN_NAME: &str = "kernel";

const NET_SCENARIO: &str = "kernel.net.baseline";
const LIMIT_SCENARIO: &str = "kernel.limit.baseline";

/// Minimum soft limit for open files and processes.
pub const LIMIT_BASELINE: u64 = 655_350;

/// Recommended value of one sysctl.
#[derive(Clone, Copy, Debug)]
pub struct SysctlExpectation {
    pub key: &'static str,
    pub expected: &'static str,
    pub purpose: &'static str,
}

pub const NET_SYSCTL_BASELINE: &[SysctlExpectation] = &[
    SysctlExpectation {
        key: "net.ipv4.tcp_syncookies",
        expected: "1",
        purpose: "SYN cookies keep the accept queue usable during a SYN flood",
    },
    SysctlExpectation {
        key: "net.core.somaxconn",
        expected: "4096",
        purpose: "caps the listen backlog; too small drops connections under load",
    },
    SysctlExpectation {
        key: "net.netfilter.nf_conntrack_max",
        expected: "655350",
        purpose: "size of the connection tracking table; too small logs \
                  `nf_conntrack: table full, dropping packet`",
    },
    SysctlExpectation {
        key: "net.ipv4.tcp_max_syn_backlog",
        expected: "8192",
        purpose: "half-open connection queue; too small amplifies SYN bursts",
    },
    SysctlExpectation {
        key: "net.ipv4.ip_local_port_range",
        expected: "1024 65000",
        purpose: "ephemeral port range; too narrow exhausts local ports",
    },
    SysctlExpectation {
        key: "net.ipv4.tcp_max_tw_buckets",
        expected: "50000",
        purpose: "TIME_WAIT socket cap; too small logs `time wait bucket table overflow`",
    },
    SysctlExpectation {
        key: "net.netfilter.nf_conntrack_tcp_timeout_established",
        expected: "1200",
        purpose: "conntrack timeout for established connections; too large pins table entries",
    },
    SysctlExpectation {
        key: "net.ipv4.tcp_timestamps",
        expected: "1",
        purpose: "TCP timestamps, normally on together with tcp_tw_recycle=0",
    },
    SysctlExpectation {
        key: "net.ipv4.tcp_tw_recycle",
        expected: "0",
        purpose: "fast TIME_WAIT recycling breaks clients behind NAT and should stay off",
    },
    SysctlExpectation {
        key: "net.ipv4.tcp_tw_reuse",
        expected: "1",
        purpose: "reuse of TIME_WAIT sockets relieves local port pressure",
    },
    SysctlExpectation {
        key: "net.ipv4.tcp_fin_timeout",
        expected: "30",
        purpose: "FIN-WAIT-2 timeout; too large accumulates FIN_WAIT2 sockets",
    },
];

pub struct KernelPlugin<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
}

impl KernelPlugin<RealFs> {
    pub fn host(config: &Config) -> Self {
        Self::new(RealFs::new(), &config.proc_path)
    }
}

impl<F: FileSystem> KernelPlugin<F> {
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    fn sysctl_path(&self, key: &str) -> PathBuf {
        self.proc_path.join("sys").join(key.replace('.', "/"))
    }

    fn check_net_baseline(&self, result: &mut DiagnosisResult) {
        for item in NET_SYSCTL_BASELINE {
            let id = format!("{}.sysctl.{}", NET_SCENARIO, sanitize_id(item.key));
            let path = self.sysctl_path(item.key);

            let current = match self.fs.read_to_string(&path) {
                Ok(value) => value,
                Err(err) => {
                    debug!("cannot read {}: {}", path.display(), err);
                    result.findings.push(Finding {
                        id: format!("{}.read_error", id),
                        title: format!("Cannot read kernel parameter {}", item.key),
                        description: format!("Reading {} failed: {}", path.display(), err),
                        severity: Severity::Warning,
                        impact: "Whether this parameter meets the network baseline is unknown."
                            .to_string(),
                    });
                    continue;
                }
            };

            if normalize(&current) == item.expected {
                continue;
            }

            result.findings.push(Finding {
                id: id.clone(),
                title: format!("Kernel parameter {} differs from the recommended value", item.key),
                description: format!(
                    "Current value is {:?}, recommended {:?}: {}.",
                    current.trim(),
                    item.expected,
                    item.purpose
                ),
                severity: Severity::Warning,
                impact: "Under high concurrency or abnormal traffic this can amplify packet \
                         drops, TIME_WAIT build-up or connection exhaustion."
                    .to_string(),
            });
            result.suggestions.push(Suggestion {
                finding_id: id,
                title: format!("Set {} to {}", item.key, item.expected),
                details: format!(
                    "Until next reboot:\n  sysctl -w {key}=\"{value}\"\n\
                     Persistently:\n  1. Add this line to /etc/sysctl.conf:\n     \
                     {key} = {value}\n  2. Run sysctl -p to apply it.\n",
                    key = item.key,
                    value = item.expected
                ),
            });
        }
    }

    fn check_limit_baseline(&self, result: &mut DiagnosisResult) {
        let path = self.proc_path.join("self/limits");
        let limits = match self.fs.read_to_string(&path) {
            Ok(content) => parse_proc_limits(&content),
            Err(err) => {
                debug!("skipping ulimit baseline, cannot read {}: {}", path.display(), err);
                return;
            }
        };

        let checks = [
            (MAX_OPEN_FILES, "nofile", 'n', "too many open files"),
            (MAX_PROCESSES, "nproc", 'u', "resource temporarily unavailable"),
        ];
        for (name, item, flag, symptom) in checks {
            let current = match limits.soft(name) {
                Some(LimitValue::Limited(value)) if value < LIMIT_BASELINE => value,
                _ => continue,
            };
            let id = format!("{}.ulimit.{}", LIMIT_SCENARIO, item);
            result.findings.push(Finding {
                id: id.clone(),
                title: format!("{} soft limit is below {}", name, LIMIT_BASELINE),
                description: format!(
                    "The soft limit is {}, recommended at least {}. Low values surface as \
                     '{}' under load.",
                    current, LIMIT_BASELINE, symptom
                ),
                severity: Severity::Warning,
                impact: "Services may fail to open connections or start workers at peak load."
                    .to_string(),
            });
            result.suggestions.push(Suggestion {
                finding_id: id,
                title: format!("Raise {} to {}", name, LIMIT_BASELINE),
                details: format!(
                    "1. For the current shell session:\n   ulimit -SH{flag} {limit}\n\n\
                     2. Persistently in /etc/security/limits.conf:\n   \
                     root soft {item} {limit}\n   \
                     root hard {item} {limit}\n   \
                     *    soft {item} {limit}\n   \
                     *    hard {item} {limit}\n\
                     Log in again or restart the service to apply it.",
                    flag = flag,
                    item = item,
                    limit = LIMIT_BASELINE
                ),
            });
        }
    }
}

impl<F: FileSystem> Plugin for KernelPlugin<F> {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn description(&self) -> &'static str {
        "Kernel parameter baselines (network sysctls and ulimits)"
    }

    fn run(&self, _ctx: &RunContext) -> Result<DiagnosisResult, PluginError> {
        let mut result = DiagnosisResult::new(PLUGIN_NAME);
        self.check_net_baseline(&mut result);
        self.check_limit_baseline(&mut result);
        info!(findings = result.findings.len(), "kernel baseline finished");
        Ok(result)
    }
}

fn sanitize_id(key: &str) -> String {
    key.replace('.', "_")
}

/// Collapses runs of whitespace so `1024\t65000` compares equal to `1024 65000`.
fn normalize(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;
    use crate::collector::mock::LimitsFixture;

    fn tuned_host() -> MockFs {
        let mut fs = MockFs::new();
        for item in NET_SYSCTL_BASELINE {
            fs.add_sysctl(item.key, item.expected);
        }
        // the kernel separates the port range with a tab
        fs.add_sysctl("net.ipv4.ip_local_port_range", "1024\t65000");
        fs.add_limits(
            "self",
            &LimitsFixture {
                max_open_files: Some(1_048_576),
                ..LimitsFixture::unlimited()
            },
        );
        fs
    }

    fn run(fs: MockFs) -> DiagnosisResult {
        KernelPlugin::new(fs, "/proc")
            .run(&RunContext::default())
            .unwrap()
    }

    #[test]
    fn test_baseline_has_eleven_keys() {
        assert_eq!(NET_SYSCTL_BASELINE.len(), 11);
    }

    #[test]
    fn test_tuned_host_has_no_findings() {
        let result = run(tuned_host());
        assert_eq!(result.plugin, "kernel");
        assert!(result.findings.is_empty(), "{:?}", result.findings);
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_mismatch_yields_finding_and_suggestion() {
        let mut fs = tuned_host();
        fs.add_sysctl("net.core.somaxconn", "128");

        let result = run(fs);
        assert_eq!(result.findings.len(), 1);
        let finding = &result.findings[0];
        assert_eq!(finding.id, "kernel.net.baseline.sysctl.net_core_somaxconn");
        assert_eq!(finding.severity, Severity::Warning);
        assert!(finding.description.contains("\"128\""));

        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.suggestions[0].finding_id, finding.id);
        assert!(
            result.suggestions[0]
                .details
                .contains("sysctl -w net.core.somaxconn=\"4096\"")
        );
    }

    #[test]
    fn test_unreadable_key_warns_without_suggestion() {
        let mut fs = tuned_host();
        fs.remove("/proc/sys/net/netfilter");

        let result = run(fs);
        let ids: Vec<&str> = result.findings.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "kernel.net.baseline.sysctl.net_netfilter_nf_conntrack_max.read_error",
                "kernel.net.baseline.sysctl.net_netfilter_nf_conntrack_tcp_timeout_established.read_error",
            ]
        );
        assert!(result.findings.iter().all(|f| f.severity == Severity::Warning));
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_low_ulimits() {
        let mut fs = tuned_host();
        fs.add_limits("self", &LimitsFixture::default());

        let result = run(fs);
        let ids: Vec<&str> = result.findings.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(
            ids,
            ["kernel.limit.baseline.ulimit.nofile", "kernel.limit.baseline.ulimit.nproc"]
        );
        assert!(result.findings[0].description.contains("1024"));
        assert!(result.suggestions[0].details.contains("ulimit -SHn 655350"));
        assert!(result.suggestions[1].details.contains("soft nproc 655350"));
    }

    #[test]
    fn test_missing_self_limits_is_skipped() {
        let mut fs = tuned_host();
        fs.remove("/proc/self");

        assert!(run(fs).findings.is_empty());
    }
}
