//! Remediation text for the constraint that binds thread headroom.

use crate::headroom::{ConstraintKind, HeadroomReport};

use super::Suggestion;

/// Suggestion for `report`, keyed to its binding constraint.
///
/// An unconstrained report gets a generic note instead of remediation steps.
pub fn headroom_suggestion(finding_id: &str, report: &HeadroomReport) -> Suggestion {
    if report.is_unconstrained() {
        return Suggestion {
            finding_id: finding_id.to_string(),
            title: "No blocking constraint found".to_string(),
            details: "nproc, cgroup pids, kernel threads-max and the address-space limit are all \
                      unlimited or unreadable for this process. If thread creation still fails, \
                      check available memory and any seccomp or container runtime policy."
                .to_string(),
        };
    }

    let (title, details) = match report.binding {
        ConstraintKind::Nproc => (
            "Raise the per-user process limit (nproc)",
            "The first blocking factor is the Max processes (nproc) soft limit.\n\n\
             1. Raise it for the current session (applies to this shell and its children):\n   \
             ulimit -SHu 655350\n\n\
             2. Persist it in /etc/security/limits.conf:\n   \
             * soft nproc 655350\n   \
             * hard nproc 655350\n   \
             root soft nproc 655350\n   \
             root hard nproc 655350\n\n\
             Log in again or restart the service for the new limit to apply.",
        ),
        ConstraintKind::CgroupPids => (
            "Raise the cgroup pids.max ceiling",
            "The first blocking factor is the cgroup pids limit (pids.max).\n\n\
             1. cgroup v2:\n   \
             echo <new limit> > /sys/fs/cgroup/pids.max\n\n\
             2. cgroup v1, in the process's pids hierarchy:\n   \
             echo <new limit> > /sys/fs/cgroup/pids/<cgroup>/pids.max\n\n\
             3. Under systemd, Docker or Kubernetes, set TasksMax= or the pids limit of the \
             unit or pod so the change survives restarts.",
        ),
        ConstraintKind::KernelThreadsMax => (
            "Raise kernel.threads-max",
            "The first blocking factor is the kernel-wide kernel.threads-max ceiling.\n\n\
             1. Until next reboot:\n   \
             sysctl -w kernel.threads-max=<new limit>\n\n\
             2. Persist it in /etc/sysctl.conf:\n   \
             kernel.threads-max = <new limit>\n   \
             sysctl -p\n\n\
             A higher ceiling costs kernel memory and scheduler overhead; size it against \
             the host's memory.",
        ),
        ConstraintKind::VirtualMemory => (
            "Reduce thread stack size or raise the address-space limit",
            "The first blocking factor is Max address space divided by Max stack size.\n\n\
             1. Lower the per-thread stack reservation, e.g. a smaller \"ulimit -s\" before \
             starting the service, or the stack entry in /etc/security/limits.conf.\n\
             2. Raise Max address space in /etc/security/limits.conf or the PAM configuration.\n\
             3. Cap the number of concurrent threads in the application.",
        ),
    };

    Suggestion {
        finding_id: finding_id.to_string(),
        title: title.to_string(),
        details: details.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CgroupVersion;
    use crate::headroom::{ConstraintReading, UNLIMITED_HEADROOM};

    fn report(readings: Vec<ConstraintReading>) -> HeadroomReport {
        HeadroomReport::from_readings(1, 10, CgroupVersion::V2, readings)
    }

    #[test]
    fn test_suggestion_follows_binding() {
        let cases = [
            (ConstraintKind::Nproc, "ulimit -SHu"),
            (ConstraintKind::CgroupPids, "pids.max"),
            (ConstraintKind::KernelThreadsMax, "sysctl -w kernel.threads-max"),
            (ConstraintKind::VirtualMemory, "ulimit -s"),
        ];
        for (kind, needle) in cases {
            let r = report(vec![ConstraintReading::limited(kind, 20, 10, 10)]);
            let s = headroom_suggestion("id", &r);
            assert_eq!(s.finding_id, "id");
            assert!(s.details.contains(needle), "{kind}: {}", s.details);
        }
    }

    #[test]
    fn test_unconstrained_gets_generic_note() {
        let readings = ConstraintKind::ALL
            .iter()
            .map(|&k| ConstraintReading::unlimited(k, None, 0))
            .collect();
        let r = report(readings);
        assert_eq!(r.remaining, UNLIMITED_HEADROOM);
        let s = headroom_suggestion("id", &r);
        assert_eq!(s.title, "No blocking constraint found");
    }
}
