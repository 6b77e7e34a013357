//! The `maxproc` plugin: how many more threads can a process create?

use std::fmt::Write as _;

use tracing::info;

use crate::collector::{FileSystem, RealFs};
use crate::config::Config;
use crate::headroom::{
    ConstraintKind, EstimateError, HeadroomEstimator, HeadroomReport, resolve_target_pid,
};

use super::advice::headroom_suggestion;
use super::{DiagnosisResult, Finding, Plugin, PluginError, RunContext, Severity};

pub const PLUGIN_NAME: &str = "maxproc";
pub const FINDING_ID: &str = "maxproc.thread.headroom";

pub struct MaxprocPlugin<F: FileSystem> {
    estimator: HeadroomEstimator<F>,
    supported: bool,
}

impl MaxprocPlugin<RealFs> {
    /// Plugin bound to the live host. Only Linux exposes the interfaces it
    /// reads; elsewhere it reports the check as unsupported.
    pub fn host(config: &Config) -> Self {
        Self {
            estimator: HeadroomEstimator::from_config(RealFs::new(), config),
            supported: cfg!(target_os = "linux"),
        }
    }
}

impl<F: FileSystem> MaxprocPlugin<F> {
    pub fn new(estimator: HeadroomEstimator<F>) -> Self {
        Self {
            estimator,
            supported: true,
        }
    }

    fn diagnose(&self, ctx: &RunContext) -> DiagnosisResult {
        let mut result = DiagnosisResult::new(PLUGIN_NAME);
        if !self.supported {
            result.findings.push(unsupported_finding());
            return result;
        }

        let pid = resolve_target_pid(ctx.pid, std::process::id());
        match self.estimator.estimate(pid, &ctx.cancel) {
            Ok(report) => {
                info!(
                    pid,
                    remaining = report.remaining,
                    binding = %report.binding,
                    "maxproc finished"
                );
                result.findings.push(headroom_finding(&report));
                result.suggestions.push(headroom_suggestion(FINDING_ID, &report));
            }
            Err(err) => {
                info!("maxproc: {}", err);
                result.findings.push(not_found_finding(&err));
            }
        }
        result
    }
}

impl<F: FileSystem> Plugin for MaxprocPlugin<F> {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn description(&self) -> &'static str {
        "Thread-creation headroom of a process and the limit that blocks it first"
    }

    fn run(&self, ctx: &RunContext) -> Result<DiagnosisResult, PluginError> {
        Ok(self.diagnose(ctx))
    }
}

fn headroom_finding(report: &HeadroomReport) -> Finding {
    let mut description = if report.is_unconstrained() {
        format!(
            "Process {} runs about {} threads. nproc, cgroup pids, kernel threads-max and \
             virtual memory / stack are all unlimited; no blocking constraint found.",
            report.pid, report.current_threads
        )
    } else {
        format!(
            "Process {} runs about {} threads. Across nproc, cgroup pids, kernel threads-max \
             and virtual memory / stack it can create about {} more; the first blocking \
             factor is {}.",
            report.pid, report.current_threads, report.remaining, report.binding
        )
    };

    for reading in &report.readings {
        let _ = write!(
            description,
            "\n{}({}) remaining: {}",
            reading.kind.tag(),
            reading.kind.label(),
            reading.remaining
        );
        if reading.kind == ConstraintKind::CgroupPids {
            let _ = write!(description, " (type: {})", report.cgroup_version);
        }
    }

    Finding {
        id: FINDING_ID.to_string(),
        title: "Thread creation headroom".to_string(),
        description,
        severity: if report.is_blocking() {
            Severity::Error
        } else {
            Severity::Info
        },
        impact: "When headroom reaches 0 or below, every further thread the process creates \
                 fails immediately, typically as \"Resource temporarily unavailable\" (EAGAIN) \
                 or an out-of-memory error."
            .to_string(),
    }
}

fn not_found_finding(err: &EstimateError) -> Finding {
    Finding {
        id: FINDING_ID.to_string(),
        title: "Cannot assess thread headroom: process missing or /proc inaccessible".to_string(),
        description: format!("{}; thread creation headroom cannot be estimated.", err),
        severity: Severity::Error,
        impact: "No thread headroom estimate is available for this process. Check that the PID \
                 is correct and the process is still running."
            .to_string(),
    }
}

fn unsupported_finding() -> Finding {
    Finding {
        id: FINDING_ID.to_string(),
        title: "Thread creation headroom is not supported on this operating system".to_string(),
        description: "The maxproc check reads Linux /proc and cgroup interfaces and is only \
                      available on Linux."
            .to_string(),
        severity: Severity::Info,
        impact: "Only the maxproc check is affected; other plugins still run.".to_string(),
    }
}
