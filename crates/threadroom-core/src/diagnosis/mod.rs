//! Diagnosis plugins and the registry that runs them by name.
//!
//! A plugin is a named check that produces zero or more [`Finding`]s and
//! zero or more [`Suggestion`]s. The CLI looks plugins up in a
//! [`PluginRegistry`] built from [`host_plugins`].

pub mod advice;
pub mod kernel;
pub mod maxproc;
mod registry;

use serde::Serialize;
use std::fmt;

use crate::cancel::CancelToken;
use crate::config::Config;

pub use kernel::KernelPlugin;
pub use maxproc::MaxprocPlugin;
pub use registry::PluginRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One observation produced by a plugin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Stable identifier, e.g. `maxproc.thread.headroom`.
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub impact: String,
}

/// Remediation advice tied to a finding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub finding_id: String,
    pub title: String,
    pub details: String,
}

/// Everything one plugin run produced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosisResult {
    pub plugin: String,
    pub findings: Vec<Finding>,
    pub suggestions: Vec<Suggestion>,
}

impl DiagnosisResult {
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            ..Self::default()
        }
    }

    /// Highest severity among the findings, if any.
    pub fn worst_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }
}

/// Inputs handed to every plugin run.
#[derive(Clone, Debug, Default)]
pub struct RunContext {
    pub cancel: CancelToken,
    /// PID requested by the caller; validated by the plugin that uses it.
    pub pid: Option<i64>,
}

impl RunContext {
    pub fn new(cancel: CancelToken) -> Self {
        Self { cancel, pid: None }
    }

    pub fn with_pid(mut self, pid: Option<i64>) -> Self {
        self.pid = pid;
        self
    }
}

/// Failure reported by a plugin that could not produce a result at all.
#[derive(Debug, thiserror::Error)]
#[error("plugin {plugin} failed: {message}")]
pub struct PluginError {
    pub plugin: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error(transparent)]
    Plugin(#[from] PluginError),
}

pub trait Plugin: Send + Sync {
    /// Unique name used to select the plugin.
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn run(&self, ctx: &RunContext) -> Result<DiagnosisResult, PluginError>;
}

/// Plugins reading the real host, configured from `config`.
pub fn host_plugins(config: &Config) -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(KernelPlugin::host(config)),
        Box::new(MaxprocPlugin::host(config)),
    ]
}
