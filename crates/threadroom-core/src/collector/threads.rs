//! System-wide thread counting.
//!
//! The count is taken by trying strategies in a fixed order until one
//! reports a positive number: first an external process-listing command
//! (`ps -eLf`, one line per thread), then a walk of the `/proc` table.
//! Failures are logged and swallowed; a total failure yields 0, which the
//! estimator treats as "unknown".

use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::cancel::CancelToken;
use crate::collector::procfs::count_table_tasks;
use crate::collector::traits::FileSystem;

/// How often a running listing command is checked for exit or cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Why a strategy produced no count.
#[derive(Debug, thiserror::Error)]
pub enum CountError {
    #[error("failed to spawn {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("{program} exited with {status}")]
    Exit { program: String, status: ExitStatus },

    #[error("{program} was cancelled before it finished")]
    Cancelled { program: String },

    #[error("failed to collect output of {program}: {source}")]
    Output { program: String, source: io::Error },

    #[error("{program} produced no output lines")]
    Empty { program: String },

    #[error("cannot walk process table: {0}")]
    ProcTable(#[source] io::Error),

    #[error("process table holds no tasks")]
    NoTasks,
}

/// One way of counting every thread on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadCountStrategy {
    /// Runs `program args...` and counts newline-terminated output lines.
    Command { program: String, args: Vec<String> },
    /// Sums `task` entries over every numeric directory of the proc root.
    ProcTable,
}

impl ThreadCountStrategy {
    /// `ps -eLf`: one line per thread plus a header line.
    pub fn ps() -> Self {
        Self::command("ps", ["-eLf"])
    }

    pub fn command<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ThreadCountStrategy::Command {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn count<F: FileSystem>(
        &self,
        fs: &F,
        proc_path: &Path,
        cancel: &CancelToken,
    ) -> Result<u64, CountError> {
        match self {
            ThreadCountStrategy::Command { program, args } => {
                count_command_lines(program, args, cancel)
            }
            ThreadCountStrategy::ProcTable => match count_table_tasks(fs, proc_path) {
                Ok(0) => Err(CountError::NoTasks),
                Ok(n) => Ok(n),
                Err(e) => Err(CountError::ProcTable(e)),
            },
        }
    }
}

/// Ordered list of counting strategies; the first positive count wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemThreadCounter {
    strategies: Vec<ThreadCountStrategy>,
}

impl Default for SystemThreadCounter {
    fn default() -> Self {
        Self::new(vec![ThreadCountStrategy::ps(), ThreadCountStrategy::ProcTable])
    }
}

impl SystemThreadCounter {
    pub fn new(strategies: Vec<ThreadCountStrategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[ThreadCountStrategy] {
        &self.strategies
    }

    /// Total threads on the host, or 0 when every strategy failed.
    pub fn count<F: FileSystem>(&self, fs: &F, proc_path: &Path, cancel: &CancelToken) -> u64 {
        self.strategies
            .iter()
            .find_map(|strategy| match strategy.count(fs, proc_path, cancel) {
                Ok(n) => Some(n),
                Err(e) => {
                    debug!("system thread count: {}", e);
                    None
                }
            })
            .unwrap_or(0)
    }
}

/// Runs the command to completion (or cancellation) and counts `\n` bytes.
fn count_command_lines(
    program: &str,
    args: &[String],
    cancel: &CancelToken,
) -> Result<u64, CountError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| CountError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let Some(mut stdout) = child.stdout.take() else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(CountError::Output {
            program: program.to_string(),
            source: io::Error::other("stdout was not captured"),
        });
    };

    // Drained on a helper thread so a full pipe cannot stall the child.
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = tx.send(stdout.read_to_end(&mut buf).map(|_| buf));
    });

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CountError::Output {
                    program: program.to_string(),
                    source,
                });
            }
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            // The reader exits on its own once the pipe closes.
            return Err(CountError::Cancelled {
                program: program.to_string(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    if !status.success() {
        return Err(CountError::Exit {
            program: program.to_string(),
            status,
        });
    }

    // A descendant that inherited stdout keeps the pipe open after the
    // child exits, so the deadline still applies while draining.
    let output = loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(read) => {
                break read.map_err(|source| CountError::Output {
                    program: program.to_string(),
                    source,
                })?;
            }
            Err(RecvTimeoutError::Timeout) => {
                if cancel.is_cancelled() {
                    return Err(CountError::Cancelled {
                        program: program.to_string(),
                    });
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(CountError::Output {
                    program: program.to_string(),
                    source: io::Error::other("output reader stopped without a result"),
                });
            }
        }
    };

    let lines = output.iter().filter(|&&b| b == b'\n').count() as u64;
    if lines == 0 {
        return Err(CountError::Empty {
            program: program.to_string(),
        });
    }
    Ok(lines)
}
