//! Readers for the Linux `/proc` filesystem.
//!
//! This module provides parsers for per-process limit, status and cgroup
//! membership files, and task counting for a single process or the whole
//! process table.

pub mod parser;
pub mod tasks;

pub use parser::{LimitValue, ProcLimits};
pub use tasks::{count_process_tasks, count_table_tasks};
