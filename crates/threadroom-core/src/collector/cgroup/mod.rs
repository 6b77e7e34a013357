//! Cgroup pids controller readers (v1 and v2).

pub mod parser;
pub mod pids;

pub use pids::{CgroupVersion, PidsController, read_pids_controller};
