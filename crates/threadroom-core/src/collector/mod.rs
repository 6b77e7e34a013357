//! Readers for thread-creation limits on Linux.
//!
//! Everything here reads through the [`FileSystem`] trait so the same code
//! runs against the real `/proc` and `/sys/fs/cgroup` trees or a [`MockFs`]
//! fixture.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       HeadroomEstimator                      │
//! │  ┌────────────────┐ ┌────────────────┐ ┌──────────────────┐  │
//! │  │     procfs     │ │     cgroup     │ │     threads      │  │
//! │  │ /proc/[pid]/*  │ │ pids.max/.cur  │ │ ps -eLf → /proc  │  │
//! │  └───────┬────────┘ └───────┬────────┘ └────────┬─────────┘  │
//! │          └──────────────────┼───────────────────┘            │
//! │                      ┌──────▼──────┐                         │
//! │                      │  FileSystem │ (trait)                 │
//! │                      └──────┬──────┘                         │
//! └─────────────────────────────┼────────────────────────────────┘
//!                  ┌────────────┴────────────┐
//!           ┌──────▼──────┐           ┌──────▼──────┐
//!           │   RealFs    │           │   MockFs    │
//!           │  (Linux)    │           │ (Scenarios) │
//!           └─────────────┘           └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use std::path::Path;
//! use threadroom_core::collector::{MockFs, procfs};
//!
//! let fs = MockFs::typical_host();
//! let threads = procfs::count_process_tasks(&fs, Path::new("/proc/4242"));
//! assert_eq!(threads, 12);
//! ```

pub mod cgroup;
pub mod mock;
pub mod procfs;
pub mod threads;
pub mod traits;

pub use cgroup::{CgroupVersion, PidsController};
pub use mock::MockFs;
pub use threads::{SystemThreadCounter, ThreadCountStrategy};
pub use traits::{FileSystem, RealFs};
