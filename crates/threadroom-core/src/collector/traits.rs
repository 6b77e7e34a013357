//! Read-only view of the host filesystem.
//!
//! Readers take a `FileSystem` instead of calling `std::fs` so that the same
//! code runs against `/proc` and `/sys/fs/cgroup` or a `MockFs` fixture.

use std::io;
use std::path::{Path, PathBuf};

/// The handful of filesystem queries the readers need.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// `false` for missing or inaccessible paths.
    fn is_dir(&self, path: &Path) -> bool;

    /// `false` for missing or inaccessible paths.
    fn is_file(&self, path: &Path) -> bool;

    /// Full paths of the direct children of `path`, in no particular order.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// `std::fs` passthrough used on live hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        RealFs
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }
}
