//! Per-run build directories.
//!
//! Every run gets a fresh directory under the build root, named after the
//! moment it started (microsecond precision). An existing directory is never
//! reused.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::debug;

use crate::error::Error;

/// Timestamp layout of build directory names.
pub const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S_%6f";

/// A freshly created, run-private directory.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildDir {
    path: PathBuf,
}

impl BuildDir {
    /// Creates `root` if needed, then a new timestamped directory inside it.
    pub fn create(root: &Path) -> Result<Self, Error> {
        fs::create_dir_all(root)
            .map_err(|e| Error::fs("cannot create build root", root, e))?;

        loop {
            let name = Local::now().format(TIMESTAMP_FORMAT).to_string();
            let path = root.join(name);
            match fs::create_dir(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "created build directory");
                    return Ok(BuildDir { path });
                }
                // Same microsecond as an earlier run: take a new timestamp.
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(Error::fs("cannot create build directory", path, e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of an artifact inside this build directory.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }
}
