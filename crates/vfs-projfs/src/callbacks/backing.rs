//! Physical files under the projection root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use canaryfs_model::normalize_path;

/// Maps virtual paths onto the real projection root.
#[derive(Debug, Clone)]
pub struct PhysicalBacking {
    root: PathBuf,
}

impl PhysicalBacking {
    /// Create a backing for `root`. Nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Projection root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Real location of a virtual path.
    ///
    /// Segments are re-joined with the host separator; `.` and `..` are
    /// dropped so a path cannot escape the root.
    pub fn resolve(&self, virtual_path: &str) -> PathBuf {
        let normalized: String = normalize_path(virtual_path);
        normalized
            .split('\\')
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    /// Read the materialized bytes of a virtual file.
    pub fn read(&self, virtual_path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(virtual_path))
    }

    /// Delete everything under the root, keeping the root itself.
    ///
    /// Failures on individual entries are logged and skipped.
    ///
    /// # Returns
    /// Number of top-level entries removed.
    pub fn clear(&self) -> io::Result<usize> {
        let mut removed: usize = 0;

        for item in fs::read_dir(&self.root)? {
            let item = item?;
            let path: PathBuf = item.path();
            let result: io::Result<()> = if item.file_type()?.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };

            match result {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "cleanup failed"),
            }
        }

        Ok(removed)
    }
}
