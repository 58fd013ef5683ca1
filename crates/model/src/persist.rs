//! Seed file persistence.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::TreeError;
use crate::tree::TreeStore;

/// Seed file on disk.
///
/// Clones share one save lock, so saves from the control server and from
/// ProjFS notification threads never race on the temp file.
#[derive(Debug, Clone)]
pub struct SeedFile {
    path: PathBuf,
    save_lock: Arc<Mutex<()>>,
}

impl SeedFile {
    /// Create a handle for a seed file path. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Path of the seed file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the seed file exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load a tree from the seed file.
    pub fn load(&self) -> Result<TreeStore, TreeError> {
        let text: String = fs::read_to_string(&self.path)?;
        let tree: TreeStore = TreeStore::from_seed(&text)?;
        tracing::debug!(path = %self.path.display(), "loaded seed file");
        Ok(tree)
    }

    /// Load the seed file, or build a tree from `default_seed` if the file
    /// does not exist.
    ///
    /// # Arguments
    /// * `default_seed` - Seed text used when no file is present
    ///
    /// # Returns
    /// The tree and whether it came from the file.
    pub fn load_or(&self, default_seed: &str) -> Result<(TreeStore, bool), TreeError> {
        if self.exists() {
            return Ok((self.load()?, true));
        }
        tracing::info!(path = %self.path.display(), "seed file not found, using default tree");
        Ok((TreeStore::from_seed(default_seed)?, false))
    }

    /// Write the tree to the seed file.
    ///
    /// Saves are serialized. The snapshot is taken after the save lock is
    /// held, so the file always ends at the state of the latest save. The
    /// text is written to a sibling temp file, then renamed over the target.
    pub fn save_from(&self, tree: &TreeStore) -> Result<(), TreeError> {
        let _guard = self.save_lock.lock();
        let text: String = tree.to_seed();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path: PathBuf = PathBuf::from(tmp_name);

        fs::write(&tmp_path, text.as_bytes())?;
        fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(path = %self.path.display(), bytes = text.len(), "saved seed file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ROOT;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let file = SeedFile::new(dir.path().join("tree.csv"));

        let tree = TreeStore::new();
        tree.ensure_directory("\\Finance").unwrap();
        tree.upsert_file("\\Finance\\Payroll.xlsx", vec![1u8; 12]).unwrap();
        file.save_from(&tree).unwrap();

        let loaded: TreeStore = file.load().unwrap();
        assert_eq!(loaded.directory_names(ROOT), vec!["Finance"]);
        assert_eq!(loaded.find("\\Finance\\Payroll.xlsx").unwrap().size, 12);
        assert!(!dir.path().join("tree.csv.tmp").exists());
    }

    #[test]
    fn test_load_or_default_when_missing() {
        let dir = TempDir::new().unwrap();
        let file = SeedFile::new(dir.path().join("missing.csv"));

        let (tree, from_file) = file.load_or("\\Network,true,0,1743942586").unwrap();
        assert!(!from_file);
        assert_eq!(tree.directory_names(ROOT), vec!["Network"]);
    }

    #[test]
    fn test_load_missing_is_io_error() {
        let dir = TempDir::new().unwrap();
        let file = SeedFile::new(dir.path().join("missing.csv"));
        assert!(matches!(file.load(), Err(TreeError::Io(_))));
    }

    #[test]
    fn test_concurrent_saves_keep_latest_state() {
        let dir = TempDir::new().unwrap();
        let file = SeedFile::new(dir.path().join("tree.csv"));
        let tree = Arc::new(TreeStore::new());
        for i in 0..500 {
            tree.upsert_file(&format!("\\Bulk\\f{}.txt", i), vec![0u8; 3]).unwrap();
        }

        let handles: Vec<_> = (0..2)
            .map(|t| {
                let file: SeedFile = file.clone();
                let tree: Arc<TreeStore> = tree.clone();
                std::thread::spawn(move || {
                    for round in 0..100 {
                        let path: String = format!("\\Worker{}\\r{}.txt", t, round);
                        tree.upsert_file(&path, vec![1u8; 2]).unwrap();
                        file.save_from(&tree).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let saved: String = fs::read_to_string(file.path()).unwrap();
        assert_eq!(saved, tree.to_seed());
        assert!(!dir.path().join("tree.csv.tmp").exists());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let file = SeedFile::new(dir.path().join("nested").join("tree.csv"));
        file.save_from(&TreeStore::new()).unwrap();
        assert!(file.exists());
    }
}
