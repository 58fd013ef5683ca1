//! In-memory decoy tree.
//!
//! The namespace (directory key → ordered children), the content store and
//! the enumeration cursor table share one mutex. Every public operation is a
//! single critical section and returns owned copies, so callers never hold
//! the lock while marshaling for the OS, touching disk, or talking to the
//! network.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::entry::{from_unix_seconds, Entry};
use crate::error::TreeError;
use crate::path::{is_root, is_valid_segment, join_path, path_key, segments, split_parent, ROOT};
use crate::seed::{encode_seed, parse_seed, SeedRecord};

/// Opaque enumeration session identifier supplied by the OS.
pub type EnumerationId = u128;

/// State guarded by the tree lock.
#[derive(Debug, Default)]
struct TreeState {
    /// Lowercase directory path → children in insertion order.
    dirs: HashMap<String, Vec<Entry>>,
    /// Lowercase file path → raw bytes.
    contents: HashMap<String, Arc<[u8]>>,
    /// Enumeration session → index into the sorted children.
    cursors: HashMap<EnumerationId, usize>,
}

impl TreeState {
    fn children(&self, dir: &str) -> Option<&Vec<Entry>> {
        self.dirs.get(&path_key(dir))
    }

    fn entry_mut(&mut self, path: &str) -> Option<&mut Entry> {
        let (parent, name) = split_parent(path);
        self.dirs
            .get_mut(&path_key(parent))?
            .iter_mut()
            .find(|e| e.has_name(name))
    }

    /// Create every missing directory along `path`, including `path` itself.
    fn ensure_directory(&mut self, path: &str, mtime: SystemTime) -> Result<(), TreeError> {
        if !segments(path).all(is_valid_segment) {
            return Err(TreeError::InvalidPath(path.to_string()));
        }
        let mut current: String = ROOT.to_string();

        for segment in segments(path) {
            let siblings: &mut Vec<Entry> = self.dirs.entry(path_key(&current)).or_default();
            match siblings.iter().find(|e| e.has_name(segment)) {
                Some(existing) if existing.is_directory => {}
                Some(_) => {
                    return Err(TreeError::PathConflict {
                        path: join_path(&current, segment),
                        reason: "a file occupies a directory segment",
                    })
                }
                None => siblings.push(Entry::directory(segment, mtime)),
            }
            current = join_path(&current, segment);
        }

        self.dirs.entry(path_key(&current)).or_default();
        Ok(())
    }

    /// Find or create the file entry at `path`, creating ancestors as needed.
    ///
    /// # Returns
    /// The entry and whether it was newly created.
    fn file_entry(&mut self, path: &str, mtime: SystemTime) -> Result<(&mut Entry, bool), TreeError> {
        let (parent, name) = split_parent(path);
        if is_root(path) || !is_valid_segment(name) {
            return Err(TreeError::InvalidPath(path.to_string()));
        }
        self.ensure_directory(parent, mtime)?;

        let siblings: &mut Vec<Entry> = self.dirs.entry(path_key(parent)).or_default();
        match siblings.iter().position(|e| e.has_name(name)) {
            Some(idx) if siblings[idx].is_directory => Err(TreeError::PathConflict {
                path: path.to_string(),
                reason: "a directory exists at this path",
            }),
            Some(idx) => Ok((&mut siblings[idx], false)),
            None => {
                let idx: usize = siblings.len();
                siblings.push(Entry::file(name, 0, mtime));
                Ok((&mut siblings[idx], true))
            }
        }
    }

    fn collect_records(&self, dir: &str, out: &mut Vec<SeedRecord>) {
        let Some(children) = self.children(dir) else {
            return;
        };

        for entry in children {
            let path: String = join_path(dir, &entry.name);
            out.push(SeedRecord {
                path: path.clone(),
                is_directory: entry.is_directory,
                size: entry.size,
                timestamp: entry.unix_timestamp(),
            });
            if entry.is_directory {
                self.collect_records(&path, out);
            }
        }
    }
}

/// Shared decoy tree with its content store and cursor table.
///
/// All paths must already be canonical (see [`crate::normalize_path`]).
#[derive(Debug)]
pub struct TreeStore {
    state: Mutex<TreeState>,
}

impl TreeStore {
    /// Create an empty tree containing only the root.
    pub fn new() -> Self {
        let mut state = TreeState::default();
        state.dirs.insert(path_key(ROOT), Vec::new());
        Self {
            state: Mutex::new(state),
        }
    }

    /// Build a tree from seed records.
    ///
    /// Ancestors missing from the records are created with the timestamp of
    /// the record that needed them.
    ///
    /// # Arguments
    /// * `records` - Seed records in any order
    pub fn from_records(records: &[SeedRecord]) -> Result<Self, TreeError> {
        let tree = Self::new();
        {
            let mut state = tree.state.lock();
            for record in records {
                if is_root(&record.path) {
                    continue;
                }
                let mtime: SystemTime = from_unix_seconds(record.timestamp);

                if record.is_directory {
                    state.ensure_directory(&record.path, mtime)?;
                    if let Some(entry) = state.entry_mut(&record.path) {
                        entry.last_write = mtime;
                        entry.size = record.size;
                    }
                } else {
                    let (entry, _) = state.file_entry(&record.path, mtime)?;
                    entry.size = record.size;
                    entry.last_write = mtime;
                }
            }
        }
        Ok(tree)
    }

    /// Build a tree from seed text.
    ///
    /// # Arguments
    /// * `text` - Seed text (see [`crate::seed`])
    pub fn from_seed(text: &str) -> Result<Self, TreeError> {
        let records: Vec<SeedRecord> = parse_seed(text)?;
        Self::from_records(&records)
    }

    /// Snapshot every entry as seed records (unsorted).
    pub fn records(&self) -> Vec<SeedRecord> {
        let mut out: Vec<SeedRecord> = Vec::new();
        self.state.lock().collect_records(ROOT, &mut out);
        out
    }

    /// Encode the current tree as seed text.
    ///
    /// Records are copied under the lock and encoded after release.
    pub fn to_seed(&self) -> String {
        let records: Vec<SeedRecord> = self.records();
        encode_seed(&records)
    }

    // ========================================================================
    // Namespace
    // ========================================================================

    /// Children of a directory in insertion order (empty if unknown).
    pub fn list_children(&self, dir: &str) -> Vec<Entry> {
        self.snapshot_children(dir).unwrap_or_default()
    }

    /// Copy of a directory's children, or None if nothing is recorded for it.
    pub fn snapshot_children(&self, dir: &str) -> Option<Vec<Entry>> {
        self.state.lock().children(dir).cloned()
    }

    /// Find a child by name (case-insensitive).
    ///
    /// # Arguments
    /// * `dir` - Canonical directory path
    /// * `name` - Child name
    pub fn find_child(&self, dir: &str, name: &str) -> Option<Entry> {
        self.state
            .lock()
            .children(dir)?
            .iter()
            .find(|e| e.has_name(name))
            .cloned()
    }

    /// Find the entry at a full path. The root has no entry.
    pub fn find(&self, path: &str) -> Option<Entry> {
        if is_root(path) {
            return None;
        }
        let (parent, name) = split_parent(path);
        self.find_child(parent, name)
    }

    /// Names of the file children of a directory.
    pub fn file_names(&self, dir: &str) -> Vec<String> {
        self.names_where(dir, |e| !e.is_directory)
    }

    /// Names of the directory children of a directory.
    pub fn directory_names(&self, dir: &str) -> Vec<String> {
        self.names_where(dir, |e| e.is_directory)
    }

    fn names_where(&self, dir: &str, keep: impl Fn(&Entry) -> bool) -> Vec<String> {
        let state = self.state.lock();
        state
            .children(dir)
            .map(|children| {
                children
                    .iter()
                    .filter(|e| keep(e))
                    .map(|e| e.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ensure a directory and all its ancestors exist. Idempotent.
    ///
    /// # Arguments
    /// * `path` - Canonical directory path
    ///
    /// # Returns
    /// Error only if a file occupies one of the segments.
    pub fn ensure_directory(&self, path: &str) -> Result<(), TreeError> {
        self.state.lock().ensure_directory(path, SystemTime::now())
    }

    /// Create or replace a file with explicit content.
    ///
    /// The entry's access bookkeeping is reset: an uploaded decoy is fresh.
    ///
    /// # Arguments
    /// * `path` - Canonical file path
    /// * `content` - File bytes
    ///
    /// # Returns
    /// Copy of the stored entry.
    pub fn upsert_file(&self, path: &str, content: impl Into<Arc<[u8]>>) -> Result<Entry, TreeError> {
        let content: Arc<[u8]> = content.into();
        let now: SystemTime = SystemTime::now();

        let mut state = self.state.lock();
        let (entry, _) = state.file_entry(path, now)?;
        entry.size = content.len() as u64;
        entry.last_write = now;
        entry.accessed = false;
        entry.last_alert_at = None;
        let stored: Entry = entry.clone();

        state.contents.insert(path_key(path), content);
        Ok(stored)
    }

    /// Store bytes the OS materialized for a file.
    ///
    /// Existing entries keep their access bookkeeping. A file unknown to the
    /// tree is created already accessed and alerted at `now_ms`, since the
    /// caller alerts on it straight away.
    ///
    /// # Arguments
    /// * `path` - Canonical file path
    /// * `content` - Bytes read back from the physical file
    /// * `now_ms` - Monotonic milliseconds
    pub fn record_materialized(
        &self,
        path: &str,
        content: impl Into<Arc<[u8]>>,
        now_ms: u64,
    ) -> Result<Entry, TreeError> {
        let content: Arc<[u8]> = content.into();
        let now: SystemTime = SystemTime::now();

        let mut state = self.state.lock();
        let (entry, created) = state.file_entry(path, now)?;
        entry.size = content.len() as u64;
        entry.last_write = now;
        if created {
            entry.accessed = true;
            entry.last_alert_at = Some(now_ms);
        }
        let stored: Entry = entry.clone();

        state.contents.insert(path_key(path), content);
        Ok(stored)
    }

    /// Remove a file and its content.
    ///
    /// # Returns
    /// False if the path is absent or names a directory.
    pub fn remove_file(&self, path: &str) -> bool {
        if is_root(path) {
            return false;
        }
        let (parent, name) = split_parent(path);

        let mut state = self.state.lock();
        let Some(siblings) = state.dirs.get_mut(&path_key(parent)) else {
            return false;
        };
        let Some(idx) = siblings.iter().position(|e| e.has_name(name)) else {
            return false;
        };
        if siblings[idx].is_directory {
            return false;
        }

        siblings.remove(idx);
        state.contents.remove(&path_key(path));
        true
    }

    // ========================================================================
    // Content and access bookkeeping
    // ========================================================================

    /// Stored bytes for a file, if any were uploaded or materialized.
    pub fn content(&self, path: &str) -> Option<Arc<[u8]>> {
        self.state.lock().contents.get(&path_key(path)).cloned()
    }

    /// Mark a file as read and stamp its alert time.
    ///
    /// # Returns
    /// Updated copy of the entry, None if no file exists at `path`.
    pub fn mark_accessed(&self, path: &str, now_ms: u64) -> Option<Entry> {
        let mut state = self.state.lock();
        let entry: &mut Entry = state.entry_mut(path).filter(|e| !e.is_directory)?;
        entry.accessed = true;
        entry.last_alert_at = Some(now_ms);
        Some(entry.clone())
    }

    /// Decide whether a re-open of a previously read file should alert.
    ///
    /// Claims the alert (stamps `now_ms`) when the file was accessed before
    /// and more than `window_ms` have passed since its last alert.
    ///
    /// # Returns
    /// True if the caller should alert.
    pub fn try_realert(&self, path: &str, now_ms: u64, window_ms: u64) -> bool {
        let mut state = self.state.lock();
        let Some(entry) = state.entry_mut(path).filter(|e| !e.is_directory) else {
            return false;
        };
        if !entry.accessed {
            return false;
        }

        let due: bool = match entry.last_alert_at {
            Some(last) => now_ms.saturating_sub(last) > window_ms,
            None => true,
        };
        if due {
            entry.last_alert_at = Some(now_ms);
        }
        due
    }

    // ========================================================================
    // Enumeration cursors
    // ========================================================================

    /// Allocate a cursor at position 0.
    ///
    /// # Returns
    /// False if the id was already active (its cursor is reset).
    pub fn begin_enumeration(&self, id: EnumerationId) -> bool {
        self.state.lock().cursors.insert(id, 0).is_none()
    }

    /// Snapshot a directory together with the session cursor.
    ///
    /// Creates the cursor at 0 if the session has none; `restart` forces it
    /// back to 0.
    ///
    /// # Returns
    /// Children and cursor position, None if the directory has no record.
    pub fn page_snapshot(
        &self,
        dir: &str,
        id: EnumerationId,
        restart: bool,
    ) -> Option<(Vec<Entry>, usize)> {
        let mut state = self.state.lock();
        let children: Vec<Entry> = state.children(dir)?.clone();

        let cursor: &mut usize = state.cursors.entry(id).or_insert(0);
        if restart {
            *cursor = 0;
        }
        Some((children, *cursor))
    }

    /// Current cursor of a session (created at 0 if missing).
    pub fn enumeration_cursor(&self, id: EnumerationId) -> usize {
        *self.state.lock().cursors.entry(id).or_insert(0)
    }

    /// Move a session cursor.
    pub fn set_enumeration_cursor(&self, id: EnumerationId, index: usize) {
        self.state.lock().cursors.insert(id, index);
    }

    /// Free a session cursor.
    ///
    /// # Returns
    /// False if the id was not active.
    pub fn end_enumeration(&self, id: EnumerationId) -> bool {
        self.state.lock().cursors.remove(&id).is_some()
    }

    /// Number of live enumeration sessions.
    pub fn active_enumerations(&self) -> usize {
        self.state.lock().cursors.len()
    }
}

impl Default for TreeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const SEED: &str = "\\Network,true,0,1743942586\n\
                        \\Network\\Network Diagram.pdf,false,2303,1727206186\n\
                        \\Network\\Router Configuration.xml,false,25267,1741508986\n\
                        \\TestData,true,0,1743942586\n";

    fn names(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_seed_builds_namespace() {
        let tree: TreeStore = TreeStore::from_seed(SEED).unwrap();

        assert_eq!(names(&tree.list_children(ROOT)), vec!["Network", "TestData"]);
        assert_eq!(
            tree.file_names("\\Network"),
            vec!["Network Diagram.pdf", "Router Configuration.xml"]
        );

        let diagram: Entry = tree.find("\\network\\NETWORK DIAGRAM.PDF").unwrap();
        assert_eq!(diagram.size, 2303);
        assert_eq!(diagram.unix_timestamp(), 1727206186);
    }

    #[test]
    fn test_seed_roundtrip() {
        let tree: TreeStore = TreeStore::from_seed(SEED).unwrap();
        let regenerated: String = tree.to_seed();

        let expected: HashSet<&str> = SEED.lines().collect();
        let actual: HashSet<&str> = regenerated.lines().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_seed_creates_missing_ancestors() {
        let tree: TreeStore = TreeStore::from_seed("\\a\\b\\c.txt,false,1,100").unwrap();

        let a: Entry = tree.find("\\a").unwrap();
        assert!(a.is_directory);
        assert_eq!(a.unix_timestamp(), 100);
        assert_eq!(tree.directory_names("\\a"), vec!["b"]);
        assert_eq!(tree.file_names("\\a\\b"), vec!["c.txt"]);
    }

    #[test]
    fn test_seed_directory_after_child_keeps_record_time() {
        let tree: TreeStore =
            TreeStore::from_seed("\\a\\f.txt,false,1,100\n\\a,true,0,200").unwrap();
        assert_eq!(tree.find("\\a").unwrap().unix_timestamp(), 200);
        assert_eq!(tree.list_children(ROOT).len(), 1);
    }

    #[test]
    fn test_upsert_creates_ancestors_and_content() {
        let tree = TreeStore::new();
        let entry: Entry = tree.upsert_file("\\x\\y\\z.txt", b"hello".to_vec()).unwrap();

        assert_eq!(entry.size, 5);
        assert_eq!(tree.directory_names(ROOT), vec!["x"]);
        assert_eq!(tree.directory_names("\\x"), vec!["y"]);
        assert_eq!(tree.content("\\X\\Y\\Z.TXT").unwrap().as_ref(), b"hello");
    }

    #[test]
    fn test_upsert_existing_is_case_insensitive_and_resets_access() {
        let tree = TreeStore::new();
        tree.upsert_file("\\Plan.txt", b"one".to_vec()).unwrap();
        tree.mark_accessed("\\Plan.txt", 10).unwrap();

        let entry: Entry = tree.upsert_file("\\PLAN.TXT", b"second".to_vec()).unwrap();
        assert_eq!(entry.name, "Plan.txt");
        assert_eq!(entry.size, 6);
        assert!(!entry.accessed);
        assert_eq!(entry.last_alert_at, None);
        assert_eq!(tree.file_names(ROOT), vec!["Plan.txt"]);
    }

    #[test]
    fn test_upsert_rejects_root_and_directories() {
        let tree: TreeStore = TreeStore::from_seed(SEED).unwrap();
        assert!(matches!(
            tree.upsert_file(ROOT, Vec::new()),
            Err(TreeError::InvalidPath(_))
        ));
        assert!(matches!(
            tree.upsert_file("\\Network", Vec::new()),
            Err(TreeError::PathConflict { .. })
        ));
    }

    #[test]
    fn test_names_with_seed_separators_rejected() {
        let tree: TreeStore = TreeStore::from_seed(SEED).unwrap();
        let before: String = tree.to_seed();

        assert!(matches!(
            tree.upsert_file("\\Network\\budget,2025.xlsx", b"x".to_vec()),
            Err(TreeError::InvalidPath(_))
        ));
        assert!(matches!(
            tree.upsert_file("\\Network\\a\nInjected.txt", b"evil".to_vec()),
            Err(TreeError::InvalidPath(_))
        ));
        assert!(matches!(
            tree.ensure_directory("\\Share\r\\Sub"),
            Err(TreeError::InvalidPath(_))
        ));
        assert!(matches!(
            tree.record_materialized("\\Q1,Q2\\notes.txt", b"x".to_vec(), 1),
            Err(TreeError::InvalidPath(_))
        ));

        // Nothing partial was created, and the seed still round-trips.
        assert_eq!(tree.to_seed(), before);
        let reloaded: TreeStore = TreeStore::from_seed(&tree.to_seed()).unwrap();
        assert_eq!(reloaded.to_seed(), before);
    }

    #[test]
    fn test_ensure_directory_idempotent() {
        let tree = TreeStore::new();
        tree.ensure_directory("\\a\\b").unwrap();
        tree.ensure_directory("\\A\\B").unwrap();
        tree.ensure_directory("\\a").unwrap();

        assert_eq!(tree.directory_names(ROOT), vec!["a"]);
        assert_eq!(tree.directory_names("\\a"), vec!["b"]);
        assert_eq!(tree.snapshot_children("\\a\\b"), Some(Vec::new()));
    }

    #[test]
    fn test_ensure_directory_through_file_conflicts() {
        let tree = TreeStore::new();
        tree.upsert_file("\\a", b"file".to_vec()).unwrap();
        assert!(tree.ensure_directory("\\a\\b").is_err());
    }

    #[test]
    fn test_remove_file() {
        let tree: TreeStore = TreeStore::from_seed(SEED).unwrap();
        tree.upsert_file("\\Network\\Plan.txt", b"hello".to_vec()).unwrap();

        assert!(tree.remove_file("\\Network\\plan.txt"));
        assert!(tree.content("\\Network\\Plan.txt").is_none());
        assert!(!tree.remove_file("\\Network\\Plan.txt"));
        assert!(!tree.remove_file("\\Network"));
        assert!(!tree.remove_file("\\Missing\\file.txt"));
        assert!(!tree.remove_file(ROOT));
    }

    #[test]
    fn test_create_delete_sequence_matches_live_set() {
        let tree = TreeStore::new();
        let mut live: HashSet<String> = HashSet::new();

        let ops: [(&str, bool); 8] = [
            ("a.txt", true),
            ("b.txt", true),
            ("a.txt", false),
            ("c.txt", true),
            ("b.txt", true),
            ("d.txt", false),
            ("a.txt", true),
            ("c.txt", false),
        ];
        for (name, create) in ops {
            let path: String = join_path("\\dir", name);
            if create {
                tree.upsert_file(&path, name.as_bytes().to_vec()).unwrap();
                live.insert(name.to_string());
            } else {
                tree.remove_file(&path);
                live.remove(name);
            }
        }

        let listed: HashSet<String> = tree.file_names("\\dir").into_iter().collect();
        assert_eq!(listed, live);
    }

    #[test]
    fn test_record_materialized_new_and_existing() {
        let tree: TreeStore = TreeStore::from_seed(SEED).unwrap();

        let created: Entry = tree
            .record_materialized("\\Network\\dropped.exe", b"MZ".to_vec(), 42)
            .unwrap();
        assert!(created.accessed);
        assert_eq!(created.last_alert_at, Some(42));
        assert_eq!(created.size, 2);

        let updated: Entry = tree
            .record_materialized("\\Network\\Network Diagram.pdf", b"edited".to_vec(), 50)
            .unwrap();
        assert!(!updated.accessed);
        assert_eq!(updated.last_alert_at, None);
        assert_eq!(updated.size, 6);
        assert_eq!(
            tree.content("\\Network\\Network Diagram.pdf").unwrap().as_ref(),
            b"edited"
        );
    }

    #[test]
    fn test_mark_accessed_only_files() {
        let tree: TreeStore = TreeStore::from_seed(SEED).unwrap();
        assert!(tree.mark_accessed("\\Network", 1).is_none());
        assert!(tree.mark_accessed("\\Network\\missing.txt", 1).is_none());

        let entry: Entry = tree.mark_accessed("\\Network\\Network Diagram.pdf", 7).unwrap();
        assert!(entry.accessed);
        assert_eq!(entry.last_alert_at, Some(7));
    }

    #[test]
    fn test_try_realert_debounce() {
        let tree: TreeStore = TreeStore::from_seed(SEED).unwrap();
        let path: &str = "\\Network\\Network Diagram.pdf";

        // Never read: opening alone is not alert-worthy.
        assert!(!tree.try_realert(path, 100, 5));

        tree.mark_accessed(path, 100).unwrap();
        assert!(!tree.try_realert(path, 103, 5));
        assert!(!tree.try_realert(path, 105, 5));
        assert!(tree.try_realert(path, 106, 5));
        assert!(!tree.try_realert(path, 110, 5));
        assert!(tree.try_realert(path, 112, 5));
    }

    #[test]
    fn test_enumeration_cursor_lifecycle() {
        let tree: TreeStore = TreeStore::from_seed(SEED).unwrap();

        assert!(tree.begin_enumeration(1));
        assert!(!tree.begin_enumeration(1));
        assert_eq!(tree.enumeration_cursor(1), 0);

        tree.set_enumeration_cursor(1, 2);
        let (children, cursor) = tree.page_snapshot("\\Network", 1, false).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(cursor, 2);

        let (_, cursor) = tree.page_snapshot("\\Network", 1, true).unwrap();
        assert_eq!(cursor, 0);

        assert!(tree.page_snapshot("\\Nowhere", 2, false).is_none());
        assert_eq!(tree.active_enumerations(), 1);

        assert!(tree.end_enumeration(1));
        assert!(!tree.end_enumeration(1));
        assert_eq!(tree.active_enumerations(), 0);
    }

    #[test]
    fn test_concurrent_mutations_from_many_threads() {
        let tree: Arc<TreeStore> = Arc::new(TreeStore::new());

        let handles: Vec<std::thread::JoinHandle<()>> = (0..8)
            .map(|t| {
                let tree: Arc<TreeStore> = tree.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let path: String = format!("\\shared\\t{}_{}.txt", t, i);
                        tree.upsert_file(&path, vec![0u8; i]).unwrap();
                        if i % 2 == 0 {
                            assert!(tree.remove_file(&path));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tree.file_names("\\shared").len(), 8 * 25);
        assert_eq!(tree.directory_names(ROOT), vec!["shared"]);
    }
}
