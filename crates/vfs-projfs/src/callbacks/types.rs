//! Plain-Rust shapes of the ProjFS request/response protocol.

use std::time::SystemTime;

use canaryfs_model::Entry;

/// Outcome reported back to ProjFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    /// Request satisfied.
    Ok,
    /// Path or directory unknown to the tree.
    NotFound,
    /// Output buffer cannot hold even one directory entry.
    InsufficientBuffer,
}

/// Flags of one directory page request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumerationFlags {
    /// Reset the session cursor to the first child.
    pub restart: bool,
    /// Return at most one matching entry.
    pub single: bool,
}

/// Receiver of directory entries for one page.
pub trait DirEntrySink {
    /// Append one entry.
    ///
    /// # Returns
    /// False if the entry did not fit; nothing was written.
    fn push(&mut self, entry: &Entry) -> bool;
}

/// Metadata answered for a placeholder request.
///
/// Creation, access, write and change times all report `last_write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderInfo {
    /// Entry name with its stored case.
    pub name: String,
    /// Whether the entry is a directory.
    pub is_directory: bool,
    /// File size in bytes (0 for directories).
    pub size: u64,
    /// Timestamp used for all four time fields.
    pub last_write: SystemTime,
}

impl From<&Entry> for PlaceholderInfo {
    fn from(entry: &Entry) -> Self {
        Self {
            name: entry.name.clone(),
            is_directory: entry.is_directory,
            size: entry.size,
            last_write: entry.last_write,
        }
    }
}

/// Change notifications the provider acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// A handle was opened.
    FileOpened,
    /// The OS materialized a brand-new file.
    NewFileCreated,
    /// An existing file was superseded or overwritten.
    FileOverwritten,
    /// A handle was closed after the file was modified.
    FileModified,
}

impl NotificationKind {
    /// Whether the notification means the on-disk bytes changed.
    pub fn changes_content(self) -> bool {
        !matches!(self, NotificationKind::FileOpened)
    }
}

/// Sink collecting entries into a vector, bounded by entry count.
///
/// Used off Windows and in tests to drive the page protocol.
#[derive(Debug, Default)]
pub struct VecSink {
    /// Entries accepted so far.
    pub entries: Vec<Entry>,
    capacity: Option<usize>,
}

impl VecSink {
    /// Unbounded sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that accepts at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: Some(capacity),
        }
    }

    /// Names of the accepted entries.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}

impl DirEntrySink for VecSink {
    fn push(&mut self, entry: &Entry) -> bool {
        if self.capacity.is_some_and(|cap| self.entries.len() >= cap) {
            return false;
        }
        self.entries.push(entry.clone());
        true
    }
}
