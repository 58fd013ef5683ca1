//! Decoy provider protocol.
//!
//! Answers the ProjFS request kinds from the shared [`TreeStore`] and raises
//! canary alerts. Every method takes what it needs from the tree in one
//! short critical section and does sorting, file I/O and alerting after the
//! lock is released. The Windows callbacks in `virtualizer` only marshal
//! arguments into these methods.

use std::sync::Arc;

use canaryfs_alert::CanaryAlert;
use canaryfs_model::{normalize_path, Clock, Entry, EnumerationId, MonotonicClock, SeedFile, TreeStore};

use crate::callbacks::backing::PhysicalBacking;
use crate::callbacks::types::{
    CallbackStatus, DirEntrySink, EnumerationFlags, NotificationKind, PlaceholderInfo,
};
use crate::options::ProjFsOptions;
use crate::util::{prj_file_name_compare, prj_file_name_match};

/// UTF-8 byte order mark prefixed to generated bodies.
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Body served for a decoy that has no stored content.
///
/// # Arguments
/// * `name` - File name
pub fn placeholder_body(name: &str) -> Vec<u8> {
    let text: String = format!("This is the content of {}", name);
    let mut body: Vec<u8> = Vec::with_capacity(UTF8_BOM.len() + text.len());
    body.extend_from_slice(&UTF8_BOM);
    body.extend_from_slice(text.as_bytes());
    body
}

/// Provider side of the projection protocol.
pub struct DecoyCallbacks {
    tree: Arc<TreeStore>,
    alerter: Arc<dyn CanaryAlert>,
    clock: Arc<dyn Clock>,
    backing: PhysicalBacking,
    debounce_ms: u64,
    auto_save: Option<SeedFile>,
}

impl DecoyCallbacks {
    /// Create the protocol handler.
    ///
    /// # Arguments
    /// * `tree` - Shared decoy tree
    /// * `alerter` - Alert sink
    /// * `options` - Root, debounce window and auto-save settings
    pub fn new(tree: Arc<TreeStore>, alerter: Arc<dyn CanaryAlert>, options: &ProjFsOptions) -> Self {
        Self {
            tree,
            alerter,
            clock: Arc::new(MonotonicClock::new()),
            backing: PhysicalBacking::new(options.root_path.clone()),
            debounce_ms: u64::try_from(options.alert_debounce.as_millis()).unwrap_or(u64::MAX),
            auto_save: options.auto_save.clone(),
        }
    }

    /// Replace the monotonic clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Shared decoy tree.
    pub fn tree(&self) -> &Arc<TreeStore> {
        &self.tree
    }

    /// Physical backing under the projection root.
    pub fn backing(&self) -> &PhysicalBacking {
        &self.backing
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    /// Start a directory enumeration session.
    pub fn start_enumeration(&self, dir: &str, id: EnumerationId) -> CallbackStatus {
        if !self.tree.begin_enumeration(id) {
            tracing::warn!(id = %id, "enumeration id reused, cursor reset");
        }
        tracing::debug!(dir = %dir, "start enumeration");
        CallbackStatus::Ok
    }

    /// End a directory enumeration session.
    pub fn end_enumeration(&self, id: EnumerationId) -> CallbackStatus {
        if !self.tree.end_enumeration(id) {
            tracing::debug!(id = %id, "end of unknown enumeration");
        }
        CallbackStatus::Ok
    }

    /// Fill one page of a directory listing.
    ///
    /// Children are sorted in ProjFS collation. The session cursor moves past
    /// every examined entry, matched or not, and is left on the first entry
    /// that did not fit.
    ///
    /// # Arguments
    /// * `dir` - Directory path as given by the OS
    /// * `id` - Enumeration session
    /// * `filter` - Search expression, None or empty for all
    /// * `flags` - Restart and single-entry flags
    /// * `sink` - Output buffer
    ///
    /// # Returns
    /// NotFound if the directory is unknown, InsufficientBuffer if the first
    /// matching entry did not fit.
    pub fn get_directory_page(
        &self,
        dir: &str,
        id: EnumerationId,
        filter: Option<&str>,
        flags: EnumerationFlags,
        sink: &mut dyn DirEntrySink,
    ) -> CallbackStatus {
        let dir: String = normalize_path(dir);
        let Some((mut children, start)) = self.tree.page_snapshot(&dir, id, flags.restart) else {
            return CallbackStatus::NotFound;
        };
        children.sort_by(|a, b| prj_file_name_compare(&a.name, &b.name));

        let mut cursor: usize = start;
        let mut added: usize = 0;
        let mut status: CallbackStatus = CallbackStatus::Ok;

        while let Some(entry) = children.get(cursor) {
            if !prj_file_name_match(&entry.name, filter) {
                cursor += 1;
                continue;
            }
            if !sink.push(entry) {
                if added == 0 {
                    status = CallbackStatus::InsufficientBuffer;
                }
                break;
            }
            cursor += 1;
            added += 1;
            if flags.single {
                break;
            }
        }

        self.tree.set_enumeration_cursor(id, cursor);
        tracing::debug!(dir = %dir, added, cursor, "directory page");
        status
    }

    // ========================================================================
    // Metadata and content
    // ========================================================================

    /// Look up metadata for a path.
    ///
    /// # Returns
    /// None if no entry exists at `path` (the root has no entry).
    pub fn placeholder_info(&self, path: &str) -> Option<PlaceholderInfo> {
        let path: String = normalize_path(path);
        self.tree.find(&path).as_ref().map(PlaceholderInfo::from)
    }

    /// Serve a byte range of a decoy file and alert.
    ///
    /// The body is the stored content or the generated placeholder body.
    /// Reads at or past the end return an empty range; ranges are cut to the
    /// available tail.
    ///
    /// # Arguments
    /// * `path` - File path as given by the OS
    /// * `offset` - Byte offset
    /// * `length` - Requested length
    /// * `process_image` - Image path of the reading process
    ///
    /// # Returns
    /// Bytes to write, None if no file exists at `path`.
    pub fn file_data(
        &self,
        path: &str,
        offset: u64,
        length: u32,
        process_image: &str,
    ) -> Option<Vec<u8>> {
        let path: String = normalize_path(path);
        let entry: Entry = self.tree.find(&path).filter(|e| !e.is_directory)?;

        let body: Vec<u8> = match self.tree.content(&path) {
            Some(stored) => stored.to_vec(),
            None => placeholder_body(&entry.name),
        };

        let len: u64 = body.len() as u64;
        let start: u64 = offset.min(len);
        let end: u64 = offset.saturating_add(u64::from(length)).min(len);
        let range: Vec<u8> = body[start as usize..end as usize].to_vec();

        self.tree.mark_accessed(&path, self.clock.now_ms());
        self.alerter.alert(&path, process_image);

        tracing::debug!(path = %path, offset, length, served = range.len(), "file data");
        Some(range)
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Handle a change notification.
    ///
    /// Directory notifications are ignored. Opens re-alert once the debounce
    /// window has passed since the last alert of an already read decoy.
    /// Content changes re-read the materialized file, store its bytes and
    /// alert; an unreadable file leaves the tree untouched.
    ///
    /// # Arguments
    /// * `path` - Path as given by the OS
    /// * `is_directory` - Whether the target is a directory
    /// * `kind` - Notification kind
    /// * `process_image` - Image path of the triggering process
    pub fn notify(
        &self,
        path: &str,
        is_directory: bool,
        kind: NotificationKind,
        process_image: &str,
    ) -> CallbackStatus {
        if is_directory {
            return CallbackStatus::Ok;
        }
        let path: String = normalize_path(path);
        let now: u64 = self.clock.now_ms();

        if !kind.changes_content() {
            if self.tree.try_realert(&path, now, self.debounce_ms) {
                self.alerter.alert(&path, process_image);
            }
            return CallbackStatus::Ok;
        }

        let bytes: Vec<u8> = match self.backing.read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path, ?kind, error = %e, "cannot read materialized file");
                return CallbackStatus::Ok;
            }
        };

        if let Err(e) = self.tree.record_materialized(&path, bytes, now) {
            tracing::warn!(path = %path, ?kind, error = %e, "cannot record materialized file");
            return CallbackStatus::Ok;
        }
        tracing::debug!(path = %path, ?kind, "materialized content stored");

        self.save_tree();
        self.alerter.alert(&path, process_image);
        CallbackStatus::Ok
    }

    fn save_tree(&self) {
        if let Some(seed) = &self.auto_save {
            if let Err(e) = seed.save_from(&self.tree) {
                tracing::warn!(path = %seed.path().display(), error = %e, "auto-save failed");
            }
        }
    }
}
