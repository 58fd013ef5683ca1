//! Configuration options for the ProjFS provider.

use std::path::PathBuf;
use std::time::Duration;

use canaryfs_model::SeedFile;

/// Default ProjFS pool and concurrent thread count.
pub const DEFAULT_THREAD_COUNT: u32 = 4;

/// Default window during which repeated opens of a read decoy stay silent.
pub const DEFAULT_ALERT_DEBOUNCE: Duration = Duration::from_secs(5);

/// Configuration for the ProjFS provider.
#[derive(Debug, Clone)]
pub struct ProjFsOptions {
    /// Virtualization root path.
    pub root_path: PathBuf,

    /// Instance id (unique per root), passed to ProjFS as a GUID.
    pub instance_id: u128,

    /// ProjFS pool thread count (0 = let ProjFS decide).
    pub pool_thread_count: u32,

    /// ProjFS concurrent thread count (0 = let ProjFS decide).
    pub concurrent_thread_count: u32,

    /// Notifications to receive.
    pub notifications: NotificationMask,

    /// Minimum gap between two open alerts for the same file.
    pub alert_debounce: Duration,

    /// Seed file rewritten after materialized content changes the tree.
    pub auto_save: Option<SeedFile>,

    /// Remove materialized files under the root after stopping.
    pub cleanup_on_stop: bool,
}

impl ProjFsOptions {
    /// Create options with specified root path.
    ///
    /// # Arguments
    /// * `root_path` - Virtualization root directory
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            instance_id: rand::random::<u128>(),
            pool_thread_count: DEFAULT_THREAD_COUNT,
            concurrent_thread_count: DEFAULT_THREAD_COUNT,
            notifications: NotificationMask::default(),
            alert_debounce: DEFAULT_ALERT_DEBOUNCE,
            auto_save: None,
            cleanup_on_stop: true,
        }
    }

    /// Set the ProjFS thread counts.
    ///
    /// # Arguments
    /// * `pool` - Pool thread count
    /// * `concurrent` - Concurrent thread count
    pub fn with_thread_counts(mut self, pool: u32, concurrent: u32) -> Self {
        self.pool_thread_count = pool;
        self.concurrent_thread_count = concurrent;
        self
    }

    /// Set notification mask.
    ///
    /// # Arguments
    /// * `mask` - Notification mask
    pub fn with_notifications(mut self, mask: NotificationMask) -> Self {
        self.notifications = mask;
        self
    }

    /// Set the alert debounce window.
    pub fn with_alert_debounce(mut self, window: Duration) -> Self {
        self.alert_debounce = window;
        self
    }

    /// Rewrite `seed` whenever materialized content changes the tree.
    pub fn with_auto_save(mut self, seed: SeedFile) -> Self {
        self.auto_save = Some(seed);
        self
    }

    /// Enable or disable removal of materialized files on stop.
    pub fn with_cleanup_on_stop(mut self, enabled: bool) -> Self {
        self.cleanup_on_stop = enabled;
        self
    }
}

/// Notification mask for ProjFS callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMask {
    /// Handle opened on a file or directory.
    pub file_opened: bool,
    /// New file materialized by the OS.
    pub new_file_created: bool,
    /// Existing file superseded or overwritten.
    pub file_overwritten: bool,
    /// Handle closed after the file was modified.
    pub file_modified: bool,
}

impl Default for NotificationMask {
    fn default() -> Self {
        Self::all()
    }
}

impl NotificationMask {
    /// Every notification the provider acts on.
    pub fn all() -> Self {
        Self {
            file_opened: true,
            new_file_created: true,
            file_overwritten: true,
            file_modified: true,
        }
    }

    /// No notifications (reads still alert).
    pub fn none() -> Self {
        Self {
            file_opened: false,
            new_file_created: false,
            file_overwritten: false,
            file_modified: false,
        }
    }

    /// Whether any notification is requested.
    pub fn is_empty(&self) -> bool {
        *self == Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ProjFsOptions::new(PathBuf::from("C:\\Secrets"));
        assert_eq!(options.pool_thread_count, 4);
        assert_eq!(options.concurrent_thread_count, 4);
        assert_eq!(options.alert_debounce, Duration::from_secs(5));
        assert_eq!(options.notifications, NotificationMask::all());
        assert!(options.cleanup_on_stop);
        assert!(options.auto_save.is_none());
    }

    #[test]
    fn test_instance_ids_differ() {
        let a = ProjFsOptions::new(PathBuf::from("a"));
        let b = ProjFsOptions::new(PathBuf::from("a"));
        assert_ne!(a.instance_id, b.instance_id);
    }

    #[test]
    fn test_builders() {
        let options = ProjFsOptions::new(PathBuf::from("root"))
            .with_thread_counts(0, 2)
            .with_notifications(NotificationMask::none())
            .with_alert_debounce(Duration::from_secs(30))
            .with_auto_save(SeedFile::new("tree.csv"))
            .with_cleanup_on_stop(false);

        assert_eq!(options.pool_thread_count, 0);
        assert_eq!(options.concurrent_thread_count, 2);
        assert!(options.notifications.is_empty());
        assert_eq!(options.alert_debounce, Duration::from_secs(30));
        assert!(options.auto_save.is_some());
        assert!(!options.cleanup_on_stop);
    }
}
