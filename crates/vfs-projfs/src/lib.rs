//! ProjFS projection of the canaryfs decoy tree.
//!
//! Presents the in-memory decoy tree under a real directory through
//! Microsoft's Projected File System and raises a canary alert whenever a
//! decoy is read or written.
//!
//! # Platform Support
//!
//! The provider protocol ([`DecoyCallbacks`]) is plain Rust and runs
//! everywhere. [`DecoyProjFs`] only virtualizes on Windows; elsewhere
//! `start()` returns [`ProjFsError::Unsupported`].
//!
//! # Architecture
//!
//! ```text
//! Layer 2: DecoyProjFs (ProjFS lifecycle + extern "system" callbacks)
//! Layer 1: DecoyCallbacks (enumeration, metadata, content, notifications)
//! Layer 0: TreeStore (canaryfs-model) + CanaryAlert (canaryfs-alert)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use canaryfs_vfs_projfs::{DecoyProjFs, ProjFsOptions};
//!
//! let tree = Arc::new(TreeStore::from_seed(DEFAULT_SEED)?);
//! let alerter = Arc::new(DnsCanaryAlerter::new(Some(domain), runtime.handle().clone()));
//! let vfs = DecoyProjFs::new(tree, alerter, ProjFsOptions::new("C:\\Secrets".into()))?;
//! vfs.start()?;
//! ```

mod callbacks;
mod error;
mod options;
mod util;
mod virtualizer;

pub use callbacks::{
    placeholder_body, CallbackStatus, DecoyCallbacks, DirEntrySink, EnumerationFlags,
    NotificationKind, PhysicalBacking, PlaceholderInfo, VecSink,
};
pub use error::ProjFsError;
pub use options::{NotificationMask, ProjFsOptions, DEFAULT_ALERT_DEBOUNCE, DEFAULT_THREAD_COUNT};
pub use util::{prj_file_name_compare, prj_file_name_match};
pub use virtualizer::DecoyProjFs;

/// Check if ProjFS is available on this system.
///
/// # Returns
/// True on Windows. The optional ProjFS feature may still be disabled, in
/// which case `start()` fails.
pub fn projfs_available() -> bool {
    cfg!(target_os = "windows")
}
