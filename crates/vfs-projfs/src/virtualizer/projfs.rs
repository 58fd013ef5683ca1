//! ProjFS virtualizer for Windows.
//!
//! Owns the lifecycle of one virtualization instance over the decoy tree.

use std::ffi::c_void;
use std::path::Path;
use std::sync::Arc;

use canaryfs_alert::CanaryAlert;
use canaryfs_model::TreeStore;
use parking_lot::Mutex;
use windows::core::{GUID, PCWSTR};
use windows::Win32::Storage::ProjectedFileSystem::{
    PrjMarkDirectoryAsPlaceholder, PrjStartVirtualizing, PrjStopVirtualizing, PRJ_CALLBACKS,
    PRJ_NAMESPACE_VIRTUALIZATION_CONTEXT, PRJ_NOTIFICATION_MAPPING,
    PRJ_NOTIFY_FILE_HANDLE_CLOSED_FILE_MODIFIED, PRJ_NOTIFY_FILE_OPENED,
    PRJ_NOTIFY_FILE_OVERWRITTEN, PRJ_NOTIFY_NEW_FILE_CREATED, PRJ_NOTIFY_TYPES,
    PRJ_STARTVIRTUALIZING_FLAGS, PRJ_STARTVIRTUALIZING_OPTIONS,
};

use crate::callbacks::DecoyCallbacks;
use crate::error::ProjFsError;
use crate::options::{NotificationMask, ProjFsOptions};
use crate::util::wstr::string_to_wide;
use crate::virtualizer::callbacks::{build_callbacks, CallbackContext};

/// Handles of a running instance.
struct RunningInstance {
    namespace_context: PRJ_NAMESPACE_VIRTUALIZATION_CONTEXT,
    /// Reclaimed with `Box::from_raw` after `PrjStopVirtualizing`.
    callback_context: *mut CallbackContext,
}

// Safety: the handles are only used under the `running` lock, and ProjFS
// allows stopping an instance from any thread.
unsafe impl Send for RunningInstance {}

/// ProjFS projection of the decoy tree.
pub struct DecoyProjFs {
    callbacks: Arc<DecoyCallbacks>,
    options: ProjFsOptions,
    running: Mutex<Option<RunningInstance>>,
}

impl DecoyProjFs {
    /// Create a virtualizer.
    ///
    /// # Arguments
    /// * `tree` - Shared decoy tree
    /// * `alerter` - Alert sink
    /// * `options` - ProjFS configuration options
    pub fn new(
        tree: Arc<TreeStore>,
        alerter: Arc<dyn CanaryAlert>,
        options: ProjFsOptions,
    ) -> Result<Self, ProjFsError> {
        let callbacks: Arc<DecoyCallbacks> = Arc::new(DecoyCallbacks::new(tree, alerter, &options));
        Ok(Self {
            callbacks,
            options,
            running: Mutex::new(None),
        })
    }

    /// Start virtualization.
    ///
    /// Creates the root directory, marks it as the virtualization root and
    /// starts ProjFS with the configured notifications.
    ///
    /// # Returns
    /// Error if already started or any ProjFS call fails.
    pub fn start(&self) -> Result<(), ProjFsError> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(ProjFsError::AlreadyStarted);
        }

        std::fs::create_dir_all(&self.options.root_path)?;
        let root_wide = string_to_wide(root_str(&self.options.root_path)?);
        let instance_guid: GUID = GUID::from_u128(self.options.instance_id);

        mark_directory_as_placeholder(PCWSTR::from_raw(root_wide.as_ptr()), &instance_guid)?;
        tracing::debug!(root = %self.options.root_path.display(), "root marked as placeholder");

        let callbacks: PRJ_CALLBACKS = build_callbacks();
        let ctx_ptr: *mut CallbackContext = Box::into_raw(Box::new(CallbackContext {
            callbacks: self.callbacks.clone(),
        }));

        // ProjFS copies the mappings; the root string only needs to outlive the call.
        let notification_root = string_to_wide("");
        let mut mappings: Vec<PRJ_NOTIFICATION_MAPPING> = build_notification_mappings(
            &self.options.notifications,
            PCWSTR::from_raw(notification_root.as_ptr()),
        );

        let start_options = PRJ_STARTVIRTUALIZING_OPTIONS {
            Flags: PRJ_STARTVIRTUALIZING_FLAGS(0),
            PoolThreadCount: self.options.pool_thread_count,
            ConcurrentThreadCount: self.options.concurrent_thread_count,
            NotificationMappings: if mappings.is_empty() {
                std::ptr::null_mut()
            } else {
                mappings.as_mut_ptr()
            },
            NotificationMappingsCount: mappings.len() as u32,
        };

        let started = unsafe {
            PrjStartVirtualizing(
                PCWSTR::from_raw(root_wide.as_ptr()),
                &callbacks,
                Some(ctx_ptr as *const c_void),
                Some(&start_options as *const PRJ_STARTVIRTUALIZING_OPTIONS),
            )
        };

        let namespace_context: PRJ_NAMESPACE_VIRTUALIZATION_CONTEXT = match started {
            Ok(context) => context,
            Err(e) => {
                // Safety: ProjFS never saw a running instance with this pointer.
                unsafe { drop(Box::from_raw(ctx_ptr)) };
                return Err(ProjFsError::ProjFsApi {
                    operation: "PrjStartVirtualizing".to_string(),
                    hresult: e.code().0,
                });
            }
        };

        *running = Some(RunningInstance {
            namespace_context,
            callback_context: ctx_ptr,
        });

        tracing::info!(
            root = %self.options.root_path.display(),
            notifications = mappings.len(),
            "ProjFS virtualization started"
        );
        Ok(())
    }

    /// Stop virtualization.
    ///
    /// Materialized files under the root are removed afterwards when
    /// `cleanup_on_stop` is set.
    pub fn stop(&self) -> Result<(), ProjFsError> {
        let instance: RunningInstance = self.running.lock().take().ok_or(ProjFsError::NotStarted)?;

        unsafe {
            PrjStopVirtualizing(instance.namespace_context);
            // Safety: created with Box::into_raw in start(); no callback runs
            // after PrjStopVirtualizing returns.
            drop(Box::from_raw(instance.callback_context));
        }
        tracing::info!("ProjFS virtualization stopped");

        if self.options.cleanup_on_stop {
            match self.callbacks.backing().clear() {
                Ok(removed) => tracing::debug!(removed, "root cleaned up"),
                Err(e) => tracing::warn!(error = %e, "root cleanup failed"),
            }
        }
        Ok(())
    }

    /// Check if virtualization is started.
    pub fn is_started(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Provider protocol handler.
    pub fn callbacks(&self) -> &Arc<DecoyCallbacks> {
        &self.callbacks
    }

    /// Virtualization root path.
    pub fn root_path(&self) -> &Path {
        &self.options.root_path
    }
}

impl Drop for DecoyProjFs {
    fn drop(&mut self) {
        if self.is_started() {
            let _ = self.stop();
        }
    }
}

// ============================================================================
// Helper Functions (Primitives)
// ============================================================================

fn root_str(root: &Path) -> Result<&str, ProjFsError> {
    root.to_str()
        .ok_or_else(|| ProjFsError::InvalidRootPath(format!("{:?}", root)))
}

/// Mark a directory as a ProjFS virtualization root.
fn mark_directory_as_placeholder(root: PCWSTR, instance_guid: &GUID) -> Result<(), ProjFsError> {
    unsafe {
        PrjMarkDirectoryAsPlaceholder(root, PCWSTR::null(), None, instance_guid).map_err(|e| {
            ProjFsError::ProjFsApi {
                operation: "PrjMarkDirectoryAsPlaceholder".to_string(),
                hresult: e.code().0,
            }
        })
    }
}

/// Build notification mappings from NotificationMask.
///
/// # Arguments
/// * `mask` - Notification mask configuration
/// * `root` - Notification root (empty string for the whole tree)
///
/// # Returns
/// One mapping covering the tree, or none if the mask is empty.
fn build_notification_mappings(mask: &NotificationMask, root: PCWSTR) -> Vec<PRJ_NOTIFICATION_MAPPING> {
    let mut notification_bits: u32 = 0;

    if mask.file_opened {
        notification_bits |= PRJ_NOTIFY_FILE_OPENED.0;
    }
    if mask.new_file_created {
        notification_bits |= PRJ_NOTIFY_NEW_FILE_CREATED.0;
    }
    if mask.file_overwritten {
        notification_bits |= PRJ_NOTIFY_FILE_OVERWRITTEN.0;
    }
    if mask.file_modified {
        notification_bits |= PRJ_NOTIFY_FILE_HANDLE_CLOSED_FILE_MODIFIED.0;
    }

    if notification_bits == 0 {
        return vec![];
    }

    vec![PRJ_NOTIFICATION_MAPPING {
        NotificationBitMask: PRJ_NOTIFY_TYPES(notification_bits),
        NotificationRoot: root,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_notification_mappings_all() {
        let root = string_to_wide("");
        let mappings: Vec<PRJ_NOTIFICATION_MAPPING> =
            build_notification_mappings(&NotificationMask::all(), PCWSTR::from_raw(root.as_ptr()));

        assert_eq!(mappings.len(), 1);
        let bits: u32 = mappings[0].NotificationBitMask.0;
        assert!(bits & PRJ_NOTIFY_FILE_OPENED.0 != 0);
        assert!(bits & PRJ_NOTIFY_NEW_FILE_CREATED.0 != 0);
        assert!(bits & PRJ_NOTIFY_FILE_OVERWRITTEN.0 != 0);
        assert!(bits & PRJ_NOTIFY_FILE_HANDLE_CLOSED_FILE_MODIFIED.0 != 0);
    }

    #[test]
    fn test_build_notification_mappings_none() {
        let mappings: Vec<PRJ_NOTIFICATION_MAPPING> =
            build_notification_mappings(&NotificationMask::none(), PCWSTR::null());
        assert!(mappings.is_empty());
    }
}
