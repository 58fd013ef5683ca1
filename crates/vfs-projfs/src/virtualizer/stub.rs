//! Virtualizer stand-in for platforms without ProjFS.

use std::path::Path;
use std::sync::Arc;

use canaryfs_alert::CanaryAlert;
use canaryfs_model::TreeStore;

use crate::callbacks::DecoyCallbacks;
use crate::error::ProjFsError;
use crate::options::ProjFsOptions;

/// ProjFS projection of the decoy tree (unavailable on this platform).
///
/// Construction succeeds so the provider protocol can be exercised, but
/// [`DecoyProjFs::start`] always fails: a root must never be presented
/// without virtualization behind it.
pub struct DecoyProjFs {
    callbacks: Arc<DecoyCallbacks>,
    options: ProjFsOptions,
}

impl DecoyProjFs {
    /// Create a virtualizer.
    pub fn new(
        tree: Arc<TreeStore>,
        alerter: Arc<dyn CanaryAlert>,
        options: ProjFsOptions,
    ) -> Result<Self, ProjFsError> {
        let callbacks: Arc<DecoyCallbacks> = Arc::new(DecoyCallbacks::new(tree, alerter, &options));
        Ok(Self { callbacks, options })
    }

    /// Always fails with [`ProjFsError::Unsupported`].
    pub fn start(&self) -> Result<(), ProjFsError> {
        Err(ProjFsError::Unsupported)
    }

    /// Always fails with [`ProjFsError::NotStarted`].
    pub fn stop(&self) -> Result<(), ProjFsError> {
        Err(ProjFsError::NotStarted)
    }

    /// Always false.
    pub fn is_started(&self) -> bool {
        false
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
