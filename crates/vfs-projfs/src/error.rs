//! Error types for the ProjFS provider.

use std::fmt;

use canaryfs_model::TreeError;

/// Errors that can occur while starting or running the provider.
#[derive(Debug)]
pub enum ProjFsError {
    /// ProjFS API error.
    ProjFsApi {
        /// Operation that failed.
        operation: String,
        /// HRESULT error code.
        hresult: i32,
    },

    /// Virtualization root path error.
    InvalidRootPath(String),

    /// Virtualization already started.
    AlreadyStarted,

    /// Virtualization not started.
    NotStarted,

    /// IO error.
    Io(std::io::Error),

    /// Decoy tree error.
    Tree(TreeError),

    /// Path conversion error (UTF-16 <-> UTF-8).
    PathConversion(String),

    /// ProjFS is not available on this platform.
    Unsupported,
}

impl fmt::Display for ProjFsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjFsError::ProjFsApi { operation, hresult } => {
                write!(
                    f,
                    "ProjFS API error in {}: HRESULT 0x{:08X}",
                    operation, hresult
                )
            }
            ProjFsError::InvalidRootPath(path) => {
                write!(f, "Invalid virtualization root path: {}", path)
            }
            ProjFsError::AlreadyStarted => write!(f, "Virtualization already started"),
            ProjFsError::NotStarted => write!(f, "Virtualization not started"),
            ProjFsError::Io(e) => write!(f, "IO error: {}", e),
            ProjFsError::Tree(e) => write!(f, "Decoy tree error: {}", e),
            ProjFsError::PathConversion(msg) => write!(f, "Path conversion error: {}", msg),
            ProjFsError::Unsupported => {
                write!(f, "ProjFS is only available on Windows 10 1809 or later")
            }
        }
    }
}

impl std::error::Error for ProjFsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProjFsError::Io(e) => Some(e),
            ProjFsError::Tree(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProjFsError {
    fn from(e: std::io::Error) -> Self {
        ProjFsError::Io(e)
    }
}

impl From<TreeError> for ProjFsError {
    fn from(e: TreeError) -> Self {
        ProjFsError::Tree(e)
    }
}
