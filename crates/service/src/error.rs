use std::path::PathBuf;

use canaryfs_model::TreeError;
use canaryfs_vfs_projfs::ProjFsError;
use thiserror::Error;

/// Fatal service errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Cannot read config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Decoy tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("{0}")]
    ProjFs(#[from] ProjFsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
