//! Error types for tree store operations.

use thiserror::Error;

/// Errors that can occur while building, mutating, or persisting the tree.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A seed record could not be parsed.
    #[error("Seed parse error on line {line}: {reason}")]
    SeedParse {
        /// 1-based line number.
        line: usize,
        /// What was wrong with the record.
        reason: String,
    },

    /// Path cannot name the requested kind of entry (e.g. a file at the root).
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// An existing entry of the other kind occupies the path.
    #[error("Path conflict at {path}: {reason}")]
    PathConflict {
        /// Conflicting path.
        path: String,
        /// Description of the conflict.
        reason: &'static str,
    },

    /// IO error while loading or saving the seed file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
