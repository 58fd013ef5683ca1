//! Decoy tree model for canaryfs.
//!
//! - [`path`] - Canonical backslash paths
//! - [`entry`] - File and directory records
//! - [`tree`] - Shared tree, content store and enumeration cursors
//! - [`seed`] - `path,isDirectory,size,unixTimestamp` text format
//! - [`persist`] - Seed file load and save
//! - [`clock`] - Monotonic milliseconds for alert debouncing

pub mod clock;
pub mod entry;
pub mod error;
pub mod path;
pub mod persist;
pub mod seed;
pub mod tree;

pub use clock::{Clock, MonotonicClock};
pub use entry::{from_unix_seconds, unix_seconds, Entry};
pub use error::TreeError;
pub use path::{is_root, is_valid_segment, join_path, leaf_name, normalize_path, split_parent, ROOT, SEPARATOR};
pub use persist::SeedFile;
pub use seed::{encode_seed, parse_seed, SeedRecord};
pub use tree::{EnumerationId, TreeStore};

/// Tree loaded when no seed file exists.
pub const DEFAULT_SEED: &str = "\\Network,true,0,1743942586\n\
\\Network\\Network Diagram.pdf,false,2303,1727206186\n\
\\Network\\Router Configuration.xml,false,25267,1741508986\n";
