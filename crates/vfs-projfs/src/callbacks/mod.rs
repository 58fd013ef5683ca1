//! Platform-independent provider layer.
//!
//! Implements the projection protocol against the decoy tree so the
//! Windows callbacks only convert arguments and status codes.

mod backing;
mod decoy;
mod types;

pub use backing::PhysicalBacking;
pub use decoy::{placeholder_body, DecoyCallbacks};
pub use types::{
    CallbackStatus, DirEntrySink, EnumerationFlags, NotificationKind, PlaceholderInfo, VecSink,
};
