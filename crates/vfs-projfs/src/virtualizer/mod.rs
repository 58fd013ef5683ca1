//! ProjFS virtualizer.
//!
//! Native callbacks and the virtualization lifecycle on Windows; a stub with
//! the same API elsewhere.

#[cfg(target_os = "windows")]
mod buffer;
#[cfg(target_os = "windows")]
mod callbacks;
#[cfg(target_os = "windows")]
mod projfs;
#[cfg(not(target_os = "windows"))]
mod stub;

#[cfg(target_os = "windows")]
pub use projfs::DecoyProjFs;
#[cfg(not(target_os = "windows"))]
pub use stub::DecoyProjFs;
