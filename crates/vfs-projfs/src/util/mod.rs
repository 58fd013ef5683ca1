//! Utility functions for ProjFS operations.

pub mod compare;
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub mod filetime;
#[cfg(target_os = "windows")]
pub mod wstr;

pub use compare::{prj_file_name_compare, prj_file_name_match};
#[cfg(target_os = "windows")]
pub use filetime::systemtime_to_filetime;
