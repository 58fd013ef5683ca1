//! ProjFS file name collation and wildcard matching.

use std::cmp::Ordering;

#[cfg(target_os = "windows")]
use windows::Win32::Storage::ProjectedFileSystem::{PrjFileNameCompare, PrjFileNameMatch};

/// Compare two file names using ProjFS collation order.
///
/// This is the same ordering used by ProjFS for directory enumeration.
///
/// # Arguments
/// * `a` - First file name
/// * `b` - Second file name
///
/// # Returns
/// Ordering result.
#[cfg(target_os = "windows")]
pub fn prj_file_name_compare(a: &str, b: &str) -> Ordering {
    use crate::util::wstr::string_to_wide;

    let a_wide: Vec<u16> = string_to_wide(a);
    let b_wide: Vec<u16> = string_to_wide(b);

    unsafe {
        let result: i32 = PrjFileNameCompare(
            windows::core::PCWSTR::from_raw(a_wide.as_ptr()),
            windows::core::PCWSTR::from_raw(b_wide.as_ptr()),
        );
        result.cmp(&0)
    }
}

/// Compare two file names (non-Windows fallback, case-insensitive).
#[cfg(not(target_os = "windows"))]
pub fn prj_file_name_compare(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Check a file name against a ProjFS search expression.
///
/// An absent or empty expression matches everything.
///
/// # Arguments
/// * `name` - File name to check
/// * `pattern` - Search expression supplied by the OS
#[cfg(target_os = "windows")]
pub fn prj_file_name_match(name: &str, pattern: Option<&str>) -> bool {
    use crate::util::wstr::string_to_wide;

    let Some(pattern) = pattern.filter(|p| !p.is_empty()) else {
        return true;
    };

    let name_wide: Vec<u16> = string_to_wide(name);
    let pattern_wide: Vec<u16> = string_to_wide(pattern);

    unsafe {
        PrjFileNameMatch(
            windows::core::PCWSTR::from_raw(name_wide.as_ptr()),
            windows::core::PCWSTR::from_raw(pattern_wide.as_ptr()),
        )
        .as_bool()
    }
}

/// Check a file name against a search expression (non-Windows fallback).
///
/// Supports `*` and `?`, case-insensitive.
#[cfg(not(target_os = "windows"))]
pub fn prj_file_name_match(name: &str, pattern: Option<&str>) -> bool {
    match pattern {
        None | Some("") => true,
        Some(pattern) => {
            let name: Vec<char> = name.to_lowercase().chars().collect();
            let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
            wildcard_match(&name, &pattern)
        }
    }
}

/// Iterative `*`/`?` matcher with single-star backtracking.
#[cfg(not(target_os = "windows"))]
fn wildcard_match(name: &[char], pattern: &[char]) -> bool {
    let (mut n, mut p) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, n));
                p += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                n += 1;
                p += 1;
            }
            _ => match star {
                Some((star_p, star_n)) => {
                    p = star_p + 1;
                    n = star_n + 1;
                    star = Some((star_p, star_n + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
