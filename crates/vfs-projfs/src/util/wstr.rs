//! Wide string conversion for the ProjFS boundary.

use smallvec::SmallVec;
use windows::core::PCWSTR;

use crate::error::ProjFsError;

/// Read a NUL-terminated UTF-16 string supplied by ProjFS.
///
/// A null pointer reads as an empty string. Unpaired surrogates are an error
/// rather than being replaced, since a lossy path would name a different
/// decoy.
///
/// # Safety
/// `s` must be null or point to a NUL-terminated UTF-16 string.
pub unsafe fn pcwstr_to_string(s: PCWSTR) -> Result<String, ProjFsError> {
    if s.is_null() {
        return Ok(String::new());
    }

    let wide: &[u16] = s.as_wide();
    String::from_utf16(wide).map_err(|e| ProjFsError::PathConversion(e.to_string()))
}

/// Read an optional search expression (null or empty means none).
///
/// # Safety
/// Same contract as [`pcwstr_to_string`].
pub unsafe fn optional_pcwstr(s: PCWSTR) -> Option<String> {
    pcwstr_to_string(s).ok().filter(|value| !value.is_empty())
}

/// Convert a Rust string to a NUL-terminated wide string.
///
/// Names and relative paths fit on the stack; longer strings spill.
pub fn string_to_wide(s: &str) -> SmallVec<[u16; 260]> {
    let mut wide: SmallVec<[u16; 260]> = s.encode_utf16().collect();
    wide.push(0);
    wide
}
