//! Virtual path helpers.
//!
//! Every path handed to the tree store is in canonical form: a single leading
//! `\`, segments separated by a single `\`, no trailing separator. The root is
//! the lone separator. Both `\` and `/` are accepted as input separators so
//! remote clients and the OS projection layer land on the same keys.

/// Canonical separator.
pub const SEPARATOR: char = '\\';

/// Canonical root path.
pub const ROOT: &str = "\\";

/// Normalize a virtual path to canonical form.
///
/// Idempotent: `normalize_path(&normalize_path(p)) == normalize_path(p)`.
///
/// # Arguments
/// * `path` - Raw path (may be empty, relative, or use `/`)
///
/// # Returns
/// Canonical path, `\` for the root.
pub fn normalize_path(path: &str) -> String {
    let mut normalized: String = String::with_capacity(path.len() + 1);

    for segment in path.split(['\\', '/']).filter(|s| !s.is_empty()) {
        normalized.push(SEPARATOR);
        normalized.push_str(segment);
    }

    if normalized.is_empty() {
        normalized.push(SEPARATOR);
    }
    normalized
}

/// Check whether a canonical path is the root.
pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Split a canonical path into parent directory and final segment.
///
/// # Arguments
/// * `path` - Canonical path
///
/// # Returns
/// `(parent, name)`; the root splits into `("\", "")`.
pub fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind(SEPARATOR) {
        Some(0) => (ROOT, &path[1..]),
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => (ROOT, path),
    }
}

/// Join a canonical directory path and a child name.
///
/// # Arguments
/// * `parent` - Canonical directory path
/// * `name` - Single path segment
///
/// # Returns
/// Canonical child path.
pub fn join_path(parent: &str, name: &str) -> String {
    if is_root(parent) {
        format!("{}{}", SEPARATOR, name)
    } else {
        format!("{}{}{}", parent, SEPARATOR, name)
    }
}

/// Final segment of a path, accepting either separator.
///
/// Used for process image paths too, which are not canonical virtual paths.
pub fn leaf_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

/// Characters the seed format cannot carry inside a name.
const FORBIDDEN_NAME_CHARS: [char; 3] = [',', '\r', '\n'];

/// Check whether a segment can be stored in the tree and persisted.
///
/// Names holding a field or record separator of the seed format would not
/// survive a save and reload.
pub fn is_valid_segment(name: &str) -> bool {
    !name.is_empty() && !name.contains(FORBIDDEN_NAME_CHARS)
}

/// Case-insensitive lookup key for a canonical path.
pub(crate) fn path_key(path: &str) -> String {
    path.to_lowercase()
}

/// Iterate the segments of a canonical path.
pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty())
}
