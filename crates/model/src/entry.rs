//! File and directory records of the decoy tree.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One file or directory record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Single path segment (compared case-insensitively).
    pub name: String,
    /// Whether this is a directory.
    pub is_directory: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last write time (UTC).
    pub last_write: SystemTime,
    /// Whether the file has been read at least once since load.
    pub accessed: bool,
    /// Monotonic milliseconds of the last alert, None if never alerted.
    pub last_alert_at: Option<u64>,
}

impl Entry {
    /// Create a file record.
    ///
    /// # Arguments
    /// * `name` - File name
    /// * `size` - File size in bytes
    /// * `last_write` - Last write time
    pub fn file(name: impl Into<String>, size: u64, last_write: SystemTime) -> Self {
        Self {
            name: name.into(),
            is_directory: false,
            size,
            last_write,
            accessed: false,
            last_alert_at: None,
        }
    }

    /// Create a directory record.
    ///
    /// # Arguments
    /// * `name` - Directory name
    /// * `last_write` - Last write time
    pub fn directory(name: impl Into<String>, last_write: SystemTime) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
            size: 0,
            last_write,
            accessed: false,
            last_alert_at: None,
        }
    }

    /// Case-insensitive name comparison.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.name.to_lowercase() == name.to_lowercase()
    }

    /// Last write time as Unix seconds.
    pub fn unix_timestamp(&self) -> i64 {
        unix_seconds(self.last_write)
    }
}

/// Convert a system time to whole Unix seconds (negative before 1970).
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    }
}

/// Convert Unix seconds to a system time.
pub fn from_unix_seconds(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_entry_defaults() {
        let entry = Entry::file("Plan.txt", 5, UNIX_EPOCH);
        assert!(!entry.is_directory);
        assert!(!entry.accessed);
        assert_eq!(entry.last_alert_at, None);
        assert_eq!(entry.size, 5);
    }

    #[test]
    fn test_directory_entry_has_zero_size() {
        let entry = Entry::directory("Network", UNIX_EPOCH);
        assert!(entry.is_directory);
        assert_eq!(entry.size, 0);
    }

    #[test]
    fn test_has_name_case_insensitive() {
        let entry = Entry::file("Plan.txt", 0, UNIX_EPOCH);
        assert!(entry.has_name("plan.TXT"));
        assert!(!entry.has_name("plan.doc"));

        let unicode = Entry::file("Ärger.txt", 0, UNIX_EPOCH);
        assert!(unicode.has_name("ärger.txt"));
    }

    #[test]
    fn test_unix_seconds_roundtrip() {
        for secs in [0_i64, 1743942586, -86400] {
            assert_eq!(unix_seconds(from_unix_seconds(secs)), secs);
        }
    }
}
