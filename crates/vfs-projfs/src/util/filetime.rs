//! FILETIME conversion.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_DIFF_SECS: i64 = 11_644_473_600;
const INTERVALS_PER_SEC: i64 = 10_000_000;

/// Convert SystemTime to a FILETIME value.
///
/// FILETIME counts 100-nanosecond intervals since January 1, 1601 UTC.
/// Times before 1601 clamp to 0.
///
/// # Arguments
/// * `time` - System time to convert
pub fn systemtime_to_filetime(time: SystemTime) -> i64 {
    let unix_intervals: i64 = match time.duration_since(UNIX_EPOCH) {
        Ok(after) => to_intervals(after),
        Err(before) => -to_intervals(before.duration()),
    };

    unix_intervals
        .saturating_add(FILETIME_UNIX_DIFF_SECS * INTERVALS_PER_SEC)
        .max(0)
}

fn to_intervals(duration: Duration) -> i64 {
    let secs: i64 = i64::try_from(duration.as_secs()).unwrap_or(i64::MAX / INTERVALS_PER_SEC);
    secs.saturating_mul(INTERVALS_PER_SEC) + i64::from(duration.subsec_nanos() / 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch() {
        assert_eq!(systemtime_to_filetime(UNIX_EPOCH), 116_444_736_000_000_000);
    }

    #[test]
    fn test_seed_timestamp() {
        let time: SystemTime = UNIX_EPOCH + Duration::from_secs(1_743_942_586);
        assert_eq!(
            systemtime_to_filetime(time),
            116_444_736_000_000_000 + 17_439_425_860_000_000
        );
    }

    #[test]
    fn test_before_1601_clamps() {
        let time: SystemTime = UNIX_EPOCH - Duration::from_secs(20_000_000_000);
        assert_eq!(systemtime_to_filetime(time), 0);
    }
}
