//! Seed/persisted tree format.
//!
//! One record per line, four comma-separated fields:
//! `path,isDirectory,size,unixTimestamp`, e.g.
//! `\Network\Router Configuration.xml,false,25267,1741508986`.

use crate::error::TreeError;
use crate::path::normalize_path;

/// One line of the seed format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedRecord {
    /// Canonical virtual path.
    pub path: String,
    /// Whether the record is a directory.
    pub is_directory: bool,
    /// Size in bytes.
    pub size: u64,
    /// Last write time as Unix seconds.
    pub timestamp: i64,
}

/// Parse seed text into records.
///
/// Blank lines are skipped. Lines without exactly four fields are skipped
/// with a warning; lines with four fields that do not parse are an error.
///
/// # Arguments
/// * `text` - Seed text (any line ending)
///
/// # Returns
/// Records in input order.
pub fn parse_seed(text: &str) -> Result<Vec<SeedRecord>, TreeError> {
    let mut records: Vec<SeedRecord> = Vec::new();
    let unified: String = text.replace("\r\n", "\n");

    for (index, line) in unified.split(['\r', '\n']).enumerate() {
        let line: &str = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 4 {
            tracing::warn!(
                line = index + 1,
                fields = fields.len(),
                "Skipping seed record without four fields"
            );
            continue;
        }

        records.push(parse_record(index + 1, &fields)?);
    }

    Ok(records)
}

/// Encode records as seed text, sorted by path.
///
/// # Arguments
/// * `records` - Records to encode
///
/// # Returns
/// Newline-terminated seed text.
pub fn encode_seed(records: &[SeedRecord]) -> String {
    let mut sorted: Vec<&SeedRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut out: String = String::new();
    for record in sorted {
        out.push_str(&format!(
            "{},{},{},{}\n",
            record.path, record.is_directory, record.size, record.timestamp
        ));
    }
    out
}

fn parse_record(line: usize, fields: &[&str]) -> Result<SeedRecord, TreeError> {
    let seed_error = |reason: String| TreeError::SeedParse { line, reason };

    let is_directory: bool = match fields[1].trim().to_ascii_lowercase().as_str() {
        "true" => true,
        "false" => false,
        other => return Err(seed_error(format!("invalid isDirectory flag '{}'", other))),
    };

    let size: u64 = fields[2]
        .trim()
        .parse()
        .map_err(|_| seed_error(format!("invalid size '{}'", fields[2].trim())))?;

    let timestamp: i64 = fields[3]
        .trim()
        .parse()
        .map_err(|_| seed_error(format!("invalid timestamp '{}'", fields[3].trim())))?;

    Ok(SeedRecord {
        path: normalize_path(fields[0]),
        is_directory,
        size,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_records() {
        let text: &str = "\\Network,true,0,1743942586\r\n\
                          \\Network\\Network Diagram.pdf,false,2303,1727206186\r\n";
        let records: Vec<SeedRecord> = parse_seed(text).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, "\\Network");
        assert!(records[0].is_directory);
        assert_eq!(records[1].path, "\\Network\\Network Diagram.pdf");
        assert_eq!(records[1].size, 2303);
        assert_eq!(records[1].timestamp, 1727206186);
    }

    #[test]
    fn test_parse_skips_blank_and_short_lines() {
        let text: &str = "\n\n\\a,true,0,1\nnot,a,record\n\n\\a\\b,false,3,2\n";
        let records: Vec<SeedRecord> = parse_seed(text).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_flag_case_insensitive() {
        let records: Vec<SeedRecord> = parse_seed("\\a,True,0,1\n\\b,FALSE,1,1").unwrap();
        assert!(records[0].is_directory);
        assert!(!records[1].is_directory);
    }

    #[test]
    fn test_parse_normalizes_paths() {
        let records: Vec<SeedRecord> = parse_seed("\\\\Network\\Plan.txt,false,5,10").unwrap();
        assert_eq!(records[0].path, "\\Network\\Plan.txt");
    }

    #[test]
    fn test_parse_reports_bad_numbers() {
        let err: TreeError = parse_seed("\\a,true,0,1\n\\b,false,big,1").unwrap_err();
        match err {
            TreeError::SeedParse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {}", other),
        }

        assert!(parse_seed("\\a,maybe,0,1").is_err());
        assert!(parse_seed("\\a,false,-1,1").is_err());
    }

    #[test]
    fn test_encode_sorts_by_path() {
        let records: Vec<SeedRecord> = vec![
            SeedRecord {
                path: "\\b".to_string(),
                is_directory: false,
                size: 1,
                timestamp: 2,
            },
            SeedRecord {
                path: "\\a".to_string(),
                is_directory: true,
                size: 0,
                timestamp: 3,
            },
        ];
        assert_eq!(encode_seed(&records), "\\a,true,0,3\n\\b,false,1,2\n");
    }

    #[test]
    fn test_negative_timestamp_survives() {
        let records: Vec<SeedRecord> = parse_seed("\\old.txt,false,1,-100").unwrap();
        assert_eq!(records[0].timestamp, -100);
        assert_eq!(encode_seed(&records), "\\old.txt,false,1,-100\n");
    }
}
