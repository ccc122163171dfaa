//! Log reading for open-time replay and cleanup.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use txfs_core::Result;

use super::record::LogRecord;

/// Read all records from the log at `path`, in physical (commit) order.
///
/// A missing log file is the common case (nothing was committed since
/// the last cleanup) and yields an empty sequence without error.
///
/// # Errors
///
/// Returns an error if the log exists but cannot be read.
pub fn read_records(path: &Path) -> Result<Vec<LogRecord>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut reader = BufReader::new(file);
    let mut records = Vec::new();
    while let Some(record) = LogRecord::decode_from(&mut reader)? {
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use txfs_core::SyncMode;

    use super::super::writer::append_record;
    use super::*;

    #[test]
    fn test_missing_log_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let records = read_records(&temp_dir.path().join("absent.log")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_reads_appended_records_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.txt.log");

        let first = LogRecord { id: 0, offset: 4, redo: b"one two".to_vec() };
        let second = LogRecord { id: 2, offset: 0, redo: b"\0\0".to_vec() };
        append_record(&path, &first, SyncMode::None).unwrap();
        append_record(&path, &second, SyncMode::None).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records, vec![first, second]);
    }

    #[test]
    fn test_torn_tail_keeps_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.txt.log");

        let record = LogRecord { id: 0, offset: 0, redo: b"intact".to_vec() };
        append_record(&path, &record, SyncMode::None).unwrap();
        // Simulate a crash mid-append of the next record.
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.extend_from_slice(b"1 0 100 short");
        std::fs::write(&path, bytes).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records, vec![record]);
    }
}
