//! Folding committed log records back into their data files.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use fs2::FileExt;
use tracing::{debug, warn};
use txfs_core::{Error, Result, SyncMode};

use crate::log::{read_records, LogRecord};
use crate::txn::TxnManager;

/// Clean one log: replay (a budgeted prefix of) its records onto a fresh
/// read of the data file, rewrite the file, and delete the log.
///
/// The data file's advisory lock is held for the duration, so a log whose
/// file is open in any process fails cleanup here instead of racing the
/// holder's segment image. Cleanup is idempotent over its inputs; a
/// failed or interrupted pass can simply be re-run.
///
/// # Errors
///
/// Returns an error if the data file is locked, any I/O step fails, or
/// the log cannot be deleted afterwards.
pub(crate) fn clean_log(log_path: &Path, budget: Option<u64>, sync_mode: SyncMode) -> Result<()> {
    // `<file>.log` -> `<file>`. The data file can be missing if it was
    // removed out-of-band; cleanup then materializes it from the log.
    let data_path = log_path.with_extension("");
    let mut file = OpenOptions::new().read(true).write(true).create(true).open(&data_path)?;
    if let Err(e) = file.try_lock_exclusive() {
        return if e.kind() == io::ErrorKind::WouldBlock {
            Err(Error::Locked(data_path))
        } else {
            Err(e.into())
        };
    }

    let mut records = read_records(log_path)?;
    if let Some(budget) = budget {
        retain_within_budget(&mut records, budget, log_path);
    }
    debug!(log = %log_path.display(), count = records.len(), "folding records into data file");

    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;

    let mut manager = TxnManager::new(buffer);
    manager.replay(&records);
    let segment = manager.into_segment();

    file.seek(SeekFrom::Start(0))?;
    file.set_len(0)?;
    file.write_all(&segment)?;
    // Make the fold durable before the log stops existing.
    sync_mode.apply(&file)?;

    fs::remove_file(log_path)?;
    Ok(())
}

/// Keep the longest record prefix whose cumulative redo size fits in
/// `budget`; a record landing exactly on the boundary is kept.
fn retain_within_budget(records: &mut Vec<LogRecord>, budget: u64, log_path: &Path) {
    let mut remaining = budget;
    let mut keep = 0usize;
    for record in records.iter() {
        let len = record.redo.len() as u64;
        if len > remaining {
            break;
        }
        remaining -= len;
        keep += 1;
        if remaining == 0 {
            break;
        }
    }
    if remaining > 0 {
        warn!(
            log = %log_path.display(),
            remaining,
            "clean budget not exhausted by log records"
        );
    }
    records.truncate(keep);
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::log::append_record;

    fn record(id: u32, offset: usize, redo: &[u8]) -> LogRecord {
        LogRecord { id, offset, redo: redo.to_vec() }
    }

    #[test]
    fn test_clean_folds_and_deletes_log() {
        let temp_dir = TempDir::new().unwrap();
        let data_path = temp_dir.path().join("data.txt");
        let log_path = temp_dir.path().join("data.txt.log");
        fs::write(&data_path, vec![0u8; 8]).unwrap();

        append_record(&log_path, &record(0, 0, b"head"), SyncMode::None).unwrap();
        append_record(&log_path, &record(1, 10, b"tail"), SyncMode::None).unwrap();

        clean_log(&log_path, None, SyncMode::None).unwrap();

        assert!(!log_path.exists());
        assert_eq!(fs::read(&data_path).unwrap(), b"head\0\0\0\0\0\0tail");
    }

    #[test]
    fn test_budget_keeps_prefix() {
        let mut records =
            vec![record(0, 0, &[1; 16]), record(1, 16, &[2; 16]), record(2, 32, &[3; 16])];
        retain_within_budget(&mut records, 24, Path::new("x.log"));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_budget_exact_boundary_keeps_record() {
        let mut records = vec![record(0, 0, &[1; 16]), record(1, 16, &[2; 16])];
        retain_within_budget(&mut records, 32, Path::new("x.log"));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_budget_larger_than_log_keeps_all() {
        let mut records = vec![record(0, 0, &[1; 4])];
        retain_within_budget(&mut records, 100, Path::new("x.log"));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_clean_missing_data_file_materializes_it() {
        let temp_dir = TempDir::new().unwrap();
        let data_path = temp_dir.path().join("data.txt");
        let log_path = temp_dir.path().join("data.txt.log");

        append_record(&log_path, &record(0, 2, b"xy"), SyncMode::None).unwrap();
        clean_log(&log_path, None, SyncMode::None).unwrap();

        assert_eq!(fs::read(&data_path).unwrap(), b"\0\0xy");
    }
}
