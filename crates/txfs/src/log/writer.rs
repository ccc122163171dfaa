//! Append-only log writer.
//!
//! Each commit is its own open/append/flush/close cycle, so a committed
//! record is durable (to the configured [`SyncMode`]) before the call
//! returns. Only the holder of the file's advisory lock ever appends, so
//! the writer needs no locking of its own.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use txfs_core::{Result, SyncMode};

use super::record::LogRecord;

/// Append one record to the log at `path`, creating the log if needed.
///
/// The record is flushed and synced per `sync_mode` before returning.
/// When the append creates the log file, the parent directory is synced
/// as well so the new directory entry survives a crash.
///
/// # Errors
///
/// Returns an error if the log cannot be opened or the write fails.
pub fn append_record(path: &Path, record: &LogRecord, sync_mode: SyncMode) -> Result<()> {
    let created = !path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut writer = BufWriter::new(file);
    record.encode_to(&mut writer)?;
    writer.flush()?;
    sync_mode.apply(writer.get_ref())?;
    if created && sync_mode != SyncMode::None {
        sync_parent_dir(path)?;
    }
    Ok(())
}

/// Sync a file's parent directory so its entries (file names) are
/// persisted. Needed once per log file, right after it is born.
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}
