//! File-bound transaction manager with durable commit.

use std::path::{Path, PathBuf};

use tracing::debug;
use txfs_core::{Error, Result, SyncMode};

use super::manager::{TxId, TxnManager};
use crate::log::{append_record, LogRecord};

/// Derive the sidecar log path for a data file: `<file>` -> `<file>.log`.
#[must_use]
pub fn log_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".log");
    PathBuf::from(os)
}

/// A [`TxnManager`] bound to a concrete on-disk file and its log path.
///
/// Adds commit (durably appending a transaction's redo record to the
/// log) on top of the base create/abort/replay operations.
#[derive(Debug)]
pub struct FileTxnManager {
    base: TxnManager,
    log_path: PathBuf,
    sync_mode: SyncMode,
}

impl FileTxnManager {
    /// Bind a manager around `segment` to the file at `file_path`.
    #[must_use]
    pub fn new(file_path: &Path, segment: Vec<u8>, sync_mode: SyncMode) -> Self {
        Self { base: TxnManager::new(segment), log_path: log_path_for(file_path), sync_mode }
    }

    /// The sidecar log path this manager commits to.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Stage a write. See [`TxnManager::create`].
    pub fn create(&mut self, offset: usize, redo: &[u8]) -> TxId {
        self.base.create(offset, redo)
    }

    /// Abort an uncommitted transaction. See [`TxnManager::abort`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTransaction`] if the id is not in the table.
    pub fn abort(&mut self, id: TxId) -> Result<()> {
        self.base.abort(id)
    }

    /// Apply committed records to the segment. See [`TxnManager::replay`].
    pub fn replay(&mut self, records: &[LogRecord]) {
        self.base.replay(records);
    }

    /// The segment contents.
    #[must_use]
    pub fn segment(&self) -> &[u8] {
        self.base.segment()
    }

    /// Commit transaction `id`, appending its redo record to the log and
    /// removing it from the table.
    ///
    /// With a `budget`, only the first `budget` bytes of the redo are
    /// persisted; the segment keeps the full write, so a partial commit
    /// narrows durability without changing what this session reads.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownTransaction`] if the id was already committed,
    ///   aborted, or never created.
    /// - [`Error::BudgetExceeded`] if `budget` is larger than the staged
    ///   write; the transaction and segment are untouched.
    /// - I/O errors from the log append, in which case the transaction
    ///   stays in the table and can be retried.
    pub fn commit(&mut self, id: TxId, budget: Option<usize>) -> Result<()> {
        let txn = self.base.find(id).ok_or(Error::UnknownTransaction(id))?;
        if let Some(bytes) = budget {
            if bytes > txn.redo.len() {
                return Err(Error::BudgetExceeded { requested: bytes, available: txn.redo.len() });
            }
        }
        let redo = match budget {
            Some(bytes) => txn.redo[..bytes].to_vec(),
            None => txn.redo.clone(),
        };
        let record = LogRecord { id, offset: txn.offset, redo };
        append_record(&self.log_path, &record, self.sync_mode)?;
        debug!(
            log = %self.log_path.display(),
            txid = id,
            bytes = record.redo.len(),
            "committed transaction to log"
        );
        let _ = self.base.remove(id);
        Ok(())
    }
}
