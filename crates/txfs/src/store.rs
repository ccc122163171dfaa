//! Directory sessions, file handles, and the write API.
//!
//! A [`Store`] is the entry point: one per host directory, process-wide.
//! Files opened through it hand back a [`FileHandle`] holding the
//! exclusive advisory lock, the file's virtual segment, and its staged
//! transactions. Writes return a [`WriteHandle`] value that is later
//! passed back to sync (commit) or abort the staged bytes.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use fs2::FileExt;
use tracing::{debug, info, warn};
use txfs_core::{Error, Result, StoreConfig};

use crate::clean::clean_log;
use crate::log::read_records;
use crate::txn::{log_path_for, FileTxnManager, TxId};

/// Process-wide registry of live stores, one per directory path.
///
/// Re-initializing a directory returns the store already registered for
/// it; stores live until process exit.
fn registry() -> &'static Mutex<HashMap<PathBuf, Arc<Store>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<PathBuf, Arc<Store>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// A session over one store directory.
#[derive(Debug)]
pub struct Store {
    dir: PathBuf,
    config: StoreConfig,
}

impl Store {
    /// Initialize (or re-join) the store for `directory`.
    ///
    /// Creates the directory if it does not exist. If this process
    /// already initialized a store for the same path, that store is
    /// returned (identity, not a fresh session) and `config` is
    /// ignored.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyPath`] for an empty directory path.
    /// - [`Error::NotADirectory`] if the path exists but is not a
    ///   directory.
    /// - I/O errors from directory creation.
    pub fn init(directory: impl AsRef<Path>, config: StoreConfig) -> Result<Arc<Self>> {
        let dir = directory.as_ref();
        if dir.as_os_str().is_empty() {
            return Err(Error::EmptyPath);
        }

        let mut stores = registry().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = stores.get(dir) {
            return Ok(Arc::clone(existing));
        }

        if !dir.exists() {
            debug!(dir = %dir.display(), "store directory does not exist, creating it");
            fs::create_dir_all(dir)?;
        } else if !dir.is_dir() {
            return Err(Error::NotADirectory(dir.to_path_buf()));
        }

        let store = Arc::new(Self { dir: dir.to_path_buf(), config });
        stores.insert(store.dir.clone(), Arc::clone(&store));
        if config.verbose {
            info!(dir = %store.dir.display(), "initialized store");
        }
        Ok(store)
    }

    /// The directory this store manages.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Open `filename` within the store at a declared byte capacity.
    ///
    /// Creates the file if missing; extends it to `declared_len` if
    /// shorter (shrinking is not allowed). Takes the non-blocking
    /// exclusive advisory lock, reads the file into a fresh segment, and
    /// replays any committed log records into it, so the handle observes
    /// every durably acknowledged write even after a crash before
    /// cleanup.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyFilename`] for an empty name.
    /// - [`Error::NotARegularFile`] if the path exists but is not a
    ///   regular file.
    /// - [`Error::LengthTooSmall`] if the on-disk file is larger than
    ///   `declared_len`.
    /// - [`Error::Locked`] if any handle, in this process or another,
    ///   holds the file's lock.
    pub fn open_file(&self, filename: &str, declared_len: u64) -> Result<FileHandle> {
        if filename.is_empty() {
            return Err(Error::EmptyFilename);
        }
        let path = self.dir.join(filename);
        if !path.exists() {
            debug!(path = %path.display(), "file does not exist, creating it");
            File::create(&path)?;
        } else if !path.is_file() {
            return Err(Error::NotARegularFile(path));
        }

        let on_disk = fs::metadata(&path)?.len();
        if declared_len < on_disk {
            return Err(Error::LengthTooSmall { declared: declared_len, on_disk });
        }

        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        if let Err(e) = file.try_lock_exclusive() {
            // Dropping the descriptor closes it on the error path.
            return if e.kind() == io::ErrorKind::WouldBlock {
                Err(Error::Locked(path))
            } else {
                Err(e.into())
            };
        }
        if declared_len > on_disk {
            debug!(path = %path.display(), declared_len, on_disk, "extending file");
            file.set_len(declared_len)?;
        }

        let mut segment = vec![0u8; declared_len as usize];
        (&file).read_exact(&mut segment)?;

        let mut manager = FileTxnManager::new(&path, segment, self.config.sync_mode);
        let records = read_records(manager.log_path())?;
        if !records.is_empty() {
            debug!(
                path = %path.display(),
                count = records.len(),
                "replaying committed log records into segment"
            );
            manager.replay(&records);
        }

        if self.config.verbose {
            info!(file = filename, declared_len, "opened file");
        }
        Ok(FileHandle {
            name: filename.to_string(),
            declared_len,
            verbose: self.config.verbose,
            file: Some(file),
            manager: Some(manager),
        })
    }

    /// Remove a file and its sidecar log from the store.
    ///
    /// The handle must be closed first; the advisory lock of an open
    /// handle protects the file from removal. A missing log is not an
    /// error, since it only exists when commits are awaiting cleanup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StillOpen`] for an open handle, or the I/O error
    /// from deleting the data file.
    pub fn remove_file(&self, file: &FileHandle) -> Result<()> {
        if file.is_open() {
            return Err(Error::StillOpen(file.name.clone()));
        }
        let path = self.dir.join(&file.name);
        fs::remove_file(&path)?;
        // The log only exists when commits are awaiting cleanup.
        match fs::remove_file(log_path_for(&path)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        if self.config.verbose {
            info!(file = %file.name, "removed file");
        }
        Ok(())
    }

    /// Fold every log in the directory into its data file and delete it.
    ///
    /// Each `*.log` regular file is cleaned independently; a failure on
    /// one log does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CleanupFailed`] carrying the number of logs whose
    /// cleanup failed after all were attempted.
    pub fn clean(&self) -> Result<()> {
        self.clean_inner(None)
    }

    /// Like [`Store::clean`], but folds at most `budget` redo bytes from
    /// each log.
    ///
    /// The budget applies to every log independently, not to the
    /// directory as a pool: each log retains its longest record prefix
    /// whose cumulative redo size fits the budget, and the rest of that
    /// log's records are discarded.
    ///
    /// # Errors
    ///
    /// As [`Store::clean`].
    pub fn clean_n_bytes(&self, budget: u64) -> Result<()> {
        self.clean_inner(Some(budget))
    }

    fn clean_inner(&self, budget: Option<u64>) -> Result<()> {
        let mut failed = 0usize;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || !path.extension().is_some_and(|e| e == "log") {
                continue;
            }
            if let Err(e) = clean_log(&path, budget, self.config.sync_mode) {
                warn!(log = %path.display(), error = %e, "log cleanup failed");
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(Error::CleanupFailed { failed });
        }
        if self.config.verbose {
            info!(dir = %self.dir.display(), "cleaned store");
        }
        Ok(())
    }
}

/// One open file within a store.
///
/// Holds the OS descriptor (and with it the exclusive advisory lock),
/// the declared capacity, and the file's transaction manager. Dropping
/// the handle releases the lock; so does [`FileHandle::close`], after
/// which every operation fails with [`Error::NotOpen`].
#[derive(Debug)]
pub struct FileHandle {
    name: String,
    declared_len: u64,
    verbose: bool,
    file: Option<File>,
    manager: Option<FileTxnManager>,
}

/// A staged write, returned by [`FileHandle::write`].
///
/// A plain value: it does not keep the file open and holds no reference
/// back to the handle. Pass it to [`FileHandle::sync_write`],
/// [`FileHandle::sync_write_n_bytes`], or [`FileHandle::abort_write`] on
/// the handle that created it.
#[derive(Debug, Clone)]
pub struct WriteHandle {
    /// Name of the file the write was staged against.
    pub filename: String,
    /// Byte offset of the write.
    pub offset: usize,
    /// Length of the staged bytes.
    pub length: usize,
    /// Transaction id within the file's manager.
    pub txid: TxId,
}

impl FileHandle {
    /// The file's name, relative to its store directory.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The byte capacity declared at open time.
    #[must_use]
    pub fn declared_len(&self) -> u64 {
        self.declared_len
    }

    /// Whether the handle still holds its descriptor and lock.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Close the handle: release the descriptor (and the advisory lock),
    /// zero the declared length, and drop the manager.
    ///
    /// Uncommitted transactions are silently discarded: their segment
    /// edits vanish with the manager, and the on-disk file never saw
    /// them because they were never logged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] if the handle was already closed.
    pub fn close(&mut self) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotOpen(self.name.clone()));
        }
        self.file = None;
        self.manager = None;
        self.declared_len = 0;
        if self.verbose {
            info!(file = %self.name, "closed file");
        }
        Ok(())
    }

    /// Read up to `length` bytes of the segment starting at `offset`.
    ///
    /// The segment is the authoritative content for this session: synced
    /// writes from before the open, plus every staged write since. The
    /// result is truncated at the segment's end; `offset` at or past the
    /// end yields an empty buffer, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] if the handle is closed.
    pub fn read(&self, offset: usize, length: usize) -> Result<Vec<u8>> {
        let manager = self.manager.as_ref().ok_or_else(|| Error::NotOpen(self.name.clone()))?;
        let segment = manager.segment();
        if offset >= segment.len() {
            return Ok(Vec::new());
        }
        let end = segment.len().min(offset.saturating_add(length));
        Ok(segment[offset..end].to_vec())
    }

    /// Stage a write of `data` at `offset`.
    ///
    /// The bytes are applied to the segment immediately (visible to
    /// [`FileHandle::read`]) but durable only after
    /// [`FileHandle::sync_write`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] if the handle is closed.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<WriteHandle> {
        let manager = self.manager.as_mut().ok_or_else(|| Error::NotOpen(self.name.clone()))?;
        let txid = manager.create(offset, data);
        debug!(file = %self.name, txid, offset, len = data.len(), "staged write");
        Ok(WriteHandle { filename: self.name.clone(), offset, length: data.len(), txid })
    }

    /// Commit a staged write durably to the file's log.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] on a closed handle, or
    /// [`Error::UnknownTransaction`] if the write was already synced or
    /// aborted (or belongs to another file).
    pub fn sync_write(&mut self, write: &WriteHandle) -> Result<()> {
        self.commit(write, None)
    }

    /// Commit only the first `bytes` bytes of a staged write.
    ///
    /// The segment keeps the full write for this session; only the
    /// durable record is narrowed.
    ///
    /// # Errors
    ///
    /// As [`FileHandle::sync_write`], plus [`Error::BudgetExceeded`] if
    /// `bytes` is larger than the staged write.
    pub fn sync_write_n_bytes(&mut self, write: &WriteHandle, bytes: usize) -> Result<()> {
        self.commit(write, Some(bytes))
    }

    /// Abort a staged write, restoring the bytes it displaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] on a closed handle, or
    /// [`Error::UnknownTransaction`] if the write was already synced or
    /// aborted (or belongs to another file).
    pub fn abort_write(&mut self, write: &WriteHandle) -> Result<()> {
        let manager = self.manager_for(write)?;
        manager.abort(write.txid)?;
        debug!(file = %self.name, txid = write.txid, "aborted write");
        Ok(())
    }

    fn commit(&mut self, write: &WriteHandle, budget: Option<usize>) -> Result<()> {
        let manager = self.manager_for(write)?;
        manager.commit(write.txid, budget)
    }

    /// Resolve the manager for a write handle, rejecting handles that
    /// were staged against a different file (ids are only unique within
    /// one manager).
    fn manager_for(&mut self, write: &WriteHandle) -> Result<&mut FileTxnManager> {
        match self.manager.as_mut() {
            None => Err(Error::NotOpen(self.name.clone())),
            Some(_) if write.filename != self.name => Err(Error::UnknownTransaction(write.txid)),
            Some(manager) => Ok(manager),
        }
    }
}
