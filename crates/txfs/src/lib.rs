//! Transactional byte-range writes over ordinary files.
//!
//! This crate provides:
//! - A per-file redo log and its record codec (`log`)
//! - In-memory transaction staging with undo/redo (`txn`)
//! - Directory sessions, file handles, and log cleanup (`store`)
//!
//! A [`Store`] is a session over one host directory. Files opened through
//! it stage byte-range writes in an in-memory segment; committing a write
//! appends its redo record to the file's sidecar log, and an explicit
//! clean pass folds committed records back into the file and removes the
//! log. A crash between commit and clean loses nothing: opening the file
//! replays the log into the segment.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clean;
pub mod log;
pub mod store;
pub mod txn;

pub use log::LogRecord;
pub use store::{FileHandle, Store, WriteHandle};
pub use txfs_core::{Error, Result, StoreConfig, SyncMode};
pub use txn::{FileTxnManager, TxId, TxnManager};
