//! Transaction staging over an in-memory virtual segment.
//!
//! [`TxnManager`] owns the virtual segment, a growable byte buffer that
//! is the authoritative logical content of a file for one session, plus
//! the table of uncommitted transactions staged against it, each holding
//! undo and redo data. [`FileTxnManager`] binds a manager to a concrete
//! data file's sidecar log and adds durable commit on top of
//! create/abort/replay.

mod file;
mod manager;

pub use file::{log_path_for, FileTxnManager};
pub use manager::{TxId, TxnManager};
