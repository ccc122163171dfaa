//! Per-file redo log: record codec, reader, and append-only writer.
//!
//! Each data file `<name>` owns at most one sidecar log `<name>.log` in
//! the same directory. The log is an append-only sequence of committed
//! redo records in commit order; it exists on disk iff at least one
//! transaction was committed since the last successful cleanup.
//!
//! # Record format
//!
//! ```text
//! <id> <offset> <redo_len> <redo_bytes_verbatim>
//! ```
//!
//! Three ASCII decimal fields, each followed by exactly one separator
//! byte, then exactly `redo_len` raw payload bytes. Records are
//! concatenated with no framing between them; the payload is
//! length-prefixed, never delimited, so it may contain any byte value.
//!
//! The format is not self-describing and carries no integrity check: a
//! torn final record is indistinguishable from EOF and is dropped on
//! read. This is inherited from logs already in the field and kept for
//! compatibility with them.

mod reader;
mod record;
mod writer;

pub use reader::read_records;
pub use record::LogRecord;
pub use writer::append_record;
