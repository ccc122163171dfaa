//! The base transaction manager: virtual segment plus transaction table.

use txfs_core::{Error, Result};

use crate::log::LogRecord;

/// Identifier of a transaction within one manager.
///
/// Ids are assigned from a counter that starts at zero for every fresh
/// manager and are never reused within it. The counter is not persisted,
/// so ids can repeat across sessions; nothing consults them after replay.
pub type TxId = u32;

/// One staged byte-range write, held in the table until it commits or
/// aborts.
#[derive(Debug, Clone)]
pub(crate) struct Transaction {
    pub id: TxId,
    pub offset: usize,
    /// The bytes previously at `offset`, truncated to the segment's prior
    /// length. Kept in memory only, so abort can revert.
    pub undo: Vec<u8>,
    /// The new bytes the caller supplied.
    pub redo: Vec<u8>,
}

/// Manages a virtual memory segment and the ordered table of uncommitted
/// transactions staged against it.
///
/// The segment grows monotonically: a write past its end extends it,
/// zero-filling any gap, and neither aborts nor writes ever shrink it.
#[derive(Debug)]
pub struct TxnManager {
    next_id: TxId,
    segment: Vec<u8>,
    table: Vec<Transaction>,
}

impl TxnManager {
    /// Create a manager owning `segment` as the file's logical content.
    #[must_use]
    pub fn new(segment: Vec<u8>) -> Self {
        Self { next_id: 0, segment, table: Vec::new() }
    }

    /// Stage a write of `redo` at `offset` and return its transaction id.
    ///
    /// Captures the displaced bytes as undo data, extends the segment if
    /// `offset + redo.len()` passes its end, and applies the new bytes to
    /// the segment immediately. The write is visible to reads from this
    /// session but durable only once committed.
    pub fn create(&mut self, offset: usize, redo: &[u8]) -> TxId {
        let undo_len = redo.len().min(self.segment.len().saturating_sub(offset));
        let undo = if undo_len == 0 {
            Vec::new()
        } else {
            self.segment[offset..offset + undo_len].to_vec()
        };

        let end = offset + redo.len();
        if end > self.segment.len() {
            self.segment.resize(end, 0);
        }
        self.segment[offset..end].copy_from_slice(redo);

        let id = self.next_id;
        self.next_id += 1;
        self.table.push(Transaction { id, offset, undo, redo: redo.to_vec() });
        id
    }

    /// Abort the uncommitted transaction `id`, restoring the bytes it
    /// displaced.
    ///
    /// The segment is not shrunk even if the write had extended it;
    /// growth is monotonic by the same policy as `create`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTransaction`] if no uncommitted transaction
    /// has this id (it was committed, already aborted, or never existed).
    pub fn abort(&mut self, id: TxId) -> Result<()> {
        let txn = self.remove(id).ok_or(Error::UnknownTransaction(id))?;
        self.segment[txn.offset..txn.offset + txn.undo.len()].copy_from_slice(&txn.undo);
        Ok(())
    }

    /// Apply already-committed records to the segment, in order.
    ///
    /// Used when hydrating a segment from the log on open, and by cleanup
    /// against a fresh read of the on-disk file. Resizes once to the
    /// maximum end offset across `records`, then overwrites each range;
    /// the last writer to an overlapping range wins. No undo is captured
    /// and the table is untouched.
    pub fn replay(&mut self, records: &[LogRecord]) {
        let Some(max_end) = records.iter().map(|r| r.offset + r.redo.len()).max() else {
            return;
        };
        if max_end > self.segment.len() {
            self.segment.resize(max_end, 0);
        }
        for record in records {
            self.segment[record.offset..record.offset + record.redo.len()]
                .copy_from_slice(&record.redo);
        }
    }

    /// The segment contents.
    #[must_use]
    pub fn segment(&self) -> &[u8] {
        &self.segment
    }

    /// Consume the manager, returning the segment buffer.
    #[must_use]
    pub fn into_segment(self) -> Vec<u8> {
        self.segment
    }

    /// Find the uncommitted transaction with this id.
    pub(crate) fn find(&self, id: TxId) -> Option<&Transaction> {
        self.table.iter().find(|t| t.id == id)
    }

    /// Remove and return the uncommitted transaction with this id.
    pub(crate) fn remove(&mut self, id: TxId) -> Option<Transaction> {
        let pos = self.table.iter().position(|t| t.id == id)?;
        Some(self.table.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_strictly_increasing() {
        let mut manager = TxnManager::new(vec![0; 16]);
        let a = manager.create(0, b"x");
        let b = manager.create(4, b"y");
        let c = manager.create(8, b"z");
        assert_eq!((a, b, c), (0, 1, 2));
    }

    #[test]
    fn test_create_applies_and_captures_undo() {
        let mut manager = TxnManager::new(b"hello world".to_vec());
        let id = manager.create(6, b"there");
        assert_eq!(manager.segment(), b"hello there");

        manager.abort(id).unwrap();
        assert_eq!(manager.segment(), b"hello world");
    }

    #[test]
    fn test_write_past_end_extends_with_zeros() {
        let mut manager = TxnManager::new(vec![b'a'; 4]);
        manager.create(8, b"tail");
        assert_eq!(manager.segment(), b"aaaa\0\0\0\0tail");
    }

    #[test]
    fn test_undo_truncated_to_prior_length() {
        let mut manager = TxnManager::new(b"abcd".to_vec());
        // Two bytes overlap the old content, four extend past it.
        let id = manager.create(2, b"XXXXXX");
        assert_eq!(manager.segment(), b"abXXXXXX");

        manager.abort(id).unwrap();
        // Only the displaced bytes come back; the segment stays extended.
        assert_eq!(manager.segment(), b"abcdXXXX");
    }

    #[test]
    fn test_abort_unknown_id_fails() {
        let mut manager = TxnManager::new(Vec::new());
        let id = manager.create(0, b"data");
        manager.abort(id).unwrap();
        assert!(matches!(manager.abort(id), Err(Error::UnknownTransaction(_))));
        assert!(matches!(manager.abort(99), Err(Error::UnknownTransaction(99))));
    }

    #[test]
    fn test_replay_resizes_once_and_last_writer_wins() {
        let mut manager = TxnManager::new(Vec::new());
        manager.replay(&[
            LogRecord { id: 0, offset: 0, redo: b"aaaa".to_vec() },
            LogRecord { id: 1, offset: 6, redo: b"bb".to_vec() },
            LogRecord { id: 2, offset: 2, redo: b"cc".to_vec() },
        ]);
        assert_eq!(manager.segment(), b"aacc\0\0bb");
    }

    #[test]
    fn test_replay_empty_is_noop() {
        let mut manager = TxnManager::new(b"keep".to_vec());
        manager.replay(&[]);
        assert_eq!(manager.segment(), b"keep");
    }

    #[test]
    fn test_replay_adds_no_table_entries() {
        let mut manager = TxnManager::new(Vec::new());
        manager.replay(&[LogRecord { id: 0, offset: 0, redo: b"x".to_vec() }]);
        // Replayed records are already committed: nothing to abort.
        assert!(matches!(manager.abort(0), Err(Error::UnknownTransaction(0))));
    }
}
