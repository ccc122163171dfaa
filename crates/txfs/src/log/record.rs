//! The persisted redo record and its text codec.

use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::txn::TxId;

/// One committed transaction as persisted in the log.
///
/// This is the durable projection of a staged write: the undo bytes are
/// kept in memory only and are never written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Transaction id, unique within the manager that committed it.
    ///
    /// The id counter is not persisted, so ids may repeat across
    /// sessions; replay never consults them.
    pub id: TxId,
    /// Byte offset of the write within the file.
    pub offset: usize,
    /// The new bytes imposed on `[offset, offset + redo.len())`.
    pub redo: Vec<u8>,
}

/// Outcome of parsing one decimal field from the stream.
enum Field {
    /// A value followed by its consumed separator byte.
    Value(u64),
    /// Clean EOF before any byte of the field.
    Eof,
    /// EOF or a malformed byte inside the field.
    Torn,
}

impl LogRecord {
    /// Encode this record onto a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    pub fn encode_to(&self, writer: &mut impl Write) -> io::Result<()> {
        write!(writer, "{} {} {} ", self.id, self.offset, self.redo.len())?;
        writer.write_all(&self.redo)
    }

    /// Decode the next record from a reader.
    ///
    /// Returns `Ok(None)` at clean end-of-stream. A record torn by EOF
    /// (or a corrupt length field) also ends the stream: the partial
    /// record is dropped with a warning, matching the tolerance the
    /// format allows for a crash mid-append.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    pub fn decode_from(reader: &mut impl BufRead) -> io::Result<Option<Self>> {
        let id = match read_field(reader)? {
            Field::Value(v) => v,
            Field::Eof => return Ok(None),
            Field::Torn => {
                warn!("torn record id at log tail, dropping");
                return Ok(None);
            }
        };
        let Field::Value(offset) = read_field(reader)? else {
            warn!(id, "torn record offset at log tail, dropping");
            return Ok(None);
        };
        let Field::Value(redo_len) = read_field(reader)? else {
            warn!(id, "torn record length at log tail, dropping");
            return Ok(None);
        };

        let mut redo = vec![0u8; redo_len as usize];
        match reader.read_exact(&mut redo) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(id, redo_len, "torn record payload at log tail, dropping");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        Ok(Some(Self { id: id as TxId, offset: offset as usize, redo }))
    }
}

/// Parse one unsigned decimal field.
///
/// Consumes digits up to and including the single separator byte that
/// terminates the field. The payload that follows a length field is raw,
/// so the separator is whatever single byte sits after the digits.
fn read_field(reader: &mut impl BufRead) -> io::Result<Field> {
    let mut value: u64 = 0;
    let mut digits = 0usize;
    loop {
        let mut byte = [0u8; 1];
        match reader.read_exact(&mut byte) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok(if digits == 0 { Field::Eof } else { Field::Torn });
            }
            Err(e) => return Err(e),
        }
        if byte[0].is_ascii_digit() {
            value = match value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(byte[0] - b'0')))
            {
                Some(v) => v,
                None => return Ok(Field::Torn),
            };
            digits += 1;
        } else if digits == 0 {
            // A field that starts with a non-digit is not a record.
            return Ok(Field::Torn);
        } else {
            return Ok(Field::Value(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn encode(record: &LogRecord) -> Vec<u8> {
        let mut buf = Vec::new();
        record.encode_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_encode_layout() {
        let record = LogRecord { id: 3, offset: 10, redo: b"abc".to_vec() };
        assert_eq!(encode(&record), b"3 10 3 abc");
    }

    #[test]
    fn test_round_trip_binary_payload() {
        // Payloads may contain separators, newlines, and NULs.
        let record = LogRecord { id: 7, offset: 0, redo: b"a \n\0 b 12".to_vec() };
        let buf = encode(&record);
        let decoded = LogRecord::decode_from(&mut Cursor::new(buf)).unwrap().unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_empty_payload() {
        let record = LogRecord { id: 0, offset: 42, redo: Vec::new() };
        let buf = encode(&record);
        assert_eq!(buf, b"0 42 0 ");
        let decoded = LogRecord::decode_from(&mut Cursor::new(buf)).unwrap().unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_concatenated_records() {
        let first = LogRecord { id: 0, offset: 0, redo: b"hello world".to_vec() };
        let second = LogRecord { id: 1, offset: 100, redo: b"\x01\x02".to_vec() };
        let mut buf = encode(&first);
        buf.extend_from_slice(&encode(&second));

        let mut cursor = Cursor::new(buf);
        assert_eq!(LogRecord::decode_from(&mut cursor).unwrap().unwrap(), first);
        assert_eq!(LogRecord::decode_from(&mut cursor).unwrap().unwrap(), second);
        assert!(LogRecord::decode_from(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_torn_payload_dropped() {
        let record = LogRecord { id: 5, offset: 8, redo: b"0123456789".to_vec() };
        let mut buf = encode(&record);
        buf.truncate(buf.len() - 4);
        assert!(LogRecord::decode_from(&mut Cursor::new(buf)).unwrap().is_none());
    }

    #[test]
    fn test_torn_header_dropped() {
        // EOF between the digits of the offset field.
        let mut cursor = Cursor::new(b"12 34".to_vec());
        assert!(LogRecord::decode_from(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_empty_stream() {
        assert!(LogRecord::decode_from(&mut Cursor::new(Vec::new())).unwrap().is_none());
    }
}
