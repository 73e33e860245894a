//! Record framing over a byte stream
//!
//! CAT240 streams are back-to-back length-prefixed records with no
//! container framing of their own. [`StreamFramer`] pulls one record at
//! a time out of any [`std::io::Read`]: it reads the 8-byte fixed
//! header (category, length, field spec, data source, message type),
//! validates the boundary, then completes the record from the declared
//! length. The header stays at the front of the returned record, so no
//! backward seek is ever required of the underlying stream.
//!
//! A wrong category octet at a record boundary means the stream is
//! desynchronized; there is no resynchronization marker to hunt for, so
//! that is fatal to the session.

use std::io::Read;

use crate::error::FramingError;
use crate::protocol::{CAT240_CATEGORY, LOOKAHEAD_LEN, MESSAGE_TYPE_SUMMARY, MESSAGE_TYPE_VIDEO};

/// Pulls whole CAT240 records out of a byte stream.
pub struct StreamFramer<R> {
    inner: R,
    /// Byte offset of the next record boundary, for error context
    offset: u64,
}

impl<R: Read> StreamFramer<R> {
    pub fn new(inner: R) -> Self {
        StreamFramer { inner, offset: 0 }
    }

    /// Stream offset of the next unread record boundary
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Consume the framer, returning the underlying stream
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read the next whole record.
    ///
    /// Returns `Ok(None)` on a clean end of stream (EOF exactly at a
    /// record boundary). EOF inside a record, a bad category octet, or
    /// an implausible length are [`FramingError`]s.
    pub fn next_record(&mut self) -> Result<Option<Vec<u8>>, FramingError> {
        let mut header = [0u8; LOOKAHEAD_LEN];
        let got = read_fully(&mut self.inner, &mut header)?;
        if got == 0 {
            return Ok(None);
        }
        if got < LOOKAHEAD_LEN {
            return Err(FramingError::TruncatedRecord {
                offset: self.offset,
                expected: LOOKAHEAD_LEN,
                actual: got,
            });
        }

        if header[0] != CAT240_CATEGORY {
            return Err(FramingError::Desynchronized {
                offset: self.offset,
                actual: header[0],
            });
        }
        let length = u16::from_be_bytes([header[1], header[2]]) as usize;
        if length < LOOKAHEAD_LEN {
            return Err(FramingError::BadLength {
                offset: self.offset,
                length,
            });
        }

        let mut record = vec![0u8; length];
        record[..LOOKAHEAD_LEN].copy_from_slice(&header);
        let got = read_fully(&mut self.inner, &mut record[LOOKAHEAD_LEN..])?;
        if got < length - LOOKAHEAD_LEN {
            return Err(FramingError::TruncatedRecord {
                offset: self.offset,
                expected: length,
                actual: LOOKAHEAD_LEN + got,
            });
        }

        log::trace!(
            "record at offset {}: type {:#04X}, {} bytes",
            self.offset,
            record[7],
            length
        );
        self.offset += length as u64;
        Ok(Some(record))
    }
}

/// Read until `buf` is full or EOF; returns bytes read
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

// =============================================================================
// Content Probe
// =============================================================================

/// Maximum confidence returned by [`probe`]
pub const PROBE_SCORE_MAX: u8 = 100;

/// Score how likely `buf` is the start of a CAT240 stream, 0-100.
///
/// Walks leading records checking the category octet, a plausible
/// length, and a known message type. Two or more well-formed records
/// give full confidence; one gives half. Content-based, so it works
/// regardless of filename.
pub fn probe(buf: &[u8]) -> u8 {
    let mut pos = 0usize;
    let mut valid = 0u32;

    while pos + LOOKAHEAD_LEN <= buf.len() && valid < 4 {
        if buf[pos] != CAT240_CATEGORY {
            break;
        }
        let length = u16::from_be_bytes([buf[pos + 1], buf[pos + 2]]) as usize;
        if length < LOOKAHEAD_LEN {
            break;
        }
        let message_type = buf[pos + 7];
        if message_type != MESSAGE_TYPE_VIDEO && message_type != MESSAGE_TYPE_SUMMARY {
            break;
        }
        // A record running past the buffer still counts: the buffer is
        // only a prefix of the stream
        valid += 1;
        pos += length;
    }

    match valid {
        0 => 0,
        1 => PROBE_SCORE_MAX / 2,
        _ => PROBE_SCORE_MAX,
    }
}
