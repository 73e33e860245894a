//! Error types for CAT240 decoding

use thiserror::Error;

/// Errors that can occur while decoding a single CAT240 record.
///
/// These are per-message: a session that receives one of these can keep
/// processing subsequent records, the failed message's sweep is simply
/// not rendered.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// First byte of the record is not the CAT240 category octet
    #[error("Not an ASTERIX CAT240 record: expected category 0xF0, got {actual:#04X}")]
    NotAsterix { actual: u8 },

    /// Record is shorter than its declared layout requires
    #[error("Truncated record: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Video cell resolution code outside the set this decoder renders
    #[error("Unsupported video resolution code {code}")]
    UnsupportedResolution { code: u8 },

    /// Compressed video block could not be inflated cleanly
    #[error("Video block decompression failed: {detail}")]
    Decompression { detail: String },

    /// Scan conversion computed a pixel outside the raster.
    /// Should never happen when the raster is at least 2x the sample range.
    #[error("Pixel ({x}, {y}) outside {width}x{height} raster")]
    PixelOutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },
}

/// Errors that can occur while framing records out of a byte stream.
///
/// Unlike [`DecodeError`] these are fatal to the stream: a desynchronized
/// framer has no way to find the next record boundary.
#[derive(Error, Debug)]
pub enum FramingError {
    /// Underlying stream read failed
    #[error("Stream read failed: {0}")]
    Io(#[from] std::io::Error),

    /// Expected a record boundary but the category octet is wrong
    #[error("Stream desynchronized at offset {offset}: expected 0xF0, got {actual:#04X}")]
    Desynchronized { offset: u64, actual: u8 },

    /// Record length field too small to hold even the fixed header
    #[error("Implausible record length {length} at offset {offset}")]
    BadLength { offset: u64, length: usize },

    /// Stream ended in the middle of a record
    #[error("Stream ended mid-record at offset {offset}: expected {expected} bytes, got {actual}")]
    TruncatedRecord {
        offset: u64,
        expected: usize,
        actual: usize,
    },
}

/// Combined error type for the session-level pull pipeline.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl SessionError {
    /// True if the underlying condition is fatal to the whole stream,
    /// false if the caller can keep pulling frames.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Framing(_))
    }
}
