//! Video block decompression
//!
//! Compressed video blocks are zlib-wrapped deflate streams. The
//! low-level [`flate2::Decompress`] API is used instead of a reader
//! wrapper so two failure modes stay detectable: a stream that never
//! reaches a definite end-of-stream, and trailing garbage after it.
//!
//! The output buffer grows on demand up to the bound implied by the
//! record's video block class (see
//! [`FieldSpec::max_video_block_len`](crate::protocol::FieldSpec::max_video_block_len)),
//! so high-resolution sweeps are never silently truncated to a fixed
//! scratch size.

use flate2::{Decompress, FlushDecompress, Status};

use crate::error::DecodeError;

/// Initial output allocation when the bound is large
const INITIAL_CHUNK: usize = 4096;

/// Inflate one compressed video block.
///
/// `max_len` bounds the plaintext size; exceeding it is an error, not a
/// truncation. Returns the inflated cell bytes.
pub fn inflate_video_block(compressed: &[u8], max_len: usize) -> Result<Vec<u8>, DecodeError> {
    if compressed.is_empty() {
        return Err(DecodeError::Decompression {
            detail: "empty compressed video block".to_string(),
        });
    }

    let mut inflater = Decompress::new(true);
    let mut out: Vec<u8> = Vec::with_capacity(max_len.clamp(1, INITIAL_CHUNK));

    let status = loop {
        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out() as usize;
        let status = inflater
            .decompress_vec(&compressed[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|e| DecodeError::Decompression {
                detail: e.to_string(),
            })?;
        match status {
            Status::StreamEnd => break status,
            Status::Ok | Status::BufError => {
                if out.len() == out.capacity() {
                    if out.len() >= max_len {
                        return Err(DecodeError::Decompression {
                            detail: format!("plaintext exceeds {} byte block bound", max_len),
                        });
                    }
                    let grow = (max_len - out.len()).min(out.capacity().max(INITIAL_CHUNK));
                    out.reserve(grow);
                } else if inflater.total_in() as usize == consumed
                    && inflater.total_out() as usize == produced
                {
                    // No input left, no progress, no end-of-stream marker
                    break status;
                }
            }
        }
    };

    if status != Status::StreamEnd {
        return Err(DecodeError::Decompression {
            detail: "deflate stream ended without end-of-stream marker".to_string(),
        });
    }
    let consumed = inflater.total_in() as usize;
    if consumed < compressed.len() {
        return Err(DecodeError::Decompression {
            detail: format!(
                "{} trailing bytes after end-of-stream",
                compressed.len() - consumed
            ),
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn deflate(plain: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(plain).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_inflate_known_payload() {
        let plain: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
        let compressed = deflate(&plain);
        let out = inflate_video_block(&compressed, 16320).unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn test_truncated_stream_is_rejected() {
        let compressed = deflate(&[0xAAu8; 1024]);
        let cut = &compressed[..compressed.len() - 4];
        let err = inflate_video_block(cut, 16320).unwrap_err();
        assert!(matches!(err, DecodeError::Decompression { .. }));
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        let mut compressed = deflate(&[0x55u8; 64]);
        compressed.extend_from_slice(&[1, 2, 3]);
        let err = inflate_video_block(&compressed, 1020).unwrap_err();
        let DecodeError::Decompression { detail } = err else {
            panic!("wrong error kind");
        };
        assert!(detail.contains("trailing"));
    }

    #[test]
    fn test_corrupt_header_is_rejected() {
        let err = inflate_video_block(&[0xDE, 0xAD, 0xBE, 0xEF], 1020).unwrap_err();
        assert!(matches!(err, DecodeError::Decompression { .. }));
    }

    #[test]
    fn test_block_bound_is_enforced() {
        let compressed = deflate(&[0u8; 2048]);
        let err = inflate_video_block(&compressed, 1020).unwrap_err();
        let DecodeError::Decompression { detail } = err else {
            panic!("wrong error kind");
        };
        assert!(detail.contains("1020"));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(inflate_video_block(&[], 1020).is_err());
    }
}
