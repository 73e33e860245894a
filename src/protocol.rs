//! ASTERIX Category 240 wire protocol parsing
//!
//! This module contains pure parsing and encoding for CAT240 records.
//! No I/O operations - just `&[u8]` → `Result<T>` functions.
//!
//! A CAT240 record is length-prefixed and big-endian throughout. Two
//! message types exist on the wire: Video Summary (0x01) and Video
//! Message (0x02). Only Video Messages carry radar video; everything
//! else is classified and skipped, never treated as an error.

use bitflags::bitflags;

use crate::error::DecodeError;

// =============================================================================
// Constants
// =============================================================================

/// ASTERIX category octet, first byte of every CAT240 record
pub const CAT240_CATEGORY: u8 = 0xF0;

/// Message type for a Video Summary record (I240/030)
pub const MESSAGE_TYPE_SUMMARY: u8 = 0x01;

/// Message type for a Video Message record (I240/040 and friends)
pub const MESSAGE_TYPE_VIDEO: u8 = 0x02;

/// Fixed header available for stream lookahead:
/// category(1) + length(2) + fspec(2) + datasource(2) + msgtype(1)
pub const LOOKAHEAD_LEN: usize = 8;

/// Offset of the video cell data within a Video Message record
pub const VIDEO_DATA_OFFSET: usize = 32;

/// Trailing time-of-day field length
pub const TIME_OF_DAY_LEN: usize = 3;

/// Smallest well-formed Video Message record (empty video block)
pub const MIN_VIDEO_RECORD_LEN: usize = VIDEO_DATA_OFFSET + TIME_OF_DAY_LEN;

/// Azimuth is a 16-bit fraction of a full turn
pub const AZIMUTH_UNITS: u32 = 1 << 16;

/// Time of day counts in units of 1/128 second
pub const TIME_OF_DAY_HZ: u32 = 128;

/// Time of day is a rolling 24-bit counter
pub const TIME_OF_DAY_MODULUS: u32 = 1 << 24;

bitflags! {
    /// FSPEC presence bitmap, first two octets of the field specification.
    ///
    /// Bits follow the CAT240 UAP order, MSB first. The decoder only
    /// checks presence; field offsets are taken from the fixed Video
    /// Message layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FieldSpec: u16 {
        const DATA_SOURCE       = 0x8000; // I240/010
        const MESSAGE_TYPE      = 0x4000; // I240/000
        const VIDEO_HEADER      = 0x2000; // I240/020 message sequence id
        const VIDEO_SUMMARY     = 0x1000; // I240/030
        const VIDEO_NANO        = 0x0800; // I240/040 nanosecond cell duration
        const VIDEO_FEMTO       = 0x0400; // I240/041 femtosecond cell duration
        const CELL_RESOLUTION   = 0x0200; // I240/048
        const FX1               = 0x0100;
        const CELL_COUNTS       = 0x0080; // I240/049
        const BLOCK_LOW_VOLUME  = 0x0040; // I240/050
        const BLOCK_MED_VOLUME  = 0x0020; // I240/051
        const BLOCK_HIGH_VOLUME = 0x0010; // I240/052
        const TIME_OF_DAY       = 0x0008; // I240/140
        const FX2               = 0x0001;
    }
}

impl FieldSpec {
    /// Upper bound on the inflated video block size, implied by which
    /// video block data item is present (low/medium/high data volume
    /// carry at most 1020/16320/65024 octets per the standard).
    pub fn max_video_block_len(&self) -> usize {
        if self.contains(FieldSpec::BLOCK_HIGH_VOLUME) {
            65024
        } else if self.contains(FieldSpec::BLOCK_MED_VOLUME) {
            16320
        } else if self.contains(FieldSpec::BLOCK_LOW_VOLUME) {
            1020
        } else {
            // No block item flagged; assume the largest class
            65024
        }
    }
}

// =============================================================================
// Video Cell Resolution
// =============================================================================

/// Video cell resolution (I240/048 low octet), codes 1-6.
///
/// Only [`LowRes`](Resolution::LowRes) and [`HighRes`](Resolution::HighRes)
/// are rendered; the remaining codes are recognized so they surface as an
/// explicit [`DecodeError::UnsupportedResolution`] instead of a silent
/// no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Code 1: 1 bit per cell
    Monobit,
    /// Code 2: 2 bits per cell
    LowRes,
    /// Code 3: 4 bits per cell
    MediumRes,
    /// Code 4: 8 bits per cell
    HighRes,
    /// Code 5: 16 bits per cell
    VeryHighRes,
    /// Code 6: 32 bits per cell
    UltraHighRes,
}

impl Resolution {
    /// Parse a resolution code from the wire
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Resolution::Monobit),
            2 => Some(Resolution::LowRes),
            3 => Some(Resolution::MediumRes),
            4 => Some(Resolution::HighRes),
            5 => Some(Resolution::VeryHighRes),
            6 => Some(Resolution::UltraHighRes),
            _ => None,
        }
    }

    /// Wire code for this resolution
    pub fn code(&self) -> u8 {
        match self {
            Resolution::Monobit => 1,
            Resolution::LowRes => 2,
            Resolution::MediumRes => 3,
            Resolution::HighRes => 4,
            Resolution::VeryHighRes => 5,
            Resolution::UltraHighRes => 6,
        }
    }

    /// Nominal bits per video cell
    pub fn bits_per_cell(&self) -> u32 {
        match self {
            Resolution::Monobit => 1,
            Resolution::LowRes => 2,
            Resolution::MediumRes => 4,
            Resolution::HighRes => 8,
            Resolution::VeryHighRes => 16,
            Resolution::UltraHighRes => 32,
        }
    }

    /// True for the resolutions this decoder rasterizes, one intensity
    /// octet per video block octet.
    pub fn is_rendered(&self) -> bool {
        matches!(self, Resolution::LowRes | Resolution::HighRes)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Monobit => "monobit",
            Resolution::LowRes => "low",
            Resolution::MediumRes => "medium",
            Resolution::HighRes => "high",
            Resolution::VeryHighRes => "very high",
            Resolution::UltraHighRes => "ultra high",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Video Message
// =============================================================================

/// One parsed CAT240 Video Message.
///
/// `video_data` borrows from the record it was parsed out of; the cell
/// bytes are only copied if they have to pass through decompression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMessage<'a> {
    /// Declared record length, header included
    pub length: u16,
    /// Field specification presence bitmap
    pub field_spec: FieldSpec,
    /// Data source identifier (SAC in the high byte, SIC in the low)
    pub data_source: u16,
    /// Message sequence identifier (I240/020)
    pub sequence_id: u32,
    /// Sweep start azimuth in 1/65536 of a turn
    pub start_azimuth: u16,
    /// Sweep end azimuth in 1/65536 of a turn
    pub end_azimuth: u16,
    /// Range of the first cell
    pub start_range: u32,
    /// Cell duration (nano- or femtoseconds per I240/040 vs /041)
    pub cell_duration: u32,
    /// Video block is deflate-compressed
    pub compressed: bool,
    /// Raw video cell resolution code (1-6)
    pub resolution_code: u8,
    /// Valid octets in the video block
    pub video_block_len: u16,
    /// Number of video cells in the sweep (24-bit on the wire)
    pub cell_count: u32,
    /// Cells packed per octet at this resolution (repetition factor)
    pub cells_per_byte: u8,
    /// Video cell data, possibly compressed
    pub video_data: &'a [u8],
    /// Rolling 24-bit time of day, 1/128 s units
    pub time_of_day: u32,
}

impl<'a> VideoMessage<'a> {
    /// System area code half of the data source identifier
    pub fn sac(&self) -> u8 {
        (self.data_source >> 8) as u8
    }

    /// System identification code half of the data source identifier
    pub fn sic(&self) -> u8 {
        self.data_source as u8
    }

    /// Angular width of this sweep in azimuth units.
    ///
    /// Wrapping subtraction handles sweeps that cross azimuth zero, so
    /// the result is invariant under rotation of both endpoints.
    pub fn sweep_width(&self) -> u16 {
        sweep_width(self.start_azimuth, self.end_azimuth)
    }

    /// Resolution code decoded to the closed enum, if valid
    pub fn resolution(&self) -> Result<Resolution, DecodeError> {
        Resolution::from_code(self.resolution_code).ok_or(DecodeError::UnsupportedResolution {
            code: self.resolution_code,
        })
    }

    /// Serialize back to wire format.
    ///
    /// The length field is recomputed from the video block, so
    /// `parse_record(&msg.encode())` round-trips every field.
    pub fn encode(&self) -> Vec<u8> {
        let length = (MIN_VIDEO_RECORD_LEN + self.video_data.len()) as u16;
        let mut out = Vec::with_capacity(length as usize);
        out.push(CAT240_CATEGORY);
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&self.field_spec.bits().to_be_bytes());
        out.extend_from_slice(&self.data_source.to_be_bytes());
        out.push(MESSAGE_TYPE_VIDEO);
        out.extend_from_slice(&self.sequence_id.to_be_bytes());
        out.extend_from_slice(&self.start_azimuth.to_be_bytes());
        out.extend_from_slice(&self.end_azimuth.to_be_bytes());
        out.extend_from_slice(&self.start_range.to_be_bytes());
        out.extend_from_slice(&self.cell_duration.to_be_bytes());
        let res_comp =
            (self.resolution_code as u16) | if self.compressed { 0x8000 } else { 0x0000 };
        out.extend_from_slice(&res_comp.to_be_bytes());
        out.extend_from_slice(&(self.video_data.len() as u16).to_be_bytes());
        out.extend_from_slice(&write_u24(self.cell_count));
        out.push(self.cells_per_byte);
        out.extend_from_slice(self.video_data);
        out.extend_from_slice(&write_u24(self.time_of_day));
        out
    }
}

/// Angular width `(end - start + 2^16) mod 2^16` of a sweep
pub fn sweep_width(start_azimuth: u16, end_azimuth: u16) -> u16 {
    end_azimuth.wrapping_sub(start_azimuth)
}

// =============================================================================
// Record Parsing
// =============================================================================

/// Outcome of parsing one CAT240 record.
///
/// Non-video records are valid on the wire; callers skip them and keep
/// scanning. Keeping them out of the error type means they can never be
/// conflated with a truncated or corrupt record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record<'a> {
    /// A Video Message, fully parsed
    Video(VideoMessage<'a>),
    /// Some other CAT240 message (e.g. Video Summary); skip `length` bytes
    Other { message_type: u8, length: u16 },
}

/// Parse one CAT240 record from `buf`.
///
/// `buf` must start at a record boundary and contain at least the whole
/// record (the framer guarantees both). Pure function; the returned
/// message borrows its video data from `buf`.
pub fn parse_record(buf: &[u8]) -> Result<Record<'_>, DecodeError> {
    if buf.len() < LOOKAHEAD_LEN {
        return Err(DecodeError::Truncated {
            expected: LOOKAHEAD_LEN,
            actual: buf.len(),
        });
    }
    if buf[0] != CAT240_CATEGORY {
        return Err(DecodeError::NotAsterix { actual: buf[0] });
    }

    let length = u16::from_be_bytes([buf[1], buf[2]]);
    if (length as usize) < LOOKAHEAD_LEN {
        return Err(DecodeError::Truncated {
            expected: LOOKAHEAD_LEN,
            actual: length as usize,
        });
    }
    if buf.len() < length as usize {
        return Err(DecodeError::Truncated {
            expected: length as usize,
            actual: buf.len(),
        });
    }
    let record = &buf[..length as usize];

    let message_type = record[7];
    if message_type != MESSAGE_TYPE_VIDEO {
        return Ok(Record::Other {
            message_type,
            length,
        });
    }

    if (length as usize) < MIN_VIDEO_RECORD_LEN {
        return Err(DecodeError::Truncated {
            expected: MIN_VIDEO_RECORD_LEN,
            actual: length as usize,
        });
    }

    let video_block_len = u16::from_be_bytes([record[26], record[27]]) as usize;
    // Video data plus the 3-byte time-of-day trailer must fit the record
    let expected = VIDEO_DATA_OFFSET + video_block_len + TIME_OF_DAY_LEN;
    if expected > length as usize {
        return Err(DecodeError::Truncated {
            expected,
            actual: length as usize,
        });
    }

    let res_comp = u16::from_be_bytes([record[24], record[25]]);
    let tod_offset = length as usize - TIME_OF_DAY_LEN;

    Ok(Record::Video(VideoMessage {
        length,
        field_spec: FieldSpec::from_bits_retain(u16::from_be_bytes([record[3], record[4]])),
        data_source: u16::from_be_bytes([record[5], record[6]]),
        sequence_id: u32::from_be_bytes([record[8], record[9], record[10], record[11]]),
        start_azimuth: u16::from_be_bytes([record[12], record[13]]),
        end_azimuth: u16::from_be_bytes([record[14], record[15]]),
        start_range: u32::from_be_bytes([record[16], record[17], record[18], record[19]]),
        cell_duration: u32::from_be_bytes([record[20], record[21], record[22], record[23]]),
        compressed: res_comp & 0x8000 != 0,
        resolution_code: res_comp as u8,
        video_block_len: video_block_len as u16,
        cell_count: read_u24(&record[28..31]),
        cells_per_byte: record[31],
        video_data: &record[VIDEO_DATA_OFFSET..VIDEO_DATA_OFFSET + video_block_len],
        time_of_day: read_u24(&record[tod_offset..tod_offset + TIME_OF_DAY_LEN]),
    }))
}

fn read_u24(b: &[u8]) -> u32 {
    (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32
}

fn write_u24(v: u32) -> [u8; 3] {
    [(v >> 16) as u8, (v >> 8) as u8, v as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message(video_data: &[u8]) -> VideoMessage<'_> {
        VideoMessage {
            length: (MIN_VIDEO_RECORD_LEN + video_data.len()) as u16,
            field_spec: FieldSpec::DATA_SOURCE
                | FieldSpec::MESSAGE_TYPE
                | FieldSpec::VIDEO_HEADER
                | FieldSpec::VIDEO_NANO
                | FieldSpec::CELL_RESOLUTION
                | FieldSpec::FX1
                | FieldSpec::CELL_COUNTS
                | FieldSpec::BLOCK_LOW_VOLUME
                | FieldSpec::TIME_OF_DAY,
            data_source: 0x1907,
            sequence_id: 42,
            start_azimuth: 0x0000,
            end_azimuth: 0x0010,
            start_range: 0,
            cell_duration: 1000,
            compressed: false,
            resolution_code: 2,
            video_block_len: video_data.len() as u16,
            cell_count: video_data.len() as u32,
            cells_per_byte: 1,
            video_data,
            time_of_day: 0x123456,
        }
    }

    #[test]
    fn test_round_trip_all_fields() {
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let msg = sample_message(&data);
        let wire = msg.encode();
        assert_eq!(wire.len(), 44);
        assert_eq!(wire[0], CAT240_CATEGORY);

        match parse_record(&wire).unwrap() {
            Record::Video(parsed) => assert_eq!(parsed, msg),
            Record::Other { .. } => panic!("round trip lost the video message"),
        }
    }

    #[test]
    fn test_scenario_44_byte_record() {
        // F0 00 2C ..., length 44, type 0x02, az 0x0000..0x0010, res 2
        let data = [9u8; 8];
        let wire = sample_message(&data).encode();
        assert_eq!(&wire[..3], &[0xF0, 0x00, 0x2C]);
        assert_eq!(wire[7], MESSAGE_TYPE_VIDEO);

        let Record::Video(msg) = parse_record(&wire).unwrap() else {
            panic!("expected video message");
        };
        assert_eq!(msg.sweep_width(), 16);
        assert_eq!(msg.video_data, &data);
        assert!(!msg.compressed);
        assert_eq!(msg.resolution().unwrap(), Resolution::LowRes);
    }

    #[test]
    fn test_other_message_type_is_not_an_error() {
        let mut wire = sample_message(&[0u8; 8]).encode();
        wire[7] = MESSAGE_TYPE_SUMMARY;
        match parse_record(&wire).unwrap() {
            Record::Other {
                message_type,
                length,
            } => {
                assert_eq!(message_type, MESSAGE_TYPE_SUMMARY);
                assert_eq!(length, 44);
            }
            Record::Video(_) => panic!("summary parsed as video"),
        }
    }

    #[test]
    fn test_wrong_category_byte() {
        let mut wire = sample_message(&[0u8; 8]).encode();
        wire[0] = 0xF1;
        assert!(matches!(
            parse_record(&wire),
            Err(DecodeError::NotAsterix { actual: 0xF1 })
        ));
    }

    #[test]
    fn test_video_block_overrunning_record_is_truncated() {
        let mut wire = sample_message(&[0u8; 8]).encode();
        // Claim more video bytes than the record can hold
        wire[26..28].copy_from_slice(&100u16.to_be_bytes());
        assert!(matches!(
            parse_record(&wire),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_short_buffer_is_truncated_not_conflated() {
        let wire = sample_message(&[0u8; 8]).encode();
        assert!(matches!(
            parse_record(&wire[..20]),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_sweep_width_rotation_invariant() {
        for k in [0u16, 1, 100, 0x7FFF, 0x8000, 0xFFFF] {
            let (start, end) = (0xFFF0u16, 0x0010u16);
            assert_eq!(
                sweep_width(start, end),
                sweep_width(start.wrapping_add(k), end.wrapping_add(k))
            );
        }
        assert_eq!(sweep_width(0xFFF0, 0x0010), 0x20);
        assert_eq!(sweep_width(0, 0), 0);
    }

    #[test]
    fn test_sac_sic_split() {
        let msg = sample_message(&[]);
        assert_eq!(msg.sac(), 0x19);
        assert_eq!(msg.sic(), 0x07);
    }

    #[test]
    fn test_resolution_codes() {
        assert_eq!(Resolution::from_code(0), None);
        assert_eq!(Resolution::from_code(7), None);
        for code in 1..=6u8 {
            let res = Resolution::from_code(code).unwrap();
            assert_eq!(res.code(), code);
        }
        assert!(Resolution::LowRes.is_rendered());
        assert!(Resolution::HighRes.is_rendered());
        assert!(!Resolution::Monobit.is_rendered());
        assert_eq!(Resolution::HighRes.bits_per_cell(), 8);
    }

    #[test]
    fn test_block_volume_bounds() {
        assert_eq!(FieldSpec::BLOCK_LOW_VOLUME.max_video_block_len(), 1020);
        assert_eq!(FieldSpec::BLOCK_MED_VOLUME.max_video_block_len(), 16320);
        assert_eq!(FieldSpec::BLOCK_HIGH_VOLUME.max_video_block_len(), 65024);
        assert_eq!(FieldSpec::empty().max_video_block_len(), 65024);
    }
}
