//! # cat240
//!
//! Platform-independent decoder for EUROCONTROL ASTERIX Category 240
//! "Radar Video" streams.
//!
//! This crate contains pure parsing and rasterization logic with **zero
//! I/O framework dependencies**: records come in as byte slices (or any
//! [`std::io::Read`] through the framer) and frames leave as plain pixel
//! buffers, so it embeds equally well in a media framework plugin, a
//! native server, or WASM.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  cat240 (platform-independent, no async deps)                  │
//! │  ├── framing/    (record boundaries out of a byte stream)      │
//! │  ├── protocol/   (wire format parsing & encoding)              │
//! │  ├── decompress/ (deflate-compressed video blocks)             │
//! │  ├── scan/       (polar → raster sweep conversion)             │
//! │  ├── assembler/  (rotation tracking, frame delivery policy)    │
//! │  ├── timing/     (rolling time-of-day → presentation ticks)    │
//! │  └── session/    (the pipeline gluing the above together)      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Modules
//!
//! - [`protocol`] - CAT240 record parsing and encoding
//! - [`framing`] - record framer over any byte stream, plus a content probe
//! - [`decompress`] - compressed video block inflation
//! - [`scan`] - PPI circle / diagnostic square scan conversion
//! - [`assembler`] - keyframe detection and delivery policy
//! - [`timing`] - monotonic presentation timestamp synthesis
//! - [`session`] - per-stream decode pipeline
//!
//! ## Example: Decoding a Stream
//!
//! ```rust,no_run
//! use cat240::{DecodeSession, DecoderConfig, StreamFramer};
//!
//! let file = std::fs::File::open("radar.cat240").unwrap();
//! let mut framer = StreamFramer::new(std::io::BufReader::new(file));
//! let mut session = DecodeSession::new(DecoderConfig::default());
//!
//! while let Some(frame) = session.next_frame(&mut framer).unwrap() {
//!     println!(
//!         "frame pts {} ({}x{}, keyframe: {})",
//!         frame.pts, frame.width, frame.height, frame.keyframe
//!     );
//! }
//! ```
//!
//! ## Example: Parsing a Single Record
//!
//! ```rust,no_run
//! use cat240::protocol::{parse_record, Record};
//!
//! let record: &[u8] = &[/* one framed record */];
//! match parse_record(record) {
//!     Ok(Record::Video(msg)) => {
//!         println!("sweep {} -> {}", msg.start_azimuth, msg.end_azimuth)
//!     }
//!     Ok(Record::Other { message_type, .. }) => {
//!         println!("skipping type {:#04X}", message_type)
//!     }
//!     Err(e) => eprintln!("bad record: {}", e),
//! }
//! ```

pub mod assembler;
pub mod decompress;
pub mod error;
pub mod framing;
pub mod protocol;
pub mod scan;
pub mod session;
pub mod timing;

// Re-export commonly used types
pub use assembler::{ClearPolicy, DeliveryMode, ScanAssembler, ScanPhase};
pub use error::{DecodeError, FramingError, SessionError};
pub use framing::{probe, StreamFramer, PROBE_SCORE_MAX};
pub use protocol::{parse_record, FieldSpec, Record, Resolution, VideoMessage};
pub use scan::{draw_sweep, PixelFormat, Projection, Raster};
pub use session::{DecodeSession, DecoderConfig, SessionStats, VideoFrame};
pub use timing::{TimeBase, Timestamps};
