//! Decode session - the message-to-frame pipeline
//!
//! One [`DecodeSession`] per stream. Each record is parsed, its video
//! block inflated if compressed, the sweep scan-converted into the
//! session raster, and the configured delivery policy decides whether
//! the accumulated raster leaves as a [`VideoFrame`].
//!
//! ```text
//! StreamFramer → parse_record → inflate_video_block → draw_sweep
//!                        │                                 │
//!                        ▼                                 ▼
//!                   TimeBase ──────────────────────► ScanAssembler ─► VideoFrame
//! ```
//!
//! The pipeline is synchronous and pull-based: one message is fully
//! processed before the next is requested. Per-message failures
//! (decompression, unsupported resolution) are returned to the caller
//! but leave the session valid, so decoding continues with the next
//! record.

use std::borrow::Cow;
use std::io::Read;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::assembler::{ClearPolicy, DeliveryMode, ScanAssembler};
use crate::decompress::inflate_video_block;
use crate::error::{DecodeError, SessionError};
use crate::framing::StreamFramer;
use crate::protocol::{parse_record, Record, VideoMessage};
use crate::scan::{draw_sweep, PixelFormat, Projection, Raster};
use crate::timing::{TimeBase, Timestamps};

// =============================================================================
// Configuration
// =============================================================================

/// Session configuration.
///
/// Defaults: a 1024x1024 RGBA PPI circle at 25 ticks per second,
/// raster carried forward between scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecoderConfig {
    pub width: usize,
    pub height: usize,
    pub pixel_format: PixelFormat,
    pub projection: Projection,
    pub delivery: DeliveryMode,
    pub clear_policy: ClearPolicy,
    /// Presentation ticks per second for rate-mode delivery
    pub ticks_per_second: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            width: 1024,
            height: 1024,
            pixel_format: PixelFormat::Rgba32,
            projection: Projection::Circle,
            delivery: DeliveryMode::RateTicks,
            clear_policy: ClearPolicy::Never,
            ticks_per_second: 25,
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// One delivered raster frame.
///
/// Carries its own copy of the pixel bytes, so the session is free to
/// keep accumulating the next scan while the caller holds this.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: usize,
    pub height: usize,
    pub pixel_format: PixelFormat,
    pub pixels: Vec<u8>,
    /// Presentation tick
    pub pts: u64,
    /// Decode tick; always equal to `pts` in this format
    pub dts: u64,
    /// Ticks until the next frame; zero only in scan-complete mode
    pub duration: u64,
    /// Frame closed a full rotation
    pub keyframe: bool,
}

/// Serializable session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub records_seen: u64,
    pub video_messages: u64,
    pub other_messages: u64,
    pub sweeps_rendered: u64,
    pub sweeps_skipped: u64,
    pub frames_delivered: u64,
    pub scans_completed: u64,
}

// =============================================================================
// Session
// =============================================================================

/// Per-stream decoding state: raster, scan assembly, presentation clock.
pub struct DecodeSession {
    config: DecoderConfig,
    raster: Raster,
    assembler: ScanAssembler,
    time_base: TimeBase,
    stats: SessionStats,
}

impl DecodeSession {
    pub fn new(config: DecoderConfig) -> Self {
        let raster = Raster::new(config.width, config.height, config.pixel_format);
        let time_base = TimeBase::new(config.ticks_per_second);
        DecodeSession {
            config,
            raster,
            assembler: ScanAssembler::new(),
            time_base,
            stats: SessionStats::default(),
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// The raster being accumulated, for inspection
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// Process one whole record, as produced by [`StreamFramer`].
    ///
    /// Returns a frame when the delivery policy fires. A returned error
    /// means this message contributed nothing to the raster; the
    /// session remains valid for subsequent records.
    pub fn process_record(&mut self, record: &[u8]) -> Result<Option<VideoFrame>, DecodeError> {
        self.stats.records_seen += 1;
        let msg = match parse_record(record)? {
            Record::Other {
                message_type,
                length,
            } => {
                self.stats.other_messages += 1;
                trace!("skipping message type {:#04X} ({} bytes)", message_type, length);
                return Ok(None);
            }
            Record::Video(msg) => msg,
        };
        self.stats.video_messages += 1;

        let ts = self.time_base.advance(msg.time_of_day);
        let keyframe = self.assembler.observe_sweep(msg.start_azimuth);
        if keyframe {
            self.stats.scans_completed += 1;
        }

        // A keyframe message opens the next rotation, so in
        // scan-complete mode the accumulated raster is snapshotted
        // before this sweep is drawn into it.
        let mut pending = None;
        if self.config.delivery == DeliveryMode::ScanComplete
            && self
                .assembler
                .should_deliver(DeliveryMode::ScanComplete, keyframe, ts.duration)
        {
            pending = Some(self.snapshot_frame(ts, true));
            if self.config.clear_policy == ClearPolicy::PerScan {
                self.raster.clear();
            }
        }

        if let Err(e) = self.render_sweep(&msg) {
            self.stats.sweeps_skipped += 1;
            match pending {
                // A completed scan is ready; hand it over and report the
                // failed sweep through the log and counters instead of
                // dropping the frame.
                Some(frame) => {
                    warn!("sweep {} not rendered: {}", msg.sequence_id, e);
                    self.stats.frames_delivered += 1;
                    return Ok(Some(frame));
                }
                None => return Err(e),
            }
        }
        self.stats.sweeps_rendered += 1;

        let frame = match self.config.delivery {
            DeliveryMode::ScanComplete => pending,
            DeliveryMode::RateTicks => {
                if self
                    .assembler
                    .should_deliver(DeliveryMode::RateTicks, keyframe, ts.duration)
                {
                    Some(self.snapshot_frame(ts, keyframe))
                } else {
                    None
                }
            }
        };

        if let Some(frame) = &frame {
            self.stats.frames_delivered += 1;
            debug!(
                "frame delivered: pts {} duration {} keyframe {}",
                frame.pts, frame.duration, frame.keyframe
            );
        }
        Ok(frame)
    }

    /// Pull records from `framer` until a frame is delivered.
    ///
    /// `Ok(None)` means a clean end of stream. A [`DecodeError`] leaves
    /// the session and framer usable; a [`FramingError`] does not.
    ///
    /// [`FramingError`]: crate::error::FramingError
    pub fn next_frame<R: Read>(
        &mut self,
        framer: &mut StreamFramer<R>,
    ) -> Result<Option<VideoFrame>, SessionError> {
        loop {
            let Some(record) = framer.next_record()? else {
                return Ok(None);
            };
            if let Some(frame) = self.process_record(&record)? {
                return Ok(Some(frame));
            }
        }
    }

    fn render_sweep(&mut self, msg: &VideoMessage<'_>) -> Result<(), DecodeError> {
        let resolution = msg.resolution()?;
        if !resolution.is_rendered() {
            return Err(DecodeError::UnsupportedResolution {
                code: msg.resolution_code,
            });
        }

        let samples: Cow<'_, [u8]> = if msg.compressed {
            Cow::Owned(inflate_video_block(
                msg.video_data,
                msg.field_spec.max_video_block_len(),
            )?)
        } else {
            Cow::Borrowed(msg.video_data)
        };

        draw_sweep(
            &mut self.raster,
            msg.start_azimuth,
            msg.end_azimuth,
            &samples,
            self.config.projection,
        )
    }

    fn snapshot_frame(&self, ts: Timestamps, keyframe: bool) -> VideoFrame {
        VideoFrame {
            width: self.raster.width(),
            height: self.raster.height(),
            pixel_format: self.raster.format(),
            pixels: self.raster.pixels().to_vec(),
            pts: ts.pts,
            dts: ts.dts,
            duration: ts.duration,
            keyframe,
        }
    }
}
