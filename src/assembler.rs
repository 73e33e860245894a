//! Scan assembly state machine
//!
//! Tracks azimuth coverage across video messages to detect completed
//! 360° rotations and to decide when the accumulated raster should be
//! delivered as a frame.
//!
//! Pure state transitions, no I/O and no pixel access - the session
//! owns the raster and acts on the decisions made here.

use serde::{Deserialize, Serialize};

// =============================================================================
// Policies
// =============================================================================

/// When an accumulated raster is handed to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Deliver on every message whose presentation tick advanced,
    /// coalescing sub-tick messages
    RateTicks,
    /// Withhold until the sweep returns to the session's keyframe
    /// azimuth, so every frame is one full rotation
    ScanComplete,
}

impl Default for DeliveryMode {
    fn default() -> Self {
        DeliveryMode::RateTicks
    }
}

/// Whether the raster is zeroed when a new scan begins.
///
/// With `Never`, pixels from the previous rotation persist until
/// overwritten, which reads as a deliberate afterglow rather than a
/// bug. `PerScan` starts each rotation from a blank buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearPolicy {
    PerScan,
    Never,
}

impl Default for ClearPolicy {
    fn default() -> Self {
        ClearPolicy::Never
    }
}

// =============================================================================
// Scan State
// =============================================================================

/// Assembly phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanPhase {
    /// No sweep seen yet, keyframe azimuth not locked
    AwaitingFirstSweep,
    /// Accumulating sweeps, emitting a keyframe per rotation
    Accumulating,
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanPhase::AwaitingFirstSweep => write!(f, "Awaiting First Sweep"),
            ScanPhase::Accumulating => write!(f, "Accumulating"),
        }
    }
}

/// Per-session scan assembly state.
///
/// The keyframe azimuth is whatever start azimuth the first sweep of
/// the session carries - the first sweep may start mid-scan, so the
/// "rotation" boundary is relative to session start, not to true north.
#[derive(Debug, Clone)]
pub struct ScanAssembler {
    phase: ScanPhase,
    keyframe_azimuth: Option<u16>,
    last_azimuth: Option<u16>,
    scans_completed: u64,
}

impl ScanAssembler {
    pub fn new() -> Self {
        ScanAssembler {
            phase: ScanPhase::AwaitingFirstSweep,
            keyframe_azimuth: None,
            last_azimuth: None,
            scans_completed: 0,
        }
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Azimuth that marks a completed rotation, once locked
    pub fn keyframe_azimuth(&self) -> Option<u16> {
        self.keyframe_azimuth
    }

    /// Start azimuth of the most recent sweep
    pub fn last_azimuth(&self) -> Option<u16> {
        self.last_azimuth
    }

    /// Completed rotations so far
    pub fn scans_completed(&self) -> u64 {
        self.scans_completed
    }

    /// Record one sweep's start azimuth.
    ///
    /// Returns true when this sweep is a keyframe boundary: the azimuth
    /// has come back around to where the session started. The first
    /// sweep locks the keyframe azimuth and is not itself a boundary.
    pub fn observe_sweep(&mut self, start_azimuth: u16) -> bool {
        self.last_azimuth = Some(start_azimuth);
        match self.keyframe_azimuth {
            None => {
                self.keyframe_azimuth = Some(start_azimuth);
                self.phase = ScanPhase::Accumulating;
                log::debug!(
                    "first sweep, keyframe azimuth locked at {}",
                    start_azimuth
                );
                false
            }
            Some(keyframe) => {
                let boundary = start_azimuth == keyframe;
                if boundary {
                    self.scans_completed += 1;
                    log::debug!("scan {} complete at azimuth {}", self.scans_completed, keyframe);
                }
                boundary
            }
        }
    }

    /// Delivery decision for the message just observed.
    ///
    /// `keyframe` is the result of [`observe_sweep`](Self::observe_sweep)
    /// for the same message, `ticks_advanced` comes from the timestamp
    /// synthesizer. Rate mode coalesces messages that did not move the
    /// presentation clock.
    pub fn should_deliver(&self, mode: DeliveryMode, keyframe: bool, ticks_advanced: u64) -> bool {
        match mode {
            DeliveryMode::RateTicks => ticks_advanced > 0,
            DeliveryMode::ScanComplete => keyframe,
        }
    }
}

impl Default for ScanAssembler {
    fn default() -> Self {
        Self::new()
    }
}
