//! Presentation timestamp synthesis
//!
//! CAT240 carries a rolling 24-bit time of day in 1/128 second units.
//! [`TimeBase`] turns that into a monotonic sequence of presentation
//! ticks at a configured rate. The tick counter advances greedily, so a
//! single message may account for zero ticks (sub-tick message, same
//! frame) or several (gap in the stream).
//!
//! The 24-bit field rolls over after ~36.4 hours. That wrap is
//! corrected here: whenever time of day decreases from one message to
//! the next, a modulus-sized epoch is added, keeping elapsed time
//! monotonic across the rollover.

use crate::protocol::{TIME_OF_DAY_HZ, TIME_OF_DAY_MODULUS};

/// Timestamps for one message, in presentation ticks.
///
/// `pts` always equals `dts`: this format has no frame reordering.
/// `duration` is the number of ticks this message advanced the clock;
/// zero means "same frame, not yet ready to emit" in rate mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamps {
    pub pts: u64,
    pub dts: u64,
    pub duration: u64,
}

/// Per-session presentation clock.
#[derive(Debug, Clone)]
pub struct TimeBase {
    /// Presentation ticks per second
    ticks_per_second: u32,
    /// Time of day of the first video message, unset until then
    start: Option<u32>,
    /// Raw time of day of the previous message, for wrap detection
    last_raw: u32,
    /// Accumulated 2^24 rollovers, in time-of-day units
    epoch: u64,
    /// Highest tick emitted so far; non-decreasing for the session
    last_tick: u64,
}

impl TimeBase {
    /// Create a clock emitting `ticks_per_second` presentation ticks.
    /// A zero rate is clamped to one tick per second.
    pub fn new(ticks_per_second: u32) -> Self {
        TimeBase {
            ticks_per_second: ticks_per_second.max(1),
            start: None,
            last_raw: 0,
            epoch: 0,
            last_tick: 0,
        }
    }

    /// Highest tick emitted so far
    pub fn last_tick(&self) -> u64 {
        self.last_tick
    }

    /// True once the first video message has set the session origin
    pub fn started(&self) -> bool {
        self.start.is_some()
    }

    /// Advance the clock with one message's time of day.
    ///
    /// The first call captures the session origin and yields tick zero
    /// with no duration.
    pub fn advance(&mut self, time_of_day: u32) -> Timestamps {
        let tod = time_of_day % TIME_OF_DAY_MODULUS;

        let start = match self.start {
            Some(start) => start,
            None => {
                self.start = Some(tod);
                self.last_raw = tod;
                return Timestamps {
                    pts: 0,
                    dts: 0,
                    duration: 0,
                };
            }
        };

        if tod < self.last_raw {
            // Rolled over midnight (or the 24-bit counter itself)
            self.epoch += TIME_OF_DAY_MODULUS as u64;
            log::debug!("time of day wrapped, epoch now {} units", self.epoch);
        }
        self.last_raw = tod;

        let elapsed_units = self.epoch + tod as u64 - start as u64;
        let elapsed = elapsed_units as f64 / TIME_OF_DAY_HZ as f64;
        let tick_period = 1.0 / self.ticks_per_second as f64;

        let pts = self.last_tick;
        let mut duration = 0;
        while elapsed >= (self.last_tick + 1) as f64 * tick_period {
            self.last_tick += 1;
            duration += 1;
        }

        Timestamps {
            pts,
            dts: pts,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_sets_origin() {
        let mut tb = TimeBase::new(25);
        assert!(!tb.started());
        let ts = tb.advance(0x400000);
        assert!(tb.started());
        assert_eq!(ts, Timestamps { pts: 0, dts: 0, duration: 0 });
    }

    #[test]
    fn test_sub_tick_messages_coalesce() {
        // 25 ticks/s = one tick per 5.12 time-of-day units
        let mut tb = TimeBase::new(25);
        tb.advance(1000);
        assert_eq!(tb.advance(1002).duration, 0);
        assert_eq!(tb.advance(1004).duration, 0);
        let ts = tb.advance(1006);
        assert_eq!(ts.duration, 1);
        assert_eq!(ts.pts, 0);
        assert_eq!(tb.last_tick(), 1);
    }

    #[test]
    fn test_gap_advances_multiple_ticks() {
        let mut tb = TimeBase::new(25);
        tb.advance(0);
        // 128 units = 1 s = 25 ticks
        let ts = tb.advance(128);
        assert_eq!(ts.duration, 25);
        assert_eq!(ts.pts, 0);
        assert_eq!(tb.last_tick(), 25);
    }

    #[test]
    fn test_ticks_non_decreasing() {
        let mut tb = TimeBase::new(10);
        let tods = [0u32, 5, 5, 30, 31, 200, 1000, 1000, 4000];
        let mut prev = 0;
        for tod in tods {
            tb.advance(tod);
            assert!(tb.last_tick() >= prev);
            prev = tb.last_tick();
        }
    }

    #[test]
    fn test_pts_equals_dts() {
        let mut tb = TimeBase::new(25);
        for tod in (0..2000).step_by(7) {
            let ts = tb.advance(tod);
            assert_eq!(ts.pts, ts.dts);
        }
    }

    #[test]
    fn test_rollover_is_corrected() {
        let mut tb = TimeBase::new(25);
        tb.advance(0xFFFFF0); // 16 units before the 24-bit wrap
        let ts = tb.advance(0x000010); // 32 units later, wrapped
        // 32/128 s at 25 ticks/s = 6 ticks, not a negative jump
        assert_eq!(ts.duration, 6);
        assert_eq!(tb.last_tick(), 6);

        // Clock keeps running normally after the wrap
        let ts = tb.advance(0x000010 + 128);
        assert_eq!(ts.duration, 25);
    }

    #[test]
    fn test_zero_rate_clamped() {
        let mut tb = TimeBase::new(0);
        tb.advance(0);
        let ts = tb.advance(128);
        assert_eq!(ts.duration, 1);
    }
}
