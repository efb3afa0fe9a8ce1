//! Sample-accurate timeline
//!
//! Bundles the shared [`Clock`], the [`Transport`] state machine and the
//! session duration, plus millisecond/frame conversion at the engine rate.
//! Every track is placed on this timeline by its start offset; the mixer
//! renders all tracks against the same clock position each block.

mod clock;
mod transport;

pub use clock::Clock;
pub use transport::{Transport, TransportState};

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Convert frames to milliseconds at `sample_rate`
#[inline]
pub fn samples_to_ms(samples: i64, sample_rate: u32) -> i64 {
    if sample_rate == 0 {
        return 0;
    }
    samples.saturating_mul(1000) / sample_rate as i64
}

/// Convert milliseconds to frames at `sample_rate`, rounding toward
/// negative infinity
#[inline]
pub fn ms_to_samples(ms: i64, sample_rate: u32) -> i64 {
    ms.saturating_mul(sample_rate as i64).div_euclid(1000)
}

/// Engine-wide timeline state
#[derive(Debug)]
pub struct Timeline {
    sample_rate: u32,
    clock: Arc<Clock>,
    transport: Arc<Transport>,
    duration: AtomicI64,
}

impl Timeline {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            clock: Arc::new(Clock::new()),
            transport: Arc::new(Transport::new()),
            duration: AtomicI64::new(0),
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Shared clock handle (also held by the stream renderer)
    pub fn clock(&self) -> &Arc<Clock> {
        &self.clock
    }

    /// Shared transport handle (also held by the stream renderer)
    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub fn samples_to_ms(&self, samples: i64) -> i64 {
        samples_to_ms(samples, self.sample_rate)
    }

    pub fn ms_to_samples(&self, ms: i64) -> i64 {
        ms_to_samples(ms, self.sample_rate)
    }

    pub fn position(&self) -> i64 {
        self.clock.position()
    }

    pub fn position_ms(&self) -> i64 {
        self.samples_to_ms(self.clock.position())
    }

    /// Session length in frames
    pub fn duration(&self) -> i64 {
        self.duration.load(Ordering::Acquire)
    }

    pub fn duration_ms(&self) -> i64 {
        self.samples_to_ms(self.duration())
    }

    /// Recompute the duration as the latest track end.
    ///
    /// Each item is `(start_offset, length)` in frames.
    pub fn recalculate_duration<I>(&self, spans: I) -> i64
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let duration = spans
            .into_iter()
            .map(|(start, length)| start.max(0) + length.max(0))
            .max()
            .unwrap_or(0);
        self.duration.store(duration, Ordering::Release);
        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_conversions() {
        assert_eq!(ms_to_samples(1000, 48000), 48000);
        assert_eq!(ms_to_samples(250, 48000), 12000);
        // floor: 1ms at 44.1k is 44.1 frames
        assert_eq!(ms_to_samples(1, 44100), 44);
        assert_eq!(ms_to_samples(-1, 44100), -45);
        assert_eq!(samples_to_ms(48000, 48000), 1000);
        assert_eq!(samples_to_ms(12000, 48000), 250);
        assert_eq!(samples_to_ms(100, 0), 0);
    }

    #[test]
    fn test_duration_is_latest_end() {
        let timeline = Timeline::new(48000);
        assert_eq!(timeline.recalculate_duration(Vec::new()), 0);
        let d = timeline.recalculate_duration(vec![(0, 48000), (24000, 48000), (0, 1000)]);
        assert_eq!(d, 72000);
        assert_eq!(timeline.duration_ms(), 1500);
    }

    #[test]
    fn test_position_ms_follows_clock() {
        let timeline = Timeline::new(48000);
        timeline.clock().advance(24000);
        assert_eq!(timeline.position_ms(), 500);
    }
}
