//! Lock-free, range-clamped control parameters

use std::ops::RangeInclusive;
use std::sync::atomic::Ordering;

use atomic_float::AtomicF32;

/// Pitch shift range in semitones
pub const PITCH_RANGE: RangeInclusive<f32> = -12.0..=12.0;
/// Stretch factor range (input frames per output frame)
pub const STRETCH_RANGE: RangeInclusive<f32> = 0.5..=2.0;
/// Track and master volume range
pub const VOLUME_RANGE: RangeInclusive<f32> = 0.0..=2.0;
/// Pan range, hard left to hard right
pub const PAN_RANGE: RangeInclusive<f32> = -1.0..=1.0;

/// Deviation below which pitch/stretch count as neutral
const ACTIVE_THRESHOLD: f32 = 0.01;

/// An `f32` parameter that any thread can set and the audio thread can read.
///
/// Writes are clamped to the parameter's range; NaN writes are ignored.
#[derive(Debug)]
pub struct FloatParam {
    value: AtomicF32,
    range: RangeInclusive<f32>,
}

impl FloatParam {
    pub fn new(init: f32, range: RangeInclusive<f32>) -> Self {
        let init = init.clamp(*range.start(), *range.end());
        Self {
            value: AtomicF32::new(init),
            range,
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value.load(Ordering::Relaxed)
    }

    /// Store `v` clamped to the range. Note that `&self` is enough.
    pub fn set(&self, v: f32) {
        if v.is_nan() {
            return;
        }
        self.value
            .store(v.clamp(*self.range.start(), *self.range.end()), Ordering::Relaxed);
    }

    pub fn range(&self) -> &RangeInclusive<f32> {
        &self.range
    }
}

/// Pitch and stretch controls for one track
#[derive(Debug)]
pub struct EffectParams {
    pub pitch: FloatParam,
    pub stretch: FloatParam,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            pitch: FloatParam::new(0.0, PITCH_RANGE),
            stretch: FloatParam::new(1.0, STRETCH_RANGE),
        }
    }
}

impl EffectParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the pitch/stretch stage has any audible effect
    pub fn is_active(&self) -> bool {
        self.pitch.get().abs() > ACTIVE_THRESHOLD
            || (self.stretch.get() - 1.0).abs() > ACTIVE_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_writes() {
        let params = EffectParams::new();
        params.pitch.set(20.0);
        assert_eq!(params.pitch.get(), 12.0);
        params.stretch.set(0.1);
        assert_eq!(params.stretch.get(), 0.5);
        params.stretch.set(f32::NAN);
        assert_eq!(params.stretch.get(), 0.5);
    }

    #[test]
    fn test_is_active_thresholds() {
        let params = EffectParams::new();
        assert!(!params.is_active());
        params.pitch.set(0.005);
        assert!(!params.is_active());
        params.pitch.set(0.5);
        assert!(params.is_active());
        params.pitch.set(0.0);
        params.stretch.set(1.005);
        assert!(!params.is_active());
        params.stretch.set(1.5);
        assert!(params.is_active());
    }

    #[test]
    fn test_init_clamped() {
        let volume = FloatParam::new(5.0, VOLUME_RANGE);
        assert_eq!(volume.get(), 2.0);
    }
}
