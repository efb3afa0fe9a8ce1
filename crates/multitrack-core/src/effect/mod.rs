//! Per-track pitch and time-stretch
//!
//! - [`EffectParams`]: atomics settable from any thread, clamped on write
//! - [`EffectFrame`]: the stateful stage that owns the stretcher and the
//!   input-demand bookkeeping; lives with whoever renders the track
//!
//! The same stage is used for live playback and offline extraction, so both
//! paths produce the same samples for the same settings.

mod frame;
mod params;

pub use frame::EffectFrame;
pub use params::{EffectParams, FloatParam, PAN_RANGE, PITCH_RANGE, STRETCH_RANGE, VOLUME_RANGE};
