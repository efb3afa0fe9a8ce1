//! Audio engine - tracks, mixer and the engine facade
//!
//! This module contains the playback side of the engine:
//! - Track: one decoded source with its streaming buffer and controls
//! - Mixer: sums the published track set onto the stereo bus
//! - AudioEngine: registry, transport, extraction and error reporting
//!   tying everything together

#[allow(clippy::module_inception)]
mod engine;
mod gc;
mod mixer;
pub(crate) mod render;
mod track;

pub use engine::{AudioEngine, ErrorCallback};
pub(crate) use gc::gc_handle;
pub use mixer::{MixBus, Mixer, TrackSet};
pub use render::pan_gains;
pub use track::{Track, TrackControls, TrackSettings};
