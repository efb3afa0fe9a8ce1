//! Multitrack Core - multi-track playback, mixing and extraction engine
//!
//! Audio files are loaded onto tracks placed on one sample-accurate
//! timeline, streamed through lock-free ring buffers, shaped by per-track
//! volume/pan/mute/solo/pitch/stretch, mixed and sent to an output device.
//! The same track model renders offline to files through the extraction
//! queue.
//!
//! Start with [`AudioEngine`].

pub mod audio;
pub mod audio_file;
pub mod config;
pub mod effect;
pub mod engine;
pub mod error;
pub mod export;
pub mod ring_buffer;
pub mod timeline;
pub mod timestretch;
pub mod types;

pub use engine::AudioEngine;
pub use error::{EngineError, EngineResult, ErrorCode};
pub use types::*;
