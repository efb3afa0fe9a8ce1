//! Engine configuration
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/multitrack/engine.yaml
//!
//! # Usage
//!
//! ```ignore
//! use multitrack_core::config::{default_config_path, EngineConfig};
//!
//! let config = EngineConfig::load(&default_config_path(EngineConfig::FILE_NAME));
//! config.save(&path)?;
//! ```

mod io;
mod paths;

pub use io::{load_config, save_config, try_load_config};
pub use paths::{default_config_dir, default_config_path};

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::audio::AudioConfig;
use crate::engine::TrackSettings;
use crate::export::ExtractionConfig;
use crate::types::{DEFAULT_MAX_TRACKS, DEFAULT_SAMPLE_RATE, FILL_CHUNK_FRAMES};

/// Sample rates the engine accepts
pub const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<u32> = 8_000..=192_000;

/// Hard cap on simultaneously loaded tracks
pub const MAX_TRACKS_LIMIT: usize = 64;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine (mix and timeline) sample rate
    pub sample_rate: u32,
    /// Maximum number of loaded tracks
    pub max_tracks: usize,
    /// Per-track streaming buffer settings
    pub streaming: StreamingConfig,
    /// Output device settings
    pub audio: AudioConfig,
    /// Defaults for extraction requests
    pub extraction: ExtractionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_tracks: DEFAULT_MAX_TRACKS,
            streaming: StreamingConfig::default(),
            audio: AudioConfig::default(),
            extraction: ExtractionConfig::default(),
        }
    }
}

/// Streaming buffer section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Ring buffer length in seconds of source audio
    pub ring_seconds: f32,
    /// Frames decoded per fill iteration
    pub fill_chunk_frames: usize,
    /// Longest the fill thread sleeps between checks
    pub poll_interval_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            ring_seconds: 1.0,
            fill_chunk_frames: FILL_CHUNK_FRAMES,
            poll_interval_ms: 5,
        }
    }
}

impl StreamingConfig {
    pub fn track_settings(&self) -> TrackSettings {
        TrackSettings {
            ring_seconds: self.ring_seconds,
            fill_chunk_frames: self.fill_chunk_frames,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

impl EngineConfig {
    pub const FILE_NAME: &'static str = "engine.yaml";

    /// Config with the given engine rate, also requested from the device
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self.audio.sample_rate = sample_rate;
        self
    }

    pub fn with_max_tracks(mut self, max_tracks: usize) -> Self {
        self.max_tracks = max_tracks;
        self
    }

    /// Pull every value into its supported range
    pub fn clamped(mut self) -> Self {
        self.sample_rate = self
            .sample_rate
            .clamp(*SAMPLE_RATE_RANGE.start(), *SAMPLE_RATE_RANGE.end());
        self.max_tracks = self.max_tracks.clamp(1, MAX_TRACKS_LIMIT);

        let s = &mut self.streaming;
        s.ring_seconds = if s.ring_seconds.is_finite() {
            s.ring_seconds.clamp(0.1, 10.0)
        } else {
            StreamingConfig::default().ring_seconds
        };
        s.fill_chunk_frames = s.fill_chunk_frames.clamp(256, 65_536);
        s.poll_interval_ms = s.poll_interval_ms.clamp(1, 100);

        self.audio.channels = self.audio.channels.max(1);
        if !matches!(self.extraction.bits_per_sample, 16 | 24 | 32) {
            self.extraction.bits_per_sample = 16;
        }
        self
    }

    /// Load from YAML, falling back to defaults, then clamp
    pub fn load(path: &Path) -> Self {
        load_config::<EngineConfig>(path).clamped()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_config(self, path)
    }
}
