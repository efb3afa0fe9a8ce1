//! Offline extraction
//!
//! Renders one track, or a mix of tracks, to a file as fast as decoding
//! allows, through the same effect and gain path as live playback.
//!
//! # Architecture
//!
//! ```text
//! AudioEngine
//!     │
//!     │ extract_* (sync)          extract_*_async
//!     │                                 │
//!     │                                 ▼
//!     │                  ExtractionQueue (one worker, FIFO)
//!     │                                 │ resolve targets at run time
//!     ▼                                 ▼
//! pipeline::extract_track / extract_mix
//!     │  independent decoders, 4096-frame blocks,
//!     │  cancel checked per block, progress per >=1%
//!     ▼
//! Encoder ──► output file (deleted on cancel or failure)
//! ```

mod message;
mod pipeline;
mod service;

pub use message::ExtractionProgress;
pub use pipeline::{extract_mix, extract_track, OfflineTrack, TrackSnapshot};
pub use service::{
    CompletionCallback, ExtractionJob, ExtractionQueue, ExtractionTarget, JobSources, ProgressCallback,
    TrackResolver,
};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio_file::{AudioFileError, FileFormat};

/// Progress is reported when it advances by at least this much
pub const PROGRESS_STEP: f32 = 0.01;

/// Output settings for an extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub format: FileFormat,
    /// Output sample rate written to the file header. `None` uses the
    /// source rate. No resampling is performed.
    pub sample_rate: Option<u32>,
    /// Bitrate for compressed formats, bits per second
    pub bitrate: u32,
    /// PCM bit depth: 16, 24 or 32
    pub bits_per_sample: u16,
    /// Apply pitch/stretch as set on the track
    pub include_effects: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            format: FileFormat::Wav,
            sample_rate: None,
            bitrate: 128_000,
            bits_per_sample: 16,
            include_effects: true,
        }
    }
}

/// What a finished extraction produced
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSummary {
    pub output_path: PathBuf,
    pub format: FileFormat,
    pub sample_rate: u32,
    pub channels: u16,
    pub bitrate: u32,
    /// Frames written
    pub frames_written: u64,
    pub file_size_bytes: u64,
}

impl ExtractionSummary {
    pub fn duration_ms(&self) -> i64 {
        crate::timeline::samples_to_ms(self.frames_written as i64, self.sample_rate)
    }
}

/// Why an extraction did not produce a file
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Extraction cancelled")]
    Cancelled,

    #[error("Track not found: {0}")]
    TrackNotFound(String),

    #[error("No tracks to extract")]
    NoTracks,

    #[error("Failed to open source: {0}")]
    Source(AudioFileError),

    #[error("Encoder error: {0}")]
    Encoder(AudioFileError),

    #[error("Extraction queue is shut down")]
    QueueClosed,
}

impl ExtractionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExtractionError::Cancelled)
    }
}

/// Outcome delivered to completion callbacks
pub type ExtractionResult = Result<ExtractionSummary, ExtractionError>;
