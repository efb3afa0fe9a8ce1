//! Audio file decoding and encoding
//!
//! A closed set of adapters over ecosystem codecs:
//!
//! - [`Decoder`]: `Wav` via hound, `Compressed` (MP3, AAC, M4A, FLAC) via
//!   symphonia. Chosen by file extension.
//! - [`Encoder`]: `Wav` via hound at 16, 24 or 32 bits. Compressed output
//!   formats are recognised but report [`AudioFileError::UnsupportedFormat`].
//!
//! Both sides work in interleaved `f32` frames.

mod decoder;
mod encoder;

pub use decoder::Decoder;
pub use encoder::{Encoder, EncoderConfig};

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from opening, decoding, seeking or encoding audio files
#[derive(Error, Debug)]
pub enum AudioFileError {
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to open {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Seek error: {0}")]
    Seek(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Properties of a decoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// Length in frames; 0 when the container does not say
    pub total_frames: u64,
}

impl AudioFormat {
    /// Whether the stream length is known up front
    pub fn has_known_length(&self) -> bool {
        self.total_frames > 0
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self) -> i64 {
        crate::timeline::samples_to_ms(self.total_frames as i64, self.sample_rate)
    }
}

/// Container/codec families, by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Wav,
    Mp3,
    Aac,
    M4a,
    Flac,
}

impl FileFormat {
    /// Detect the format from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self, AudioFileError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        Self::from_extension(&ext)
            .ok_or_else(|| AudioFileError::UnsupportedFormat(format!("{:?}", path)))
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "wav" | "wave" => Some(FileFormat::Wav),
            "mp3" => Some(FileFormat::Mp3),
            "aac" => Some(FileFormat::Aac),
            "m4a" | "mp4" => Some(FileFormat::M4a),
            "flac" => Some(FileFormat::Flac),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Wav => "wav",
            FileFormat::Mp3 => "mp3",
            FileFormat::Aac => "aac",
            FileFormat::M4a => "m4a",
            FileFormat::Flac => "flac",
        }
    }

    /// Whether extraction can write this format
    pub fn can_encode(self) -> bool {
        matches!(self, FileFormat::Wav)
    }
}

impl std::str::FromStr for FileFormat {
    type Err = AudioFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| AudioFileError::UnsupportedFormat(s.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::path::Path;

    /// Write a sine test file as 16-bit WAV
    pub fn write_sine_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize, amp: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let value = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * amp;
            for _ in 0..channels {
                writer.write_sample((value * 32767.0) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    /// Write a constant-valued 32-bit float WAV
    pub fn write_constant_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize, value: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames * channels as usize {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// Write a mono 32-bit float WAV whose frame `i` holds `i / frames`
    pub fn write_ramp_wav(path: &Path, sample_rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample(i as f32 / frames as f32).unwrap();
        }
        writer.finalize().unwrap();
    }
}
