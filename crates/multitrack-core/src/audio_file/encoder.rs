//! Output encoders

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{AudioFileError, FileFormat};

/// Settings for a new output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub format: FileFormat,
    pub sample_rate: u32,
    pub channels: u16,
    /// Bits per sample for PCM output: 16, 24 or 32
    pub bits_per_sample: u16,
    /// Target bitrate for compressed output, bits per second
    pub bitrate: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            format: FileFormat::Wav,
            sample_rate: crate::types::DEFAULT_SAMPLE_RATE,
            channels: 2,
            bits_per_sample: 16,
            bitrate: 128_000,
        }
    }
}

/// An open output file.
///
/// Samples are interleaved `f32` in [-1, 1]; out-of-range values are
/// clamped before quantisation.
pub enum Encoder {
    Wav(WavEncoder),
}

impl Encoder {
    pub fn open(path: &Path, config: &EncoderConfig) -> Result<Self, AudioFileError> {
        if !config.format.can_encode() {
            return Err(AudioFileError::UnsupportedFormat(format!(
                "no encoder available for {}",
                config.format.extension()
            )));
        }
        if config.channels == 0 || config.sample_rate == 0 {
            return Err(AudioFileError::Encode(format!(
                "invalid output layout: {}Hz {}ch",
                config.sample_rate, config.channels
            )));
        }
        Ok(Encoder::Wav(WavEncoder::create(path, config)?))
    }

    /// Append `samples.len() / channels` frames
    pub fn write(&mut self, samples: &[f32]) -> Result<(), AudioFileError> {
        match self {
            Encoder::Wav(e) => e.write(samples),
        }
    }

    /// Flush and finalise the file. Idempotent.
    pub fn close(&mut self) -> Result<(), AudioFileError> {
        match self {
            Encoder::Wav(e) => e.close(),
        }
    }

    pub fn frames_written(&self) -> u64 {
        match self {
            Encoder::Wav(e) => e.frames_written,
        }
    }

    /// Size of the finished file; only meaningful after [`Encoder::close`]
    pub fn file_size_bytes(&self) -> u64 {
        match self {
            Encoder::Wav(e) => e.file_size,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Encoder::Wav(e) => &e.path,
        }
    }
}

/// PCM WAV writer via hound
pub struct WavEncoder {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    channels: usize,
    bits_per_sample: u16,
    frames_written: u64,
    file_size: u64,
}

impl WavEncoder {
    fn create(path: &Path, config: &EncoderConfig) -> Result<Self, AudioFileError> {
        let bits_per_sample = match config.bits_per_sample {
            16 | 24 | 32 => config.bits_per_sample,
            other => {
                return Err(AudioFileError::UnsupportedFormat(format!(
                    "{}-bit WAV output",
                    other
                )))
            }
        };
        let spec = hound::WavSpec {
            channels: config.channels,
            sample_rate: config.sample_rate,
            bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        };
        let writer =
            hound::WavWriter::create(path, spec).map_err(|e| AudioFileError::Encode(e.to_string()))?;
        log::debug!(
            "WavEncoder: {:?} {}Hz {}ch {}bit",
            path,
            config.sample_rate,
            config.channels,
            bits_per_sample
        );
        Ok(Self {
            writer: Some(writer),
            path: path.to_path_buf(),
            channels: config.channels as usize,
            bits_per_sample,
            frames_written: 0,
            file_size: 0,
        })
    }

    fn write(&mut self, samples: &[f32]) -> Result<(), AudioFileError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| AudioFileError::Encode("write after close".to_string()))?;
        let full_scale = ((1u64 << (self.bits_per_sample - 1)) - 1) as f64;
        let usable = samples.len() - samples.len() % self.channels;
        for &sample in &samples[..usable] {
            let value = (sample.clamp(-1.0, 1.0) as f64 * full_scale).round() as i32;
            writer
                .write_sample(value)
                .map_err(|e| AudioFileError::Encode(e.to_string()))?;
        }
        self.frames_written += (usable / self.channels) as u64;
        Ok(())
    }

    fn close(&mut self) -> Result<(), AudioFileError> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| AudioFileError::Encode(e.to_string()))?;
            self.file_size = std::fs::metadata(&self.path)?.len();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_wav_roundtrip_levels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let config = EncoderConfig {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 24,
            ..Default::default()
        };
        let mut encoder = Encoder::open(&path, &config).unwrap();
        encoder.write(&[0.0, 0.5, -0.5, 2.0]).unwrap();
        encoder.close().unwrap();
        assert_eq!(encoder.frames_written(), 4);
        assert!(encoder.file_size_bytes() > 44);

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 24);
        let samples: Vec<i32> = reader.samples::<i32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples[0], 0);
        assert_eq!(samples[1], 4194304);
        assert_eq!(samples[2], -4194304);
        // clamped
        assert_eq!(samples[3], 8388607);
    }

    #[test]
    fn test_partial_frames_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let mut encoder = Encoder::open(&path, &EncoderConfig::default()).unwrap();
        encoder.write(&[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(encoder.frames_written(), 1);
        encoder.close().unwrap();
        encoder.close().unwrap();
        assert!(encoder.write(&[0.0, 0.0]).is_err());
    }

    #[test]
    fn test_compressed_output_unsupported() {
        let dir = tempdir().unwrap();
        for format in [FileFormat::Mp3, FileFormat::Aac, FileFormat::M4a, FileFormat::Flac] {
            let path = dir.path().join(format!("out.{}", format.extension()));
            let config = EncoderConfig {
                format,
                ..Default::default()
            };
            let result = Encoder::open(&path, &config);
            assert!(matches!(result, Err(AudioFileError::UnsupportedFormat(_))));
            assert!(!path.exists());
        }
    }

    #[test]
    fn test_invalid_bit_depth() {
        let dir = tempdir().unwrap();
        let config = EncoderConfig {
            bits_per_sample: 12,
            ..Default::default()
        };
        assert!(Encoder::open(&dir.path().join("out.wav"), &config).is_err());
    }
}
