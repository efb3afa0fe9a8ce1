//! Audio output configuration
//!
//! Device selection, sharing mode and buffer settings for the output stream.

use serde::{Deserialize, Serialize};

pub use crate::types::MAX_BUFFER_SIZE;

/// Common low-latency buffer sizes, in order of preference (frames)
/// - 64 frames @ 48kHz = ~1.3ms
/// - 128 frames @ 48kHz = ~2.7ms
/// - 256 frames @ 48kHz = ~5.3ms
/// - 512 frames @ 48kHz = ~10.7ms
pub const LOW_LATENCY_BUFFER_SIZES: [u32; 4] = [64, 128, 256, 512];

/// Default buffer size when no preference is specified (frames)
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Buffer requested when opening in exclusive low-latency mode
pub const EXCLUSIVE_BUFFER_SIZE: u32 = 256;

/// How the output stream shares the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SharingMode {
    /// Low-latency, device to ourselves where the host allows it
    #[default]
    Exclusive,
    /// Mixed by the system with other applications
    Shared,
}

/// Preferred buffer size for audio streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Let the system choose the default buffer size
    #[default]
    Default,
    /// Request a specific buffer size in frames (may be adjusted by the system)
    Fixed(u32),
    /// Smallest common size the device accepts
    LowLatency,
}

impl BufferSize {
    /// Get the buffer size in frames, or None for system default
    pub fn as_frames(&self) -> Option<u32> {
        match self {
            BufferSize::Default => None,
            BufferSize::Fixed(frames) => Some((*frames).min(MAX_BUFFER_SIZE as u32)),
            BufferSize::LowLatency => Some(LOW_LATENCY_BUFFER_SIZES[2]),
        }
    }

    /// Calculate latency in milliseconds for a given sample rate
    pub fn latency_ms(&self, sample_rate: u32) -> Option<f32> {
        self.as_frames()
            .map(|frames| (frames as f32 / sample_rate.max(1) as f32) * 1000.0)
    }
}

/// Audio device identifier
///
/// Includes both the device name and the host backend (ALSA, CoreAudio,
/// WASAPI, AAudio...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    /// Audio host identifier. If None, uses the default host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: Some(host.into()),
        }
    }

    /// Get a display label that includes the host if available
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Configuration for the output stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device (None = system default)
    pub device: Option<DeviceId>,
    /// Stream sample rate; the engine renders at this rate
    pub sample_rate: u32,
    /// Device channel count; the mix occupies the first two
    pub channels: u16,
    /// Preferred buffer size
    pub buffer_size: BufferSize,
    /// Mode tried first; shared is always the fallback
    pub sharing_mode: SharingMode,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: crate::types::DEFAULT_SAMPLE_RATE,
            channels: 2,
            buffer_size: BufferSize::default(),
            sharing_mode: SharingMode::default(),
        }
    }
}

impl AudioConfig {
    /// Set the output device
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }

    /// Set a fixed buffer size in frames
    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }

    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn with_sharing_mode(mut self, mode: SharingMode) -> Self {
        self.sharing_mode = mode;
        self
    }

    /// Buffer size to request in `mode`.
    ///
    /// Exclusive mode asks for a small fixed buffer unless one was
    /// configured; shared mode uses the configured preference as is.
    pub fn buffer_frames_for(&self, mode: SharingMode) -> Option<u32> {
        match (mode, self.buffer_size) {
            (SharingMode::Exclusive, BufferSize::Default) => Some(EXCLUSIVE_BUFFER_SIZE),
            (_, size) => size.as_frames(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size_frames() {
        assert_eq!(BufferSize::Default.as_frames(), None);
        assert_eq!(BufferSize::Fixed(128).as_frames(), Some(128));
        assert_eq!(BufferSize::Fixed(100_000).as_frames(), Some(MAX_BUFFER_SIZE as u32));
        let latency = BufferSize::Fixed(480).latency_ms(48000).unwrap();
        assert!((latency - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_exclusive_prefers_small_buffer() {
        let config = AudioConfig::default();
        assert_eq!(config.buffer_frames_for(SharingMode::Exclusive), Some(EXCLUSIVE_BUFFER_SIZE));
        assert_eq!(config.buffer_frames_for(SharingMode::Shared), None);

        let config = config.with_buffer_frames(1024);
        assert_eq!(config.buffer_frames_for(SharingMode::Exclusive), Some(1024));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = AudioConfig::default()
            .with_device(DeviceId::new("Speakers"))
            .with_sharing_mode(SharingMode::Shared);
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: AudioConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, config);
    }
}
