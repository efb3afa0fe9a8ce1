//! Common types for the multitrack engine
//!
//! This module contains the fundamental audio types used throughout the
//! engine: the stereo frame type and the shared block sizes.

/// Default engine sample rate (48kHz - standard professional audio rate)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default maximum number of simultaneously loaded tracks
pub const DEFAULT_MAX_TRACKS: usize = 8;

/// Frames decoded per fill-thread iteration
pub const FILL_CHUNK_FRAMES: usize = 4096;

/// Frames rendered per offline extraction iteration
pub const RENDER_CHUNK_FRAMES: usize = 4096;

/// Largest block the real-time path renders in one pass.
/// Callbacks asking for more are rendered in slices of this size.
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Largest channel count a track may have (mono or stereo)
pub const MAX_TRACK_CHANNELS: u16 = 2;

/// Audio sample type (32-bit float for processing)
pub type Sample = f32;

/// A single stereo sample (left and right channels)
///
/// Uses `#[repr(C)]` to ensure predictable memory layout: [left, right].
/// This enables zero-copy conversion between `&[StereoSample]` and `&[f32]`
/// (interleaved format) using bytemuck, which is how the device buffer handed
/// to the audio callback is reinterpreted.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    /// Create a new stereo sample
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Create a silent stereo sample
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Create a mono sample (same value in both channels)
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Hard-clip both channels to [-1, 1]
    #[inline]
    pub fn clipped(self) -> Self {
        Self {
            left: self.left.clamp(-1.0, 1.0),
            right: self.right.clamp(-1.0, 1.0),
        }
    }

    /// Get the peak amplitude (max of abs(left), abs(right))
    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }
}

impl std::ops::AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.left += other.left;
        self.right += other.right;
    }
}

impl std::ops::MulAssign<Sample> for StereoSample {
    #[inline]
    fn mul_assign(&mut self, factor: Sample) {
        self.left *= factor;
        self.right *= factor;
    }
}

/// Root-mean-square level of one channel of an interleaved buffer
pub fn channel_rms(interleaved: &[Sample], channels: usize, channel: usize) -> f32 {
    if channels == 0 || channel >= channels {
        return 0.0;
    }
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for frame in interleaved.chunks_exact(channels) {
        let s = frame[channel] as f64;
        sum += s * s;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        (sum / count as f64).sqrt() as f32
    }
}
