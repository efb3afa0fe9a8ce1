//! Per-track pitch/stretch stage

use crate::timestretch::TimeStretcher;
use crate::types::{Sample, MAX_BUFFER_SIZE};

use super::params::{EffectParams, STRETCH_RANGE};

/// Pitch changes smaller than this are not pushed to the stretcher
const PITCH_EPSILON: f32 = 0.001;

/// Drives a [`TimeStretcher`] for one track.
///
/// Owns the input scratch buffer so rendering never allocates. For a
/// requested output block it works out how many source frames to pull under
/// the current stretch factor, carrying the fractional remainder into the
/// next call so the long-run ratio is exact.
pub struct EffectFrame {
    stretcher: TimeStretcher,
    channels: usize,
    /// Pitch last pushed to the stretcher
    applied_pitch: f32,
    /// Fractional input frames owed to (or borrowed from) the next block
    carry: f64,
    /// Whether the previous block went through the stretcher
    was_active: bool,
    input: Vec<Sample>,
    max_input_frames: usize,
}

impl EffectFrame {
    /// Create a stage sized for blocks of up to `max_output_frames`
    pub fn new(channels: u16, sample_rate: u32, max_output_frames: usize) -> Self {
        let stretcher = TimeStretcher::new(channels, sample_rate);
        let channels = stretcher.channels();
        let max_input_frames =
            (max_output_frames as f64 * *STRETCH_RANGE.end() as f64).ceil() as usize + 2;
        Self {
            stretcher,
            channels,
            applied_pitch: 0.0,
            carry: 0.0,
            was_active: false,
            input: vec![0.0; max_input_frames * channels],
            max_input_frames,
        }
    }

    /// Sized for the real-time path
    pub fn for_playback(channels: u16, sample_rate: u32) -> Self {
        Self::new(channels, sample_rate, MAX_BUFFER_SIZE)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Source frames to pull for `output_frames` of output at `stretch`.
    ///
    /// Rounds `output_frames * stretch + carry` to the nearest frame, keeps
    /// the difference as the new carry, and never asks for fewer than one
    /// frame.
    pub fn input_frames_for(&mut self, output_frames: usize, stretch: f32) -> usize {
        let exact = output_frames as f64 * stretch as f64 + self.carry;
        let frames = exact.round().max(1.0).min(self.max_input_frames as f64);
        self.carry = exact - frames;
        frames as usize
    }

    /// Render `output.len() / channels` frames through the stretcher.
    ///
    /// `pull` fills the slice it is given with interleaved source frames and
    /// returns how many frames it produced; the remainder is zero-padded.
    /// Returns the number of source frames consumed.
    pub fn render<F>(&mut self, params: &EffectParams, output: &mut [Sample], mut pull: F) -> usize
    where
        F: FnMut(&mut [Sample]) -> usize,
    {
        let output_frames = output.len() / self.channels;
        if !self.was_active {
            // History from an earlier active stretch is stale now
            self.stretcher.reset();
            self.carry = 0.0;
            self.was_active = true;
        }

        let pitch = params.pitch.get();
        if (pitch - self.applied_pitch).abs() > PITCH_EPSILON {
            self.stretcher.set_pitch_semitones(pitch);
            self.applied_pitch = pitch;
        }

        let input_frames = self.input_frames_for(output_frames, params.stretch.get());
        let input = &mut self.input[..input_frames * self.channels];
        let got = pull(input).min(input_frames);
        input[got * self.channels..].fill(0.0);

        self.stretcher.process(input, output);
        got
    }

    /// Note that the next block bypassed the stretcher
    pub fn mark_bypassed(&mut self) {
        self.was_active = false;
    }

    /// Clear stretcher history and the carried fraction.
    ///
    /// Must be called after every seek or restart.
    pub fn reset(&mut self) {
        self.stretcher.reset();
        self.carry = 0.0;
    }
}
