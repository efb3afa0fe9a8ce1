//! Pitch shifting and time-stretching via signalsmith-stretch
//!
//! Wraps the signalsmith-stretch library for mono or stereo interleaved
//! audio. The stretch ratio is implied by the buffer sizes handed to
//! [`TimeStretcher::process`]: more input than output speeds up, less slows
//! down. Pitch is set independently in semitones.

use signalsmith_stretch::Stretch;

/// Pitch range in semitones (one octave each way)
pub const PITCH_RANGE_SEMITONES: f32 = 12.0;

/// Frequency above which tonal content is not formant-corrected
const TONALITY_LIMIT_HZ: f32 = 8000.0;

/// Time stretcher for pitch shifting and tempo change
pub struct TimeStretcher {
    /// The underlying signalsmith stretcher
    stretcher: Stretch,
    channels: usize,
    sample_rate: u32,
    /// Pitch shift in semitones (positive = up, negative = down)
    pitch_semitones: f32,
}

impl TimeStretcher {
    /// Create a stretcher for `channels` interleaved channels (1 or 2)
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        let channels = channels.clamp(1, 2);
        let stretcher = Stretch::preset_default(channels as u32, sample_rate);

        Self {
            stretcher,
            channels: channels as usize,
            sample_rate,
            pitch_semitones: 0.0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Set pitch shift in semitones, clamped to one octave either way
    pub fn set_pitch_semitones(&mut self, semitones: f32) {
        self.pitch_semitones = semitones.clamp(-PITCH_RANGE_SEMITONES, PITCH_RANGE_SEMITONES);
        let tonality_limit = TONALITY_LIMIT_HZ / self.sample_rate.max(1) as f32;
        self.stretcher
            .set_transpose_factor_semitones(self.pitch_semitones, Some(tonality_limit));
    }

    /// Get the current pitch shift in semitones
    pub fn pitch_semitones(&self) -> f32 {
        self.pitch_semitones
    }

    /// Clear all internal history
    pub fn reset(&mut self) {
        self.stretcher.reset();
    }

    /// Process interleaved audio.
    ///
    /// `input` holds `input.len() / channels` frames and `output` receives
    /// exactly `output.len() / channels` frames. Empty input produces silence.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        output.fill(0.0);
        if input.is_empty() || output.is_empty() {
            return;
        }
        let input_len = input.len() - input.len() % self.channels;
        let output_len = output.len() - output.len() % self.channels;
        self.stretcher
            .process(&input[..input_len], &mut output[..output_len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_stretcher_creation() {
        let stretcher = TimeStretcher::new(2, 48000);
        assert_eq!(stretcher.channels(), 2);
        assert_eq!(stretcher.pitch_semitones(), 0.0);
    }

    #[test]
    fn test_channels_clamped() {
        assert_eq!(TimeStretcher::new(0, 48000).channels(), 1);
        assert_eq!(TimeStretcher::new(6, 48000).channels(), 2);
    }

    #[test]
    fn test_pitch_clamped() {
        let mut stretcher = TimeStretcher::new(1, 44100);
        stretcher.set_pitch_semitones(30.0);
        assert_eq!(stretcher.pitch_semitones(), 12.0);
        stretcher.set_pitch_semitones(-30.0);
        assert_eq!(stretcher.pitch_semitones(), -12.0);
    }

    #[test]
    fn test_process_fills_requested_output() {
        let mut stretcher = TimeStretcher::new(2, 48000);
        let input = vec![0.0f32; 1024 * 2];
        let mut output = vec![1.0f32; 512 * 2];

        stretcher.process(&input, &mut output);

        // Silence in, silence out; exact values depend on windowing
        assert!(output.iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn test_empty_input_is_silence() {
        let mut stretcher = TimeStretcher::new(1, 48000);
        let mut output = vec![1.0f32; 256];
        stretcher.process(&[], &mut output);
        assert!(output.iter().all(|&s| s == 0.0));
    }
}
