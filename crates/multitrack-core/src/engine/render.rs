//! Block rendering shared by live playback and offline extraction
//!
//! Both paths pull source frames through the same effect stage, apply the
//! same gain law and sum into a stereo bus the same way, so a mixdown matches
//! what was heard.

use std::f32::consts::FRAC_PI_4;

use crate::effect::{EffectFrame, EffectParams};
use crate::types::{Sample, StereoSample};

/// Equal-power pan gains for `volume` at `pan` in [-1, 1].
///
/// `left = volume * cos((pan + 1) * pi/4)`, `right = volume * sin(...)`.
#[inline]
pub fn pan_gains(volume: f32, pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (volume * angle.cos(), volume * angle.sin())
}

/// Apply track gain in place.
///
/// Stereo uses the equal-power pan law; mono gets `volume` only.
pub fn apply_gain(buf: &mut [Sample], channels: usize, volume: f32, pan: f32) {
    match channels {
        2 => {
            let (left, right) = pan_gains(volume, pan);
            for frame in buf.chunks_exact_mut(2) {
                frame[0] *= left;
                frame[1] *= right;
            }
        }
        _ => {
            for sample in buf.iter_mut() {
                *sample *= volume;
            }
        }
    }
}

/// Pull one block of a track's source into `output`.
///
/// Goes through the effect stage when pitch or stretch is active, otherwise
/// reads straight into `output`. Frames the source could not supply are
/// zero-filled. Returns the number of source frames consumed.
pub fn render_source<F>(
    effect: &mut EffectFrame,
    params: &EffectParams,
    output: &mut [Sample],
    channels: usize,
    mut pull: F,
) -> usize
where
    F: FnMut(&mut [Sample]) -> usize,
{
    if params.is_active() {
        return effect.render(params, output, pull);
    }

    effect.mark_bypassed();
    let frames = output.len() / channels;
    let got = pull(output).min(frames);
    output[got * channels..].fill(0.0);
    got
}

/// Sum an interleaved track block into a stereo bus, duplicating mono
pub fn sum_into(bus: &mut [StereoSample], block: &[Sample], channels: usize) {
    match channels {
        1 => {
            for (out, &s) in bus.iter_mut().zip(block.iter()) {
                *out += StereoSample::mono(s);
            }
        }
        _ => {
            for (out, frame) in bus.iter_mut().zip(block.chunks_exact(channels)) {
                *out += StereoSample::new(frame[0], frame[1]);
            }
        }
    }
}

/// Apply master volume and hard-clip the bus to [-1, 1]
pub fn master_and_clip(bus: &mut [StereoSample], master_volume: f32) {
    for sample in bus.iter_mut() {
        *sample *= master_volume;
        *sample = sample.clipped();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pan_law() {
        for step in 0..=20 {
            let pan = -1.0 + step as f32 * 0.1;
            for volume in [0.0f32, 0.5, 1.0, 2.0] {
                let (l, r) = pan_gains(volume, pan);
                let angle = (pan + 1.0) * std::f32::consts::PI / 4.0;
                assert!((l - volume * angle.cos()).abs() < 1e-6);
                assert!((r - volume * angle.sin()).abs() < 1e-6);
                // equal power
                assert!((l * l + r * r - volume * volume).abs() < 1e-4);
            }
        }
        let (l, r) = pan_gains(1.0, 0.0);
        assert!((l - r).abs() < 1e-6);
    }

    #[test]
    fn test_hard_pan() {
        let (l, r) = pan_gains(1.0, -1.0);
        assert!((l - 1.0).abs() < 1e-6);
        assert!(r.abs() < 1e-6);
        let (l, r) = pan_gains(1.0, 1.0);
        assert!(l.abs() < 1e-6);
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_apply_gain_mono_ignores_pan() {
        let mut buf = [1.0f32, -1.0, 0.5];
        apply_gain(&mut buf, 1, 0.5, -1.0);
        assert_eq!(buf, [0.5, -0.5, 0.25]);
    }

    #[test]
    fn test_render_source_bypass_zero_pads() {
        let params = EffectParams::new();
        let mut effect = EffectFrame::new(2, 48000, 64);
        let mut out = [9.0f32; 8];
        let consumed = render_source(&mut effect, &params, &mut out, 2, |buf| {
            buf[..2].copy_from_slice(&[0.1, 0.2]);
            1
        });
        assert_eq!(consumed, 1);
        assert_eq!(out, [0.1, 0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_sum_mono_duplicates() {
        let mut bus = vec![StereoSample::silence(); 2];
        sum_into(&mut bus, &[0.25, -0.5], 1);
        assert_eq!(bus[0], StereoSample::new(0.25, 0.25));
        assert_eq!(bus[1], StereoSample::new(-0.5, -0.5));
    }

    #[test]
    fn test_master_and_clip_bounds() {
        let mut bus = vec![StereoSample::new(0.9, -0.9), StereoSample::new(0.2, 0.1)];
        master_and_clip(&mut bus, 2.0);
        assert_eq!(bus[0], StereoSample::new(1.0, -1.0));
        assert!((bus[1].left - 0.4).abs() < 1e-6);
    }
}
