//! Offline render loops
//!
//! Each source gets its own decoder so extraction never disturbs live
//! playback. Blocks go through [`render_source`] and [`apply_gain`], the
//! same stages the live track uses, so a rendered file matches what was
//! heard.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::audio_file::{AudioFileError, AudioFormat, Decoder, Encoder, EncoderConfig};
use crate::effect::{EffectFrame, EffectParams};
use crate::engine::render::{apply_gain, master_and_clip, render_source, sum_into};
use crate::engine::Track;
use crate::types::{Sample, StereoSample, DEFAULT_SAMPLE_RATE, RENDER_CHUNK_FRAMES};

use super::{ExtractionConfig, ExtractionError, ExtractionResult, ExtractionSummary, PROGRESS_STEP};

/// Frozen copy of a track's source and controls.
///
/// Captured when a job starts so later edits to the live track do not
/// change a render in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    pub id: String,
    pub path: PathBuf,
    /// Timeline frame of the track's first frame
    pub start_offset: i64,
    pub volume: f32,
    pub pan: f32,
    pub muted: bool,
    pub solo: bool,
    pub pitch: f32,
    pub stretch: f32,
}

impl TrackSnapshot {
    /// Snapshot with neutral controls
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            start_offset: 0,
            volume: 1.0,
            pan: 0.0,
            muted: false,
            solo: false,
            pitch: 0.0,
            stretch: 1.0,
        }
    }

    pub fn capture(track: &Track) -> Self {
        Self {
            id: track.id().to_string(),
            path: track.path().to_path_buf(),
            start_offset: track.start_offset(),
            volume: track.volume(),
            pan: track.pan(),
            muted: track.is_muted(),
            solo: track.is_solo(),
            pitch: track.pitch(),
            stretch: track.stretch(),
        }
    }
}

/// A track rendered offline from its own decoder
pub struct OfflineTrack {
    snapshot: TrackSnapshot,
    decoder: Decoder,
    format: AudioFormat,
    channels: usize,
    effect: EffectFrame,
    params: EffectParams,
    /// Source frames consumed so far
    processed: u64,
    finished: bool,
}

impl OfflineTrack {
    /// Open a fresh decoder for `snapshot`.
    ///
    /// With `include_effects` false the track renders at its original pitch
    /// and speed; gain still applies.
    pub fn open(snapshot: TrackSnapshot, include_effects: bool) -> Result<Self, AudioFileError> {
        let decoder = Decoder::open(&snapshot.path)?;
        let format = decoder.format();
        let params = EffectParams::new();
        if include_effects {
            params.pitch.set(snapshot.pitch);
            params.stretch.set(snapshot.stretch);
        }
        Ok(Self {
            effect: EffectFrame::new(format.channels, format.sample_rate, RENDER_CHUNK_FRAMES),
            channels: format.channels as usize,
            snapshot,
            decoder,
            format,
            params,
            processed: 0,
            finished: false,
        })
    }

    pub fn snapshot(&self) -> &TrackSnapshot {
        &self.snapshot
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Source frames consumed so far
    pub fn processed_frames(&self) -> u64 {
        self.processed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Input frames consumed per output frame
    fn effective_stretch(&self) -> f64 {
        if self.params.is_active() {
            self.params.stretch.get() as f64
        } else {
            1.0
        }
    }

    /// Output frames still to come, or `None` when the source length is
    /// unknown
    pub fn remaining_output_frames(&self) -> Option<u64> {
        if self.finished {
            return Some(0);
        }
        if !self.format.has_known_length() {
            return None;
        }
        let remaining = self.format.total_frames.saturating_sub(self.processed);
        Some((remaining as f64 / self.effective_stretch()).ceil() as u64)
    }

    /// Render up to `frames` frames (at most [`RENDER_CHUNK_FRAMES`]) into
    /// `output`, interleaved at the track's channel count.
    ///
    /// Returns the number of frames worth writing; 0 once the source is
    /// exhausted. A muted track renders silence but still consumes its
    /// source so it ends on time.
    pub fn render(&mut self, output: &mut [Sample], frames: usize) -> Result<usize, AudioFileError> {
        if self.finished {
            return Ok(0);
        }
        let frames = frames.min(RENDER_CHUNK_FRAMES);
        let output = &mut output[..frames * self.channels];

        let decoder = &mut self.decoder;
        let mut decode_error = None;
        let consumed = render_source(&mut self.effect, &self.params, output, self.channels, |buf| {
            match decoder.read(buf) {
                Ok(n) => n,
                Err(e) => {
                    decode_error = Some(e);
                    0
                }
            }
        });
        if let Some(e) = decode_error {
            self.finished = true;
            return Err(e);
        }

        self.processed += consumed as u64;
        let rendered = if self.params.is_active() {
            // The stretcher always emits a full block while it is being fed
            if consumed == 0 {
                0
            } else {
                frames
            }
        } else {
            consumed
        };

        let known_end = self.format.has_known_length() && self.processed >= self.format.total_frames;
        if rendered == 0 || known_end || (!self.params.is_active() && consumed < frames) {
            self.finished = true;
        }

        let output = &mut output[..rendered * self.channels];
        if self.snapshot.muted {
            output.fill(0.0);
        } else {
            apply_gain(output, self.channels, self.snapshot.volume, self.snapshot.pan);
        }
        Ok(rendered)
    }
}

/// Emits progress only when it moves by at least [`PROGRESS_STEP`]
struct ProgressThrottle {
    last: f32,
}

impl ProgressThrottle {
    fn new() -> Self {
        Self { last: 0.0 }
    }

    fn update(&mut self, fraction: f32) -> Option<f32> {
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction > self.last && (fraction >= 1.0 || fraction - self.last >= PROGRESS_STEP) {
            self.last = fraction;
            Some(fraction)
        } else {
            None
        }
    }

    /// Final report on success
    fn finish(&mut self) -> Option<f32> {
        self.update(1.0)
    }
}

fn fraction(processed: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (processed as f64 / total as f64) as f32
    }
}

fn encoder_config(config: &ExtractionConfig, source_rate: u32, channels: u16) -> EncoderConfig {
    let sample_rate = match config.sample_rate {
        Some(rate) if rate != source_rate => {
            log::warn!(
                "[EXTRACT] Writing {} Hz header for {} Hz material (no resampling)",
                rate,
                source_rate
            );
            rate
        }
        Some(rate) => rate,
        None => source_rate,
    };
    EncoderConfig {
        format: config.format,
        sample_rate,
        channels,
        bits_per_sample: config.bits_per_sample,
        bitrate: config.bitrate,
    }
}

/// Close the encoder and build the summary, or remove the partial file
fn finish(
    mut encoder: Encoder,
    encoder_config: &EncoderConfig,
    outcome: Result<(), ExtractionError>,
) -> ExtractionResult {
    let closed = encoder.close().map_err(ExtractionError::Encoder);
    match outcome.and(closed) {
        Ok(()) => {
            let summary = ExtractionSummary {
                output_path: encoder.path().to_path_buf(),
                format: encoder_config.format,
                sample_rate: encoder_config.sample_rate,
                channels: encoder_config.channels,
                bitrate: encoder_config.bitrate,
                frames_written: encoder.frames_written(),
                file_size_bytes: encoder.file_size_bytes(),
            };
            log::info!(
                "[EXTRACT] Wrote {} frames ({} bytes) to {:?}",
                summary.frames_written,
                summary.file_size_bytes,
                summary.output_path
            );
            Ok(summary)
        }
        Err(e) => {
            discard_output(encoder.path());
            if e.is_cancelled() {
                log::info!("[EXTRACT] Cancelled, removed {:?}", encoder.path());
            } else {
                log::error!("[EXTRACT] {} ({:?} removed)", e, encoder.path());
            }
            Err(e)
        }
    }
}

fn discard_output(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("[EXTRACT] Failed to remove partial output {:?}: {}", path, e);
        }
    }
}

/// Render one track to `output`.
///
/// `cancel` is checked before every block; `progress` receives the
/// fraction of source frames consumed, throttled to 1% steps, and a final
/// 1.0 on success.
pub fn extract_track(
    snapshot: &TrackSnapshot,
    output: &Path,
    config: &ExtractionConfig,
    cancel: &AtomicBool,
    progress: &mut dyn FnMut(f32),
) -> ExtractionResult {
    let mut track =
        OfflineTrack::open(snapshot.clone(), config.include_effects).map_err(ExtractionError::Source)?;
    let format = track.format();
    let encoder_config = encoder_config(config, format.sample_rate, format.channels);
    let mut encoder = Encoder::open(output, &encoder_config).map_err(ExtractionError::Encoder)?;

    log::info!(
        "[EXTRACT] Track '{}' -> {:?} ({} Hz, {} ch, effects {})",
        snapshot.id,
        output,
        encoder_config.sample_rate,
        encoder_config.channels,
        if config.include_effects { "on" } else { "off" }
    );

    let outcome = render_track(&mut track, &mut encoder, cancel, progress);
    finish(encoder, &encoder_config, outcome)
}

fn render_track(
    track: &mut OfflineTrack,
    encoder: &mut Encoder,
    cancel: &AtomicBool,
    progress: &mut dyn FnMut(f32),
) -> Result<(), ExtractionError> {
    let channels = track.channels();
    let total = track.format().total_frames;
    let mut buffer = vec![0.0; RENDER_CHUNK_FRAMES * channels];
    let mut throttle = ProgressThrottle::new();

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(ExtractionError::Cancelled);
        }

        let frames = match track.remaining_output_frames() {
            Some(0) => break,
            Some(remaining) => remaining.min(RENDER_CHUNK_FRAMES as u64) as usize,
            None => RENDER_CHUNK_FRAMES,
        };

        let rendered = track.render(&mut buffer, frames).map_err(ExtractionError::Source)?;
        if rendered == 0 {
            break;
        }
        encoder
            .write(&buffer[..rendered * channels])
            .map_err(ExtractionError::Encoder)?;

        if let Some(f) = throttle.update(fraction(track.processed_frames(), total)) {
            progress(f);
        }
    }

    if let Some(f) = throttle.finish() {
        progress(f);
    }
    Ok(())
}

/// Render the mix of `snapshots` to a stereo file at `output`.
///
/// Solo and mute resolve as in the live mixer. Each track enters at its
/// start offset (negative offsets count as zero) and drops out when its
/// source ends; the render stops once every eligible track has ended.
/// Progress follows the furthest-advanced track against the longest source.
pub fn extract_mix(
    snapshots: &[TrackSnapshot],
    master_volume: f32,
    output: &Path,
    config: &ExtractionConfig,
    cancel: &AtomicBool,
    progress: &mut dyn FnMut(f32),
) -> ExtractionResult {
    if snapshots.is_empty() {
        return Err(ExtractionError::NoTracks);
    }

    let has_solo = snapshots.iter().any(|s| s.solo);
    let mut tracks = Vec::new();
    for snapshot in snapshots {
        if snapshot.muted || (has_solo && !snapshot.solo) {
            log::debug!("[EXTRACT] Skipping '{}' (muted or not soloed)", snapshot.id);
            continue;
        }
        let track = OfflineTrack::open(snapshot.clone(), config.include_effects)
            .map_err(ExtractionError::Source)?;
        tracks.push(track);
    }

    let source_rate = tracks
        .first()
        .map(|t| t.format().sample_rate)
        .unwrap_or(DEFAULT_SAMPLE_RATE);
    for track in &tracks {
        if track.format().sample_rate != source_rate {
            log::warn!(
                "[EXTRACT] Track '{}' is {} Hz, mix is {} Hz (no resampling)",
                track.snapshot().id,
                track.format().sample_rate,
                source_rate
            );
        }
    }

    let encoder_config = encoder_config(config, source_rate, 2);
    let mut encoder = Encoder::open(output, &encoder_config).map_err(ExtractionError::Encoder)?;

    log::info!(
        "[EXTRACT] Mix of {} tracks ({} eligible) -> {:?}",
        snapshots.len(),
        tracks.len(),
        output
    );

    let outcome = render_mix(&mut tracks, master_volume, &mut encoder, cancel, progress);
    finish(encoder, &encoder_config, outcome)
}

fn render_mix(
    tracks: &mut [OfflineTrack],
    master_volume: f32,
    encoder: &mut Encoder,
    cancel: &AtomicBool,
    progress: &mut dyn FnMut(f32),
) -> Result<(), ExtractionError> {
    let total = tracks
        .iter()
        .map(|t| t.format().total_frames)
        .max()
        .unwrap_or(0);
    let mut bus = vec![StereoSample::silence(); RENDER_CHUNK_FRAMES];
    let mut scratch = vec![0.0; RENDER_CHUNK_FRAMES * 2];
    let mut throttle = ProgressThrottle::new();
    let mut position: i64 = 0;

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(ExtractionError::Cancelled);
        }

        // Longest remaining span across tracks still playing
        let remaining = tracks
            .iter()
            .filter(|t| !t.is_finished())
            .map(|t| {
                let lead = (t.snapshot().start_offset.max(0) - position).max(0) as u64;
                lead + t.remaining_output_frames().unwrap_or(RENDER_CHUNK_FRAMES as u64)
            })
            .max()
            .unwrap_or(0);
        if remaining == 0 {
            break;
        }
        let frames = remaining.min(RENDER_CHUNK_FRAMES as u64) as usize;

        let block = &mut bus[..frames];
        block.fill(StereoSample::silence());
        for track in tracks.iter_mut().filter(|t| !t.is_finished()) {
            let track_frame = position - track.snapshot().start_offset.max(0);
            if track_frame + frames as i64 <= 0 {
                continue;
            }
            let skip = (-track_frame).max(0) as usize;
            let channels = track.channels();
            let rendered = track
                .render(&mut scratch, frames - skip)
                .map_err(ExtractionError::Source)?;
            sum_into(&mut block[skip..skip + rendered], &scratch[..rendered * channels], channels);
        }
        master_and_clip(block, master_volume);

        encoder
            .write(bytemuck::cast_slice(block))
            .map_err(ExtractionError::Encoder)?;
        position += frames as i64;

        let furthest = tracks.iter().map(|t| t.processed_frames()).max().unwrap_or(0);
        if let Some(f) = throttle.update(fraction(furthest, total)) {
            progress(f);
        }
    }

    if let Some(f) = throttle.finish() {
        progress(f);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_file::test_util::{write_constant_wav, write_sine_wav};
    use crate::audio_file::FileFormat;
    use crate::types::channel_rms;
    use tempfile::tempdir;

    fn run_track(snapshot: &TrackSnapshot, output: &Path, config: &ExtractionConfig) -> (ExtractionResult, Vec<f32>) {
        let cancel = AtomicBool::new(false);
        let mut reports = Vec::new();
        let result = extract_track(snapshot, output, config, &cancel, &mut |f| reports.push(f));
        (result, reports)
    }

    fn read_wav(path: &Path) -> (hound::WavSpec, Vec<f32>) {
        let mut reader = hound::WavReader::open(path).unwrap();
        let spec = reader.spec();
        let samples = reader
            .samples::<i16>()
            .map(|s| s.unwrap() as f32 / i16::MAX as f32)
            .collect();
        (spec, samples)
    }

    fn assert_progress_sane(reports: &[f32]) {
        assert!(!reports.is_empty());
        assert!(reports.windows(2).all(|w| w[1] >= w[0]), "{:?}", reports);
        assert!(reports.iter().all(|f| (0.0..=1.0).contains(f)));
        assert!(*reports.last().unwrap() >= 0.99);
    }

    #[test]
    fn test_single_track_copies_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.wav");
        let out = dir.path().join("out.wav");
        write_sine_wav(&src, 48000, 1, 48000, 0.5);

        let (result, reports) = run_track(&TrackSnapshot::new("a", &src), &out, &ExtractionConfig::default());
        let summary = result.unwrap();
        assert_eq!(summary.frames_written, 48000);
        assert_eq!(summary.channels, 1);
        assert_eq!(summary.duration_ms(), 1000);
        assert!(summary.file_size_bytes > 96000);
        assert_progress_sane(&reports);

        let (spec, samples) = read_wav(&out);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(samples.len(), 48000);
    }

    #[test]
    fn test_volume_applied() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.wav");
        let out = dir.path().join("out.wav");
        write_constant_wav(&src, 48000, 1, 4800, 0.5);

        let mut snapshot = TrackSnapshot::new("a", &src);
        snapshot.volume = 0.5;
        run_track(&snapshot, &out, &ExtractionConfig::default()).0.unwrap();

        let (_, samples) = read_wav(&out);
        assert!(samples.iter().all(|s| (s - 0.25).abs() < 1e-3));
    }

    #[test]
    fn test_stretch_halves_length() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.wav");
        let out = dir.path().join("out.wav");
        write_sine_wav(&src, 48000, 2, 48000, 0.5);

        let mut snapshot = TrackSnapshot::new("a", &src);
        snapshot.stretch = 2.0;
        let (result, reports) = run_track(&snapshot, &out, &ExtractionConfig::default());
        let summary = result.unwrap();
        let expected = 24000i64;
        assert!(
            (summary.frames_written as i64 - expected).abs() <= expected / 20,
            "wrote {}",
            summary.frames_written
        );
        assert_progress_sane(&reports);
    }

    #[test]
    fn test_effects_excluded() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.wav");
        let out = dir.path().join("out.wav");
        write_sine_wav(&src, 48000, 1, 9600, 0.5);

        let mut snapshot = TrackSnapshot::new("a", &src);
        snapshot.stretch = 2.0;
        snapshot.pitch = 5.0;
        let config = ExtractionConfig {
            include_effects: false,
            ..Default::default()
        };
        let summary = run_track(&snapshot, &out, &config).0.unwrap();
        assert_eq!(summary.frames_written, 9600);
    }

    #[test]
    fn test_cancel_before_start_leaves_no_file() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.wav");
        let out = dir.path().join("out.wav");
        write_sine_wav(&src, 48000, 1, 48000, 0.5);

        let cancel = AtomicBool::new(true);
        let result = extract_track(
            &TrackSnapshot::new("a", &src),
            &out,
            &ExtractionConfig::default(),
            &cancel,
            &mut |_| {},
        );
        let err = result.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "Extraction cancelled");
        assert!(!out.exists());
    }

    #[test]
    fn test_cancel_mid_render_removes_partial() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.wav");
        let out = dir.path().join("out.wav");
        write_sine_wav(&src, 48000, 2, 96000, 0.5);

        let cancel = AtomicBool::new(false);
        let mut reports = 0;
        let result = extract_track(
            &TrackSnapshot::new("a", &src),
            &out,
            &ExtractionConfig::default(),
            &cancel,
            &mut |_| {
                reports += 1;
                cancel.store(true, Ordering::Relaxed);
            },
        );
        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(reports, 1);
        assert!(!out.exists());
    }

    #[test]
    fn test_unsupported_output_format() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.wav");
        let out = dir.path().join("out.mp3");
        write_sine_wav(&src, 48000, 1, 4800, 0.5);

        let config = ExtractionConfig {
            format: FileFormat::Mp3,
            ..Default::default()
        };
        let err = run_track(&TrackSnapshot::new("a", &src), &out, &config).0.unwrap_err();
        assert!(matches!(err, ExtractionError::Encoder(AudioFileError::UnsupportedFormat(_))));
        assert!(!out.exists());
    }

    #[test]
    fn test_missing_source() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.wav");
        let snapshot = TrackSnapshot::new("ghost", dir.path().join("ghost.wav"));
        let err = run_track(&snapshot, &out, &ExtractionConfig::default()).0.unwrap_err();
        assert!(matches!(err, ExtractionError::Source(_)));
        assert!(!out.exists());
    }

    fn run_mix(
        snapshots: &[TrackSnapshot],
        master: f32,
        output: &Path,
    ) -> (ExtractionResult, Vec<f32>) {
        let cancel = AtomicBool::new(false);
        let mut reports = Vec::new();
        let result = extract_mix(
            snapshots,
            master,
            output,
            &ExtractionConfig::default(),
            &cancel,
            &mut |f| reports.push(f),
        );
        (result, reports)
    }

    #[test]
    fn test_mix_solo_resolution() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left.wav");
        let right = dir.path().join("right.wav");
        let out = dir.path().join("mix.wav");
        write_constant_wav(&left, 48000, 2, 24000, 0.5);
        write_constant_wav(&right, 48000, 2, 24000, 0.5);

        let mut a = TrackSnapshot::new("left", &left);
        a.pan = -1.0;
        a.solo = true;
        let mut b = TrackSnapshot::new("right", &right);
        b.pan = 1.0;

        let (result, reports) = run_mix(&[a, b], 1.0, &out);
        let summary = result.unwrap();
        assert_eq!(summary.channels, 2);
        assert_eq!(summary.frames_written, 24000);
        assert_progress_sane(&reports);

        let (_, samples) = read_wav(&out);
        assert!(channel_rms(&samples, 2, 0) > 0.1);
        assert!(channel_rms(&samples, 2, 1) < 1e-3);
    }

    #[test]
    fn test_mix_clips_and_upmixes() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        let out = dir.path().join("mix.wav");
        write_constant_wav(&a, 48000, 1, 4800, 0.9);
        write_constant_wav(&b, 48000, 1, 2400, 0.9);

        let (result, _) = run_mix(&[TrackSnapshot::new("a", &a), TrackSnapshot::new("b", &b)], 2.0, &out);
        assert_eq!(result.unwrap().frames_written, 4800);

        let (spec, samples) = read_wav(&out);
        assert_eq!(spec.channels, 2);
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
        // Shorter track ended; the longer one alone is still over full scale
        assert!((samples[2 * 3000] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_mix_honors_start_offset() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        let out = dir.path().join("mix.wav");
        write_constant_wav(&a, 48000, 1, 4800, 0.25);
        write_constant_wav(&b, 48000, 1, 4800, 0.25);

        let mut late = TrackSnapshot::new("b", &b);
        late.start_offset = 2400;
        let (result, _) = run_mix(&[TrackSnapshot::new("a", &a), late], 1.0, &out);
        assert_eq!(result.unwrap().frames_written, 7200);

        let (_, samples) = read_wav(&out);
        let left = |frame: usize| samples[frame * 2];
        assert!((left(100) - 0.25).abs() < 1e-3);
        assert!((left(3000) - 0.5).abs() < 1e-3);
        assert!((left(6000) - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_mix_all_muted_writes_empty_file() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let out = dir.path().join("mix.wav");
        write_constant_wav(&a, 48000, 1, 4800, 0.25);

        let mut muted = TrackSnapshot::new("a", &a);
        muted.muted = true;
        let (result, _) = run_mix(&[muted], 1.0, &out);
        assert_eq!(result.unwrap().frames_written, 0);
    }

    #[test]
    fn test_mix_requires_tracks() {
        let dir = tempdir().unwrap();
        let (result, _) = run_mix(&[], 1.0, &dir.path().join("mix.wav"));
        assert!(matches!(result, Err(ExtractionError::NoTracks)));
    }
}
