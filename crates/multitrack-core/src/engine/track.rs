//! A loaded track: decoder, streaming buffer, fill thread and controls
//!
//! The decoder and the ring's producer half live in a [`TrackFeeder`] owned
//! by a background fill thread. The ring's consumer half and the effect stage
//! live in a [`TrackReader`] that only the renderer touches. The audio thread
//! reaches the reader with `try_lock`, so a seek holding the lock costs one
//! silent block rather than a wait.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::audio_file::{AudioFileError, AudioFormat, Decoder};
use crate::effect::{EffectFrame, EffectParams, FloatParam, PAN_RANGE, VOLUME_RANGE};
use crate::ring_buffer::{RingBuffer, RingConsumer, RingProducer};
use crate::types::{Sample, FILL_CHUNK_FRAMES};

use super::render::{apply_gain, render_source};

/// Minimum gap between underrun warnings for one track
const UNDERRUN_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Streaming parameters for a track
#[derive(Debug, Clone, Copy)]
pub struct TrackSettings {
    /// Ring buffer length in seconds of source audio
    pub ring_seconds: f32,
    /// Frames decoded per fill iteration
    pub fill_chunk_frames: usize,
    /// Upper bound on how long the fill thread sleeps between checks
    pub poll_interval: Duration,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            ring_seconds: 1.0,
            fill_chunk_frames: FILL_CHUNK_FRAMES,
            poll_interval: Duration::from_millis(5),
        }
    }
}

/// User-facing per-track controls, all lock-free
#[derive(Debug)]
pub struct TrackControls {
    pub volume: FloatParam,
    pub pan: FloatParam,
    pub mute: AtomicBool,
    pub solo: AtomicBool,
    pub effect: EffectParams,
}

impl Default for TrackControls {
    fn default() -> Self {
        Self {
            volume: FloatParam::new(1.0, VOLUME_RANGE),
            pan: FloatParam::new(0.0, PAN_RANGE),
            mute: AtomicBool::new(false),
            solo: AtomicBool::new(false),
            effect: EffectParams::default(),
        }
    }
}

/// Consumer side: what the renderer needs
struct TrackReader {
    consumer: RingConsumer,
    effect: EffectFrame,
}

/// Producer side: what the fill thread needs
struct TrackFeeder {
    decoder: Decoder,
    producer: RingProducer,
    /// Decoder hit end of stream (or failed) since the last seek
    exhausted: bool,
}

enum FillStatus {
    Wrote,
    Full,
    Exhausted,
}

/// State shared between the track handle and its fill thread
struct FillShared {
    shutdown: AtomicBool,
    /// Mirrors `TrackFeeder::exhausted` for the reader
    exhausted: AtomicBool,
    underruns: AtomicU64,
    wake_lock: Mutex<()>,
    wake: Condvar,
}

impl FillShared {
    fn notify(&self) {
        self.wake.notify_one();
    }
}

/// One loaded audio source placed on the timeline
pub struct Track {
    id: String,
    path: PathBuf,
    format: AudioFormat,
    channels: usize,
    /// Timeline frame where this track's first frame plays
    start_offset: AtomicI64,
    controls: TrackControls,
    reader: Mutex<TrackReader>,
    feeder: Arc<Mutex<TrackFeeder>>,
    shared: Arc<FillShared>,
    fill_thread: Mutex<Option<JoinHandle<()>>>,
    chunk_samples: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Track {
    /// Open `path` and start streaming it.
    ///
    /// The ring holds `rate * channels * ring_seconds` samples and the fill
    /// thread starts priming it immediately.
    pub fn open(
        id: &str,
        path: &Path,
        start_offset: i64,
        settings: TrackSettings,
    ) -> Result<Self, AudioFileError> {
        let decoder = Decoder::open(path)?;
        let format = decoder.format();
        let channels = format.channels as usize;

        let chunk_frames = settings.fill_chunk_frames.max(1);
        let ring_samples = ((format.sample_rate as f32 * settings.ring_seconds.max(0.0)) as usize
            * channels)
            // room for at least two chunks so the fill loop can make progress
            .max(chunk_frames * channels * 2 + 1);
        let (producer, consumer) = RingBuffer::new(ring_samples);

        let reader = TrackReader {
            consumer,
            effect: EffectFrame::for_playback(format.channels, format.sample_rate),
        };
        let feeder = Arc::new(Mutex::new(TrackFeeder {
            decoder,
            producer,
            exhausted: false,
        }));
        let shared = Arc::new(FillShared {
            shutdown: AtomicBool::new(false),
            exhausted: AtomicBool::new(false),
            underruns: AtomicU64::new(0),
            wake_lock: Mutex::new(()),
            wake: Condvar::new(),
        });

        let fill_thread = {
            let feeder = Arc::clone(&feeder);
            let shared = Arc::clone(&shared);
            let id = id.to_string();
            let poll = settings.poll_interval;
            thread::Builder::new()
                .name(format!("track-fill-{}", id))
                .spawn(move || fill_loop(id, feeder, shared, chunk_frames, channels, poll))?
        };

        log::info!(
            "[TRACK] Loaded '{}' from {:?}: {}Hz {}ch {} frames, ring {} samples",
            id,
            path,
            format.sample_rate,
            format.channels,
            format.total_frames,
            ring_samples
        );

        Ok(Self {
            id: id.to_string(),
            path: path.to_path_buf(),
            format,
            channels,
            start_offset: AtomicI64::new(start_offset),
            controls: TrackControls::default(),
            reader: Mutex::new(reader),
            feeder,
            shared,
            fill_thread: Mutex::new(Some(fill_thread)),
            chunk_samples: chunk_frames * channels,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Length in source frames
    pub fn duration_frames(&self) -> i64 {
        self.format.total_frames as i64
    }

    pub fn is_loaded(&self) -> bool {
        !self.shared.shutdown.load(Ordering::Acquire)
    }

    #[inline]
    pub fn start_offset(&self) -> i64 {
        self.start_offset.load(Ordering::Acquire)
    }

    pub fn set_start_offset(&self, frames: i64) {
        self.start_offset.store(frames, Ordering::Release);
    }

    pub fn controls(&self) -> &TrackControls {
        &self.controls
    }

    pub fn volume(&self) -> f32 {
        self.controls.volume.get()
    }

    pub fn set_volume(&self, volume: f32) {
        self.controls.volume.set(volume);
    }

    pub fn pan(&self) -> f32 {
        self.controls.pan.get()
    }

    pub fn set_pan(&self, pan: f32) {
        self.controls.pan.set(pan);
    }

    #[inline]
    pub fn is_muted(&self) -> bool {
        self.controls.mute.load(Ordering::Relaxed)
    }

    pub fn set_muted(&self, muted: bool) {
        self.controls.mute.store(muted, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_solo(&self) -> bool {
        self.controls.solo.load(Ordering::Relaxed)
    }

    pub fn set_solo(&self, solo: bool) {
        self.controls.solo.store(solo, Ordering::Relaxed);
    }

    pub fn pitch(&self) -> f32 {
        self.controls.effect.pitch.get()
    }

    pub fn set_pitch(&self, semitones: f32) {
        self.controls.effect.pitch.set(semitones);
    }

    pub fn stretch(&self) -> f32 {
        self.controls.effect.stretch.get()
    }

    pub fn set_stretch(&self, factor: f32) {
        self.controls.effect.stretch.set(factor);
    }

    /// Times a read came up short before the end of the stream
    pub fn underrun_count(&self) -> u64 {
        self.shared.underruns.load(Ordering::Relaxed)
    }

    /// Samples currently buffered ahead of the reader
    pub fn buffered_samples(&self) -> usize {
        match self.reader.try_lock() {
            Ok(reader) => reader.consumer.available(),
            Err(_) => 0,
        }
    }

    /// Render `frames` frames of this track into `output` (interleaved at
    /// the track's channel count). Real-time safe.
    ///
    /// Muted tracks produce zeros without consuming the buffer. Missing data
    /// is zero-filled.
    pub fn read_samples(&self, output: &mut [Sample], frames: usize) -> usize {
        let len = (frames * self.channels).min(output.len());
        let output = &mut output[..len];
        let frames = len / self.channels;

        if self.is_muted() {
            output.fill(0.0);
            return frames;
        }

        let Ok(mut guard) = self.reader.try_lock() else {
            // seek in progress
            output.fill(0.0);
            return frames;
        };
        let reader = &mut *guard;
        let channels = self.channels;
        let mut wanted = 0usize;
        let mut got = 0usize;
        {
            let consumer = &mut reader.consumer;
            render_source(
                &mut reader.effect,
                &self.controls.effect,
                output,
                channels,
                |buf| {
                    let want = buf.len() / channels;
                    let n = consumer.read(&mut buf[..want * channels]) / channels;
                    wanted += want;
                    got += n;
                    n
                },
            );
        }
        let free = reader.consumer.free_space();
        drop(guard);

        if got < wanted && !self.shared.exhausted.load(Ordering::Acquire) {
            self.shared.underruns.fetch_add(1, Ordering::Relaxed);
        }
        if free >= self.chunk_samples {
            self.shared.notify();
        }

        apply_gain(output, channels, self.volume(), self.pan());
        frames
    }

    /// Reposition the track at source frame `frame`.
    ///
    /// Clamps to `[0, total_frames]`, discards buffered audio, clears the
    /// effect stage and reseeks the decoder. The fill thread refills.
    pub fn seek(&self, frame: i64) -> Result<(), AudioFileError> {
        let mut target = frame.max(0);
        if self.format.has_known_length() {
            target = target.min(self.duration_frames());
        }

        let mut reader = lock(&self.reader);
        let mut feeder = lock(&self.feeder);
        reader.consumer.reset(&mut feeder.producer);
        reader.effect.reset();
        feeder.exhausted = false;
        self.shared.exhausted.store(false, Ordering::Release);
        let result = feeder.decoder.seek(target as u64);
        drop(feeder);
        drop(reader);

        self.shared.notify();
        log::debug!("[TRACK] '{}' seek to frame {}", self.id, target);
        result
    }

    /// Stop the fill thread and wait for it. Idempotent.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.notify();
        if let Some(handle) = lock(&self.fill_thread).take() {
            if handle.join().is_err() {
                log::error!("[TRACK] Fill thread for '{}' panicked", self.id);
            }
            log::debug!("[TRACK] '{}' fill thread stopped", self.id);
        }
    }
}

#[cfg(test)]
impl Track {
    /// Block until the fill thread has buffered `samples` or hit the end
    pub(crate) fn wait_until_buffered(&self, samples: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.buffered_samples() < samples && !self.shared.exhausted.load(Ordering::Acquire) {
            assert!(Instant::now() < deadline, "fill thread never buffered");
            thread::sleep(Duration::from_millis(2));
        }
    }
}

impl Drop for Track {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl TrackFeeder {
    fn fill_once(&mut self, scratch: &mut [Sample], channels: usize, shared: &FillShared) -> FillStatus {
        if self.exhausted {
            return FillStatus::Exhausted;
        }
        if self.producer.free_space() < scratch.len() {
            return FillStatus::Full;
        }
        match self.decoder.read(scratch) {
            Ok(0) => {
                self.exhausted = true;
                shared.exhausted.store(true, Ordering::Release);
                FillStatus::Exhausted
            }
            Ok(frames) => {
                self.producer.write(&scratch[..frames * channels]);
                FillStatus::Wrote
            }
            Err(e) => {
                log::error!("[TRACK] Decode failed, stopping fill: {}", e);
                self.exhausted = true;
                shared.exhausted.store(true, Ordering::Release);
                FillStatus::Exhausted
            }
        }
    }
}

fn fill_loop(
    id: String,
    feeder: Arc<Mutex<TrackFeeder>>,
    shared: Arc<FillShared>,
    chunk_frames: usize,
    channels: usize,
    poll: Duration,
) {
    let mut scratch = vec![0.0 as Sample; chunk_frames * channels];
    let mut logged_underruns = 0u64;
    let mut last_log = Instant::now();

    while !shared.shutdown.load(Ordering::Acquire) {
        let status = lock(&feeder).fill_once(&mut scratch, channels, &shared);

        let underruns = shared.underruns.load(Ordering::Relaxed);
        if underruns > logged_underruns && last_log.elapsed() >= UNDERRUN_LOG_INTERVAL {
            log::warn!(
                "[TRACK] '{}' buffer underrun ({} new, {} total)",
                id,
                underruns - logged_underruns,
                underruns
            );
            logged_underruns = underruns;
            last_log = Instant::now();
        }

        match status {
            FillStatus::Wrote => continue,
            FillStatus::Full | FillStatus::Exhausted => {
                let guard = lock(&shared.wake_lock);
                // Hint only; the timeout bounds the wait either way
                let _ = shared.wake.wait_timeout(guard, poll);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_file::test_util::write_constant_wav;
    use tempfile::tempdir;

    fn wait_for_buffer(track: &Track, samples: usize) {
        track.wait_until_buffered(samples);
    }

    fn open(dir: &Path, name: &str, channels: u16, value: f32) -> Track {
        let path = dir.join(name);
        write_constant_wav(&path, 48000, channels, 48000, value);
        Track::open(name, &path, 0, TrackSettings::default()).unwrap()
    }

    #[test]
    fn test_open_reports_format() {
        let dir = tempdir().unwrap();
        let track = open(dir.path(), "a.wav", 2, 0.5);
        assert_eq!(track.channels(), 2);
        assert_eq!(track.duration_frames(), 48000);
        assert!(track.is_loaded());
        track.shutdown();
        assert!(!track.is_loaded());
    }

    #[test]
    fn test_read_applies_gain() {
        let dir = tempdir().unwrap();
        let track = open(dir.path(), "mono.wav", 1, 0.5);
        track.set_volume(0.5);
        wait_for_buffer(&track, 512);

        let mut out = vec![0.0f32; 512];
        assert_eq!(track.read_samples(&mut out, 512), 512);
        assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_muted_read_is_zero_and_does_not_consume() {
        let dir = tempdir().unwrap();
        let track = open(dir.path(), "mute.wav", 2, 0.5);
        wait_for_buffer(&track, 2048);

        track.set_muted(true);
        let before = track.buffered_samples();
        let mut out = vec![1.0f32; 1024];
        assert_eq!(track.read_samples(&mut out, 512), 512);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(track.buffered_samples() >= before);

        track.set_muted(false);
        track.read_samples(&mut out, 512);
        assert!(out.iter().all(|&s| s > 0.0));
    }

    #[test]
    fn test_seek_clamps_and_refills() {
        let dir = tempdir().unwrap();
        let track = open(dir.path(), "seek.wav", 1, 0.5);
        track.seek(1_000_000).unwrap();
        // At the end: nothing more to buffer
        thread::sleep(Duration::from_millis(50));
        assert_eq!(track.buffered_samples(), 0);

        track.seek(-10).unwrap();
        wait_for_buffer(&track, 4096);
    }

    #[test]
    fn test_seek_clears_stretched_history() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("burst.wav");
        // 440 Hz tone for the first half second, silence after
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..48000 {
            let value = if i < 24000 {
                (i as f32 / 48000.0 * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5
            } else {
                0.0
            };
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();

        let track = Track::open("burst", &path, 0, TrackSettings::default()).unwrap();
        track.set_pitch(3.0);
        track.set_stretch(1.25);

        let mut out = vec![0.0f32; 512];
        let mut peak = 0.0f32;
        for _ in 0..24 {
            wait_for_buffer(&track, 1024);
            track.read_samples(&mut out, 512);
            peak = out.iter().fold(peak, |p, s| p.max(s.abs()));
        }
        assert!(peak > 0.05, "stretched tone never came out: {}", peak);

        // Into the silent half: nothing from the tone may remain
        track.seek(30000).unwrap();
        for _ in 0..8 {
            wait_for_buffer(&track, 1024);
            track.read_samples(&mut out, 512);
            assert!(out.iter().all(|s| s.abs() < 1e-3));
        }
    }

    #[test]
    fn test_parameters_clamped() {
        let dir = tempdir().unwrap();
        let track = open(dir.path(), "params.wav", 2, 0.1);
        track.set_volume(3.0);
        track.set_pan(-4.0);
        track.set_pitch(13.0);
        track.set_stretch(9.0);
        assert_eq!(track.volume(), 2.0);
        assert_eq!(track.pan(), -1.0);
        assert_eq!(track.pitch(), 12.0);
        assert_eq!(track.stretch(), 2.0);
    }

    #[test]
    fn test_underrun_zero_fills() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.wav");
        write_constant_wav(&path, 48000, 1, 100, 0.5);
        let track = Track::open("short", &path, 0, TrackSettings::default()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !track.shared.exhausted.load(Ordering::Acquire) {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(2));
        }

        let mut out = vec![1.0f32; 256];
        track.read_samples(&mut out, 256);
        assert!(out[..100].iter().all(|&s| (s - 0.5).abs() < 1e-6));
        assert!(out[100..].iter().all(|&s| s == 0.0));
        // past the end is not an underrun
        assert_eq!(track.underrun_count(), 0);
    }
}
