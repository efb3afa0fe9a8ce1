//! Main audio engine - ties together the track registry, timeline, output
//! stream and extraction queue
//!
//! # Architecture
//!
//! ```text
//!   control thread                      audio thread
//! ┌──────────────────┐  publish   ┌──────────────────────┐
//! │  AudioEngine     │───────────►│ MixBus (SharedCell)  │◄── StreamRenderer
//! │  TrackRegistry   │            └──────────────────────┘        ▲
//! │  Timeline        │──── Clock / Transport (atomics) ───────────┘
//! └────────┬─────────┘
//!          │ submit                extraction worker
//!          ▼                     ┌──────────────────────┐
//!   ExtractionQueue ────────────►│ snapshots + decoders │──► Encoder
//!                                └──────────────────────┘
//! ```
//!
//! Every failing operation returns an [`EngineError`] and also records it as
//! the last error and passes it to the registered error callback.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use basedrop::Shared;
use crossbeam::channel::Sender;

use crate::audio::{
    default_backend, AudioBackend, AudioError, StreamEngine, StreamHealth, StreamInfo,
};
use crate::audio_file::FileFormat;
use crate::config::EngineConfig;
use crate::effect::EffectParams;
use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::export::{
    self, CompletionCallback, ExtractionConfig, ExtractionJob, ExtractionProgress,
    ExtractionQueue, ExtractionSummary, ExtractionTarget, JobSources, ProgressCallback,
    TrackResolver, TrackSnapshot,
};
use crate::timeline::{Timeline, TransportState};

use super::gc::gc_handle;
use super::mixer::MixBus;
use super::track::Track;

/// Called with every error the engine reports
pub type ErrorCallback = Arc<dyn Fn(ErrorCode, &str) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Error reporting
// ============================================================================

/// Per-engine last-error slot plus the user callback
struct ErrorState {
    last: Mutex<(ErrorCode, String)>,
    callback: Mutex<Option<ErrorCallback>>,
}

impl ErrorState {
    fn new() -> Self {
        Self {
            last: Mutex::new((ErrorCode::Ok, String::new())),
            callback: Mutex::new(None),
        }
    }

    fn report(&self, error: &EngineError) {
        let code = error.code();
        let message = error.to_string();
        log::error!("[ENGINE] {} ({})", message, code);
        *lock(&self.last) = (code, message.clone());

        let callback = lock(&self.callback).clone();
        if let Some(callback) = callback {
            callback(code, &message);
        }
    }
}

// ============================================================================
// Track registry
// ============================================================================

/// Loaded tracks in load order.
///
/// Every membership change republishes the set to the [`MixBus`].
struct TrackRegistry {
    tracks: Mutex<Vec<Shared<Track>>>,
    bus: Arc<MixBus>,
}

impl TrackRegistry {
    fn new(bus: Arc<MixBus>) -> Self {
        Self {
            tracks: Mutex::new(Vec::new()),
            bus,
        }
    }

    fn publish(&self, tracks: &[Shared<Track>]) {
        self.bus.publish(tracks.to_vec());
    }

    fn find(&self, id: &str) -> Option<Shared<Track>> {
        lock(&self.tracks).iter().find(|t| t.id() == id).cloned()
    }

    fn all(&self) -> Vec<Shared<Track>> {
        lock(&self.tracks).clone()
    }

    fn remove(&self, id: &str) -> Option<Shared<Track>> {
        let mut tracks = lock(&self.tracks);
        let index = tracks.iter().position(|t| t.id() == id)?;
        let track = tracks.remove(index);
        self.publish(&tracks);
        Some(track)
    }

    fn clear(&self) -> Vec<Shared<Track>> {
        let mut tracks = lock(&self.tracks);
        let removed = std::mem::take(&mut *tracks);
        self.publish(&tracks);
        removed
    }

    /// `(start_offset, length)` of every track
    fn spans(&self) -> Vec<(i64, i64)> {
        lock(&self.tracks)
            .iter()
            .map(|t| (t.start_offset(), t.duration_frames()))
            .collect()
    }
}

impl TrackResolver for TrackRegistry {
    fn resolve(&self, target: &ExtractionTarget) -> Result<JobSources, export::ExtractionError> {
        let tracks = match target {
            ExtractionTarget::Track(id) => {
                let track = self
                    .find(id)
                    .ok_or_else(|| export::ExtractionError::TrackNotFound(id.clone()))?;
                vec![TrackSnapshot::capture(&track)]
            }
            ExtractionTarget::Mix => self.all().iter().map(|t| TrackSnapshot::capture(t)).collect(),
        };
        Ok(JobSources {
            tracks,
            master_volume: self.bus.master_volume(),
        })
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Resources that exist between `initialize` and `release`
struct Session {
    stream: Option<StreamEngine>,
    extraction: ExtractionQueue,
}

/// The multitrack playback engine
///
/// Tracks are loaded onto a shared timeline and mixed to the output stream.
/// The engine is driven from a control thread; the audio callback only
/// touches atomics and the published track set.
pub struct AudioEngine {
    config: EngineConfig,
    backend: Option<Arc<dyn AudioBackend>>,
    timeline: Timeline,
    bus: Arc<MixBus>,
    registry: Arc<TrackRegistry>,
    /// Master pitch/speed, applied to every track when set
    master: EffectParams,
    errors: Arc<ErrorState>,
    session: Option<Session>,
}

impl AudioEngine {
    /// Engine using the platform output backend
    pub fn new(config: EngineConfig) -> Self {
        Self::with_backend(config, default_backend())
    }

    /// Engine without audio output. Playback state and extraction work,
    /// nothing is heard.
    pub fn headless(config: EngineConfig) -> Self {
        Self::with_backend(config, None)
    }

    pub fn with_backend(config: EngineConfig, backend: Option<Arc<dyn AudioBackend>>) -> Self {
        let bus = Arc::new(MixBus::new());
        Self {
            timeline: Timeline::new(config.sample_rate),
            registry: Arc::new(TrackRegistry::new(Arc::clone(&bus))),
            bus,
            config,
            backend,
            master: EffectParams::new(),
            errors: Arc::new(ErrorState::new()),
            session: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.timeline.sample_rate()
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    fn fail<T>(&self, error: EngineError) -> EngineResult<T> {
        self.errors.report(&error);
        Err(error)
    }

    fn report<T>(&self, result: EngineResult<T>) -> EngineResult<T> {
        if let Err(e) = &result {
            self.errors.report(e);
        }
        result
    }

    fn session(&self) -> EngineResult<&Session> {
        match self.session.as_ref() {
            Some(session) => Ok(session),
            None => self.fail(EngineError::NotInitialized),
        }
    }

    fn track(&self, id: &str) -> EngineResult<Shared<Track>> {
        match self.registry.find(id) {
            Some(track) => Ok(track),
            None => self.fail(EngineError::TrackNotFound(id.to_string())),
        }
    }

    fn recalculate_duration(&self) {
        let duration = self.timeline.recalculate_duration(self.registry.spans());
        log::debug!("[ENGINE] Duration now {} frames", duration);
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Open the output stream and start the extraction worker.
    ///
    /// Calling this on an initialized engine does nothing.
    pub fn initialize(&mut self) -> EngineResult<()> {
        if self.session.is_some() {
            log::debug!("[ENGINE] Already initialized");
            return Ok(());
        }
        if self.config.sample_rate == 0 {
            return self.fail(EngineError::InvalidArgument("Invalid sample rate".into()));
        }
        if self.config.max_tracks == 0 {
            return self.fail(EngineError::InvalidArgument("Invalid max tracks".into()));
        }

        let stream = match &self.backend {
            Some(backend) => {
                let mut audio = self.config.audio.clone();
                audio.sample_rate = self.config.sample_rate;
                let stream = StreamEngine::new(
                    Arc::clone(backend),
                    audio,
                    Arc::clone(&self.bus),
                    Arc::clone(self.timeline.clock()),
                    Arc::clone(self.timeline.transport()),
                );
                let errors = Arc::downgrade(&self.errors);
                stream.set_error_callback(Some(Arc::new(move |e: &AudioError| {
                    if let Some(errors) = errors.upgrade() {
                        errors.report(&EngineError::StreamDisconnected(e.to_string()));
                    }
                })));
                if let Err(e) = stream.open() {
                    return self.fail(e.into());
                }
                Some(stream)
            }
            None => {
                log::info!("[ENGINE] No audio backend, running headless");
                None
            }
        };

        let resolver: Arc<dyn TrackResolver> = self.registry.clone();
        self.session = Some(Session {
            stream,
            extraction: ExtractionQueue::spawn(resolver),
        });
        log::info!(
            "[ENGINE] Initialized: {} Hz, max {} tracks",
            self.config.sample_rate,
            self.config.max_tracks
        );
        Ok(())
    }

    /// Cancel extractions, stop playback, unload every track and close the
    /// stream. Idempotent.
    pub fn release(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        session.extraction.shutdown();
        self.timeline.transport().stop();
        if let Some(stream) = &session.stream {
            stream.close();
        }
        for track in self.registry.clear() {
            track.shutdown();
        }
        self.timeline.clock().reset();
        self.timeline.recalculate_duration(std::iter::empty());
        log::info!("[ENGINE] Released");
    }

    // ------------------------------------------------------------------------
    // Tracks
    // ------------------------------------------------------------------------

    /// Load a track starting at the beginning of the timeline
    pub fn load_track(&self, id: &str, path: impl AsRef<Path>) -> EngineResult<()> {
        self.load_track_at(id, path, 0)
    }

    /// Load a track whose first frame plays at `start_ms` on the timeline
    pub fn load_track_at(&self, id: &str, path: impl AsRef<Path>, start_ms: i64) -> EngineResult<()> {
        let path = path.as_ref();
        self.session()?;
        if id.is_empty() {
            return self.fail(EngineError::InvalidArgument("Track id is empty".into()));
        }
        if path.as_os_str().is_empty() {
            return self.fail(EngineError::InvalidArgument("File path is empty".into()));
        }
        if let Err(e) = FileFormat::from_path(path) {
            return self.fail(e.into());
        }

        // Held across the open so id and limit checks stay valid
        let mut tracks = lock(&self.registry.tracks);
        if tracks.iter().any(|t| t.id() == id) {
            drop(tracks);
            return self.fail(EngineError::InvalidArgument(format!(
                "Track already loaded: {}",
                id
            )));
        }
        if tracks.len() >= self.config.max_tracks {
            drop(tracks);
            return self.fail(EngineError::TrackLimitReached(self.config.max_tracks));
        }

        let start = self.timeline.ms_to_samples(start_ms).max(0);
        let track = match Track::open(id, path, start, self.config.streaming.track_settings()) {
            Ok(track) => track,
            Err(e) => {
                drop(tracks);
                log::warn!("[ENGINE] Failed to load track '{}': {}", id, e);
                return self.fail(e.into());
            }
        };

        let format = track.format();
        if format.sample_rate != self.sample_rate() {
            log::warn!(
                "[ENGINE] Track '{}' is {} Hz, engine runs at {} Hz (no resampling)",
                id,
                format.sample_rate,
                self.sample_rate()
            );
        }

        // Join the timeline where it currently is
        let position = self.timeline.position();
        if position > start {
            if let Err(e) = track.seek(position - start) {
                log::warn!("[ENGINE] Track '{}' could not seek to playhead: {}", id, e);
            }
        }

        tracks.push(Shared::new(&gc_handle(), track));
        self.registry.publish(&tracks);
        drop(tracks);

        self.recalculate_duration();
        log::info!("[ENGINE] Track '{}' loaded at frame {}", id, start);
        Ok(())
    }

    pub fn unload_track(&self, id: &str) -> EngineResult<()> {
        match self.registry.remove(id) {
            Some(track) => {
                track.shutdown();
                self.recalculate_duration();
                log::info!("[ENGINE] Track '{}' unloaded", id);
                Ok(())
            }
            None => self.fail(EngineError::TrackNotFound(id.to_string())),
        }
    }

    pub fn unload_all_tracks(&self) {
        let removed = self.registry.clear();
        for track in &removed {
            track.shutdown();
        }
        self.timeline.recalculate_duration(std::iter::empty());
        log::info!("[ENGINE] All tracks unloaded ({})", removed.len());
    }

    /// Ids of loaded tracks, in load order
    pub fn loaded_track_ids(&self) -> Vec<String> {
        lock(&self.registry.tracks)
            .iter()
            .map(|t| t.id().to_string())
            .collect()
    }

    pub fn track_count(&self) -> usize {
        lock(&self.registry.tracks).len()
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    pub fn play(&self) -> EngineResult<()> {
        let session = self.session()?;
        let transport = self.timeline.transport();
        transport.play();

        if let Some(stream) = &session.stream {
            if !stream.is_running() {
                if let Err(e) = stream.start() {
                    transport.stop();
                    return self.fail(e.into());
                }
            }
        }
        log::info!("[ENGINE] Playback started");
        Ok(())
    }

    /// Pause if playing or recording
    pub fn pause(&self) -> EngineResult<()> {
        self.session()?;
        if self.timeline.transport().pause() {
            log::info!("[ENGINE] Playback paused");
        }
        Ok(())
    }

    /// Stop playback and return to the start of the timeline
    pub fn stop(&self) -> EngineResult<()> {
        let session = self.session()?;
        self.timeline.transport().stop();

        let stopped = match &session.stream {
            Some(stream) if stream.is_running() => self.report(stream.stop().map_err(Into::into)),
            _ => Ok(()),
        };
        let rewound = self.seek(0);
        log::info!("[ENGINE] Playback stopped");
        stopped.and(rewound)
    }

    /// Move the playhead, clamped to `[0, duration]`.
    ///
    /// Every track is reseeked even if some fail; failures are reported
    /// together as one [`EngineError::SeekFailed`].
    pub fn seek(&self, position_ms: i64) -> EngineResult<()> {
        self.session()?;
        let duration_ms = self.timeline.duration_ms();
        let clamped = if duration_ms > 0 {
            position_ms.clamp(0, duration_ms)
        } else {
            position_ms.max(0)
        };
        if clamped != position_ms {
            log::debug!("[ENGINE] Seek to {} ms clamped to {} ms", position_ms, clamped);
        }

        let frame = self.timeline.ms_to_samples(clamped);
        self.timeline.clock().set_position(frame);

        let failed: Vec<String> = self
            .registry
            .all()
            .iter()
            .filter_map(|track| {
                let local = (frame - track.start_offset()).max(0);
                track
                    .seek(local)
                    .err()
                    .map(|e| format!("{}: {}", track.id(), e))
            })
            .collect();

        log::debug!("[ENGINE] Seeked to {} ms (frame {})", clamped, frame);
        if failed.is_empty() {
            Ok(())
        } else {
            self.fail(EngineError::SeekFailed(failed.join("; ")))
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_initialized() && self.timeline.transport().is_playing()
    }

    pub fn transport_state(&self) -> TransportState {
        self.timeline.transport().state()
    }

    /// Playhead position in milliseconds
    pub fn position_ms(&self) -> i64 {
        self.timeline.position_ms()
    }

    /// Timeline length in milliseconds: the latest track end
    pub fn duration_ms(&self) -> i64 {
        self.timeline.duration_ms()
    }

    // ------------------------------------------------------------------------
    // Track parameters
    // ------------------------------------------------------------------------

    pub fn set_track_volume(&self, id: &str, volume: f32) -> EngineResult<()> {
        self.track(id).map(|t| t.set_volume(volume))
    }

    pub fn track_volume(&self, id: &str) -> EngineResult<f32> {
        self.track(id).map(|t| t.volume())
    }

    pub fn set_track_pan(&self, id: &str, pan: f32) -> EngineResult<()> {
        self.track(id).map(|t| t.set_pan(pan))
    }

    pub fn track_pan(&self, id: &str) -> EngineResult<f32> {
        self.track(id).map(|t| t.pan())
    }

    pub fn set_track_muted(&self, id: &str, muted: bool) -> EngineResult<()> {
        self.track(id).map(|t| t.set_muted(muted))
    }

    pub fn is_track_muted(&self, id: &str) -> EngineResult<bool> {
        self.track(id).map(|t| t.is_muted())
    }

    pub fn set_track_solo(&self, id: &str, solo: bool) -> EngineResult<()> {
        self.track(id).map(|t| t.set_solo(solo))
    }

    pub fn is_track_solo(&self, id: &str) -> EngineResult<bool> {
        self.track(id).map(|t| t.is_solo())
    }

    /// Pitch shift in semitones, clamped to [-12, 12]
    pub fn set_track_pitch(&self, id: &str, semitones: f32) -> EngineResult<()> {
        self.track(id).map(|t| t.set_pitch(semitones))
    }

    pub fn track_pitch(&self, id: &str) -> EngineResult<f32> {
        self.track(id).map(|t| t.pitch())
    }

    /// Playback speed factor, clamped to [0.5, 2.0]
    pub fn set_track_speed(&self, id: &str, factor: f32) -> EngineResult<()> {
        self.track(id).map(|t| t.set_stretch(factor))
    }

    pub fn track_speed(&self, id: &str) -> EngineResult<f32> {
        self.track(id).map(|t| t.stretch())
    }

    /// Blocks the track could not fill from its buffer since loading
    pub fn track_underruns(&self, id: &str) -> EngineResult<u64> {
        self.track(id).map(|t| t.underrun_count())
    }

    /// Move a track on the timeline.
    ///
    /// The track is reseeked so its local position matches the playhead
    /// under the new offset.
    pub fn set_track_start(&self, id: &str, start_ms: i64) -> EngineResult<()> {
        let track = self.track(id)?;
        let start = self.timeline.ms_to_samples(start_ms).max(0);
        track.set_start_offset(start);
        self.recalculate_duration();

        let local = (self.timeline.position() - start).max(0);
        if let Err(e) = track.seek(local) {
            return self.fail(EngineError::SeekFailed(format!("{}: {}", id, e)));
        }
        log::debug!("[ENGINE] Track '{}' moved to frame {} (local {})", id, start, local);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Master parameters
    // ------------------------------------------------------------------------

    /// Master volume, clamped to [0, 2]
    pub fn set_master_volume(&self, volume: f32) {
        self.bus.set_master_volume(volume);
    }

    pub fn master_volume(&self) -> f32 {
        self.bus.master_volume()
    }

    /// Set the pitch of every loaded track
    pub fn set_pitch(&self, semitones: f32) {
        self.master.pitch.set(semitones);
        let pitch = self.master.pitch.get();
        for track in self.registry.all() {
            track.set_pitch(pitch);
        }
    }

    pub fn pitch(&self) -> f32 {
        self.master.pitch.get()
    }

    /// Set the speed of every loaded track
    pub fn set_speed(&self, factor: f32) {
        self.master.stretch.set(factor);
        let stretch = self.master.stretch.get();
        for track in self.registry.all() {
            track.set_stretch(stretch);
        }
    }

    pub fn speed(&self) -> f32 {
        self.master.stretch.get()
    }

    // ------------------------------------------------------------------------
    // Extraction
    // ------------------------------------------------------------------------

    /// Render one track to `output` on the calling thread
    pub fn extract_track(
        &self,
        id: &str,
        output: impl AsRef<Path>,
        config: &ExtractionConfig,
        progress: &mut dyn FnMut(f32),
    ) -> EngineResult<ExtractionSummary> {
        let snapshot = TrackSnapshot::capture(&self.track(id)?);
        let never = AtomicBool::new(false);
        let result = export::extract_track(&snapshot, output.as_ref(), config, &never, progress);
        self.report(result.map_err(Into::into))
    }

    /// Render the mix of every loaded track to `output` on the calling
    /// thread
    pub fn extract_mix(
        &self,
        output: impl AsRef<Path>,
        config: &ExtractionConfig,
        progress: &mut dyn FnMut(f32),
    ) -> EngineResult<ExtractionSummary> {
        let never = AtomicBool::new(false);
        let result = self
            .registry
            .resolve(&ExtractionTarget::Mix)
            .and_then(|sources| {
                export::extract_mix(
                    &sources.tracks,
                    sources.master_volume,
                    output.as_ref(),
                    config,
                    &never,
                    progress,
                )
            });
        self.report(result.map_err(Into::into))
    }

    /// Queue a single-track extraction and return its job id.
    ///
    /// The outcome, including failure or cancellation, arrives through
    /// `on_complete` on the worker thread.
    pub fn extract_track_async(
        &self,
        id: &str,
        output: impl Into<PathBuf>,
        config: ExtractionConfig,
        on_progress: Option<ProgressCallback>,
        on_complete: Option<CompletionCallback>,
    ) -> EngineResult<u64> {
        self.submit(
            ExtractionTarget::Track(id.to_string()),
            output.into(),
            config,
            on_progress,
            on_complete,
        )
    }

    /// Queue a mixed extraction of every loaded track
    pub fn extract_mix_async(
        &self,
        output: impl Into<PathBuf>,
        config: ExtractionConfig,
        on_progress: Option<ProgressCallback>,
        on_complete: Option<CompletionCallback>,
    ) -> EngineResult<u64> {
        self.submit(ExtractionTarget::Mix, output.into(), config, on_progress, on_complete)
    }

    fn submit(
        &self,
        target: ExtractionTarget,
        output_path: PathBuf,
        config: ExtractionConfig,
        on_progress: Option<ProgressCallback>,
        on_complete: Option<CompletionCallback>,
    ) -> EngineResult<u64> {
        let session = self.session()?;
        let job = ExtractionJob {
            target,
            output_path,
            config,
        };
        let submitted = session.extraction.submit(job, on_progress, on_complete);
        self.report(submitted.map_err(Into::into))
    }

    /// Cancel a queued or running extraction. False if the job is unknown
    /// or already finished.
    pub fn cancel_extraction(&self, job_id: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.extraction.cancel(job_id))
    }

    pub fn cancel_all_extractions(&self) {
        if let Some(session) = &self.session {
            session.extraction.cancel_all();
        }
    }

    /// Whether a job is queued or rendering
    pub fn is_extraction_running(&self, job_id: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.extraction.is_running(job_id))
    }

    pub fn current_extraction(&self) -> Option<u64> {
        self.session.as_ref().and_then(|s| s.extraction.current_job())
    }

    /// Mirror extraction lifecycle events to `monitor`
    pub fn set_extraction_monitor(&self, monitor: Option<Sender<ExtractionProgress>>) {
        if let Some(session) = &self.session {
            session.extraction.set_monitor(monitor);
        }
    }

    // ------------------------------------------------------------------------
    // Output stream
    // ------------------------------------------------------------------------

    /// Health of the output stream, `None` when headless or uninitialized
    pub fn stream_health(&self) -> Option<StreamHealth> {
        self.session
            .as_ref()
            .and_then(|s| s.stream.as_ref())
            .map(|stream| stream.health())
    }

    pub fn is_stream_healthy(&self) -> bool {
        self.stream_health().map_or(true, |h| h == StreamHealth::Healthy)
    }

    pub fn stream_info(&self) -> Option<StreamInfo> {
        self.session
            .as_ref()
            .and_then(|s| s.stream.as_ref())
            .and_then(|stream| stream.stream_info())
    }

    /// Reopen the output stream, resuming playback if it was running.
    ///
    /// Rejected with [`EngineError::InvalidState`] while another recovery is
    /// in progress.
    pub fn restart_stream(&self) -> EngineResult<()> {
        let session = self.session()?;
        match &session.stream {
            Some(stream) => self.report(stream.restart_stream().map_err(Into::into)),
            None => self.fail(EngineError::InvalidState("No output stream".into())),
        }
    }

    // ------------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------------

    pub fn set_error_callback(&self, callback: Option<ErrorCallback>) {
        *lock(&self.errors.callback) = callback;
    }

    /// Code of the most recent failure on this engine.
    ///
    /// The slot belongs to the engine instance, not the process: engines
    /// running side by side never see each other's errors. It is shared
    /// with the engine's stream and extraction threads.
    pub fn last_error_code(&self) -> ErrorCode {
        lock(&self.errors.last).0
    }

    pub fn last_error_message(&self) -> String {
        lock(&self.errors.last).1.clone()
    }

    pub fn clear_last_error(&self) {
        *lock(&self.errors.last) = (ErrorCode::Ok, String::new());
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.release();
    }
}
