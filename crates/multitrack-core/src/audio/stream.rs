//! Output stream driver
//!
//! [`StreamRenderer`] is what runs inside the device callback: it mixes the
//! published track set at the clock position and advances the clock.
//! [`StreamEngine`] owns the open stream and brings it back after device
//! failures.
//!
//! # Recovery
//!
//! ```text
//!  backend thread            StreamEngine
//!  ──────────────            ────────────
//!  AboutToClose ───────────► note running state
//!  Closed ─────────────────► CAS recovering false→true ──(lost)──► rejected
//!                                 │
//!                                 ▼ health = Recovering
//!                            drop old stream
//!                            open (preferred mode, shared fallback)
//!                            restart if it was running
//!                                 │
//!                    ok ◄─────────┴─────────► err
//!              health = Healthy          health = Failed, error callback
//! ```

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::engine::{MixBus, Mixer};
use crate::timeline::{Clock, Transport};
use crate::types::{StereoSample, MAX_BUFFER_SIZE};

use super::backend::{AudioBackend, EventSink, OutputStream, RenderCallback, StreamEvent, StreamInfo};
use super::config::{AudioConfig, SharingMode};
use super::error::{AudioError, AudioResult};

/// Device callback body
pub struct StreamRenderer {
    mixer: Mixer,
    clock: Arc<Clock>,
    transport: Arc<Transport>,
    block: Vec<StereoSample>,
}

impl StreamRenderer {
    pub fn new(bus: Arc<MixBus>, clock: Arc<Clock>, transport: Arc<Transport>) -> Self {
        Self {
            mixer: Mixer::new(bus),
            clock,
            transport,
            block: vec![StereoSample::silence(); MAX_BUFFER_SIZE],
        }
    }

    /// Fill an interleaved device buffer.
    ///
    /// Silence without touching the clock unless the transport is rolling.
    /// Mono devices get the average of both sides; channels past the
    /// second are zeroed.
    pub fn render(&mut self, output: &mut [f32], channels: usize) {
        if channels == 0 || !self.transport.is_playing() {
            output.fill(0.0);
            return;
        }

        for chunk in output.chunks_mut(MAX_BUFFER_SIZE * channels) {
            let frames = chunk.len() / channels;
            let block = &mut self.block[..frames];
            let position = self.clock.position();
            self.mixer.mix(block, position);
            self.clock.advance(frames as i64);
            write_interleaved(block, chunk, channels);
        }
    }
}

fn write_interleaved(block: &[StereoSample], output: &mut [f32], channels: usize) {
    for (frame, sample) in output.chunks_exact_mut(channels).zip(block) {
        if channels == 1 {
            frame[0] = 0.5 * (sample.left + sample.right);
        } else {
            frame[0] = sample.left;
            frame[1] = sample.right;
            frame[2..].fill(0.0);
        }
    }
    let tail = block.len() * channels;
    output[tail.min(output.len())..].fill(0.0);
}

/// Stream health as seen by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StreamHealth {
    Healthy = 0,
    Recovering = 1,
    Failed = 2,
}

impl StreamHealth {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => StreamHealth::Healthy,
            1 => StreamHealth::Recovering,
            _ => StreamHealth::Failed,
        }
    }
}

/// Notified when the stream fails for good
pub type StreamErrorCallback = Arc<dyn Fn(&AudioError) + Send + Sync>;

struct StreamShared {
    backend: Arc<dyn AudioBackend>,
    config: AudioConfig,
    bus: Arc<MixBus>,
    clock: Arc<Clock>,
    transport: Arc<Transport>,
    stream: Mutex<Option<Box<dyn OutputStream>>>,
    health: AtomicU8,
    /// Recovery guard; only the CAS winner touches the stream
    recovering: AtomicBool,
    running: AtomicBool,
    /// Running state noted at the pre-close notification
    resume: AtomicBool,
    error_callback: Mutex<Option<StreamErrorCallback>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl StreamShared {
    fn set_health(&self, health: StreamHealth) {
        self.health.store(health as u8, Ordering::Release);
    }

    fn report(&self, error: &AudioError) {
        log::error!("[STREAM] {}", error);
        let callback = lock(&self.error_callback).clone();
        if let Some(callback) = callback {
            callback(error);
        }
    }

    /// Open in the configured mode, falling back to shared
    fn open_stream(self: &Arc<Self>) -> AudioResult<Box<dyn OutputStream>> {
        let preferred = self.config.sharing_mode;
        match self.open_in(preferred) {
            Ok(stream) => Ok(stream),
            Err(e) if preferred == SharingMode::Exclusive => {
                log::warn!("[STREAM] Exclusive open failed ({}), trying shared mode", e);
                self.open_in(SharingMode::Shared)
            }
            Err(e) => Err(e),
        }
    }

    fn open_in(self: &Arc<Self>, mode: SharingMode) -> AudioResult<Box<dyn OutputStream>> {
        let mut renderer = StreamRenderer::new(
            Arc::clone(&self.bus),
            Arc::clone(&self.clock),
            Arc::clone(&self.transport),
        );
        let render: RenderCallback = Box::new(move |output, channels| renderer.render(output, channels));

        let weak = Arc::downgrade(self);
        let events: EventSink = Arc::new(move |event| {
            if let Some(shared) = weak.upgrade() {
                shared.handle_event(event);
            }
        });

        let stream = self.backend.open(&self.config, mode, render, events)?;
        let info = stream.info();
        log::info!(
            "[STREAM] Opened {} stream: {} Hz, {} ch, {:?} mode, buffer {:?}",
            self.backend.name(),
            info.sample_rate,
            info.channels,
            info.sharing_mode,
            info.buffer_frames
        );
        if info.sample_rate != self.config.sample_rate {
            log::warn!(
                "[STREAM] Device runs at {} Hz, engine renders at {} Hz (no resampling)",
                info.sample_rate,
                self.config.sample_rate
            );
        }
        Ok(stream)
    }

    fn handle_event(self: &Arc<Self>, event: StreamEvent) {
        match event {
            StreamEvent::AboutToClose => {
                let running = self.running.load(Ordering::Acquire);
                self.resume.store(running, Ordering::Release);
                log::warn!("[STREAM] Stream closing (was running: {})", running);
            }
            StreamEvent::Closed { reason } => {
                log::warn!("[STREAM] Stream closed: {}", reason);
                let resume =
                    self.resume.swap(false, Ordering::AcqRel) || self.running.load(Ordering::Acquire);
                if let Err(AudioError::RecoveryInProgress) = self.recover(resume) {
                    log::debug!("[STREAM] Recovery already running, ignoring close");
                }
            }
        }
    }

    /// Reopen the stream. Rejected if another recovery holds the guard.
    fn recover(self: &Arc<Self>, resume: bool) -> AudioResult<()> {
        if self
            .recovering
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AudioError::RecoveryInProgress);
        }

        self.set_health(StreamHealth::Recovering);
        log::info!("[STREAM] Recovering stream (resume: {})", resume);

        let result = {
            let mut slot = lock(&self.stream);
            drop(slot.take());
            self.open_stream().and_then(|mut stream| {
                if resume {
                    stream.start()?;
                }
                *slot = Some(stream);
                Ok(())
            })
        };

        match &result {
            Ok(()) => {
                self.running.store(resume, Ordering::Release);
                self.set_health(StreamHealth::Healthy);
                log::info!("[STREAM] Stream recovered");
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                self.set_health(StreamHealth::Failed);
                self.report(e);
            }
        }

        self.recovering.store(false, Ordering::Release);
        result
    }
}

/// Owns the output stream for an engine
pub struct StreamEngine {
    shared: Arc<StreamShared>,
}

impl StreamEngine {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        config: AudioConfig,
        bus: Arc<MixBus>,
        clock: Arc<Clock>,
        transport: Arc<Transport>,
    ) -> Self {
        Self {
            shared: Arc::new(StreamShared {
                backend,
                config,
                bus,
                clock,
                transport,
                stream: Mutex::new(None),
                health: AtomicU8::new(StreamHealth::Healthy as u8),
                recovering: AtomicBool::new(false),
                running: AtomicBool::new(false),
                resume: AtomicBool::new(false),
                error_callback: Mutex::new(None),
            }),
        }
    }

    pub fn set_error_callback(&self, callback: Option<StreamErrorCallback>) {
        *lock(&self.shared.error_callback) = callback;
    }

    /// Open the stream without starting it. No-op if already open.
    pub fn open(&self) -> AudioResult<()> {
        let mut slot = lock(&self.shared.stream);
        if slot.is_none() {
            *slot = Some(self.shared.open_stream()?);
            self.shared.set_health(StreamHealth::Healthy);
        }
        Ok(())
    }

    /// Start the stream, opening it first if needed
    pub fn start(&self) -> AudioResult<()> {
        let mut slot = lock(&self.shared.stream);
        if slot.is_none() {
            *slot = Some(self.shared.open_stream()?);
            self.shared.set_health(StreamHealth::Healthy);
        }
        if let Some(stream) = slot.as_mut() {
            stream.start()?;
        }
        self.shared.running.store(true, Ordering::Release);
        Ok(())
    }

    pub fn stop(&self) -> AudioResult<()> {
        let mut slot = lock(&self.shared.stream);
        let stream = slot.as_mut().ok_or(AudioError::NotOpen)?;
        stream.stop()?;
        self.shared.running.store(false, Ordering::Release);
        Ok(())
    }

    /// Close the stream. Idempotent.
    pub fn close(&self) {
        let stream = lock(&self.shared.stream).take();
        if stream.is_some() {
            log::info!("[STREAM] Closing stream");
        }
        drop(stream);
        self.shared.running.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        lock(&self.shared.stream).is_some()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn health(&self) -> StreamHealth {
        StreamHealth::from_u8(self.shared.health.load(Ordering::Acquire))
    }

    /// False while recovering or after recovery failed
    pub fn is_healthy(&self) -> bool {
        self.health() == StreamHealth::Healthy
    }

    pub fn stream_info(&self) -> Option<StreamInfo> {
        lock(&self.shared.stream).as_ref().map(|s| s.info())
    }

    /// Tear down and reopen the stream, restarting it if it was running.
    ///
    /// Fails immediately with [`AudioError::RecoveryInProgress`] if a
    /// recovery is already under way.
    pub fn restart_stream(&self) -> AudioResult<()> {
        let resume = self.is_running();
        self.shared.recover(resume)
    }
}

impl Drop for StreamEngine {
    fn drop(&mut self) {
        self.close();
    }
}
