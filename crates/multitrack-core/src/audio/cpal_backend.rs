//! CPAL audio backend implementation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  Start/Stop/Shutdown  ┌─────────────────────┐
//! │  StreamEngine    │──────────────────────►│ audio-stream-owner  │
//! │ (control thread) │◄──────replies─────────│ (owns cpal::Stream) │
//! └──────────────────┘                       └──────────┬──────────┘
//!         ▲                                             │ builds
//!         │ AboutToClose / Closed                       ▼
//! ┌───────┴──────────┐   cpal::StreamError   ┌─────────────────────┐
//! │ audio-stream-    │◄──────────────────────│  CPAL Audio Thread  │
//! │ watchdog         │    error callback     │  (render callback)  │
//! └──────────────────┘                       └─────────────────────┘
//! ```
//!
//! `cpal::Stream` is not `Send` on every platform, so it lives on a
//! dedicated owner thread for its whole life. Stream errors arrive on a
//! CPAL thread; the watchdog turns the first one into the close
//! notifications so recovery never runs on a CPAL thread.

use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, StreamConfig};
use crossbeam::channel::{self, Receiver, Sender};

use super::backend::{AudioBackend, EventSink, OutputStream, RenderCallback, StreamEvent, StreamInfo};
use super::config::{AudioConfig, SharingMode};
use super::device::{find_device_by_id, get_cpal_default_device};
use super::error::{AudioError, AudioResult};

/// Opens streams on CPAL devices
#[derive(Debug, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

enum Control {
    Start(Sender<AudioResult<()>>),
    Stop(Sender<AudioResult<()>>),
    Shutdown,
}

/// Handle to a stream living on its owner thread
pub struct CpalOutputStream {
    control_tx: Sender<Control>,
    owner: Option<JoinHandle<()>>,
    info: StreamInfo,
}

impl CpalOutputStream {
    fn request(&self, make: fn(Sender<AudioResult<()>>) -> Control) -> AudioResult<()> {
        let (reply_tx, reply_rx) = channel::bounded(1);
        self.control_tx
            .send(make(reply_tx))
            .map_err(|_| AudioError::NotOpen)?;
        reply_rx.recv().map_err(|_| AudioError::NotOpen)?
    }
}

impl OutputStream for CpalOutputStream {
    fn start(&mut self) -> AudioResult<()> {
        self.request(Control::Start)
    }

    fn stop(&mut self) -> AudioResult<()> {
        self.request(Control::Stop)
    }

    fn info(&self) -> StreamInfo {
        self.info
    }
}

impl Drop for CpalOutputStream {
    fn drop(&mut self) {
        let _ = self.control_tx.send(Control::Shutdown);
        if let Some(owner) = self.owner.take() {
            let _ = owner.join();
        }
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn open(
        &self,
        config: &AudioConfig,
        mode: SharingMode,
        render: RenderCallback,
        events: EventSink,
    ) -> AudioResult<Box<dyn OutputStream>> {
        let (control_tx, control_rx) = channel::unbounded();
        let (ready_tx, ready_rx) = channel::bounded(1);
        let (error_tx, error_rx) = channel::bounded::<cpal::StreamError>(4);

        let owner_config = config.clone();
        let owner = thread::Builder::new()
            .name("audio-stream-owner".to_string())
            .spawn(move || {
                run_owner(owner_config, mode, render, error_tx, control_rx, ready_tx)
            })
            .map_err(|e| AudioError::StreamBuildError(format!("owner thread: {}", e)))?;

        let info = match ready_rx.recv() {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                let _ = owner.join();
                return Err(e);
            }
            Err(_) => {
                let _ = owner.join();
                return Err(AudioError::StreamBuildError("owner thread exited".to_string()));
            }
        };

        thread::Builder::new()
            .name("audio-stream-watchdog".to_string())
            .spawn(move || run_watchdog(error_rx, events))
            .map_err(|e| AudioError::StreamBuildError(format!("watchdog thread: {}", e)))?;

        Ok(Box::new(CpalOutputStream {
            control_tx,
            owner: Some(owner),
            info,
        }))
    }
}

/// Build the stream, report readiness, then serve control requests until
/// shutdown. The stream is dropped on this thread.
fn run_owner(
    config: AudioConfig,
    mode: SharingMode,
    render: RenderCallback,
    error_tx: Sender<cpal::StreamError>,
    control_rx: Receiver<Control>,
    ready_tx: Sender<AudioResult<StreamInfo>>,
) {
    let (stream, info) = match build_stream(&config, mode, render, error_tx) {
        Ok(built) => built,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    let _ = ready_tx.send(Ok(info));

    while let Ok(msg) = control_rx.recv() {
        match msg {
            Control::Start(reply) => {
                let result = stream
                    .play()
                    .map_err(|e| AudioError::StreamPlayError(e.to_string()));
                let _ = reply.send(result);
            }
            Control::Stop(reply) => {
                let result = stream
                    .pause()
                    .map_err(|e| AudioError::StreamError(e.to_string()));
                let _ = reply.send(result);
            }
            Control::Shutdown => break,
        }
    }
    drop(stream);
    log::debug!("[STREAM] CPAL stream dropped");
}

/// Forward the first stream error as the close notifications
fn run_watchdog(error_rx: Receiver<cpal::StreamError>, events: EventSink) {
    if let Ok(err) = error_rx.recv() {
        let reason = match &err {
            cpal::StreamError::DeviceNotAvailable => format!("device not available ({})", err),
            other => other.to_string(),
        };
        events(StreamEvent::AboutToClose);
        events(StreamEvent::Closed { reason });
    }
}

fn build_stream(
    config: &AudioConfig,
    mode: SharingMode,
    mut render: RenderCallback,
    error_tx: Sender<cpal::StreamError>,
) -> AudioResult<(cpal::Stream, StreamInfo)> {
    let device = match &config.device {
        Some(id) => find_device_by_id(id)?,
        None => get_cpal_default_device()?,
    };
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("[STREAM] Using audio device: {}", device_name);

    let supported = get_output_config(&device, config)?;
    let buffer_frames = config.buffer_frames_for(mode);
    let stream_config = StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: match buffer_frames {
            Some(frames) => CpalBufferSize::Fixed(frames),
            None => CpalBufferSize::Default,
        },
    };
    let channels = stream_config.channels as usize;

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                render(data, channels);
            },
            move |err| {
                log::error!("[STREAM] Audio stream error: {}", err);
                let _ = error_tx.try_send(err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    let info = StreamInfo {
        sample_rate: stream_config.sample_rate.0,
        channels: stream_config.channels,
        buffer_frames,
        sharing_mode: mode,
    };
    Ok((stream, info))
}

/// Pick the best output configuration for a device.
///
/// Prefers f32, at least two channels, and a range containing the
/// requested sample rate.
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<cpal::SupportedStreamConfig> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();

    let target = config.sample_rate;
    let in_range = |c: &&cpal::SupportedStreamConfigRange| {
        target >= c.min_sample_rate().0 && target <= c.max_sample_rate().0
    };

    let best = supported_configs
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.channels() >= 2)
        .find(in_range)
        .or_else(|| {
            supported_configs
                .iter()
                .filter(|c| c.sample_format() == SampleFormat::F32)
                .find(in_range)
        })
        .or_else(|| {
            supported_configs
                .iter()
                .find(|c| c.sample_format() == SampleFormat::F32)
        })
        .ok_or_else(|| AudioError::UnsupportedFormat("device has no f32 output".to_string()))?;

    let sample_rate = if in_range(&best) {
        cpal::SampleRate(target)
    } else {
        let fallback = best.max_sample_rate();
        log::warn!(
            "[STREAM] Device doesn't support {}Hz, using {}Hz",
            target,
            fallback.0
        );
        fallback
    };

    Ok(best.clone().with_sample_rate(sample_rate))
}
