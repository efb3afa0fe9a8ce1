//! Audio backend trait for device implementations
//!
//! A backend opens an output stream that calls a render callback on its own
//! real-time thread. Device failures are reported through an event sink in
//! two steps, mirroring how hosts tear a stream down:
//!
//! - [`StreamEvent::AboutToClose`]: the stream is going away; the owner
//!   should note whether it was running
//! - [`StreamEvent::Closed`]: the stream is gone and must be reopened
//!
//! Events are delivered off the audio thread, so the sink may block and may
//! reopen the stream itself.

use std::sync::Arc;

use super::config::{AudioConfig, SharingMode};
use super::error::AudioResult;

/// Fills an interleaved output buffer of `channels` channels.
///
/// Called on the device's real-time thread: must not block or allocate.
pub type RenderCallback = Box<dyn FnMut(&mut [f32], usize) + Send>;

/// Stream lifecycle notifications from a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    AboutToClose,
    Closed { reason: String },
}

/// Receives [`StreamEvent`]s, possibly from a backend-owned thread
pub type EventSink = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// What the device actually granted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// Negotiated buffer size, if the host reports one
    pub buffer_frames: Option<u32>,
    pub sharing_mode: SharingMode,
}

impl StreamInfo {
    /// One-way output latency in milliseconds
    pub fn latency_ms(&self) -> Option<f32> {
        self.buffer_frames
            .map(|frames| frames as f32 / self.sample_rate.max(1) as f32 * 1000.0)
    }
}

/// An open output stream. Dropping it closes the stream.
pub trait OutputStream: Send {
    fn start(&mut self) -> AudioResult<()>;
    fn stop(&mut self) -> AudioResult<()>;
    fn info(&self) -> StreamInfo;
}

/// Something that can open output streams
pub trait AudioBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Open (but do not start) a stream in `mode`.
    fn open(
        &self,
        config: &AudioConfig,
        mode: SharingMode,
        render: RenderCallback,
        events: EventSink,
    ) -> AudioResult<Box<dyn OutputStream>>;
}

/// The platform backend, when one is compiled in
pub fn default_backend() -> Option<Arc<dyn AudioBackend>> {
    #[cfg(feature = "cpal-backend")]
    {
        Some(Arc::new(super::cpal_backend::CpalBackend::new()))
    }

    #[cfg(not(feature = "cpal-backend"))]
    {
        None
    }
}
