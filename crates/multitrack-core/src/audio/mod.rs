//! Real-time audio output
//!
//! # Architecture
//!
//! The output path follows a lock-free design:
//!
//! - **Control thread**: mutates track parameters through atomics and
//!   publishes track-set snapshots
//! - **Audio thread**: runs [`StreamRenderer`] inside the device callback,
//!   mixing at the shared clock position
//! - **Backend threads**: own the device stream and turn device errors into
//!   close notifications for [`StreamEngine`]'s recovery
//!
//! Backends sit behind the [`AudioBackend`] trait; CPAL is the built-in one
//! (feature `cpal-backend`).

mod backend;
mod config;
mod error;
mod stream;

#[cfg(feature = "cpal-backend")]
mod cpal_backend;
#[cfg(feature = "cpal-backend")]
mod device;

pub use backend::{
    default_backend, AudioBackend, EventSink, OutputStream, RenderCallback, StreamEvent, StreamInfo,
};
pub use config::{
    AudioConfig, BufferSize, DeviceId, SharingMode, DEFAULT_BUFFER_SIZE, EXCLUSIVE_BUFFER_SIZE,
    LOW_LATENCY_BUFFER_SIZES, MAX_BUFFER_SIZE,
};
pub use error::{AudioError, AudioResult};
pub use stream::{StreamEngine, StreamErrorCallback, StreamHealth, StreamRenderer};

#[cfg(feature = "cpal-backend")]
pub use cpal_backend::{CpalBackend, CpalOutputStream};
#[cfg(feature = "cpal-backend")]
pub use device::{find_device_by_id, list_output_devices, OutputDevice};
