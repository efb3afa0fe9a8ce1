//! Engine-level error taxonomy
//!
//! Every fallible facade operation returns [`EngineResult`]. Lower layers have
//! their own error enums ([`AudioError`], [`AudioFileError`]) which convert
//! into [`EngineError`] with the matching [`ErrorCode`].

use std::fmt;

use thiserror::Error;

use crate::audio::AudioError;
use crate::audio_file::AudioFileError;
use crate::export::ExtractionError;

/// Stable error categories reported through the last-error slot and the
/// error callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    NotInitialized = 1,
    InvalidArgument = 2,
    InvalidState = 3,
    TrackNotFound = 4,
    TrackLimitReached = 5,
    UnsupportedFormat = 6,
    DecoderOpenFailed = 7,
    SeekFailed = 8,
    StreamError = 9,
    StreamDisconnected = 10,
    ExtractionFailed = 11,
}

impl ErrorCode {
    /// Short stable name, used in log lines
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::Ok => "Ok",
            ErrorCode::NotInitialized => "NotInitialized",
            ErrorCode::InvalidArgument => "InvalidArgument",
            ErrorCode::InvalidState => "InvalidState",
            ErrorCode::TrackNotFound => "TrackNotFound",
            ErrorCode::TrackLimitReached => "TrackLimitReached",
            ErrorCode::UnsupportedFormat => "UnsupportedFormat",
            ErrorCode::DecoderOpenFailed => "DecoderOpenFailed",
            ErrorCode::SeekFailed => "SeekFailed",
            ErrorCode::StreamError => "StreamError",
            ErrorCode::StreamDisconnected => "StreamDisconnected",
            ErrorCode::ExtractionFailed => "ExtractionFailed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors returned by the engine facade
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Engine not initialized")]
    NotInitialized,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Track not found: {0}")]
    TrackNotFound(String),

    #[error("Track limit reached ({0} tracks)")]
    TrackLimitReached(usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to open decoder: {0}")]
    DecoderOpenFailed(String),

    #[error("Seek failed: {0}")]
    SeekFailed(String),

    #[error("Audio stream error: {0}")]
    StreamError(String),

    #[error("Audio stream disconnected: {0}")]
    StreamDisconnected(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),
}

impl EngineError {
    /// The taxonomy category of this error
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::NotInitialized => ErrorCode::NotInitialized,
            EngineError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            EngineError::InvalidState(_) => ErrorCode::InvalidState,
            EngineError::TrackNotFound(_) => ErrorCode::TrackNotFound,
            EngineError::TrackLimitReached(_) => ErrorCode::TrackLimitReached,
            EngineError::UnsupportedFormat(_) => ErrorCode::UnsupportedFormat,
            EngineError::DecoderOpenFailed(_) => ErrorCode::DecoderOpenFailed,
            EngineError::SeekFailed(_) => ErrorCode::SeekFailed,
            EngineError::StreamError(_) => ErrorCode::StreamError,
            EngineError::StreamDisconnected(_) => ErrorCode::StreamDisconnected,
            EngineError::ExtractionFailed(_) => ErrorCode::ExtractionFailed,
        }
    }
}

impl From<AudioFileError> for EngineError {
    fn from(err: AudioFileError) -> Self {
        match err {
            AudioFileError::UnsupportedFormat(_) => EngineError::UnsupportedFormat(err.to_string()),
            AudioFileError::Seek(_) => EngineError::SeekFailed(err.to_string()),
            AudioFileError::Open { .. } | AudioFileError::Decode(_) => {
                EngineError::DecoderOpenFailed(err.to_string())
            }
            AudioFileError::Encode(_) | AudioFileError::Io(_) => {
                EngineError::ExtractionFailed(err.to_string())
            }
        }
    }
}

impl From<AudioError> for EngineError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::Disconnected(_) => EngineError::StreamDisconnected(err.to_string()),
            AudioError::RecoveryInProgress => EngineError::InvalidState(err.to_string()),
            _ => EngineError::StreamError(err.to_string()),
        }
    }
}

impl From<ExtractionError> for EngineError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::TrackNotFound(id) => EngineError::TrackNotFound(id),
            ExtractionError::Source(source) => source.into(),
            ExtractionError::Encoder(AudioFileError::UnsupportedFormat(format)) => {
                EngineError::UnsupportedFormat(format)
            }
            other => EngineError::ExtractionFailed(other.to_string()),
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(EngineError::NotInitialized.code(), ErrorCode::NotInitialized);
        assert_eq!(
            EngineError::TrackLimitReached(8).code(),
            ErrorCode::TrackLimitReached
        );
        assert_eq!(ErrorCode::SeekFailed as i32, 8);
        assert_eq!(ErrorCode::StreamDisconnected.to_string(), "StreamDisconnected");
    }

    #[test]
    fn test_audio_file_error_conversion() {
        let err: EngineError = AudioFileError::UnsupportedFormat("ogg".into()).into();
        assert_eq!(err.code(), ErrorCode::UnsupportedFormat);

        let err: EngineError = AudioFileError::Seek("past end".into()).into();
        assert_eq!(err.code(), ErrorCode::SeekFailed);
    }

    #[test]
    fn test_audio_error_conversion() {
        let err: EngineError = AudioError::Disconnected("unplugged".into()).into();
        assert_eq!(err.code(), ErrorCode::StreamDisconnected);

        let err: EngineError = AudioError::RecoveryInProgress.into();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[test]
    fn test_extraction_error_conversion() {
        let err: EngineError = ExtractionError::Cancelled.into();
        assert_eq!(err, EngineError::ExtractionFailed("Extraction cancelled".into()));

        let err: EngineError = ExtractionError::TrackNotFound("drums".into()).into();
        assert_eq!(err, EngineError::TrackNotFound("drums".into()));

        let err: EngineError =
            ExtractionError::Encoder(AudioFileError::UnsupportedFormat("mp3".into())).into();
        assert_eq!(err.code(), ErrorCode::UnsupportedFormat);
    }
}
