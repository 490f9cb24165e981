//! Error types for Reel Core

use crate::surface::NativeError;
use crate::types::StreamType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Resolution errors
    #[error("cannot auto-detect stream type of '{url}', pass an explicit stream descriptor")]
    UnrecognizedSource { url: String },

    #[error("unknown stream type: {0}")]
    UnknownStreamType(String),

    #[error("source resolved to no streams")]
    EmptySource,

    #[error("no compatible stream handler for {stream_type} stream: {url}")]
    NoCompatibleHandler { stream_type: StreamType, url: String },

    #[error("{handler} can only handle a single {stream_type} stream, received {count}")]
    MultiStreamNotSupported {
        handler: String,
        stream_type: StreamType,
        count: usize,
    },

    // Playback errors
    #[error("native playback failed: {0}")]
    NativePlayback(NativeError),

    #[error("failed to load stream {url}: {reason}")]
    StreamLoad { url: String, reason: String },

    #[error("received a native event without a handler: {0}")]
    UnhandledNativeEvent(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Error kinds exposed to consumers of the `error` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    UnrecognizedSource,
    NoCompatibleHandler,
    MultiStreamNotSupported,
    NativePlayback,
    StreamLoad,
    UnhandledNativeEvent,
    InvalidConfig,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::UnrecognizedSource => write!(f, "unrecognized source"),
            ErrorKind::NoCompatibleHandler => write!(f, "no compatible handler"),
            ErrorKind::MultiStreamNotSupported => write!(f, "multiple streams not supported"),
            ErrorKind::NativePlayback => write!(f, "native playback"),
            ErrorKind::StreamLoad => write!(f, "stream load"),
            ErrorKind::UnhandledNativeEvent => write!(f, "unhandled native event"),
            ErrorKind::InvalidConfig => write!(f, "invalid configuration"),
        }
    }
}

impl Error {
    /// Create a stream load error for `url`
    pub fn stream_load(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::StreamLoad {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnrecognizedSource { .. } | Error::UnknownStreamType(_) | Error::EmptySource => {
                ErrorKind::UnrecognizedSource
            }
            Error::NoCompatibleHandler { .. } => ErrorKind::NoCompatibleHandler,
            Error::MultiStreamNotSupported { .. } => ErrorKind::MultiStreamNotSupported,
            Error::NativePlayback(_) => ErrorKind::NativePlayback,
            Error::StreamLoad { .. } => ErrorKind::StreamLoad,
            Error::UnhandledNativeEvent(_) => ErrorKind::UnhandledNativeEvent,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Returns true for errors raised synchronously while resolving a source.
    ///
    /// These abort the current `src` assignment. Everything else is reported
    /// through the `error` event after attach.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnrecognizedSource
                | ErrorKind::NoCompatibleHandler
                | ErrorKind::MultiStreamNotSupported
                | ErrorKind::InvalidConfig
        )
    }

    /// The URL the error originated from, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::UnrecognizedSource { url }
            | Error::NoCompatibleHandler { url, .. }
            | Error::StreamLoad { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Returns the error code for analytics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::UnrecognizedSource { .. } => "UNRECOGNIZED_SOURCE",
            Error::UnknownStreamType(_) => "UNKNOWN_STREAM_TYPE",
            Error::EmptySource => "EMPTY_SOURCE",
            Error::NoCompatibleHandler { .. } => "NO_COMPATIBLE_HANDLER",
            Error::MultiStreamNotSupported { .. } => "MULTI_STREAM",
            Error::NativePlayback(_) => "NATIVE_PLAYBACK",
            Error::StreamLoad { .. } => "STREAM_LOAD",
            Error::UnhandledNativeEvent(_) => "UNHANDLED_NATIVE_EVENT",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_errors_are_fatal() {
        let err = Error::UnrecognizedSource {
            url: "http://host/video.avi".to_string(),
        };
        assert!(err.is_fatal());
        assert_eq!(err.kind(), ErrorKind::UnrecognizedSource);
        assert_eq!(err.url(), Some("http://host/video.avi"));

        let err = Error::MultiStreamNotSupported {
            handler: "mse-dash".to_string(),
            stream_type: StreamType::Dash,
            count: 2,
        };
        assert!(err.is_fatal());
        assert_eq!(err.error_code(), "MULTI_STREAM");
    }

    #[test]
    fn test_playback_errors_are_not_fatal() {
        let err = Error::stream_load("http://host/live.m3u8", "manifest 404");
        assert!(!err.is_fatal());
        assert_eq!(err.kind(), ErrorKind::StreamLoad);
        assert_eq!(err.url(), Some("http://host/live.m3u8"));
        assert_eq!(
            err.to_string(),
            "failed to load stream http://host/live.m3u8: manifest 404"
        );

        let err = Error::NativePlayback(NativeError::new("NotAllowedError"));
        assert!(!err.is_fatal());
        assert_eq!(err.url(), None);
    }
}
