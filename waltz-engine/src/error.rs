//! Error types for waltz-engine

use std::io;
use thiserror::Error;

/// Engine error type
#[derive(Error, Debug)]
pub enum Error {
    /// The host exposes no default output device
    #[error("no default output device")]
    NoDevice,

    /// A device was requested by name but is not present
    #[error("requested device not found: {0}")]
    DeviceNotFound(String),

    /// The audio output could not be created or refused to start
    #[error("audio stream error: {0}")]
    Stream(String),

    /// Device sample format we cannot feed
    #[error("unsupported device sample format: {0}")]
    UnsupportedFormat(String),

    /// Render or container configuration is unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error while writing output files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(feature = "realtime")]
mod cpal_conv {
    use super::Error;

    impl From<cpal::DevicesError> for Error {
        fn from(e: cpal::DevicesError) -> Self { Error::Stream(e.to_string()) }
    }

    impl From<cpal::DeviceNameError> for Error {
        fn from(e: cpal::DeviceNameError) -> Self { Error::Stream(e.to_string()) }
    }

    impl From<cpal::DefaultStreamConfigError> for Error {
        fn from(e: cpal::DefaultStreamConfigError) -> Self { Error::Stream(e.to_string()) }
    }

    impl From<cpal::BuildStreamError> for Error {
        fn from(e: cpal::BuildStreamError) -> Self { Error::Stream(e.to_string()) }
    }

    impl From<cpal::PlayStreamError> for Error {
        fn from(e: cpal::PlayStreamError) -> Self { Error::Stream(e.to_string()) }
    }
}
