//! Error types for seamless-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//!
//! Construction errors (`Open`, `Resampler`) abort the enqueue that caused
//! them. `Decode` ends one track's playback. `Device` surfaces from
//! init/close.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for seamless-player
#[derive(Error, Debug)]
pub enum Error {
    /// Source unreadable, no audio stream, or no decoder available
    #[error("Could not open {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    /// Conversion context could not be built for the source/destination pair
    #[error("Resampler error: {0}")]
    Resampler(String),

    /// Malformed compressed data mid-stream
    #[error("Decode error in {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    Device(String),

    /// Control operation issued before `init`
    #[error("Player has not been initialized yet")]
    NotInitialized,

    /// `init` issued twice
    #[error("Player has already been initialized")]
    AlreadyInitialized,

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using seamless-player Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn open(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Error::Open {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Error::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
