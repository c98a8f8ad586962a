//! # Seamless Player Library (seamless-player)
//!
//! Gapless playback core: decodes queued audio files on demand, resamples
//! them to one fixed s16 output format and mixes the queue head into the
//! device callback, trimming trailing silence at track boundaries.
//!
//! **Architecture:** pull-buffered decode pipeline using symphonia + rubato,
//! output through cpal

pub mod audio;
pub mod config;
pub mod error;
pub mod logging;
pub mod playback;

pub use error::{Error, Result};
pub use playback::{CurrentSong, Player};
