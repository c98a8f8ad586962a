//! Decode, resample and device output
//!
//! Everything below the playback queue: turning one file into s16 PCM at the
//! output format, and moving rendered PCM to the sound card.

pub mod buffer;
pub mod decoder;
pub mod output;
pub mod resampler;
pub mod types;

pub use buffer::PcmBuffer;
pub use decoder::{ChunkSource, SymphoniaOpener, SymphoniaSource, TrackOpener};
pub use output::{AudioSink, CpalBackend, OutputBackend};
pub use resampler::StreamResampler;
pub use types::{DecodeStatus, OutputFormat, BYTES_PER_SAMPLE, DEFAULT_BUFFER_FRAMES};
