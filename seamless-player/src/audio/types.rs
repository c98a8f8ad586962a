//! Core audio data types
//!
//! Defines the fixed output PCM format shared by the decode pipeline and the
//! mixer, and the tagged result of one decode step.
//!
//! **Format:**
//! - Samples are signed 16-bit little-endian
//! - Interleaved: [C0, C1, ..., C0, C1, ...]
//! - Channel count and sample rate fixed at `Player::init`

/// Size of one output sample in bytes (16-bit signed)
pub const BYTES_PER_SAMPLE: usize = std::mem::size_of::<i16>();

/// Default callback buffer size in frames
pub const DEFAULT_BUFFER_FRAMES: u32 = 4096;

/// Destination PCM format for decoded tracks and the output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    /// Interleaved channel count
    pub channels: u16,

    /// Frames per second
    pub sample_rate: u32,
}

impl OutputFormat {
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    /// Bytes occupied by one frame (one sample per channel)
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * BYTES_PER_SAMPLE
    }

    /// Convert a byte count of delivered PCM into elapsed milliseconds
    pub fn bytes_to_ms(&self, bytes: u64) -> u64 {
        let frame_bytes = self.bytes_per_frame() as u64;
        if frame_bytes == 0 || self.sample_rate == 0 {
            return 0;
        }
        (bytes / frame_bytes) * 1000 / self.sample_rate as u64
    }

    /// Number of samples (across all channels) in a quarter second.
    ///
    /// Upper bound on how much trailing silence the gapless trim rewinds.
    pub fn quarter_second_samples(&self) -> usize {
        self.sample_rate as usize * self.channels as usize / 4
    }
}

/// Outcome of one decode step on a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// Bytes were appended to the track buffer
    Produced(usize),

    /// Nothing appended yet, but the source has more input
    NeedMoreInput,

    /// Input exhausted and decoder flushed; terminal
    EndOfStream,
}
