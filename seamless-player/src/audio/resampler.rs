//! Audio resampling using rubato
//!
//! Converts decoded frames to the player's output format: channel count,
//! sample rate, and signed 16-bit interleaved samples.
//!
//! The resampler is stateful across frames. rubato's `FastFixedIn` consumes
//! fixed-size input chunks, so decoded frames accumulate in a planar
//! pending buffer until a full chunk is available; the remainder is pushed
//! through with `process_partial` when the stream ends.
//!
//! rubato's interpolation delay is dropped from the front of the output and
//! the zero padding of the final chunks is cut from the back, so a stream of
//! `n` input frames yields exactly `ceil(n × dst/src)` output frames.

use crate::audio::buffer::PcmBuffer;
use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use std::ops::Range;
use tracing::{debug, warn};

/// Input chunk size handed to rubato, in frames
pub const RESAMPLER_CHUNK_FRAMES: usize = 1024;

/// Zero-fed chunks allowed to push out the interpolation tail on flush
const MAX_TAIL_CHUNKS: usize = 4;

/// Streaming channel/rate converter producing s16 PCM.
pub struct StreamResampler {
    source_rate: u32,
    dest_rate: u32,
    dest_channels: usize,

    /// None when source and destination rates match
    rubato: Option<FastFixedIn<f32>>,

    /// Channel-mapped input not yet converted, one Vec per destination channel
    pending: Vec<Vec<f32>>,

    /// Interleaved s16 output of the current call, reused between calls
    scratch: Vec<i16>,

    /// Channel-mapped input frames accepted so far
    input_frames: u64,

    /// Output frames handed out so far
    emitted_frames: u64,

    /// Leading rubato output frames still to discard
    delay_remaining: usize,

    flushed: bool,
}

impl StreamResampler {
    /// Create a resampler from `source_rate` to `dest_rate`/`dest_channels`.
    ///
    /// # Errors
    /// `Error::Resampler` if either rate or the channel count is zero, or
    /// rubato rejects the ratio.
    pub fn new(source_rate: u32, dest_rate: u32, dest_channels: u16) -> Result<Self> {
        if source_rate == 0 || dest_rate == 0 {
            return Err(Error::Resampler(format!(
                "Unsupported sample rate conversion {}Hz -> {}Hz",
                source_rate, dest_rate
            )));
        }
        if dest_channels == 0 {
            return Err(Error::Resampler(
                "Destination channel count must be non-zero".to_string(),
            ));
        }

        let dest_channels = dest_channels as usize;
        let rubato = if source_rate == dest_rate {
            debug!("Sample rate already at {}Hz, skipping resample", dest_rate);
            None
        } else {
            debug!(
                "Resampling from {}Hz to {}Hz ({} channels)",
                source_rate, dest_rate, dest_channels
            );
            let resampler = FastFixedIn::<f32>::new(
                dest_rate as f64 / source_rate as f64,
                1.0, // max_relative_ratio (no runtime changes)
                PolynomialDegree::Septic,
                RESAMPLER_CHUNK_FRAMES,
                dest_channels,
            )
            .map_err(|e| Error::Resampler(format!("Failed to create resampler: {}", e)))?;
            Some(resampler)
        };
        let delay_remaining = rubato.as_ref().map_or(0, |r| r.output_delay());

        Ok(Self {
            source_rate,
            dest_rate,
            dest_channels,
            rubato,
            pending: vec![Vec::with_capacity(RESAMPLER_CHUNK_FRAMES * 2); dest_channels],
            scratch: Vec::new(),
            input_frames: 0,
            emitted_frames: 0,
            delay_remaining,
            flushed: false,
        })
    }

    /// True when no rate conversion happens (channel mapping still applies)
    pub fn is_pass_through(&self) -> bool {
        self.rubato.is_none()
    }

    /// Input frames held back waiting for a full rubato chunk
    pub fn buffered_frames(&self) -> usize {
        self.pending.first().map_or(0, Vec::len)
    }

    /// Upper bound on output frames for the next call.
    ///
    /// Buffered input plus the incoming frame count, rounded up to whole
    /// rubato chunks and scaled by the destination/source rate ratio, plus
    /// the resampler's internal delay.
    pub fn max_output_frames(&self, incoming_frames: usize) -> usize {
        let frames = self.buffered_frames() + incoming_frames;
        match self.rubato.as_ref() {
            None => frames,
            Some(rubato) => {
                let chunks = frames.div_ceil(RESAMPLER_CHUNK_FRAMES);
                let per_chunk = ((RESAMPLER_CHUNK_FRAMES as u64 * self.dest_rate as u64)
                    .div_ceil(self.source_rate as u64) as usize)
                    .max(rubato.output_frames_max());
                rubato.output_delay() + chunks * per_chunk
            }
        }
    }

    /// Output frames a stream of `input_frames` converts to
    fn expected_output_frames(&self) -> u64 {
        (self.input_frames * self.dest_rate as u64).div_ceil(self.source_rate as u64)
    }

    /// Current scratch capacity in samples
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.capacity()
    }

    /// Convert one decoded frame and append the result to `out`.
    ///
    /// `planar` holds `frames` samples of source channel 0, then channel 1,
    /// and so on (symphonia's planar layout).
    ///
    /// # Returns
    /// Number of bytes appended to `out` (may be 0 while input accumulates)
    pub fn process(
        &mut self,
        planar: &[f32],
        source_channels: usize,
        frames: usize,
        out: &mut PcmBuffer,
    ) -> Result<usize> {
        if source_channels == 0 || frames == 0 {
            return Ok(0);
        }
        debug_assert!(planar.len() >= source_channels * frames);

        let bound = self.max_output_frames(frames) * self.dest_channels;
        self.reserve_scratch(bound);
        self.map_channels(planar, source_channels, frames);
        self.input_frames += frames as u64;

        if self.rubato.is_none() {
            self.emit_pending();
            return Ok(self.drain_scratch(out));
        }

        loop {
            let output = {
                let Some(rubato) = self.rubato.as_mut() else {
                    break;
                };
                let needed = rubato.input_frames_next();
                if self.pending[0].len() < needed {
                    break;
                }
                let chunk: Vec<Vec<f32>> = self
                    .pending
                    .iter_mut()
                    .map(|channel| channel.drain(..needed).collect())
                    .collect();
                rubato
                    .process(&chunk, None)
                    .map_err(|e| Error::Resampler(format!("Resampling failed: {}", e)))?
            };
            self.emit(&output, None);
        }

        Ok(self.drain_scratch(out))
    }

    /// Push any held-back input plus the resampler tail into `out`.
    ///
    /// Only the first call does work. The zero padding rubato needs to
    /// finish its last chunks is cut, so the total output length matches
    /// the input duration.
    pub fn flush(&mut self, out: &mut PcmBuffer) -> Result<usize> {
        if self.flushed {
            return Ok(0);
        }
        self.flushed = true;

        if self.rubato.is_none() {
            self.emit_pending();
            return Ok(self.drain_scratch(out));
        }

        let expected = self.expected_output_frames();
        let bound = self.max_output_frames(0) * self.dest_channels;
        self.reserve_scratch(bound);

        if !self.pending[0].is_empty() {
            let output = self.convert_partial(true)?;
            self.emit(&output, Some(expected));
            for channel in &mut self.pending {
                channel.clear();
            }
        }

        // Feed silence until the delayed tail of the real input is out
        let mut tail_chunks = 0;
        while self.emitted_frames < expected && tail_chunks < MAX_TAIL_CHUNKS {
            let output = self.convert_partial(false)?;
            self.emit(&output, Some(expected));
            tail_chunks += 1;
        }
        if self.emitted_frames < expected {
            warn!(
                "Resampler tail short by {} frames",
                expected - self.emitted_frames
            );
        }

        Ok(self.drain_scratch(out))
    }

    /// Run one zero-padded rubato chunk, over the pending input or silence
    fn convert_partial(&mut self, with_pending: bool) -> Result<Vec<Vec<f32>>> {
        let Some(rubato) = self.rubato.as_mut() else {
            return Ok(Vec::new());
        };
        let input = with_pending.then_some(self.pending.as_slice());
        rubato
            .process_partial(input, None)
            .map_err(|e| Error::Resampler(format!("Resampling failed: {}", e)))
    }

    /// Interleave rubato output into scratch.
    ///
    /// Frames still covering the interpolation delay are dropped, and with a
    /// `limit` nothing past that many total output frames is kept.
    fn emit(&mut self, output: &[Vec<f32>], limit: Option<u64>) {
        let frames = output.first().map_or(0, Vec::len);
        let start = self.delay_remaining.min(frames);
        self.delay_remaining -= start;

        let end = match limit {
            Some(limit) => {
                let room = limit.saturating_sub(self.emitted_frames);
                frames.min(start + room.min(frames as u64) as usize)
            }
            None => frames,
        };

        interleave_s16(output, start..end, &mut self.scratch);
        self.emitted_frames += (end - start) as u64;
    }

    /// Pass-through: every pending frame goes straight to scratch
    fn emit_pending(&mut self) {
        let frames = self.buffered_frames();
        interleave_s16(&self.pending, 0..frames, &mut self.scratch);
        self.emitted_frames += frames as u64;
        for channel in &mut self.pending {
            channel.clear();
        }
    }

    /// Grow scratch only when the bound exceeds capacity, at least doubling.
    fn reserve_scratch(&mut self, samples: usize) {
        let capacity = self.scratch.capacity();
        if samples > capacity {
            let target = samples.max(capacity * 2);
            self.scratch.reserve_exact(target - self.scratch.len());
        }
    }

    /// Map source channels onto destination channels into `pending`.
    ///
    /// Destination channel `c` averages every source channel whose index is
    /// congruent to `c` modulo the destination count. If there is none (more
    /// destination than source channels) it copies source channel
    /// `c % source_channels`.
    fn map_channels(&mut self, planar: &[f32], source_channels: usize, frames: usize) {
        let dest_channels = self.dest_channels;

        for (dest_ch, pending) in self.pending.iter_mut().enumerate() {
            let sources: Vec<usize> = (0..source_channels)
                .filter(|ch| ch % dest_channels == dest_ch)
                .collect();

            match sources.len() {
                0 => pending.extend_from_slice(plane(planar, frames, dest_ch % source_channels)),
                1 => pending.extend_from_slice(plane(planar, frames, sources[0])),
                n => {
                    let scale = 1.0 / n as f32;
                    pending.extend((0..frames).map(|frame| {
                        sources
                            .iter()
                            .map(|&ch| plane(planar, frames, ch)[frame])
                            .sum::<f32>()
                            * scale
                    }));
                }
            }
        }
    }

    fn drain_scratch(&mut self, out: &mut PcmBuffer) -> usize {
        let written = out.push_samples(&self.scratch);
        self.scratch.clear();
        written
    }
}

/// One channel of a planar frame
fn plane(planar: &[f32], frames: usize, channel: usize) -> &[f32] {
    &planar[channel * frames..(channel + 1) * frames]
}

/// Quantise a normalised f32 sample to s16
pub fn f32_to_s16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Interleave the frames in `range` of planar f32 channels into s16 samples
/// appended to `out`.
///
/// Input:  [[L, L, L, ...], [R, R, R, ...]]
/// Output: [L, R, L, R, L, R, ...]
fn interleave_s16<V: AsRef<[f32]>>(planar: &[V], range: Range<usize>, out: &mut Vec<i16>) {
    for frame_idx in range {
        for channel in planar {
            out.push(f32_to_s16(channel.as_ref()[frame_idx]));
        }
    }
}
