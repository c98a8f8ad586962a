//! Audio decoder using symphonia
//!
//! Opens one track, pulls compressed packets, decodes them and hands each
//! decoded frame to the [`StreamResampler`], which appends s16 PCM to the
//! track's pull buffer.
//!
//! # Supported Formats
//!
//! Per Cargo.toml symphonia features plus symphonia defaults:
//! - MP3, FLAC, AAC, MP4/M4A, Vorbis/Ogg, WAV/PCM, ADPCM
//!
//! # Decode step
//!
//! One call to [`ChunkSource::decode_next_chunk`] reads one packet. A
//! packet may decode to zero frames (codec priming, other tracks), which is
//! reported as [`DecodeStatus::NeedMoreInput`] rather than end of stream.

use crate::audio::buffer::PcmBuffer;
use crate::audio::resampler::StreamResampler;
use crate::audio::types::{DecodeStatus, OutputFormat};
use crate::error::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Per-track decode/resample state.
///
/// Implementations append converted PCM to `out` and report what happened
/// as a tagged [`DecodeStatus`]. After `EndOfStream` every further call
/// must return `EndOfStream` without side effects.
pub trait ChunkSource: Send {
    fn decode_next_chunk(&mut self, out: &mut PcmBuffer) -> Result<DecodeStatus>;
}

/// Constructs a [`ChunkSource`] for a path at the player's output format.
///
/// The playback queue calls this on enqueue, on repeat, and on prev.
pub trait TrackOpener: Send + Sync {
    fn open(&self, path: &str, format: OutputFormat) -> Result<Box<dyn ChunkSource>>;
}

/// Default opener backed by symphonia + rubato
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaOpener;

impl TrackOpener for SymphoniaOpener {
    fn open(&self, path: &str, format: OutputFormat) -> Result<Box<dyn ChunkSource>> {
        Ok(Box::new(SymphoniaSource::open(path, format)?))
    }
}

/// Streaming decoder for one audio file.
pub struct SymphoniaSource {
    path: PathBuf,

    /// Symphonia format reader
    format: Box<dyn FormatReader>,

    /// Symphonia decoder
    decoder: Box<dyn Decoder>,

    /// Track being decoded
    track_id: u32,

    /// Stateful converter to the output format
    resampler: StreamResampler,

    /// Planar f32 staging for decoded frames, reused while large enough
    sample_buf: Option<SampleBuffer<f32>>,
    sample_buf_capacity: usize,

    /// No more packets to read
    end_of_input: bool,

    /// Input exhausted and resampler flushed
    end_of_decode: bool,
}

impl SymphoniaSource {
    /// Open `path` and prepare conversion to `output`.
    ///
    /// # Errors
    /// - `Error::Open`: file unreadable, unknown container, no audio track,
    ///   or no decoder for the codec
    /// - `Error::Resampler`: no conversion from the source rate to `output`
    pub fn open<P: AsRef<Path>>(path: P, output: OutputFormat) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening track: {}", path.display());

        let file = File::open(path).map_err(|e| Error::open(path, e))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_options(), &MetadataOptions::default())
            .map_err(|e| Error::open(path, format!("Failed to probe format: {}", e)))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::open(path, "No audio track found"))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let source_rate = codec_params
            .sample_rate
            .ok_or_else(|| Error::open(path, "Sample rate not found"))?;

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::open(path, format!("Failed to create decoder: {}", e)))?;

        let resampler = StreamResampler::new(source_rate, output.sample_rate, output.channels)?;

        debug!(
            "Audio format: sample_rate={}, channels={:?} -> {}Hz, {} channels",
            source_rate,
            codec_params.channels.map(|c| c.count()),
            output.sample_rate,
            output.channels
        );

        Ok(Self {
            path: path.to_path_buf(),
            format,
            decoder,
            track_id,
            resampler,
            sample_buf: None,
            sample_buf_capacity: 0,
            end_of_input: false,
            end_of_decode: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reader options: gapless mode drops encoder delay and padding frames
fn format_options() -> FormatOptions {
    FormatOptions {
        enable_gapless: true,
        ..Default::default()
    }
}

impl ChunkSource for SymphoniaSource {
    fn decode_next_chunk(&mut self, out: &mut PcmBuffer) -> Result<DecodeStatus> {
        if self.end_of_decode {
            return Ok(DecodeStatus::EndOfStream);
        }

        if self.end_of_input {
            // Decoder drained; push out what the resampler still holds
            let flushed = self.resampler.flush(out)?;
            self.end_of_decode = true;
            debug!("Decoding complete: {}", self.path.display());
            return Ok(if flushed > 0 {
                DecodeStatus::Produced(flushed)
            } else {
                DecodeStatus::EndOfStream
            });
        }

        let packet = match self.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                debug!("Reached end of file: {}", self.path.display());
                self.end_of_input = true;
                return Ok(DecodeStatus::NeedMoreInput);
            }
            Err(SymphoniaError::ResetRequired) => {
                warn!(
                    "Stream reset required in {}, treating as end of input",
                    self.path.display()
                );
                self.end_of_input = true;
                return Ok(DecodeStatus::NeedMoreInput);
            }
            Err(e) => {
                self.end_of_decode = true;
                return Err(Error::decode(&self.path, format!("Could not read packet: {}", e)));
            }
        };

        // Skip packets for other tracks
        if packet.track_id() != self.track_id {
            return Ok(DecodeStatus::NeedMoreInput);
        }

        let decoded = match self.decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.end_of_decode = true;
                return Err(Error::decode(&self.path, format!("Could not decode frame: {}", e)));
            }
        };

        let frames = decoded.frames();
        if frames == 0 {
            return Ok(DecodeStatus::NeedMoreInput);
        }

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let needed = frames * channels;
        if needed > self.sample_buf_capacity {
            self.sample_buf = None;
        }
        let capacity = &mut self.sample_buf_capacity;
        let sample_buf = self.sample_buf.get_or_insert_with(|| {
            let duration = decoded.capacity().max(frames);
            *capacity = duration * channels;
            SampleBuffer::<f32>::new(duration as u64, spec)
        });
        sample_buf.copy_planar_ref(decoded);

        let produced = self
            .resampler
            .process(sample_buf.samples(), channels, frames, out)?;

        Ok(if produced > 0 {
            DecodeStatus::Produced(produced)
        } else {
            DecodeStatus::NeedMoreInput
        })
    }
}
