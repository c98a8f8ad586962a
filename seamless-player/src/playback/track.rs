//! Queued track with its decode state and pending PCM
//!
//! A track pulls exactly as many decoded bytes as the renderer asks for and
//! keeps the remainder for the next request.

use crate::audio::{ChunkSource, DecodeStatus, OutputFormat, PcmBuffer};
use crate::error::Result;
use tracing::{debug, warn};
use uuid::Uuid;

/// One queued audio source with its decoder and pull buffer.
///
/// Dropping a track releases its decoder resources.
pub struct Track {
    /// Fresh per constructed instance; a repeated path gets a new id
    entry_id: Uuid,

    /// Source path (the track's identity in history)
    path: String,

    source: Box<dyn ChunkSource>,

    /// Decoded bytes not yet delivered to the renderer
    buffer: PcmBuffer,

    format: OutputFormat,

    /// Source reported end of stream or failed
    end_of_decode: bool,

    /// Bytes consumed by the renderer so far
    delivered_bytes: u64,
}

impl Track {
    pub fn new(path: impl Into<String>, source: Box<dyn ChunkSource>, format: OutputFormat) -> Self {
        let path = path.into();
        let entry_id = Uuid::new_v4();
        debug!("Created track {} ({})", entry_id, path);
        Self {
            entry_id,
            path,
            source,
            buffer: PcmBuffer::new(),
            format,
            end_of_decode: false,
            delivered_bytes: 0,
        }
    }

    pub fn entry_id(&self) -> Uuid {
        self.entry_id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn end_of_decode(&self) -> bool {
        self.end_of_decode
    }

    /// Bytes currently buffered and undelivered
    pub fn available(&self) -> usize {
        self.buffer.len()
    }

    /// Playback position derived from delivered bytes
    pub fn elapsed_ms(&self) -> u64 {
        self.format.bytes_to_ms(self.delivered_bytes)
    }

    /// Decode until at least `n` bytes are buffered or the stream ends.
    ///
    /// # Returns
    /// `min(n, available)`; less than `n` only once decoding is finished.
    /// Calling again with the same or smaller `n` decodes nothing.
    ///
    /// # Errors
    /// The first decode failure is returned and ends the track; later calls
    /// return whatever was buffered before the failure.
    pub fn ensure_bytes(&mut self, n: usize) -> Result<usize> {
        while self.buffer.len() < n && !self.end_of_decode {
            match self.source.decode_next_chunk(&mut self.buffer) {
                Ok(DecodeStatus::Produced(_)) | Ok(DecodeStatus::NeedMoreInput) => {}
                Ok(DecodeStatus::EndOfStream) => {
                    debug!(
                        "Track {} finished decoding ({} bytes pending)",
                        self.entry_id,
                        self.buffer.len()
                    );
                    self.end_of_decode = true;
                }
                Err(e) => {
                    warn!("Track {} stopped decoding: {}", self.entry_id, e);
                    self.end_of_decode = true;
                    return Err(e);
                }
            }
        }
        Ok(self.buffer.len().min(n))
    }

    /// Read-only view of the undelivered front
    pub fn buffer(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Mark `n` bytes from the front as delivered.
    ///
    /// # Panics
    /// Panics if `n` exceeds [`available`](Self::available).
    pub fn did_read(&mut self, n: usize) {
        self.buffer.consume(n);
        self.delivered_bytes += n as u64;
    }
}

impl Drop for Track {
    fn drop(&mut self) {
        debug!("Released track {} ({})", self.entry_id, self.path);
    }
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("entry_id", &self.entry_id)
            .field("path", &self.path)
            .field("available", &self.buffer.len())
            .field("end_of_decode", &self.end_of_decode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::playback::test_support::{ramp, ScriptedSource, Step};

    fn format() -> OutputFormat {
        OutputFormat::new(2, 44100)
    }

    fn track_with(steps: Vec<Step>) -> Track {
        Track::new("test.flac", Box::new(ScriptedSource::new(steps)), format())
    }

    #[test]
    fn test_ensure_bytes_decodes_until_satisfied() {
        let mut track = track_with(vec![
            Step::Bytes(vec![1; 100]),
            Step::NeedMore,
            Step::Bytes(vec![2; 100]),
            Step::Bytes(vec![3; 100]),
        ]);

        assert_eq!(track.ensure_bytes(150).unwrap(), 150);
        // Third chunk was not needed
        assert_eq!(track.available(), 200);
        assert!(!track.end_of_decode());
    }

    #[test]
    fn test_ensure_bytes_short_at_end_of_stream() {
        let mut track = track_with(vec![Step::Bytes(vec![1; 60])]);

        assert_eq!(track.ensure_bytes(100).unwrap(), 60);
        assert!(track.end_of_decode());
    }

    #[test]
    fn test_ensure_bytes_idempotent_when_satisfied() {
        let mut track = track_with(vec![Step::Bytes(vec![7; 64]), Step::Bytes(vec![8; 64])]);

        assert_eq!(track.ensure_bytes(64).unwrap(), 64);
        assert_eq!(track.ensure_bytes(64).unwrap(), 64);
        assert_eq!(track.ensure_bytes(10).unwrap(), 10);
        assert_eq!(track.available(), 64);
    }

    #[test]
    fn test_fully_decoded_returns_min_of_request_and_remaining() {
        let mut track = track_with(vec![Step::Bytes(vec![1; 40])]);
        assert_eq!(track.ensure_bytes(1000).unwrap(), 40);

        assert_eq!(track.ensure_bytes(1000).unwrap(), 40);
        assert_eq!(track.ensure_bytes(16).unwrap(), 16);
        assert_eq!(track.ensure_bytes(16).unwrap(), 16);
    }

    #[test]
    fn test_unconsumed_equals_decoded_minus_consumed() {
        let data = ramp(1000);
        let chunks: Vec<Step> = data.chunks(96).map(|c| Step::Bytes(c.to_vec())).collect();
        let mut track = track_with(chunks);

        let mut consumed = Vec::new();
        for (request, take) in [(10, 10), (300, 250), (5, 0), (800, 700), (4000, 40)] {
            let got = track.ensure_bytes(request).unwrap();
            assert!(got <= request);
            let take = take.min(got);
            consumed.extend_from_slice(&track.buffer()[..take]);
            track.did_read(take);

            // Front of the buffer continues exactly where consumption stopped
            let decoded_so_far = consumed.len() + track.available();
            assert_eq!(track.buffer(), &data[consumed.len()..decoded_so_far]);
        }
        assert_eq!(consumed, data);
        assert_eq!(track.available(), 0);
    }

    #[test]
    fn test_did_read_tracks_elapsed() {
        // One second of stereo s16
        let mut track = track_with(vec![Step::Bytes(vec![0; 44100 * 4])]);
        let got = track.ensure_bytes(44100 * 4).unwrap();
        track.did_read(got / 2);
        assert_eq!(track.elapsed_ms(), 500);
        track.did_read(got / 2);
        assert_eq!(track.elapsed_ms(), 1000);
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn test_did_read_past_available_panics() {
        let mut track = track_with(vec![Step::Bytes(vec![0; 8])]);
        track.ensure_bytes(8).unwrap();
        track.did_read(9);
    }

    #[test]
    fn test_decode_error_surfaces_then_ends_track() {
        let mut track = track_with(vec![Step::Bytes(vec![5; 10]), Step::Fail]);

        let result = track.ensure_bytes(100);
        assert!(matches!(result, Err(Error::Decode { .. })));
        assert!(track.end_of_decode());

        // Bytes decoded before the failure remain deliverable
        assert_eq!(track.ensure_bytes(100).unwrap(), 10);
    }
}
