//! In-memory decode sources for unit tests

use crate::audio::{ChunkSource, DecodeStatus, OutputFormat, PcmBuffer, TrackOpener};
use crate::error::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// One scripted decode step
#[derive(Debug, Clone)]
pub enum Step {
    Bytes(Vec<u8>),
    NeedMore,
    Fail,
}

/// Replays a fixed script, then reports end of stream forever
pub struct ScriptedSource {
    steps: VecDeque<Step>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
        }
    }
}

impl ChunkSource for ScriptedSource {
    fn decode_next_chunk(&mut self, out: &mut PcmBuffer) -> Result<DecodeStatus> {
        match self.steps.pop_front() {
            Some(Step::Bytes(bytes)) => {
                out.append(&bytes);
                Ok(DecodeStatus::Produced(bytes.len()))
            }
            Some(Step::NeedMore) => Ok(DecodeStatus::NeedMoreInput),
            Some(Step::Fail) => {
                self.steps.clear();
                Err(Error::decode("scripted", "corrupt packet"))
            }
            None => Ok(DecodeStatus::EndOfStream),
        }
    }
}

/// Serves s16 samples from memory in fixed-size chunks
pub struct MemorySource {
    data: Vec<u8>,
    pos: usize,
    chunk_bytes: usize,
}

impl ChunkSource for MemorySource {
    fn decode_next_chunk(&mut self, out: &mut PcmBuffer) -> Result<DecodeStatus> {
        if self.pos >= self.data.len() {
            return Ok(DecodeStatus::EndOfStream);
        }
        let end = (self.pos + self.chunk_bytes).min(self.data.len());
        out.append(&self.data[self.pos..end]);
        let produced = end - self.pos;
        self.pos = end;
        Ok(DecodeStatus::Produced(produced))
    }
}

/// Opener over a map of path -> interleaved samples.
///
/// Unknown paths fail with `Error::Open`. Every successful open is recorded.
#[derive(Clone, Default)]
pub struct MemoryOpener {
    tracks: Arc<Mutex<HashMap<String, Vec<i16>>>>,
    scripts: Arc<Mutex<HashMap<String, Vec<Step>>>>,
    opened: Arc<Mutex<Vec<String>>>,
    chunk_bytes: usize,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self {
            chunk_bytes: 256,
            ..Default::default()
        }
    }

    pub fn with_track(self, path: &str, samples: Vec<i16>) -> Self {
        self.tracks.lock().unwrap().insert(path.to_string(), samples);
        self
    }

    /// Serve `path` from a decode script instead of samples
    pub fn with_script(self, path: &str, steps: Vec<Step>) -> Self {
        self.scripts.lock().unwrap().insert(path.to_string(), steps);
        self
    }

    pub fn remove_track(&self, path: &str) {
        self.tracks.lock().unwrap().remove(path);
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl TrackOpener for MemoryOpener {
    fn open(&self, path: &str, _format: OutputFormat) -> Result<Box<dyn ChunkSource>> {
        if let Some(steps) = self.scripts.lock().unwrap().get(path).cloned() {
            self.opened.lock().unwrap().push(path.to_string());
            return Ok(Box::new(ScriptedSource::new(steps)));
        }

        let samples = self
            .tracks
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::open(path, "No such file"))?;
        self.opened.lock().unwrap().push(path.to_string());

        let data = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Ok(Box::new(MemorySource {
            data,
            pos: 0,
            chunk_bytes: self.chunk_bytes.max(2),
        }))
    }
}

/// Deterministic non-repeating-looking byte pattern
pub fn ramp(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

