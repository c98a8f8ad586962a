//! Test helper modules for seamless-player integration tests
//!
//! - audio_generator: hound-written WAV fixtures
//! - ManualBackend: an output "device" whose callback the test invokes

#![allow(dead_code)]

pub mod audio_generator;

use seamless_player::audio::{AudioSink, OutputBackend, OutputFormat};
use seamless_player::playback::Renderer;
use seamless_player::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Output backend that captures the renderer instead of opening hardware
#[derive(Clone, Default)]
pub struct ManualBackend {
    renderer: Arc<Mutex<Option<Renderer>>>,
    playing: Arc<AtomicBool>,
    fail: bool,
}

impl ManualBackend {
    /// Backend whose device never opens
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Run one device callback of `samples` interleaved samples
    pub fn callback(&self, samples: usize) -> Vec<i16> {
        let mut out = vec![0i16; samples];
        let renderer = self
            .renderer
            .lock()
            .unwrap()
            .clone()
            .expect("player not initialized");
        renderer.render(&mut out);
        out
    }

    /// Run callbacks of `buffer` samples until `total` samples are rendered
    pub fn drain(&self, buffer: usize, total: usize) -> Vec<i16> {
        let mut rendered = Vec::with_capacity(total);
        while rendered.len() < total {
            rendered.extend(self.callback(buffer.min(total - rendered.len())));
        }
        rendered
    }
}

struct ManualSink {
    playing: Arc<AtomicBool>,
}

impl AudioSink for ManualSink {
    fn resume(&self) -> Result<()> {
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl OutputBackend for ManualBackend {
    fn open(
        &self,
        _format: OutputFormat,
        _buffer_frames: u32,
        renderer: Renderer,
    ) -> Result<Box<dyn AudioSink>> {
        if self.fail {
            return Err(Error::Device("no device".to_string()));
        }
        *self.renderer.lock().unwrap() = Some(renderer);
        Ok(Box::new(ManualSink {
            playing: Arc::clone(&self.playing),
        }))
    }
}

/// Longest run of all-zero frames in `samples`
pub fn longest_silent_run(samples: &[i16], channels: usize) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for frame in samples.chunks_exact(channels) {
        if frame.iter().all(|&s| s == 0) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}
