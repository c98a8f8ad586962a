//! Control surface
//!
//! [`Player`] owns the output device and the playback queue. Every queue
//! operation locks the same mutex the render callback holds while it fills
//! a device buffer, so control calls and rendering never interleave.
//!
//! # Lifecycle
//! `new` → `init` → (`queue` / `play` / `pause` / `next` / `prev` / `goto`)*
//! → `close`. After `close` the player may be initialized again.

use crate::audio::{
    AudioSink, CpalBackend, OutputBackend, OutputFormat, SymphoniaOpener, TrackOpener,
    DEFAULT_BUFFER_FRAMES,
};
use crate::error::{Error, Result};
use crate::playback::queue::{CurrentSong, Placement, PlaybackQueue};
use crate::playback::render::{lock_queue, Renderer};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// State that exists between `init` and `close`
struct Session {
    queue: Arc<Mutex<PlaybackQueue>>,

    /// Dropped after the queue is cleared on close
    sink: Box<dyn AudioSink>,
}

pub struct Player {
    opener: Arc<dyn TrackOpener>,
    backend: Box<dyn OutputBackend>,
    buffer_frames: u32,
    session: Option<Session>,
}

impl Player {
    /// Player decoding with symphonia and playing through the default cpal
    /// device
    pub fn new() -> Self {
        Self::with_backends(Arc::new(SymphoniaOpener), Box::new(CpalBackend::default()))
    }

    pub fn with_backends(opener: Arc<dyn TrackOpener>, backend: Box<dyn OutputBackend>) -> Self {
        Self {
            opener,
            backend,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            session: None,
        }
    }

    /// Frames per device callback requested at `init`
    pub fn with_buffer_frames(mut self, buffer_frames: u32) -> Self {
        self.buffer_frames = buffer_frames;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(Error::NotInitialized)
    }

    fn locked_queue(&self) -> Result<MutexGuard<'_, PlaybackQueue>> {
        Ok(lock_queue(&self.session()?.queue))
    }

    /// Open the output device, paused, at the given format.
    ///
    /// # Errors
    /// - `Error::AlreadyInitialized` if called twice without `close`
    /// - `Error::Device` for a zero format or when the device cannot be opened
    pub fn init(&mut self, channels: u16, sample_rate: u32) -> Result<()> {
        if self.session.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        if channels == 0 || sample_rate == 0 {
            return Err(Error::Device(format!(
                "Unsupported output format: {} channels at {}Hz",
                channels, sample_rate
            )));
        }

        let format = OutputFormat::new(channels, sample_rate);
        let queue = Arc::new(Mutex::new(PlaybackQueue::new(
            Arc::clone(&self.opener),
            format,
        )));
        let sink = self
            .backend
            .open(format, self.buffer_frames, Renderer::new(Arc::clone(&queue)))?;

        info!(
            "Player initialized: {} channels at {}Hz, {} frame buffers",
            channels, sample_rate, self.buffer_frames
        );
        self.session = Some(Session { queue, sink });
        Ok(())
    }

    /// Output format fixed at `init`
    pub fn format(&self) -> Result<OutputFormat> {
        Ok(self.locked_queue()?.format())
    }

    /// Append a track to the back of the queue.
    ///
    /// The decoder is opened immediately, under the queue lock.
    ///
    /// # Errors
    /// `Error::Open` / `Error::Resampler` from opening the track; the queue
    /// is unchanged.
    pub fn queue(&self, path: &str) -> Result<()> {
        self.locked_queue()?.enqueue(path, Placement::Back)
    }

    pub fn play(&self) -> Result<()> {
        self.session()?.sink.resume()?;
        debug!("Playback resumed");
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        self.session()?.sink.pause()?;
        debug!("Playback paused");
        Ok(())
    }

    /// Skip the current track.
    ///
    /// Unlike the automatic advance at end of track, this also skips the
    /// last pending track, which restarts the playlist from its first
    /// track.
    pub fn next(&self) -> Result<()> {
        self.locked_queue()?.advance();
        Ok(())
    }

    /// Restart the current track behind the previously played one
    pub fn prev(&self) -> Result<()> {
        self.locked_queue()?.rewind()
    }

    /// Jump to the 1-based playlist position (played tracks first)
    pub fn goto(&self, position: usize) -> Result<()> {
        self.locked_queue()?.goto(position)
    }

    /// Head track's path and progress, or `None` with an empty queue
    pub fn current_song(&self) -> Result<Option<CurrentSong>> {
        Ok(self.locked_queue()?.current_song())
    }

    /// Clear the queue and release the output device.
    ///
    /// # Errors
    /// `Error::NotInitialized` if there is nothing to close
    pub fn close(&mut self) -> Result<()> {
        let session = self.session.take().ok_or(Error::NotInitialized)?;
        lock_queue(&session.queue).clear();
        drop(session.sink);
        info!("Player closed");
        Ok(())
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if self.session.is_some() {
            let _ = self.close();
        }
    }
}
