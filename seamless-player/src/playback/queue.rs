//! Playback queue
//!
//! Ordered pending tracks plus the paths of tracks already played. The head
//! of `pending` is the track the renderer is playing.
//!
//! # Progression
//! - [`advance`](PlaybackQueue::advance) moves the head's path into history.
//!   When that empties `pending`, every history path is reopened in order and
//!   history is cleared (whole-playlist repeat).
//! - [`rewind`](PlaybackQueue::rewind) restarts the head and puts the most
//!   recent history entry in front of it.

use crate::audio::{OutputFormat, TrackOpener};
use crate::error::Result;
use crate::playback::track::Track;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a newly opened track goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Front,
    Back,
}

/// Snapshot of the head track for status queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentSong {
    pub path: String,

    /// Position derived from bytes delivered to the device
    pub elapsed_ms: u64,

    /// Decoder has produced its last byte; the rest is already buffered
    pub end_of_decode: bool,
}

pub struct PlaybackQueue {
    /// Front is the currently playing track
    pending: VecDeque<Track>,

    /// Paths of tracks played since the last repeat, oldest first
    history: Vec<String>,

    opener: Arc<dyn TrackOpener>,
    format: OutputFormat,
}

impl PlaybackQueue {
    pub fn new(opener: Arc<dyn TrackOpener>, format: OutputFormat) -> Self {
        Self {
            pending: VecDeque::new(),
            history: Vec::new(),
            opener,
            format,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Number of pending tracks, including the head
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn head(&self) -> Option<&Track> {
        self.pending.front()
    }

    pub fn head_mut(&mut self) -> Option<&mut Track> {
        self.pending.front_mut()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn pending_paths(&self) -> Vec<&str> {
        self.pending.iter().map(Track::path).collect()
    }

    /// 1-based position of the head within history + pending
    pub fn position(&self) -> Option<usize> {
        (!self.pending.is_empty()).then(|| self.history.len() + 1)
    }

    fn open_track(&self, path: &str) -> Result<Track> {
        let source = self.opener.open(path, self.format)?;
        Ok(Track::new(path, source, self.format))
    }

    /// Open `path` and insert it.
    ///
    /// # Errors
    /// Open and resampler errors from the opener. On error the queue is
    /// unchanged.
    pub fn enqueue(&mut self, path: &str, placement: Placement) -> Result<()> {
        let track = self.open_track(path)?;
        info!("Queued {} ({:?})", path, placement);
        match placement {
            Placement::Front => self.pending.push_front(track),
            Placement::Back => self.pending.push_back(track),
        }
        Ok(())
    }

    /// Finish the head track and move on.
    ///
    /// No-op on an empty queue.
    pub fn advance(&mut self) {
        let Some(finished) = self.pending.pop_front() else {
            return;
        };
        debug!("Advancing past {}", finished.path());
        self.history.push(finished.path().to_string());
        drop(finished);

        if self.pending.is_empty() {
            self.repeat();
        }
    }

    fn repeat(&mut self) {
        let paths = std::mem::take(&mut self.history);
        info!("Playlist finished, repeating {} tracks", paths.len());
        for path in &paths {
            match self.open_track(path) {
                Ok(track) => self.pending.push_back(track),
                Err(e) => warn!("Dropping {} from playlist: {}", path, e),
            }
        }
    }

    /// Restart the head and step back to the previous track.
    ///
    /// Without history this does nothing.
    ///
    /// # Errors
    /// If either track fails to reopen the error is returned and the queue
    /// is unchanged.
    pub fn rewind(&mut self) -> Result<()> {
        let Some(previous_path) = self.history.last().cloned() else {
            debug!("No history to rewind into");
            return Ok(());
        };

        let previous = self.open_track(&previous_path)?;
        let restarted = match self.pending.front() {
            Some(head) => Some(self.open_track(head.path())?),
            None => None,
        };

        self.history.pop();
        if let Some(restarted) = restarted {
            self.pending.pop_front();
            self.pending.push_front(restarted);
        }
        self.pending.push_front(previous);
        info!("Rewound to {}", previous_path);
        Ok(())
    }

    /// Jump to the 1-based `position` within history + pending.
    ///
    /// Out-of-range positions are ignored.
    ///
    /// # Errors
    /// Reopen failures while stepping backwards; steps already taken stay.
    pub fn goto(&mut self, position: usize) -> Result<()> {
        let total = self.history.len() + self.pending.len();
        let Some(current) = self.position() else {
            return Ok(());
        };
        if position == 0 || position > total {
            debug!("Ignoring goto {} (queue holds {})", position, total);
            return Ok(());
        }

        if position > current {
            for _ in current..position {
                self.advance();
            }
        } else {
            for _ in position..current {
                self.rewind()?;
            }
        }
        Ok(())
    }

    pub fn current_song(&self) -> Option<CurrentSong> {
        self.pending.front().map(|track| CurrentSong {
            path: track.path().to_string(),
            elapsed_ms: track.elapsed_ms(),
            end_of_decode: track.end_of_decode(),
        })
    }

    /// Drop every track and forget history
    pub fn clear(&mut self) {
        self.pending.clear();
        self.history.clear();
    }
}

impl std::fmt::Debug for PlaybackQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackQueue")
            .field("pending", &self.pending_paths())
            .field("history", &self.history)
            .field("format", &self.format)
            .finish()
    }
}
