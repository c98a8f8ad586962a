//! Render callback body
//!
//! Fills one device buffer from the head of the playback queue. Runs on the
//! real-time audio thread with the queue mutex held for the whole call.

use crate::audio::BYTES_PER_SAMPLE;
use crate::playback::mixer::{mix_into, trim_trailing_silence};
use crate::playback::queue::PlaybackQueue;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Fill `out` from the queue.
///
/// The buffer is zeroed first, then tracks are mixed in from the head. A
/// track that ends while others are pending is advanced past and trailing
/// silence written for it in this call is trimmed, so the next track starts
/// immediately. The last pending track is never advanced here; once it runs
/// dry the rest of `out` stays silent.
///
/// Decode errors end the failing track. They are logged, never propagated.
pub fn render(queue: &mut PlaybackQueue, out: &mut [i16]) {
    out.fill(0);

    let format = queue.format();
    let channels = format.channels as usize;
    let trim_cap = format.quarter_second_samples();

    let mut pos = 0;
    while pos < out.len() {
        let pending = queue.len();
        let Some(track) = queue.head_mut() else {
            break;
        };

        let wanted = (out.len() - pos) * BYTES_PER_SAMPLE;
        let available = match track.ensure_bytes(wanted) {
            Ok(available) => available,
            Err(e) => {
                // Bytes decoded before the failure still play
                warn!("Ending {} early: {}", track.path(), e);
                track.available().min(wanted)
            }
        };
        // Whole samples only
        let available = available - available % BYTES_PER_SAMPLE;

        if available == 0 {
            if pending <= 1 {
                break;
            }
            queue.advance();
            pos = trim_trailing_silence(out, pos, channels, trim_cap);
            continue;
        }

        let mixed = mix_into(&mut out[pos..], &track.buffer()[..available]);
        track.did_read(mixed * BYTES_PER_SAMPLE);
        pos += mixed;
    }
}

/// Shared handle the output device calls into.
///
/// Cloning shares the same queue.
#[derive(Clone)]
pub struct Renderer {
    queue: Arc<Mutex<PlaybackQueue>>,
}

impl Renderer {
    pub fn new(queue: Arc<Mutex<PlaybackQueue>>) -> Self {
        Self { queue }
    }

    /// Lock the queue and fill `out`
    pub fn render(&self, out: &mut [i16]) {
        let mut queue = lock_queue(&self.queue);
        render(&mut queue, out);
    }
}

/// Lock the shared queue.
///
/// A panic on another thread while holding the lock does not leave the queue
/// structurally invalid, so a poisoned lock is recovered rather than
/// propagated into the audio thread.
pub(crate) fn lock_queue(queue: &Mutex<PlaybackQueue>) -> MutexGuard<'_, PlaybackQueue> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}
