//! Pull buffer for decoded PCM bytes
//!
//! Holds the decoded-but-undelivered bytes of one track. Decoding appends at
//! the write cursor; the renderer consumes from the front.
//!
//! # Sample Format
//!
//! - Signed 16-bit little-endian, interleaved at the track's output format
//! - Bytes `[0, len)` are valid PCM not yet delivered to the renderer
//!
//! # Growth
//!
//! Capacity grows to at least double its previous size whenever an append
//! does not fit, so a long track decodes with O(log n) reallocations.

/// Growable byte buffer with explicit capacity tracking.
///
/// # Examples
///
/// ```
/// use seamless_player::audio::PcmBuffer;
///
/// let mut buffer = PcmBuffer::new();
/// buffer.push_samples(&[1, -1]);
/// assert_eq!(buffer.len(), 4);
/// buffer.consume(2);
/// assert_eq!(buffer.as_slice(), &(-1i16).to_le_bytes());
/// ```
#[derive(Debug, Default)]
pub struct PcmBuffer {
    /// `data.len()` is the write cursor
    data: Vec<u8>,
}

impl PcmBuffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Bytes available for delivery (the write cursor)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Read-only view of the undelivered front
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Append raw PCM bytes at the write cursor
    pub fn append(&mut self, bytes: &[u8]) {
        self.grow_for(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    /// Append samples as little-endian s16 bytes.
    ///
    /// Returns the number of bytes appended.
    pub fn push_samples(&mut self, samples: &[i16]) -> usize {
        let bytes = samples.len() * std::mem::size_of::<i16>();
        self.grow_for(bytes);
        for sample in samples {
            self.data.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    /// Drop `n` delivered bytes from the front and compact the remainder to
    /// offset 0.
    ///
    /// # Panics
    /// Panics if `n` exceeds [`len`](Self::len). Consuming bytes that were
    /// never decoded is a contract violation.
    pub fn consume(&mut self, n: usize) {
        assert!(
            n <= self.data.len(),
            "consume({}) exceeds {} available bytes",
            n,
            self.data.len()
        );
        self.data.drain(..n);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    fn grow_for(&mut self, additional: usize) {
        let needed = self.data.len() + additional;
        let capacity = self.data.capacity();
        if needed > capacity {
            let target = needed.max(capacity * 2);
            self.data.reserve_exact(target - self.data.len());
        }
    }
}
