//! Bounded reassembly buffer.
//!
//! Holds raw channel bytes between polls. When unconsumed bytes pass the
//! ceiling the oldest are dropped, so sustained noise or a protocol
//! mismatch cannot grow memory without bound.

use bytes::{Buf, Bytes, BytesMut};
use tracing::warn;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Ordered byte queue with a drop-oldest ceiling.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: BytesMut,
    ceiling: usize,
    dropped: u64,
    resync: bool,
}

impl FrameBuffer {
    /// Create an empty buffer that never holds more than `ceiling` bytes.
    pub fn new(ceiling: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY.min(ceiling.max(1))),
            ceiling: ceiling.max(1),
            dropped: 0,
            resync: false,
        }
    }

    /// Append newly received bytes.
    ///
    /// Returns how many of the oldest buffered bytes were discarded to stay
    /// under the ceiling (zero in the normal case).
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        // Only the newest `ceiling` bytes of an oversized chunk can survive.
        let mut overflow = 0usize;
        let bytes = if bytes.len() > self.ceiling {
            overflow += bytes.len() - self.ceiling;
            &bytes[bytes.len() - self.ceiling..]
        } else {
            bytes
        };

        let excess = (self.buf.len() + bytes.len()).saturating_sub(self.ceiling);
        if excess > 0 {
            self.buf.advance(excess);
            overflow += excess;
        }
        self.buf.extend_from_slice(bytes);

        if overflow > 0 {
            self.dropped = self.dropped.saturating_add(overflow as u64);
            self.resync = true;
            warn!(
                dropped = overflow,
                ceiling = self.ceiling,
                "frame buffer overflow, dropped oldest bytes"
            );
        }
        overflow
    }

    /// The unconsumed bytes, oldest first.
    pub fn peek(&self) -> &[u8] {
        &self.buf
    }

    /// Remove `n` bytes from the front (clamped to the buffered length).
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        self.buf.advance(n);
    }

    /// Remove `n` bytes from the front and return them without copying.
    pub fn take(&mut self, n: usize) -> Bytes {
        let n = n.min(self.buf.len());
        self.buf.split_to(n).freeze()
    }

    /// Number of unconsumed bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The configured ceiling.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Total bytes discarded by overflow over the buffer's lifetime.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Report and clear the overflow resync flag.
    pub fn take_resync(&mut self) -> bool {
        std::mem::take(&mut self.resync)
    }

    /// Discard everything buffered.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
