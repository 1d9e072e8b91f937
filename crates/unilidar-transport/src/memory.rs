use std::collections::VecDeque;

use crate::error::{ChannelError, Result};
use crate::traits::ByteChannel;

/// In-memory channel for tests and offline tooling.
///
/// Bytes injected with [`MemoryChannel::inject`] are handed out by
/// `read_available`; bytes written by the host are captured and can be
/// inspected with [`MemoryChannel::written`].
#[derive(Debug, Default)]
pub struct MemoryChannel {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    read_limit: Option<usize>,
    closed: bool,
}

impl MemoryChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the host to read.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    /// Cap the number of bytes returned by a single read.
    pub fn set_read_limit(&mut self, limit: Option<usize>) {
        self.read_limit = limit;
    }

    /// Make every subsequent write fail with [`ChannelError::Closed`].
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// All bytes written by the host so far.
    pub fn written(&self) -> &[u8] {
        &self.outbound
    }

    /// Take and clear the captured writes.
    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }

    /// Bytes injected but not read yet.
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    /// True when every injected byte has been read.
    pub fn is_drained(&self) -> bool {
        self.inbound.is_empty()
    }
}

impl ByteChannel for MemoryChannel {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let limit = self.read_limit.unwrap_or(usize::MAX);
        let n = self.inbound.len().min(buf.len()).min(limit);
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        self.outbound.extend_from_slice(bytes);
        Ok(())
    }
}
