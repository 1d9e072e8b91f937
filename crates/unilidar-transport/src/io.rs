use std::io::{ErrorKind, Read, Write};

use crate::error::{ChannelError, Result};
use crate::traits::ByteChannel;

/// Adapts any `Read + Write` stream into a [`ByteChannel`].
///
/// `WouldBlock` and `TimedOut` reads count as "nothing pending", so a stream
/// configured with a short read timeout (or non-blocking mode) behaves like a
/// polled device. End of stream also reads as zero bytes, which lets a
/// capture file be replayed through the same poll loop as a live port.
pub struct IoChannel<T> {
    inner: T,
}

impl<T: Read + Write> IoChannel<T> {
    /// Wrap a stream.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the channel and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write> ByteChannel for IoChannel<T> {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.inner.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Ok(0)
                }
                Err(err) => return Err(ChannelError::Io(err)),
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(ChannelError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(ChannelError::Io(err)),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(ChannelError::Io(err)),
            }
        }
    }
}

impl<T> std::fmt::Debug for IoChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoChannel").finish_non_exhaustive()
    }
}
