use crate::error::Result;

/// An ordered byte source/sink connected to one device.
///
/// Reads never wait for data: an implementation returns `Ok(0)` when nothing
/// is pending. Writes either deliver every byte or fail.
pub trait ByteChannel {
    /// Copy whatever bytes are pending into `buf`, returning how many.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write all of `bytes`, blocking only as long as the device needs.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Push buffered writes out to the device.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<C: ByteChannel + ?Sized> ByteChannel for &mut C {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_available(buf)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<C: ByteChannel + ?Sized> ByteChannel for Box<C> {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_available(buf)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryChannel;

    fn drain<C: ByteChannel>(mut channel: C) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 4];
        loop {
            let n = channel.read_available(&mut buf).unwrap();
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    #[test]
    fn borrowed_channel_is_a_channel() {
        let mut channel = MemoryChannel::new();
        channel.inject(b"abcdef");

        assert_eq!(drain(&mut channel), b"abcdef");
        assert!(channel.is_drained());
    }

    #[test]
    fn boxed_channel_forwards_writes() {
        let mut boxed: Box<dyn ByteChannel> = Box::new(MemoryChannel::new());
        boxed.write_all(b"cmd").unwrap();
        boxed.flush().unwrap();
    }
}
