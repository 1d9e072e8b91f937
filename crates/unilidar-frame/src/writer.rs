use bytes::BytesMut;
use tracing::trace;
use unilidar_transport::ByteChannel;

use crate::codec::{encode_frame, Frame, DEFAULT_MAX_PAYLOAD};
use crate::error::{FrameError, Result};
use crate::message_type::type_name;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Encodes frames into a reusable buffer and writes them to a channel.
///
/// The writer does not own the channel: the same channel also carries
/// inbound telemetry, so callers lend it per send.
#[derive(Debug)]
pub struct FrameWriter {
    buf: BytesMut,
    max_payload_size: usize,
}

impl FrameWriter {
    /// Create a new frame writer with the default payload limit.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    /// Create a new frame writer with an explicit payload limit.
    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_payload_size,
        }
    }

    /// Write a complete frame.
    pub fn write_frame<C: ByteChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        frame: &Frame,
    ) -> Result<()> {
        self.send(channel, frame.msg_type, frame.payload.as_ref())
    }

    /// Encode a payload under a type tag and write it.
    ///
    /// The frame is written synchronously; a channel failure is returned
    /// as-is and nothing is kept for a later retry.
    pub fn send<C: ByteChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        msg_type: u16,
        payload: &[u8],
    ) -> Result<()> {
        if payload.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload_size,
            });
        }

        self.buf.clear();
        encode_frame(msg_type, payload, &mut self.buf)?;
        trace!(
            msg_type = type_name(msg_type),
            len = self.buf.len(),
            "writing frame"
        );

        channel.write_all(&self.buf)?;
        channel.flush()?;
        Ok(())
    }

    /// The bytes of the most recently encoded frame.
    pub fn last_encoded(&self) -> &[u8] {
        &self.buf
    }

    /// Update maximum payload size for subsequent frame encoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.max_payload_size = max_payload_size;
    }
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use unilidar_transport::{ChannelError, MemoryChannel};

    use super::*;
    use crate::codec::decode_frame;
    use crate::message_type::{LED_DISPLAY, WORK_MODE};

    #[test]
    fn write_single_frame() {
        let mut channel = MemoryChannel::new();
        let mut writer = FrameWriter::new();

        writer.send(&mut channel, WORK_MODE, &[1]).unwrap();

        let mut wire = BytesMut::from(channel.written());
        let frame = decode_frame(&mut wire, usize::MAX).unwrap();
        assert_eq!(frame.msg_type, WORK_MODE);
        assert_eq!(frame.payload.as_ref(), &[1]);
        assert_eq!(writer.last_encoded(), channel.written());
    }

    #[test]
    fn write_multiple_frames() {
        let mut channel = MemoryChannel::new();
        let mut writer = FrameWriter::new();

        writer.send(&mut channel, WORK_MODE, &[0]).unwrap();
        writer
            .write_frame(&mut channel, &Frame::new(LED_DISPLAY, vec![0xFF; 45]))
            .unwrap();

        let mut wire = BytesMut::from(channel.written());
        let f1 = decode_frame(&mut wire, usize::MAX).unwrap();
        let f2 = decode_frame(&mut wire, usize::MAX).unwrap();
        assert_eq!(f1.msg_type, WORK_MODE);
        assert_eq!(f2.msg_type, LED_DISPLAY);
        assert_eq!(f2.payload.len(), 45);
        assert!(wire.is_empty());
    }

    #[test]
    fn payload_over_limit_is_rejected_before_writing() {
        let mut channel = MemoryChannel::new();
        let mut writer = FrameWriter::with_max_payload(4);

        let err = writer.send(&mut channel, LED_DISPLAY, &[0; 5]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 5, max: 4 }));
        assert!(channel.written().is_empty());

        writer.set_max_payload_size(8);
        writer.send(&mut channel, LED_DISPLAY, &[0; 5]).unwrap();
    }

    #[test]
    fn channel_failure_is_surfaced() {
        let mut channel = MemoryChannel::new();
        channel.close();
        let mut writer = FrameWriter::new();

        let err = writer.send(&mut channel, WORK_MODE, &[1]).unwrap_err();
        assert!(matches!(err, FrameError::Channel(ChannelError::Closed)));
    }
}
