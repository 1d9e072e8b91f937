use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: magic (4) + type (2) + length (4) = 10 bytes.
pub const HEADER_SIZE: usize = 10;

/// Frame trailer: CRC-32 of the payload (4 bytes).
pub const TRAILER_SIZE: usize = 4;

/// Magic bytes opening every frame.
pub const MAGIC: [u8; 4] = [0x55, 0xAA, 0x05, 0x0A];

/// Default maximum payload size: 64 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// Default reassembly buffer ceiling: 256 KiB.
pub const DEFAULT_BUFFER_CEILING: usize = 256 * 1024;

/// Default number of bytes pulled from the channel per read call.
pub const DEFAULT_READ_CHUNK: usize = 4 * 1024;

/// A checksum-validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type tag, see [`crate::message_type`].
    pub msg_type: u16,
    /// The message payload.
    pub payload: Bytes,
    /// CRC-32 carried in the trailer.
    pub checksum: u32,
}

impl Frame {
    /// Create a new frame, computing its checksum.
    pub fn new(msg_type: u16, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let checksum = checksum(&payload);
        Self {
            msg_type,
            payload,
            checksum,
        }
    }

    /// The total wire size of this frame (header + payload + trailer).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + TRAILER_SIZE
    }

    /// True when the carried checksum matches the payload.
    pub fn is_intact(&self) -> bool {
        self.checksum == checksum(&self.payload)
    }

    /// Append this frame's wire bytes to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        encode_frame(self.msg_type, &self.payload, dst)
    }

    /// Split a validated wire image into its fields without copying.
    pub(crate) fn from_wire(mut raw: Bytes) -> Self {
        raw.advance(MAGIC.len());
        let msg_type = raw.get_u16_le();
        let len = raw.get_u32_le() as usize;
        let payload = raw.split_to(len);
        let checksum = raw.get_u32_le();
        Self {
            msg_type,
            payload,
            checksum,
        }
    }
}

/// IEEE CRC-32 over a payload.
pub fn checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────┬───────────┬────────────────┬────────────┐
/// │ Magic (4B)   │ Type     │ Length    │ Payload        │ CRC-32     │
/// │ 55 AA 05 0A  │ (2B LE)  │ (4B LE)   │ (Length bytes) │ (4B LE)    │
/// └──────────────┴──────────┴───────────┴────────────────┴────────────┘
/// ```
pub fn encode_frame(msg_type: u16, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len() + TRAILER_SIZE);
    dst.put_slice(&MAGIC);
    dst.put_u16_le(msg_type);
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    dst.put_u32_le(checksum(payload));
    Ok(())
}

/// Why a header match was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The length field exceeds the configured maximum payload.
    Oversize { len: usize, max: usize },
    /// The trailer does not match the payload.
    Checksum { expected: u32, actual: u32 },
}

/// What the front of a byte slice holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A checksum-valid frame occupies `start..start + len`.
    Frame { start: usize, len: usize },
    /// More bytes are needed. The first `skip` bytes precede any marker and
    /// can be discarded; when no marker is present `skip` is zero.
    Incomplete { skip: usize },
    /// The marker at `start` is spurious. Discard `start + 1` bytes and look
    /// again.
    Reject { start: usize, reason: Rejection },
}

/// Classify the front of `data`.
///
/// Pure function: callers decide how to consume. Work is linear in
/// `data.len()`.
pub fn next_step(data: &[u8], max_payload: usize) -> Step {
    let Some(start) = find_magic(data) else {
        return Step::Incomplete { skip: 0 };
    };

    let rest = &data[start..];
    if rest.len() < HEADER_SIZE {
        return Step::Incomplete { skip: start };
    }

    let payload_len = u32::from_le_bytes([rest[6], rest[7], rest[8], rest[9]]) as usize;
    if payload_len > max_payload {
        return Step::Reject {
            start,
            reason: Rejection::Oversize {
                len: payload_len,
                max: max_payload,
            },
        };
    }

    let total = HEADER_SIZE + payload_len + TRAILER_SIZE;
    if rest.len() < total {
        return Step::Incomplete { skip: start };
    }

    let payload_end = HEADER_SIZE + payload_len;
    let expected = u32::from_le_bytes([
        rest[payload_end],
        rest[payload_end + 1],
        rest[payload_end + 2],
        rest[payload_end + 3],
    ]);
    let actual = checksum(&rest[HEADER_SIZE..payload_end]);
    if expected != actual {
        return Step::Reject {
            start,
            reason: Rejection::Checksum { expected, actual },
        };
    }

    Step::Frame { start, len: total }
}

fn find_magic(data: &[u8]) -> Option<usize> {
    data.windows(MAGIC.len()).position(|window| window == MAGIC)
}

/// Decode the first valid frame from a buffer.
///
/// Returns `None` if the buffer doesn't contain a complete frame yet.
/// Garbage ahead of a marker and spurious markers are consumed; bytes that
/// may still become a frame are left in place.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Option<Frame> {
    loop {
        match next_step(src, max_payload) {
            Step::Frame { start, len } => {
                src.advance(start);
                let raw = src.split_to(len).freeze();
                return Some(Frame::from_wire(raw));
            }
            Step::Incomplete { skip } => {
                src.advance(skip);
                return None;
            }
            Step::Reject { start, .. } => src.advance(start + 1),
        }
    }
}

/// Configuration for frame reassembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 64 KiB.
    pub max_payload_size: usize,
    /// Unconsumed bytes kept before the oldest are dropped. Default: 256 KiB.
    pub buffer_ceiling: usize,
    /// Bytes requested from the channel per read. Default: 4 KiB.
    pub read_chunk_size: usize,
}

impl FrameConfig {
    /// Largest frame this configuration accepts, on the wire.
    pub fn max_frame_size(&self) -> usize {
        HEADER_SIZE + self.max_payload_size + TRAILER_SIZE
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            buffer_ceiling: DEFAULT_BUFFER_CEILING,
            read_chunk_size: DEFAULT_READ_CHUNK,
        }
    }
}
