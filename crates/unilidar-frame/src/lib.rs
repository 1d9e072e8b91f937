//! Checksummed framing for the LiDAR serial protocol.
//!
//! Every message on the wire is framed with:
//! - A 4-byte magic marker (`55 AA 05 0A`) for stream synchronization
//! - A 2-byte little-endian message type tag
//! - A 4-byte little-endian payload length
//! - The payload, followed by a 4-byte little-endian CRC-32 of the payload
//!
//! [`FrameScanner`] reassembles frames across arbitrary read boundaries and
//! recovers from line noise one byte at a time.

pub mod buffer;
pub mod codec;
pub mod error;
pub mod message_type;
pub mod scanner;
pub mod writer;

pub use buffer::FrameBuffer;
pub use codec::{
    checksum, decode_frame, encode_frame, next_step, Frame, FrameConfig, Rejection, Step,
    DEFAULT_BUFFER_CEILING, DEFAULT_MAX_PAYLOAD, DEFAULT_READ_CHUNK, HEADER_SIZE, MAGIC,
    TRAILER_SIZE,
};
pub use error::{FrameError, Result};
pub use message_type::{is_command, AUXILIARY, IMU, LED_DISPLAY, POINT_CLOUD, VERSION, WORK_MODE};
pub use scanner::{FrameScanner, ScanStats};
pub use writer::FrameWriter;
