//! Byte channel abstraction for LiDAR links.
//!
//! Provides one non-blocking interface over the ways a host can talk to the
//! device:
//! - Serial ports (behind the `serial` feature)
//! - Any `Read + Write` stream (capture files, sockets, pipes)
//! - An in-memory channel for tests and offline tooling
//!
//! This is the lowest layer of unilidar. Everything else builds on top of
//! the [`ByteChannel`] trait provided here.

pub mod error;
pub mod io;
pub mod memory;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{ChannelError, Result};
pub use io::IoChannel;
pub use memory::MemoryChannel;
pub use traits::ByteChannel;

#[cfg(feature = "serial")]
pub use serial::SerialChannel;
