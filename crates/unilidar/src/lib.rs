//! Serial LiDAR protocol decoder and device command interface.
//!
//! unilidar turns the raw byte stream of a serial LiDAR into typed IMU,
//! point cloud, version and auxiliary messages, and encodes the working-mode
//! and LED commands the device accepts.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte channels (serial port, `Read + Write` streams, in-memory)
//! - [`frame`]: checksummed framing and stream resynchronization
//! - [`reader`]: typed messages, device state, commands and the polling reader
//!
//! ```no_run
//! use unilidar::reader::{LidarReader, Message, WorkingMode};
//! use unilidar::transport::SerialChannel;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let port = SerialChannel::open("/dev/ttyUSB0")?;
//! let mut reader = LidarReader::new(port);
//! reader.set_working_mode(WorkingMode::Normal)?;
//! loop {
//!     if let Message::Imu(imu) = reader.poll()? {
//!         println!("imu {} at {}", imu.id, imu.stamp);
//!     }
//! }
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use unilidar_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use unilidar_frame::*;
}

/// Re-export reader types.
pub mod reader {
    pub use unilidar_reader::*;
}
