//! Typed LiDAR telemetry and device control.
//!
//! This is the layer applications use. Wrap a [`ByteChannel`] in a
//! [`LidarReader`], call [`LidarReader::poll`] in a tight loop and dispatch
//! on the returned [`Message`]; send working-mode and LED commands over the
//! same channel in between polls.
//!
//! [`ByteChannel`]: unilidar_transport::ByteChannel

pub mod command;
pub mod config;
pub mod decode;
pub mod error;
pub mod message;
pub mod reader;
pub mod state;

pub use command::{Command, LedDisplayMode, LedPattern, WorkingMode, LED_TABLE_LEN};
pub use config::ReaderConfig;
pub use decode::decode_message;
pub use error::{DecodeError, ReaderError, Result};
pub use message::{
    Auxiliary, Imu, Message, MessageKind, Point, PointCloud, Version, AUXILIARY_PAYLOAD_LEN,
    CLOUD_HEADER_LEN, IMU_PAYLOAD_LEN, POINT_RECORD_LEN,
};
pub use reader::{Diagnostics, LidarReader, SDK_VERSION};
pub use state::{Arrivals, DeviceState, HostClock, SystemClock};
