//! Typed telemetry messages.
//!
//! Payload layouts (all little-endian):
//!
//! ```text
//! IMU (52 B)          stamp f64 | id u32 | quaternion 4×f32 (x,y,z,w)
//!                     | angular velocity 3×f32 | linear acceleration 3×f32
//! POINT_CLOUD         stamp f64 | id u32 | ring_num u32 | count u32
//!                     | count × point (22 B: x,y,z,intensity,time f32 | ring u16)
//! VERSION             firmware version, UTF-8, NUL padding allowed
//! AUXILIARY (12 B)    stamp f64 | dirty_percentage u8 | reserved 3 B
//! ```

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use unilidar_frame::{Frame, AUXILIARY, IMU, POINT_CLOUD, VERSION};

/// IMU payload size.
pub const IMU_PAYLOAD_LEN: usize = 52;

/// Fixed part of a point cloud payload, ahead of the point records.
pub const CLOUD_HEADER_LEN: usize = 20;

/// Size of one point record.
pub const POINT_RECORD_LEN: usize = 22;

/// Auxiliary payload size.
pub const AUXILIARY_PAYLOAD_LEN: usize = 12;

/// Result of one poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// No complete message this call.
    None,
    Imu(Imu),
    PointCloud(PointCloud),
    Version(Version),
    Auxiliary(Auxiliary),
}

impl Message {
    /// Payload-free classification.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::None => MessageKind::None,
            Message::Imu(_) => MessageKind::Imu,
            Message::PointCloud(_) => MessageKind::PointCloud,
            Message::Version(_) => MessageKind::Version,
            Message::Auxiliary(_) => MessageKind::Auxiliary,
        }
    }

    /// True for [`Message::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Message::None)
    }

    /// Device timestamp in seconds, for messages that carry one.
    pub fn stamp(&self) -> Option<f64> {
        match self {
            Message::Imu(imu) => Some(imu.stamp),
            Message::PointCloud(cloud) => Some(cloud.stamp),
            Message::Auxiliary(aux) => Some(aux.stamp),
            Message::Version(_) | Message::None => None,
        }
    }
}

/// Message classification without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    None,
    Imu,
    PointCloud,
    Version,
    Auxiliary,
}

impl MessageKind {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::None => "none",
            MessageKind::Imu => "imu",
            MessageKind::PointCloud => "point_cloud",
            MessageKind::Version => "version",
            MessageKind::Auxiliary => "auxiliary",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IMU attitude sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Imu {
    /// Device time in seconds.
    pub stamp: f64,
    /// Sequence id.
    pub id: u32,
    /// Orientation as (x, y, z, w).
    pub quaternion: [f32; 4],
    /// rad/s.
    pub angular_velocity: [f32; 3],
    /// m/s².
    pub linear_acceleration: [f32; 3],
}

impl Imu {
    /// Append the wire payload to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(IMU_PAYLOAD_LEN);
        dst.put_f64_le(self.stamp);
        dst.put_u32_le(self.id);
        for v in self
            .quaternion
            .iter()
            .chain(&self.angular_velocity)
            .chain(&self.linear_acceleration)
        {
            dst.put_f32_le(*v);
        }
    }

    /// Build the telemetry frame the device would send.
    pub fn to_frame(&self) -> Frame {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        Frame::new(IMU, buf.freeze())
    }
}

/// One LiDAR return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
    /// Offset from the cloud stamp, seconds.
    pub time: f32,
    /// Laser ring index.
    pub ring: u16,
}

impl Point {
    fn encode(&self, dst: &mut BytesMut) {
        dst.put_f32_le(self.x);
        dst.put_f32_le(self.y);
        dst.put_f32_le(self.z);
        dst.put_f32_le(self.intensity);
        dst.put_f32_le(self.time);
        dst.put_u16_le(self.ring);
    }
}

/// A scan of points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointCloud {
    /// Device time of the first point, seconds.
    pub stamp: f64,
    /// Sequence id.
    pub id: u32,
    /// Number of laser rings.
    pub ring_num: u32,
    pub points: Vec<Point>,
}

impl PointCloud {
    /// Append the wire payload to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(CLOUD_HEADER_LEN + self.points.len() * POINT_RECORD_LEN);
        dst.put_f64_le(self.stamp);
        dst.put_u32_le(self.id);
        dst.put_u32_le(self.ring_num);
        dst.put_u32_le(self.points.len() as u32);
        for point in &self.points {
            point.encode(dst);
        }
    }

    /// Build the telemetry frame the device would send.
    pub fn to_frame(&self) -> Frame {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        Frame::new(POINT_CLOUD, buf.freeze())
    }
}

/// Firmware version report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
    pub firmware: String,
}

impl Version {
    pub fn new(firmware: impl Into<String>) -> Self {
        Self {
            firmware: firmware.into(),
        }
    }

    /// Build the telemetry frame the device would send.
    pub fn to_frame(&self) -> Frame {
        Frame::new(VERSION, self.firmware.clone().into_bytes())
    }
}

/// Auxiliary status report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Auxiliary {
    /// Device time in seconds.
    pub stamp: f64,
    /// How dirty the protection cover is, 0..=100.
    pub dirty_percentage: u8,
}

impl Auxiliary {
    /// Append the wire payload to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(AUXILIARY_PAYLOAD_LEN);
        dst.put_f64_le(self.stamp);
        dst.put_u8(self.dirty_percentage);
        dst.put_bytes(0, 3);
    }

    /// Build the telemetry frame the device would send.
    pub fn to_frame(&self) -> Frame {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        Frame::new(AUXILIARY, buf.freeze())
    }
}
