use bytes::Buf;
use unilidar_frame::{Frame, AUXILIARY, IMU, POINT_CLOUD, VERSION};

use crate::error::DecodeError;
use crate::message::{
    Auxiliary, Imu, Message, Point, PointCloud, Version, AUXILIARY_PAYLOAD_LEN, CLOUD_HEADER_LEN,
    IMU_PAYLOAD_LEN, POINT_RECORD_LEN,
};

/// Turn a checksum-valid frame into a typed message.
///
/// Frames with a type tag this crate does not know decode to
/// [`Message::None`], so newer firmware can add messages without breaking
/// older hosts. A known tag with a payload that does not match its layout is
/// a [`DecodeError`].
pub fn decode_message(frame: &Frame) -> Result<Message, DecodeError> {
    let payload = frame.payload.as_ref();
    match frame.msg_type {
        IMU => decode_imu(payload).map(Message::Imu),
        POINT_CLOUD => decode_point_cloud(payload).map(Message::PointCloud),
        VERSION => decode_version(payload).map(Message::Version),
        AUXILIARY => decode_auxiliary(payload).map(Message::Auxiliary),
        _ => Ok(Message::None),
    }
}

fn expect_len(kind: &'static str, payload: &[u8], expected: usize) -> Result<(), DecodeError> {
    if payload.len() != expected {
        return Err(DecodeError::Length {
            kind,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

fn get_f32s<const N: usize>(buf: &mut &[u8]) -> [f32; N] {
    let mut out = [0f32; N];
    for v in &mut out {
        *v = buf.get_f32_le();
    }
    out
}

fn decode_imu(mut payload: &[u8]) -> Result<Imu, DecodeError> {
    expect_len("imu", payload, IMU_PAYLOAD_LEN)?;
    Ok(Imu {
        stamp: payload.get_f64_le(),
        id: payload.get_u32_le(),
        quaternion: get_f32s(&mut payload),
        angular_velocity: get_f32s(&mut payload),
        linear_acceleration: get_f32s(&mut payload),
    })
}

fn decode_point_cloud(mut payload: &[u8]) -> Result<PointCloud, DecodeError> {
    if payload.len() < CLOUD_HEADER_LEN {
        return Err(DecodeError::Length {
            kind: "point_cloud",
            expected: CLOUD_HEADER_LEN,
            actual: payload.len(),
        });
    }

    let stamp = payload.get_f64_le();
    let id = payload.get_u32_le();
    let ring_num = payload.get_u32_le();
    let declared = payload.get_u32_le() as usize;

    let record_bytes = payload.len();
    if record_bytes % POINT_RECORD_LEN != 0 || record_bytes / POINT_RECORD_LEN != declared {
        return Err(DecodeError::PointCount {
            declared,
            record_bytes,
        });
    }

    let mut points = Vec::with_capacity(declared);
    for _ in 0..declared {
        points.push(Point {
            x: payload.get_f32_le(),
            y: payload.get_f32_le(),
            z: payload.get_f32_le(),
            intensity: payload.get_f32_le(),
            time: payload.get_f32_le(),
            ring: payload.get_u16_le(),
        });
    }

    Ok(PointCloud {
        stamp,
        id,
        ring_num,
        points,
    })
}

fn decode_version(payload: &[u8]) -> Result<Version, DecodeError> {
    let end = payload
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    let text = std::str::from_utf8(&payload[..end]).map_err(|_| DecodeError::VersionEncoding)?;
    if text.is_empty() {
        return Err(DecodeError::EmptyVersion);
    }
    Ok(Version::new(text))
}

fn decode_auxiliary(mut payload: &[u8]) -> Result<Auxiliary, DecodeError> {
    expect_len("auxiliary", payload, AUXILIARY_PAYLOAD_LEN)?;
    let stamp = payload.get_f64_le();
    let dirty_percentage = payload.get_u8();
    if dirty_percentage > 100 {
        return Err(DecodeError::DirtyPercentage(dirty_percentage));
    }
    Ok(Auxiliary {
        stamp,
        dirty_percentage,
    })
}
