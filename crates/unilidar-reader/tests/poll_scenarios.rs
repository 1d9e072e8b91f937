//! End-to-end scenarios: device bytes in, typed messages out.

use std::io::Cursor;

use bytes::BytesMut;
use unilidar_frame::{decode_frame, Frame, DEFAULT_MAX_PAYLOAD, MAGIC};
use unilidar_reader::{
    Auxiliary, Command, Imu, LedDisplayMode, LedPattern, LidarReader, Message, MessageKind, Point,
    PointCloud, ReaderConfig, Version, WorkingMode,
};
use unilidar_transport::{ByteChannel, IoChannel, MemoryChannel};

fn wire(frame: &Frame) -> Vec<u8> {
    let mut buf = BytesMut::new();
    frame.encode(&mut buf).unwrap();
    buf.to_vec()
}

fn sample_imu(id: u32) -> Imu {
    Imu {
        stamp: 1_700_000_000.0 + f64::from(id) * 0.004,
        id,
        quaternion: [0.0, 0.0, 0.0, 1.0],
        angular_velocity: [0.01, -0.02, 0.03],
        linear_acceleration: [0.1, 0.2, 9.81],
    }
}

fn sample_cloud(id: u32, n: usize) -> PointCloud {
    PointCloud {
        stamp: 1_700_000_000.5,
        id,
        ring_num: 18,
        points: (0..n)
            .map(|i| Point {
                x: i as f32 * 0.1,
                y: -(i as f32) * 0.1,
                z: 0.5,
                intensity: 40.0,
                time: i as f32 * 1e-5,
                ring: (i % 18) as u16,
            })
            .collect(),
    }
}

fn session_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend(wire(&Version::new("2.4.1").to_frame()));
    bytes.extend(wire(&sample_imu(1).to_frame()));
    bytes.extend(wire(&sample_cloud(7, 120).to_frame()));
    bytes.extend(wire(
        &Auxiliary {
            stamp: 1_700_000_001.0,
            dirty_percentage: 12,
        }
        .to_frame(),
    ));
    bytes.extend(wire(&sample_imu(2).to_frame()));
    bytes
}

fn drain(reader: &mut LidarReader<MemoryChannel, impl unilidar_reader::HostClock>) -> Vec<Message> {
    let mut out = Vec::new();
    for _ in 0..64 {
        let msg = reader.poll().unwrap();
        if !msg.is_none() {
            out.push(msg);
        }
    }
    out
}

#[test]
fn byte_at_a_time_matches_single_delivery() {
    let bytes = session_bytes();

    let mut whole = LidarReader::with_clock(MemoryChannel::new(), ReaderConfig::default(), || 0.0);
    whole.get_mut().inject(&bytes);
    let expected = drain(&mut whole);
    assert_eq!(expected.len(), 5);

    let mut trickle =
        LidarReader::with_clock(MemoryChannel::new(), ReaderConfig::default(), || 0.0);
    let mut got = Vec::new();
    for byte in &bytes {
        trickle.get_mut().inject(std::slice::from_ref(byte));
        let msg = trickle.poll().unwrap();
        if !msg.is_none() {
            got.push(msg);
        }
    }
    got.extend(drain(&mut trickle));

    assert_eq!(got, expected);
    assert_eq!(trickle.state(), whole.state());
}

#[test]
fn bit_flip_costs_one_message() {
    let imu_a = wire(&sample_imu(1).to_frame());
    let imu_b = wire(&sample_imu(2).to_frame());
    let mut bytes = imu_a.clone();
    bytes[20] ^= 0x01;
    bytes.extend(&imu_b);

    let mut reader = LidarReader::new(MemoryChannel::new());
    reader.get_mut().inject(&bytes);
    let got = drain(&mut reader);

    assert_eq!(got, vec![Message::Imu(sample_imu(2))]);
    let diag = reader.diagnostics();
    assert_eq!(diag.checksum_failures, 1);
    assert_eq!(diag.frames, 1);
}

#[test]
fn cloud_point_count_survives() {
    let mut reader = LidarReader::new(MemoryChannel::new());
    reader.get_mut().inject(&wire(&sample_cloud(3, 300).to_frame()));

    let Message::PointCloud(cloud) = reader.poll().unwrap() else {
        panic!("expected a point cloud");
    };
    assert_eq!(cloud.points.len(), 300);
    assert_eq!(cloud, sample_cloud(3, 300));
}

#[test]
fn garbage_then_auxiliary() {
    let mut bytes = vec![0x00, 0x55, 0xAA, 0x13, 0x37, 0x55, 0xFF, 0x05];
    bytes.extend(wire(
        &Auxiliary {
            stamp: 3.0,
            dirty_percentage: 7,
        }
        .to_frame(),
    ));

    let mut reader = LidarReader::new(MemoryChannel::new());
    reader.get_mut().inject(&bytes);
    let got = drain(&mut reader);

    assert_eq!(got.len(), 1);
    assert_eq!(got[0].kind(), MessageKind::Auxiliary);
    assert_eq!(reader.dirty_percentage(), Some(7));
}

#[test]
fn spurious_marker_with_huge_length_is_skipped() {
    let mut bytes = MAGIC.to_vec();
    bytes.extend([0x01, 0x01]);
    bytes.extend(u32::MAX.to_le_bytes());
    bytes.extend(wire(&Version::new("1.0.0").to_frame()));

    let mut reader = LidarReader::new(MemoryChannel::new());
    reader.get_mut().inject(&bytes);
    let got = drain(&mut reader);

    assert_eq!(got, vec![Message::Version(Version::new("1.0.0"))]);
    assert_eq!(reader.diagnostics().oversize_lengths, 1);
}

#[test]
fn sustained_noise_stays_bounded() {
    let config = ReaderConfig {
        buffer_ceiling: 4096,
        max_payload_size: 1024,
        ..ReaderConfig::default()
    };
    let mut reader = LidarReader::with_config(MemoryChannel::new(), config);
    let noise: Vec<u8> = (0..64 * 1024).map(|i| (i * 7 % 251) as u8).collect();

    for chunk in noise.chunks(1000) {
        reader.get_mut().inject(chunk);
        assert!(reader.poll().unwrap().is_none());
        assert!(reader.buffered_len() <= 4096);
    }

    reader
        .get_mut()
        .inject(&wire(&Version::new("after-noise").to_frame()));
    let got = drain(&mut reader);
    assert_eq!(got, vec![Message::Version(Version::new("after-noise"))]);
    assert!(reader.diagnostics().overflow_dropped > 0);
}

#[test]
fn commands_round_trip_through_the_codec() {
    let mut reader = LidarReader::new(MemoryChannel::new());
    reader.set_working_mode(WorkingMode::Standby).unwrap();
    reader.set_led_display_mode(LedPattern::SixStageBreathing).unwrap();
    reader
        .set_led_display_mode(LedDisplayMode::all_off())
        .unwrap();

    let mut written = BytesMut::from(reader.get_ref().written());
    let mut commands = Vec::new();
    while let Some(frame) = decode_frame(&mut written, DEFAULT_MAX_PAYLOAD) {
        commands.push(Command::decode(&frame).unwrap());
    }

    assert_eq!(
        commands,
        vec![
            Command::SetWorkingMode(WorkingMode::Standby),
            Command::SetLedDisplayMode(LedDisplayMode::Pattern(LedPattern::SixStageBreathing)),
            Command::SetLedDisplayMode(LedDisplayMode::all_off()),
        ]
    );
    assert_eq!(reader.working_mode(), Some(WorkingMode::Standby));
}

#[test]
fn commands_interleave_with_polling() {
    let mut reader = LidarReader::new(MemoryChannel::new());
    reader.get_mut().inject(&wire(&sample_imu(1).to_frame()));

    reader.set_working_mode(WorkingMode::Normal).unwrap();
    assert_eq!(reader.poll().unwrap(), Message::Imu(sample_imu(1)));
    reader.set_working_mode(WorkingMode::Standby).unwrap();

    assert_eq!(reader.working_mode(), Some(WorkingMode::Standby));
    assert_eq!(reader.last_imu(), Some(&sample_imu(1)));
}

#[test]
fn delay_tracks_latest_stamped_message() {
    let mut reader = LidarReader::with_clock(
        MemoryChannel::new(),
        ReaderConfig::default(),
        || 1_700_000_000.010,
    );
    reader.get_mut().inject(&wire(&sample_imu(0).to_frame()));
    reader.poll().unwrap();
    let delay = reader.time_delay_us().unwrap();
    assert!((delay - 10_000.0).abs() < 5.0, "delay was {delay}");

    // Version carries no stamp and leaves the delay alone.
    reader.get_mut().inject(&wire(&Version::new("x").to_frame()));
    reader.poll().unwrap();
    assert_eq!(reader.time_delay_us(), Some(delay));
}

fn imu_burst(n: u32) -> Vec<u8> {
    (0..n).flat_map(|id| wire(&sample_imu(id).to_frame())).collect()
}

/// Poll until a call neither yields a message nor changes the buffer.
fn replay<C: ByteChannel>(reader: &mut LidarReader<C>) -> Vec<u32> {
    let mut ids = Vec::new();
    loop {
        let before = (reader.buffered_len(), reader.diagnostics());
        match reader.poll().unwrap() {
            Message::Imu(imu) => ids.push(imu.id),
            Message::None if before == (reader.buffered_len(), reader.diagnostics()) => {
                return ids
            }
            _ => {}
        }
    }
}

#[test]
fn capture_larger_than_buffer_replays_completely() {
    let bytes = imu_burst(5000);
    assert!(bytes.len() > 300_000);

    let mut reader = LidarReader::new(IoChannel::new(Cursor::new(bytes)));
    let ids = replay(&mut reader);

    assert_eq!(ids, (0..5000).collect::<Vec<u32>>());
    let diag = reader.diagnostics();
    assert_eq!(diag.overflow_dropped, 0);
    assert_eq!(diag.resync_events, 0);
}

#[test]
fn burst_larger_than_buffer_survives_tiny_reads() {
    let mut channel = MemoryChannel::new();
    channel.inject(&imu_burst(5000));
    channel.set_read_limit(Some(1));

    let mut reader = LidarReader::new(channel);
    let ids = replay(&mut reader);

    assert_eq!(ids.len(), 5000);
    assert_eq!(reader.diagnostics().overflow_dropped, 0);
    assert!(reader.get_ref().is_drained());
}
