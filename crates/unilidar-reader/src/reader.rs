use serde::Serialize;
use tracing::{debug, info, trace};
use unilidar_frame::message_type::{is_command, type_name};
use unilidar_frame::{FrameScanner, FrameWriter};
use unilidar_transport::ByteChannel;

use crate::command::{Command, LedDisplayMode, WorkingMode};
use crate::config::ReaderConfig;
use crate::decode::decode_message;
use crate::error::Result;
use crate::message::{Auxiliary, Imu, Message, PointCloud, Version};
use crate::state::{DeviceState, HostClock, SystemClock};

/// Version of this library, reported next to the firmware version.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Counters for everything the reader skipped instead of failing on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Checksum-valid frames extracted.
    pub frames: u64,
    /// Header matches rejected by the CRC check.
    pub checksum_failures: u64,
    /// Header matches rejected for an implausible length.
    pub oversize_lengths: u64,
    /// Bytes discarded while resynchronizing.
    pub skipped_bytes: u64,
    /// Bytes dropped because the buffer hit its ceiling.
    pub overflow_dropped: u64,
    /// Times the stream lost sync.
    pub resync_events: u64,
    /// Valid frames whose payload did not match the message layout.
    pub decode_errors: u64,
    /// Valid frames with a type tag that is not telemetry.
    pub skipped_frames: u64,
    /// Skipped frames that carried a command tag (the device echoing).
    pub command_echoes: u64,
}

struct PendingCloud {
    cloud: PointCloud,
    scans: u32,
}

/// Polling decoder and command interface for one device.
///
/// The reader owns its reassembly buffer and device state; the channel can
/// be owned or borrowed (`LidarReader<&mut C>`). Nothing here blocks or
/// spawns threads: call [`poll`](Self::poll) often enough to keep up with
/// the device. Bytes the buffer has no room for are left in the channel.
pub struct LidarReader<C, K = SystemClock> {
    channel: C,
    clock: K,
    config: ReaderConfig,
    scanner: FrameScanner,
    writer: FrameWriter,
    read_buf: Vec<u8>,
    state: DeviceState,
    last_imu: Option<Imu>,
    last_point_cloud: Option<PointCloud>,
    last_version: Option<Version>,
    last_auxiliary: Option<Auxiliary>,
    pending_cloud: Option<PendingCloud>,
    decode_errors: u64,
    skipped_frames: u64,
    command_echoes: u64,
}

impl<C: ByteChannel> LidarReader<C> {
    /// Create a reader with default configuration and the system clock.
    pub fn new(channel: C) -> Self {
        Self::with_config(channel, ReaderConfig::default())
    }

    /// Create a reader with explicit configuration and the system clock.
    pub fn with_config(channel: C, config: ReaderConfig) -> Self {
        Self::with_clock(channel, config, SystemClock)
    }
}

impl<C: ByteChannel, K: HostClock> LidarReader<C, K> {
    /// Create a reader with an explicit host clock.
    pub fn with_clock(channel: C, mut config: ReaderConfig, clock: K) -> Self {
        config.max_read_per_poll = config.max_read_per_poll.max(1);
        config.cloud_scan_num = config.cloud_scan_num.max(1);
        let frame_config = config.frame_config();
        Self {
            channel,
            clock,
            read_buf: vec![0u8; frame_config.read_chunk_size],
            writer: FrameWriter::with_max_payload(frame_config.max_payload_size),
            scanner: FrameScanner::with_config(frame_config),
            config,
            state: DeviceState::default(),
            last_imu: None,
            last_point_cloud: None,
            last_version: None,
            last_auxiliary: None,
            pending_cloud: None,
            decode_errors: 0,
            skipped_frames: 0,
            command_echoes: 0,
        }
    }

    /// Try to produce one message, reading from the channel only when no
    /// complete frame is already buffered.
    ///
    /// Returns [`Message::None`] when no complete, well-formed telemetry
    /// frame is available; that is the common case, not an error. Only a
    /// channel read failure returns `Err`.
    pub fn poll(&mut self) -> Result<Message> {
        let frame = match self.scanner.next_frame() {
            Some(frame) => frame,
            None => {
                self.drain_channel()?;
                match self.scanner.next_frame() {
                    Some(frame) => frame,
                    None => return Ok(Message::None),
                }
            }
        };

        let message = match decode_message(&frame) {
            Ok(Message::None) => {
                self.skipped_frames = self.skipped_frames.saturating_add(1);
                if is_command(frame.msg_type) {
                    self.command_echoes = self.command_echoes.saturating_add(1);
                    trace!(
                        msg_type = type_name(frame.msg_type),
                        "ignoring inbound command frame"
                    );
                } else {
                    debug!(tag = frame.msg_type, "skipping unknown frame type");
                }
                return Ok(Message::None);
            }
            Ok(message) => message,
            Err(err) => {
                self.decode_errors = self.decode_errors.saturating_add(1);
                debug!(
                    msg_type = type_name(frame.msg_type),
                    error = %err,
                    "dropping malformed frame"
                );
                return Ok(Message::None);
            }
        };

        let message = match message {
            Message::PointCloud(cloud) => match self.accumulate(cloud) {
                Some(cloud) => Message::PointCloud(cloud),
                None => return Ok(Message::None),
            },
            other => other,
        };

        let now = self.clock.now();
        self.state.record(&message, now);
        self.remember(&message);
        Ok(message)
    }

    // Reads stop at the buffer's free space so bytes still waiting to be
    // framed are never evicted. A full buffer that yields no frame holds no
    // marker, so one chunk is read and the overflow policy evicts noise.
    fn drain_channel(&mut self) -> Result<usize> {
        let ceiling = self.scanner.config().buffer_ceiling;
        let free = ceiling.saturating_sub(self.scanner.buffered_len());
        let budget = if free == 0 {
            self.read_buf.len().min(ceiling)
        } else {
            free
        }
        .min(self.config.max_read_per_poll);

        let mut total = 0usize;
        while total < budget {
            let want = (budget - total).min(self.read_buf.len());
            let n = self.channel.read_available(&mut self.read_buf[..want])?;
            if n == 0 {
                break;
            }
            self.scanner.push(&self.read_buf[..n]);
            total += n;
        }
        Ok(total)
    }

    // Scans after the first are rebased onto the first scan's stamp.
    fn accumulate(&mut self, cloud: PointCloud) -> Option<PointCloud> {
        if self.config.cloud_scan_num <= 1 {
            return Some(cloud);
        }

        let pending = match self.pending_cloud.take() {
            None => PendingCloud { cloud, scans: 1 },
            Some(mut pending) => {
                let offset = (cloud.stamp - pending.cloud.stamp) as f32;
                pending.cloud.ring_num = cloud.ring_num;
                pending
                    .cloud
                    .points
                    .extend(cloud.points.into_iter().map(|mut point| {
                        point.time += offset;
                        point
                    }));
                pending.scans += 1;
                pending
            }
        };

        if pending.scans >= self.config.cloud_scan_num {
            Some(pending.cloud)
        } else {
            self.pending_cloud = Some(pending);
            None
        }
    }

    fn remember(&mut self, message: &Message) {
        match message {
            Message::None => {}
            Message::Imu(imu) => self.last_imu = Some(imu.clone()),
            Message::PointCloud(cloud) => self.last_point_cloud = Some(cloud.clone()),
            Message::Version(version) => self.last_version = Some(version.clone()),
            Message::Auxiliary(aux) => self.last_auxiliary = Some(aux.clone()),
        }
    }

    /// Ask the device to switch working mode.
    ///
    /// Fire-and-forget: the effect shows up later in polled telemetry.
    pub fn set_working_mode(&mut self, mode: WorkingMode) -> Result<()> {
        self.send_command(&Command::SetWorkingMode(mode))
    }

    /// Set the LED ring to a brightness table or a built-in pattern.
    pub fn set_led_display_mode(&mut self, mode: impl Into<LedDisplayMode>) -> Result<()> {
        self.send_command(&Command::SetLedDisplayMode(mode.into()))
    }

    /// Encode and write one command frame.
    ///
    /// A write failure is returned to the caller; nothing is retried or
    /// queued.
    pub fn send_command(&mut self, command: &Command) -> Result<()> {
        self.writer
            .send(&mut self.channel, command.msg_type(), &command.payload())?;

        match command {
            Command::SetWorkingMode(mode) => {
                self.state.record_working_mode(*mode);
                info!(mode = ?mode, "working mode requested");
            }
            Command::SetLedDisplayMode(LedDisplayMode::Pattern(pattern)) => {
                info!(pattern = ?pattern, "led pattern requested");
            }
            Command::SetLedDisplayMode(LedDisplayMode::Table(table)) => {
                let lit = table.iter().filter(|&&b| b > 0).count();
                info!(lit, "led table requested");
            }
        }
        Ok(())
    }
}

impl<C, K> LidarReader<C, K> {
    /// Latest IMU sample.
    pub fn last_imu(&self) -> Option<&Imu> {
        self.last_imu.as_ref()
    }

    /// Latest point cloud.
    pub fn last_point_cloud(&self) -> Option<&PointCloud> {
        self.last_point_cloud.as_ref()
    }

    /// Latest version report.
    pub fn last_version(&self) -> Option<&Version> {
        self.last_version.as_ref()
    }

    /// Latest auxiliary report.
    pub fn last_auxiliary(&self) -> Option<&Auxiliary> {
        self.last_auxiliary.as_ref()
    }

    /// Delay of the latest timestamped message, microseconds.
    pub fn time_delay_us(&self) -> Option<f64> {
        self.state.time_delay_us()
    }

    /// Last working mode successfully requested.
    pub fn working_mode(&self) -> Option<WorkingMode> {
        self.state.working_mode()
    }

    /// Last reported cover dirty percentage.
    pub fn dirty_percentage(&self) -> Option<u8> {
        self.state.dirty_percentage()
    }

    /// Last reported firmware version.
    pub fn firmware_version(&self) -> Option<&str> {
        self.state.firmware_version()
    }

    /// Version of this library.
    pub fn sdk_version(&self) -> &'static str {
        SDK_VERSION
    }

    /// Full device state.
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Skip and resync counters.
    pub fn diagnostics(&self) -> Diagnostics {
        let scan = self.scanner.stats();
        Diagnostics {
            frames: scan.frames,
            checksum_failures: scan.checksum_failures,
            oversize_lengths: scan.oversize_lengths,
            skipped_bytes: scan.skipped_bytes,
            overflow_dropped: scan.overflow_dropped,
            resync_events: scan.resync_events,
            decode_errors: self.decode_errors,
            skipped_frames: self.skipped_frames,
            command_echoes: self.command_echoes,
        }
    }

    /// Bytes buffered but not yet framed.
    pub fn buffered_len(&self) -> usize {
        self.scanner.buffered_len()
    }

    /// Effective configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.channel
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Consume the reader and return the channel.
    pub fn into_inner(self) -> C {
        self.channel
    }
}

impl<C, K> std::fmt::Debug for LidarReader<C, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LidarReader")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("buffered", &self.scanner.buffered_len())
            .finish_non_exhaustive()
    }
}
