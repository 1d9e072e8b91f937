use tracing::{debug, trace, warn};

use crate::buffer::FrameBuffer;
use crate::codec::{next_step, Frame, FrameConfig, Rejection, Step};
use crate::message_type::type_name;

/// Counters describing what the scanner had to discard.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Checksum-valid frames handed out.
    pub frames: u64,
    /// Header matches rejected by the CRC check.
    pub checksum_failures: u64,
    /// Header matches rejected for an implausible length field.
    pub oversize_lengths: u64,
    /// Bytes skipped while hunting for a marker.
    pub skipped_bytes: u64,
    /// Bytes dropped by the buffer ceiling.
    pub overflow_dropped: u64,
    /// Times the stream lost sync (rejected marker or overflow).
    pub resync_events: u64,
}

/// Reassembles frames from a byte stream delivered in arbitrary pieces.
///
/// Feed bytes with [`FrameScanner::push`] and pull frames with
/// [`FrameScanner::next_frame`]. A marker whose length or checksum does not
/// hold up costs exactly one byte, so a valid frame that follows noise is
/// always found on the next scan.
#[derive(Debug)]
pub struct FrameScanner {
    buffer: FrameBuffer,
    config: FrameConfig,
    stats: ScanStats,
}

impl FrameScanner {
    /// Create a scanner with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a scanner with explicit configuration.
    ///
    /// A ceiling smaller than the largest acceptable frame could never hold
    /// that frame, so it is raised to fit.
    pub fn with_config(mut config: FrameConfig) -> Self {
        let min_ceiling = config.max_frame_size();
        if config.buffer_ceiling < min_ceiling {
            warn!(
                configured = config.buffer_ceiling,
                raised_to = min_ceiling,
                "buffer ceiling below max frame size"
            );
            config.buffer_ceiling = min_ceiling;
        }
        Self {
            buffer: FrameBuffer::new(config.buffer_ceiling),
            config,
            stats: ScanStats::default(),
        }
    }

    /// Append bytes received from the channel.
    pub fn push(&mut self, bytes: &[u8]) {
        let dropped = self.buffer.append(bytes);
        if self.buffer.take_resync() {
            self.stats.overflow_dropped = self.stats.overflow_dropped.saturating_add(dropped as u64);
            self.stats.resync_events = self.stats.resync_events.saturating_add(1);
        }
    }

    /// Extract the next valid frame, if one is fully buffered.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            match next_step(self.buffer.peek(), self.config.max_payload_size) {
                Step::Frame { start, len } => {
                    self.skip(start);
                    let frame = Frame::from_wire(self.buffer.take(len));
                    self.stats.frames = self.stats.frames.saturating_add(1);
                    trace!(
                        msg_type = type_name(frame.msg_type),
                        len = frame.payload.len(),
                        "frame"
                    );
                    return Some(frame);
                }
                Step::Incomplete { skip } => {
                    self.skip(skip);
                    return None;
                }
                Step::Reject { start, reason } => {
                    match reason {
                        Rejection::Oversize { len, max } => {
                            self.stats.oversize_lengths =
                                self.stats.oversize_lengths.saturating_add(1);
                            debug!(len, max, "spurious header, length out of range");
                        }
                        Rejection::Checksum { expected, actual } => {
                            self.stats.checksum_failures =
                                self.stats.checksum_failures.saturating_add(1);
                            debug!(expected, actual, "checksum mismatch, resyncing");
                        }
                    }
                    self.stats.resync_events = self.stats.resync_events.saturating_add(1);
                    self.skip(start + 1);
                }
            }
        }
    }

    fn skip(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.buffer.consume(n);
        self.stats.skipped_bytes = self.stats.skipped_bytes.saturating_add(n as u64);
    }

    /// Number of buffered, not yet framed bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Discard all buffered bytes.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Diagnostic counters.
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Current scanner configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, HEADER_SIZE, MAGIC, TRAILER_SIZE};
    use crate::message_type::{AUXILIARY, IMU, VERSION};

    fn wire(msg_type: u16, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(msg_type, payload, &mut buf).unwrap();
        buf.to_vec()
    }

    fn collect(scanner: &mut FrameScanner) -> Vec<Frame> {
        std::iter::from_fn(|| scanner.next_frame()).collect()
    }

    #[test]
    fn read_single_frame() {
        let mut scanner = FrameScanner::new();
        scanner.push(&wire(VERSION, b"1.2.3"));

        let frame = scanner.next_frame().unwrap();
        assert_eq!(frame.msg_type, VERSION);
        assert_eq!(frame.payload.as_ref(), b"1.2.3");
        assert!(scanner.next_frame().is_none());
        assert_eq!(scanner.buffered_len(), 0);
        assert_eq!(scanner.stats().frames, 1);
    }

    #[test]
    fn byte_by_byte_matches_one_shot() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&[0x00, 0x55, 0xAA]);
        stream.extend_from_slice(&wire(IMU, &[1; 52]));
        stream.extend_from_slice(&wire(VERSION, b"2.0.1"));
        stream.extend_from_slice(&[0x55, 0xAA, 0x05]);
        stream.extend_from_slice(&wire(AUXILIARY, &[0; 12]));

        let mut one_shot = FrameScanner::new();
        one_shot.push(&stream);
        let expected = collect(&mut one_shot);
        assert_eq!(expected.len(), 3);

        let mut trickle = FrameScanner::new();
        let mut got = Vec::new();
        for byte in &stream {
            trickle.push(std::slice::from_ref(byte));
            got.extend(collect(&mut trickle));
        }
        assert_eq!(got, expected);
    }

    #[test]
    fn header_split_across_pushes_is_kept() {
        let bytes = wire(VERSION, b"split");
        let mut scanner = FrameScanner::new();

        scanner.push(&bytes[..3]);
        assert!(scanner.next_frame().is_none());
        assert_eq!(scanner.buffered_len(), 3);

        scanner.push(&bytes[3..HEADER_SIZE + 1]);
        assert!(scanner.next_frame().is_none());
        assert_eq!(scanner.buffered_len(), HEADER_SIZE + 1);

        scanner.push(&bytes[HEADER_SIZE + 1..]);
        assert_eq!(scanner.next_frame().unwrap().payload.as_ref(), b"split");
    }

    #[test]
    fn checksum_failure_drops_one_byte_and_recovers() {
        let mut bad = wire(VERSION, b"broken");
        bad[HEADER_SIZE] ^= 0x01;
        let good = wire(VERSION, b"fine");

        let mut scanner = FrameScanner::new();
        scanner.push(&bad);
        scanner.push(&good);

        let frame = scanner.next_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"fine");

        let stats = scanner.stats();
        assert_eq!(stats.checksum_failures, 1);
        assert_eq!(stats.skipped_bytes, bad.len() as u64);
        assert_eq!(stats.resync_events, 1);
    }

    #[test]
    fn marker_inside_corrupt_frame_is_not_trusted() {
        // A corrupt frame whose payload embeds a second, valid frame: the
        // one-byte resync must find the inner frame instead of skipping it.
        let inner = wire(AUXILIARY, &[7, 0, 0, 0]);
        let mut outer_payload = b"xx".to_vec();
        outer_payload.extend_from_slice(&inner);
        let mut outer = wire(VERSION, &outer_payload);
        let crc_at = outer.len() - TRAILER_SIZE;
        outer[crc_at] ^= 0xFF;

        let mut scanner = FrameScanner::new();
        scanner.push(&outer);

        let frame = scanner.next_frame().unwrap();
        assert_eq!(frame.msg_type, AUXILIARY);
        assert_eq!(frame.payload.as_ref(), &[7, 0, 0, 0]);
    }

    #[test]
    fn oversize_length_costs_one_byte() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&IMU.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&wire(VERSION, b"ok"));

        let mut scanner = FrameScanner::new();
        scanner.push(&bytes);

        assert_eq!(scanner.next_frame().unwrap().payload.as_ref(), b"ok");
        assert_eq!(scanner.stats().oversize_lengths, 1);
    }

    #[test]
    fn noise_without_marker_is_bounded_by_ceiling() {
        let config = FrameConfig {
            max_payload_size: 16,
            buffer_ceiling: 64,
            ..FrameConfig::default()
        };
        let mut scanner = FrameScanner::with_config(config);

        scanner.push(&[0x11; 50]);
        assert!(scanner.next_frame().is_none());
        assert_eq!(scanner.buffered_len(), 50);

        scanner.push(&[0x22; 50]);
        assert!(scanner.next_frame().is_none());
        assert_eq!(scanner.buffered_len(), 64);
        assert_eq!(scanner.stats().overflow_dropped, 36);
        assert_eq!(scanner.stats().resync_events, 1);

        scanner.push(&wire(VERSION, b"back"));
        assert_eq!(scanner.next_frame().unwrap().payload.as_ref(), b"back");
    }

    #[test]
    fn small_ceiling_is_raised_to_fit_a_frame() {
        let config = FrameConfig {
            max_payload_size: 100,
            buffer_ceiling: 10,
            ..FrameConfig::default()
        };
        let scanner = FrameScanner::with_config(config);
        assert_eq!(
            scanner.config().buffer_ceiling,
            HEADER_SIZE + 100 + TRAILER_SIZE
        );
    }

    #[test]
    fn reset_discards_partial_frame() {
        let bytes = wire(VERSION, b"partial");
        let mut scanner = FrameScanner::new();
        scanner.push(&bytes[..bytes.len() - 1]);
        scanner.reset();
        scanner.push(&bytes[bytes.len() - 1..]);
        assert!(scanner.next_frame().is_none());
    }
}
