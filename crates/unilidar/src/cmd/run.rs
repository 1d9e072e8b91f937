use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use unilidar_reader::{
    LedDisplayMode, LedPattern, LidarReader, Message, MessageKind, WorkingMode, SDK_VERSION,
};
use unilidar_transport::ByteChannel;

use crate::cmd::led::describe;
use crate::cmd::listen::install_ctrlc_handler;
use crate::cmd::mode::mode_name;
use crate::cmd::{load_config, RunArgs, IDLE_SLEEP};
use crate::exit::{reader_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT};
use crate::output::{print_message, OutputFormat};

/// Scans per printed cloud when neither the flag nor a config file says otherwise.
const DEFAULT_CLOUD_SCAN_NUM: u32 = 18;
const MODE_SETTLE: Duration = Duration::from_secs(1);
const STEP_PAUSE: Duration = Duration::from_secs(2);
const DIRTY_SAMPLES: usize = 3;
/// Highest cover dirt percentage accepted before streaming.
const DIRTY_LIMIT: u8 = 10;

/// Owns the reader and returns the device to standby on every exit path.
struct StandbyGuard<C: ByteChannel> {
    reader: LidarReader<C>,
}

impl<C: ByteChannel> Drop for StandbyGuard<C> {
    fn drop(&mut self) {
        match self.reader.set_working_mode(WorkingMode::Standby) {
            Ok(()) => info!("device returned to standby"),
            Err(err) => warn!(error = %err, "could not return device to standby"),
        }
    }
}

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = load_config(args.config.as_ref())?;
    match args.cloud_scan_num {
        Some(n) => config.cloud_scan_num = n,
        None if args.config.is_none() => config.cloud_scan_num = DEFAULT_CLOUD_SCAN_NUM,
        None => {}
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let channel = args.port.open()?;
    let mut device = StandbyGuard {
        reader: LidarReader::with_config(channel, config),
    };
    let reader = &mut device.reader;
    let status_timeout = Duration::from_secs(args.status_timeout);

    for mode in [WorkingMode::Standby, WorkingMode::Normal] {
        println!("set working mode: {}", mode_name(mode));
        reader
            .set_working_mode(mode)
            .map_err(|err| reader_error("set working mode failed", err))?;
        pause(&running, MODE_SETTLE);
    }

    let Some(Message::Version(version)) =
        wait_for(reader, &running, MessageKind::Version, status_timeout)?
    else {
        return Ok(SUCCESS);
    };
    println!("firmware version: {}", version.firmware);
    println!("sdk version: {SDK_VERSION}");
    pause(&running, STEP_PAUSE);

    if check_cover(reader, &running, status_timeout)?.is_none() {
        return Ok(SUCCESS);
    }
    pause(&running, STEP_PAUSE);

    if !args.no_led {
        let steps = [
            LedDisplayMode::all_on(),
            LedDisplayMode::all_off(),
            LedPattern::ForwardSlow.into(),
            LedPattern::ReverseSlow.into(),
            LedPattern::SixStageBreathing.into(),
        ];
        for mode in steps {
            if !running.load(Ordering::SeqCst) {
                return Ok(SUCCESS);
            }
            println!("set led display: {}", describe(&mode));
            reader
                .set_led_display_mode(mode)
                .map_err(|err| reader_error("set LED display failed", err))?;
            pause(&running, STEP_PAUSE);
        }
    }

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let message = reader
            .poll()
            .map_err(|err| reader_error("read failed", err))?;
        match message.kind() {
            MessageKind::None => thread::sleep(IDLE_SLEEP),
            MessageKind::Imu | MessageKind::PointCloud => {
                print_message(&message, reader.time_delay_us(), format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            MessageKind::Version | MessageKind::Auxiliary => {}
        }
    }

    Ok(SUCCESS)
}

/// Poll until a message of `kind` arrives. `Ok(None)` means interrupted.
fn wait_for<C: ByteChannel>(
    reader: &mut LidarReader<C>,
    running: &AtomicBool,
    kind: MessageKind,
    timeout: Duration,
) -> CliResult<Option<Message>> {
    let deadline = Instant::now() + timeout;
    while running.load(Ordering::SeqCst) {
        let message = reader
            .poll()
            .map_err(|err| reader_error("read failed", err))?;
        if message.kind() == kind {
            return Ok(Some(message));
        }
        if Instant::now() >= deadline {
            return Err(CliError::new(
                TIMEOUT,
                format!("no {kind} message within {}s", timeout.as_secs_f64()),
            ));
        }
        if message.is_none() {
            thread::sleep(IDLE_SLEEP);
        }
    }
    Ok(None)
}

/// Read the cover dirt level a few times and refuse to continue when it is
/// too high. Returns the last reading, or `None` if interrupted.
fn check_cover<C: ByteChannel>(
    reader: &mut LidarReader<C>,
    running: &AtomicBool,
    timeout: Duration,
) -> CliResult<Option<u8>> {
    let mut last = None;
    for _ in 0..DIRTY_SAMPLES {
        let Some(Message::Auxiliary(aux)) =
            wait_for(reader, running, MessageKind::Auxiliary, timeout)?
        else {
            return Ok(None);
        };
        println!("dirty percentage: {} %", aux.dirty_percentage);
        if aux.dirty_percentage > DIRTY_LIMIT {
            return Err(CliError::new(
                FAILURE,
                format!(
                    "protection cover is too dirty ({}%), clean it before use",
                    aux.dirty_percentage
                ),
            ));
        }
        last = Some(aux.dirty_percentage);
    }
    Ok(last)
}

fn pause(running: &AtomicBool, total: Duration) {
    let slice = Duration::from_millis(50);
    let deadline = Instant::now() + total;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(slice.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use unilidar_frame::{decode_frame, Frame, DEFAULT_MAX_PAYLOAD};
    use unilidar_reader::{Auxiliary, Command, Version};
    use unilidar_transport::MemoryChannel;

    use super::*;

    fn inject(channel: &mut MemoryChannel, frame: Frame) {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf).unwrap();
        channel.inject(&buf);
    }

    fn aux(dirty: u8) -> Frame {
        Auxiliary {
            stamp: 1.0,
            dirty_percentage: dirty,
        }
        .to_frame()
    }

    #[test]
    fn guard_sends_standby_on_drop() {
        let mut channel = MemoryChannel::new();
        {
            let _guard = StandbyGuard {
                reader: LidarReader::new(&mut channel),
            };
        }

        let mut written = BytesMut::from(channel.written());
        let frame = decode_frame(&mut written, DEFAULT_MAX_PAYLOAD).unwrap();
        assert_eq!(
            Command::decode(&frame).unwrap(),
            Command::SetWorkingMode(WorkingMode::Standby)
        );
    }

    #[test]
    fn guard_tolerates_closed_channel() {
        let mut channel = MemoryChannel::new();
        channel.close();
        let guard = StandbyGuard {
            reader: LidarReader::new(&mut channel),
        };
        drop(guard);
        assert!(channel.written().is_empty());
    }

    #[test]
    fn wait_for_skips_other_kinds() {
        let mut channel = MemoryChannel::new();
        inject(&mut channel, aux(1));
        inject(&mut channel, Version::new("3.0.0").to_frame());
        let mut reader = LidarReader::new(channel);
        let running = AtomicBool::new(true);

        let got = wait_for(
            &mut reader,
            &running,
            MessageKind::Version,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(got, Some(Message::Version(Version::new("3.0.0"))));
    }

    #[test]
    fn wait_for_times_out() {
        let mut reader = LidarReader::new(MemoryChannel::new());
        let running = AtomicBool::new(true);

        let err = wait_for(&mut reader, &running, MessageKind::Version, Duration::ZERO)
            .unwrap_err();
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn wait_for_stops_when_interrupted() {
        let mut reader = LidarReader::new(MemoryChannel::new());
        let running = AtomicBool::new(false);

        let got = wait_for(&mut reader, &running, MessageKind::Version, Duration::ZERO).unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn clean_cover_passes() {
        let mut channel = MemoryChannel::new();
        for dirty in [2, 3, 4] {
            inject(&mut channel, aux(dirty));
        }
        let mut reader = LidarReader::new(channel);
        let running = AtomicBool::new(true);

        let last = check_cover(&mut reader, &running, Duration::from_secs(1)).unwrap();
        assert_eq!(last, Some(4));
    }

    #[test]
    fn dirty_cover_aborts() {
        let mut channel = MemoryChannel::new();
        inject(&mut channel, aux(2));
        inject(&mut channel, aux(55));
        let mut reader = LidarReader::new(channel);
        let running = AtomicBool::new(true);

        let err = check_cover(&mut reader, &running, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.code, FAILURE);
        assert!(err.message.contains("55%"));
    }
}
