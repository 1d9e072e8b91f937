use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info};
use unilidar_reader::LidarReader;
use unilidar_transport::{ByteChannel, IoChannel, SerialChannel};

use crate::cmd::{load_config, ListenArgs, IDLE_SLEEP};
use crate::exit::{
    channel_error, io_error, reader_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE,
};
use crate::output::{print_diagnostics, print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = load_config(args.config.as_ref())?;

    if let Some(path) = &args.replay {
        let file = File::open(path)
            .map_err(|err| io_error(&format!("cannot open {}", path.display()), err))?;
        info!(path = %path.display(), "replaying capture");
        let mut reader = LidarReader::with_config(IoChannel::new(file), config);
        let running = AtomicBool::new(true);
        return stream(&mut reader, &args, format, &running, true);
    }

    let Some(port) = &args.port else {
        return Err(CliError::new(USAGE, "a port or --replay is required"));
    };
    let channel = SerialChannel::open_with_baud(port, args.baud)
        .map_err(|err| channel_error("open failed", err))?;
    let mut reader = LidarReader::with_config(channel, config);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    stream(&mut reader, &args, format, &running, false)
}

/// Print messages until the count is reached, the flag drops or, when
/// `stop_when_idle` is set, a poll neither consumes nor reads anything.
fn stream<C: ByteChannel>(
    reader: &mut LidarReader<C>,
    args: &ListenArgs,
    format: OutputFormat,
    running: &AtomicBool,
    stop_when_idle: bool,
) -> CliResult<i32> {
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let before = (reader.buffered_len(), reader.diagnostics());
        let message = reader
            .poll()
            .map_err(|err| reader_error("read failed", err))?;

        if message.is_none() {
            let progressed = before != (reader.buffered_len(), reader.diagnostics());
            match on_empty_poll(stop_when_idle, progressed) {
                EmptyPoll::Retry => {}
                EmptyPoll::Sleep => thread::sleep(IDLE_SLEEP),
                EmptyPoll::Stop => {
                    debug!("input exhausted");
                    break;
                }
            }
            continue;
        }

        if let Some(kinds) = &args.kinds {
            if !kinds.iter().any(|k| k.matches(message.kind())) {
                continue;
            }
        }

        print_message(&message, reader.time_delay_us(), format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    if args.stats {
        print_diagnostics(&reader.diagnostics(), format);
    }
    Ok(SUCCESS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmptyPoll {
    Retry,
    Sleep,
    Stop,
}

/// What to do after a poll returned no message. A poll that consumed bytes
/// may have more to give right away; one that did nothing means the input is
/// exhausted (replay) or the device is quiet (live port).
fn on_empty_poll(stop_when_idle: bool, progressed: bool) -> EmptyPoll {
    match (progressed, stop_when_idle) {
        (true, _) => EmptyPoll::Retry,
        (false, true) => EmptyPoll::Stop,
        (false, false) => EmptyPoll::Sleep,
    }
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
