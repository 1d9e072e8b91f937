use unilidar_reader::{LidarReader, WorkingMode};

use crate::cmd::ModeArgs;
use crate::exit::{reader_error, CliResult, SUCCESS};

pub fn run(args: ModeArgs) -> CliResult<i32> {
    let mut reader = LidarReader::new(args.port.open()?);
    let mode = WorkingMode::from(args.mode);
    reader
        .set_working_mode(mode)
        .map_err(|err| reader_error("set working mode failed", err))?;

    println!("working mode: {}", mode_name(mode));
    Ok(SUCCESS)
}

pub fn mode_name(mode: WorkingMode) -> &'static str {
    match mode {
        WorkingMode::Normal => "normal",
        WorkingMode::Standby => "standby",
    }
}
