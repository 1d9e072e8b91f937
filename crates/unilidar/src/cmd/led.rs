use unilidar_reader::{LedDisplayMode, LedPattern, LidarReader, LED_TABLE_LEN};

use crate::cmd::LedArgs;
use crate::exit::{reader_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: LedArgs) -> CliResult<i32> {
    let mode = display_mode(&args)?;
    let mut reader = LidarReader::new(args.port.open()?);
    reader
        .set_led_display_mode(mode)
        .map_err(|err| reader_error("set LED display failed", err))?;

    println!("led display: {}", describe(&mode));
    Ok(SUCCESS)
}

fn display_mode(args: &LedArgs) -> CliResult<LedDisplayMode> {
    if let Some(pattern) = args.pattern {
        return Ok(LedPattern::from(pattern).into());
    }
    if args.all_on {
        return Ok(LedDisplayMode::all_on());
    }
    if args.all_off {
        return Ok(LedDisplayMode::all_off());
    }
    match &args.table {
        Some(values) => {
            let table: [u8; LED_TABLE_LEN] = values.as_slice().try_into().map_err(|_| {
                CliError::new(
                    USAGE,
                    format!(
                        "--table needs {LED_TABLE_LEN} values, got {}",
                        values.len()
                    ),
                )
            })?;
            Ok(LedDisplayMode::Table(table))
        }
        None => Err(CliError::new(USAGE, "no LED display selected")),
    }
}

pub fn describe(mode: &LedDisplayMode) -> String {
    match mode {
        LedDisplayMode::Pattern(LedPattern::ForwardSlow) => "forward-slow".to_string(),
        LedDisplayMode::Pattern(LedPattern::ReverseSlow) => "reverse-slow".to_string(),
        LedDisplayMode::Pattern(LedPattern::SixStageBreathing) => {
            "six-stage-breathing".to_string()
        }
        LedDisplayMode::Table(table) => {
            let lit = table.iter().filter(|&&b| b > 0).count();
            format!("table ({lit}/{LED_TABLE_LEN} lit)")
        }
    }
}
