use unilidar_frame::MAGIC;
use unilidar_reader::SDK_VERSION;
use unilidar_transport::SerialChannel;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("unilidar {SDK_VERSION}");
        return Ok(SUCCESS);
    }

    println!("name: unilidar");
    println!("version: {SDK_VERSION}");
    println!(
        "build_target: {}",
        option_env!("UNILIDAR_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("UNILIDAR_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("frame_magic: {MAGIC:02X?}");
    println!("default_baud: {}", SerialChannel::DEFAULT_BAUD_RATE);

    Ok(SUCCESS)
}
