use clap::{ArgGroup, Args, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use unilidar_reader::{LedPattern, MessageKind, ReaderConfig, WorkingMode};
use unilidar_transport::SerialChannel;

use crate::exit::{channel_error, reader_error, CliResult};
use crate::output::OutputFormat;

pub mod led;
pub mod listen;
pub mod mode;
pub mod run;
pub mod version;

/// Pause after a poll that found nothing on a live port.
pub const IDLE_SLEEP: Duration = Duration::from_micros(200);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring the device up, check it, cycle the LEDs and stream telemetry.
    Run(RunArgs),
    /// Print decoded messages from a port or a capture file.
    Listen(ListenArgs),
    /// Switch the device working mode.
    Mode(ModeArgs),
    /// Set the LED ring display.
    Led(LedArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Mode(args) => mode::run(args),
        Command::Led(args) => led::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PortArgs {
    /// Serial device path (e.g. /dev/ttyUSB0).
    pub port: String,
    /// Baud rate.
    #[arg(long, default_value_t = SerialChannel::DEFAULT_BAUD_RATE)]
    pub baud: u32,
}

impl PortArgs {
    pub fn open(&self) -> CliResult<SerialChannel> {
        SerialChannel::open_with_baud(&self.port, self.baud)
            .map_err(|err| channel_error("open failed", err))
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Reader configuration file (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Scans merged into each printed point cloud (overrides the config file).
    #[arg(long, value_name = "N")]
    pub cloud_scan_num: Option<u32>,
    /// Seconds to wait for each status message before giving up.
    #[arg(long, default_value_t = 5)]
    pub status_timeout: u64,
    /// Skip the LED demonstration.
    #[arg(long)]
    pub no_led: bool,
    /// Exit after printing N telemetry messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["port", "replay"])))]
pub struct ListenArgs {
    /// Serial device path (e.g. /dev/ttyUSB0).
    pub port: Option<String>,
    /// Baud rate.
    #[arg(long, default_value_t = SerialChannel::DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Decode a raw capture file instead of a live port.
    #[arg(long, value_name = "FILE", conflicts_with = "port")]
    pub replay: Option<PathBuf>,
    /// Reader configuration file (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Only print these message kinds (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub kinds: Option<Vec<KindArg>>,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Print skip and resync counters on exit.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct ModeArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Target working mode.
    #[arg(value_enum)]
    pub mode: ModeArg,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("display").required(true).args(["pattern", "all_on", "all_off", "table"])))]
pub struct LedArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Built-in animation.
    #[arg(long, value_enum)]
    pub pattern: Option<PatternArg>,
    /// Light every LED.
    #[arg(long)]
    pub all_on: bool,
    /// Turn every LED off.
    #[arg(long)]
    pub all_off: bool,
    /// Explicit 45-entry brightness table (comma-separated bytes).
    #[arg(long, value_delimiter = ',', value_name = "BYTES")]
    pub table: Option<Vec<u8>>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Imu,
    PointCloud,
    Version,
    Auxiliary,
}

impl KindArg {
    pub fn matches(self, kind: MessageKind) -> bool {
        matches!(
            (self, kind),
            (KindArg::Imu, MessageKind::Imu)
                | (KindArg::PointCloud, MessageKind::PointCloud)
                | (KindArg::Version, MessageKind::Version)
                | (KindArg::Auxiliary, MessageKind::Auxiliary)
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Normal,
    Standby,
}

impl From<ModeArg> for WorkingMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Normal => WorkingMode::Normal,
            ModeArg::Standby => WorkingMode::Standby,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PatternArg {
    ForwardSlow,
    ReverseSlow,
    SixStageBreathing,
}

impl From<PatternArg> for LedPattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::ForwardSlow => LedPattern::ForwardSlow,
            PatternArg::ReverseSlow => LedPattern::ReverseSlow,
            PatternArg::SixStageBreathing => LedPattern::SixStageBreathing,
        }
    }
}

pub fn load_config(path: Option<&PathBuf>) -> CliResult<ReaderConfig> {
    match path {
        Some(path) => {
            ReaderConfig::load(path).map_err(|err| reader_error("config load failed", err))
        }
        None => Ok(ReaderConfig::default()),
    }
}
