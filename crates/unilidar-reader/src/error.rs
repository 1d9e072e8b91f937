use unilidar_frame::FrameError;
use unilidar_transport::ChannelError;

/// Errors returned by reader operations.
///
/// Only the channel can make an operation fail. Bad frames and bad payloads
/// are skipped and counted in [`Diagnostics`](crate::Diagnostics).
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// Reading from or writing to the channel failed.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Encoding or writing a command frame failed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    ConfigFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// Configuration could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReaderError>;

/// Why a checksum-valid frame could not be turned into a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A fixed-layout payload has the wrong size.
    #[error("{kind} payload is {actual} bytes, expected {expected}")]
    Length {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Point records do not add up to the declared point count.
    #[error("point cloud declares {declared} points but carries {record_bytes} bytes of records")]
    PointCount { declared: usize, record_bytes: usize },

    /// Dirty percentage outside 0..=100.
    #[error("dirty percentage {0} out of range")]
    DirtyPercentage(u8),

    /// Version string is not valid UTF-8.
    #[error("version string is not valid UTF-8")]
    VersionEncoding,

    /// Version string is empty once padding is removed.
    #[error("version string is empty")]
    EmptyVersion,

    /// Unknown working mode byte.
    #[error("unknown working mode {0:#04x}")]
    WorkingMode(u8),

    /// Unknown LED pattern selector.
    #[error("unknown LED pattern {0:#04x}")]
    LedPattern(u8),

    /// The frame does not carry a command.
    #[error("type {0:#06x} is not a command")]
    NotACommand(u16),
}
