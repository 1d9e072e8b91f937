/// Errors that can occur on a byte channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Failed to open the underlying device.
    #[error("failed to open {path}: {reason}")]
    Open { path: String, reason: String },

    /// An I/O error occurred while reading or writing.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer end stopped accepting bytes.
    #[error("channel closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ChannelError>;
