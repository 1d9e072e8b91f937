use unilidar_transport::ChannelError;

/// Errors that can occur while encoding or sending frames.
///
/// Malformed inbound bytes are not errors: the scanner skips them and
/// records the event in [`ScanStats`](crate::ScanStats).
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The channel failed while writing a frame.
    #[error("frame channel error: {0}")]
    Channel(#[from] ChannelError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
