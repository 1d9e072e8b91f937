use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{ChannelError, Result};
use crate::traits::ByteChannel;

/// Serial port channel (8N1, no flow control).
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialChannel {
    /// Default baud rate of the device's USB-serial bridge.
    pub const DEFAULT_BAUD_RATE: u32 = 2_000_000;

    /// Upper bound on how long a read may wait when the driver reports
    /// pending bytes that have not landed yet.
    const READ_TIMEOUT: Duration = Duration::from_micros(100);

    /// Open a serial port at [`Self::DEFAULT_BAUD_RATE`].
    pub fn open(path: &str) -> Result<Self> {
        Self::open_with_baud(path, Self::DEFAULT_BAUD_RATE)
    }

    /// Open a serial port at an explicit baud rate.
    pub fn open_with_baud(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Self::READ_TIMEOUT)
            .open()
            .map_err(|err| ChannelError::Open {
                path: path.to_string(),
                reason: err.to_string(),
            })?;

        info!(path, baud_rate, "opened serial port");

        Ok(Self {
            port,
            path: path.to_string(),
        })
    }

    /// Path the port was opened from.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl ByteChannel for SerialChannel {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let pending = match self.port.bytes_to_read() {
            Ok(n) => n as usize,
            Err(err) => {
                return Err(ChannelError::Io(std::io::Error::other(err.to_string())));
            }
        };
        if pending == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = pending.min(buf.len());
        match self.port.read(&mut buf[..want]) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == ErrorKind::TimedOut => Ok(0),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(0),
            Err(err) => Err(ChannelError::Io(err)),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        debug!(path = %self.path, len = bytes.len(), "serial write");
        Write::write_all(&mut self.port, bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.port.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("path", &self.path)
            .finish()
    }
}
