use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::ByteChannel;

/// Serial port channel to a KBox.
///
/// The KBox enumerates as a USB CDC serial device. The baud rate is nominal
/// over USB but the port is still configured explicitly (8N1, no flow control).
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    name: String,
    current_timeout: Duration,
}

impl SerialChannel {
    /// Baud rate used by the KBox USB interface.
    pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;
    /// Timeout applied when the port is opened, before any read sets its own.
    const OPEN_TIMEOUT: Duration = Duration::from_millis(100);

    /// Open a serial port at the default KBox baud rate.
    pub fn open(port: &str) -> Result<Self> {
        Self::open_with_baud(port, Self::DEFAULT_BAUD_RATE)
    }

    /// Open a serial port at an explicit baud rate.
    pub fn open_with_baud(port: &str, baud_rate: u32) -> Result<Self> {
        let serial = serialport::new(port, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Self::OPEN_TIMEOUT)
            .open()
            .map_err(|source| TransportError::Open {
                port: port.to_string(),
                source,
            })?;

        info!(port, baud_rate, "opened serial port");

        Ok(Self {
            port: serial,
            name: port.to_string(),
            current_timeout: Self::OPEN_TIMEOUT,
        })
    }

    /// Discard anything buffered in either direction.
    pub fn clear(&self) -> Result<()> {
        self.port.clear(ClearBuffer::All)?;
        Ok(())
    }

    /// Path of the underlying port.
    pub fn port_name(&self) -> &str {
        &self.name
    }

    fn apply_timeout(&mut self, timeout: Duration) -> Result<()> {
        if timeout != self.current_timeout {
            self.port.set_timeout(timeout)?;
            self.current_timeout = timeout;
        }
        Ok(())
    }
}

impl ByteChannel for SerialChannel {
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.apply_timeout(timeout)?;
        loop {
            match self.port.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock =>
                {
                    return Ok(0);
                }
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                    return Err(TransportError::Closed)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        Write::write_all(&mut self.port, bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn try_clone(&self) -> Result<Self> {
        let port = self.port.try_clone()?;
        debug!(port = %self.name, "cloned serial port handle");
        Ok(Self {
            port,
            name: self.name.clone(),
            current_timeout: self.current_timeout,
        })
    }

    fn describe(&self) -> String {
        format!("serial:{}", self.name)
    }
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("port", &self.name)
            .finish()
    }
}

/// List serial ports that look like they could be a KBox.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_port_fails() {
        let result = SerialChannel::open("/dev/kbox-does-not-exist");
        match result {
            Err(TransportError::Open { port, .. }) => {
                assert_eq!(port, "/dev/kbox-does-not-exist");
            }
            other => panic!("expected open error, got {other:?}"),
        }
    }

    #[test]
    fn test_open_error_mentions_port() {
        let err = SerialChannel::open_with_baud("/dev/kbox-nowhere", 115_200).unwrap_err();
        assert!(err.to_string().contains("/dev/kbox-nowhere"));
    }
}
