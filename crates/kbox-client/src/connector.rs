use kbox_transport::SerialChannel;

use crate::config::ClientConfig;
use crate::device::Kbox;
use crate::error::Result;

/// Open a KBox on a serial port at the default baud rate.
pub fn open(port: &str) -> Result<Kbox<SerialChannel>> {
    open_with_config(port, SerialChannel::DEFAULT_BAUD_RATE, ClientConfig::default())
}

/// Open a KBox on a serial port with explicit settings.
pub fn open_with_config(port: &str, baud_rate: u32, config: ClientConfig) -> Result<Kbox<SerialChannel>> {
    let channel = SerialChannel::open_with_baud(port, baud_rate)?;
    Kbox::with_config(channel, config)
}
