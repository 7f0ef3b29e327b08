//! Talk to a KBox over its serial protocol.
//!
//! [`CommandTransport`] sends kommands and waits for replies while passing
//! pushed logs and status updates to a [`FrameSink`]. [`Kbox`] builds the
//! device command set on top: ping, reboot, screenshots, WiFi settings and
//! file transfer.

pub mod config;
pub mod connector;
pub mod device;
pub mod error;
pub mod file;
pub mod log;
pub mod screenshot;
pub mod sink;
pub mod transport;
pub mod wifi;

pub use config::{ClientConfig, FileTransferConfig, ScreenGeometry, DEFAULT_EXCHANGE_TIMEOUT};
pub use connector::{open, open_with_config};
pub use device::{Kbox, PingReply, REBOOT_MAGIC};
pub use error::{ClientError, DeviceFault, Result};
pub use file::{FileAck, FileErrorCode, FileTransfer, TransferStats};
pub use log::{LogLevel, LogRecord};
pub use screenshot::{rgb565_to_rgb, rgb888_to_rgb565, Rgb, ScreenChunk, Screenshot};
pub use sink::{FrameSink, TracingSink};
pub use transport::CommandTransport;
pub use wifi::{WifiConfig, WifiCredentials, WifiState, WifiStatus};
