use kbox_frame::{kommand_name, Frame, HexDump};
use tracing::{debug, error, info, warn};

use crate::log::{LogLevel, LogRecord};
use crate::wifi::WifiStatus;

/// Receives the frames the device pushes while an exchange is waiting.
///
/// All methods default to doing nothing.
pub trait FrameSink: Send {
    fn on_log(&mut self, _record: &LogRecord) {}

    fn on_wifi_status(&mut self, _status: &WifiStatus) {}

    /// A frame that is neither the awaited reply nor a known push.
    fn on_unexpected(&mut self, _frame: &Frame) {}
}

/// Forwards pushed frames to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FrameSink for TracingSink {
    fn on_log(&mut self, record: &LogRecord) {
        let file = record.display_name();
        match record.level {
            LogLevel::HostDebug | LogLevel::WifiDebug => {
                debug!(target: "kbox::device", prefix = record.level.prefix(), file, line = record.line, "{}", record.message)
            }
            LogLevel::HostInfo | LogLevel::WifiInfo => {
                info!(target: "kbox::device", prefix = record.level.prefix(), file, line = record.line, "{}", record.message)
            }
            LogLevel::HostError | LogLevel::WifiError => {
                error!(target: "kbox::device", prefix = record.level.prefix(), file, line = record.line, "{}", record.message)
            }
        }
    }

    fn on_wifi_status(&mut self, status: &WifiStatus) {
        info!(
            state = %status.state,
            ip = %status.ip,
            dhcp = status.dhcp_clients,
            tcp = status.tcp_clients,
            signalk = status.signalk_clients,
            "wifi status"
        );
    }

    fn on_unexpected(&mut self, frame: &Frame) {
        warn!(
            command = frame.command,
            name = kommand_name(frame.command),
            payload = %HexDump(&frame.payload),
            "unexpected frame"
        );
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn on_log(&mut self, record: &LogRecord) {
        (**self).on_log(record);
    }

    fn on_wifi_status(&mut self, status: &WifiStatus) {
        (**self).on_wifi_status(status);
    }

    fn on_unexpected(&mut self, frame: &Frame) {
        (**self).on_unexpected(frame);
    }
}
