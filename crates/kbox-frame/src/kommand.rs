//! Kommand identifiers.
//!
//! Every frame starts with a little-endian `u16` identifying the kommand.
//! Requests and their replies use distinct identifiers.

/// Ping request carrying a `u32` nonce.
pub const PING: u16 = 0x00;

/// Ping reply echoing the nonce.
pub const PONG: u16 = 0x01;

/// Generic error reported by the device.
pub const ERROR: u16 = 0x0F;

/// Log line pushed by the device.
pub const LOG: u16 = 0x10;

/// Read a block of a file from the SD card.
pub const FILE_READ: u16 = 0x20;

/// Write a block of a file to the SD card.
pub const FILE_WRITE: u16 = 0x21;

/// Reply to a [`FILE_READ`] carrying the block data.
pub const FILE_READ_REPLY: u16 = 0x22;

/// File operation status; also the acknowledgement of a [`FILE_WRITE`].
pub const FILE_ERROR: u16 = 0x2F;

/// Capture the screen starting at a given line.
pub const SCREENSHOT: u16 = 0x30;

/// Reply to a [`SCREENSHOT`] carrying pixel data.
pub const SCREENSHOT_REPLY: u16 = 0x31;

/// Reboot the device. Ignored unless the payload is the reboot magic.
pub const REBOOT: u16 = 0x33;

/// NMEA sentence forwarded by the device.
pub const NMEA_SENTENCE: u16 = 0x40;

/// SignalK update forwarded by the device.
pub const SK_DATA: u16 = 0x42;

/// Status of the WiFi module.
pub const WIFI_STATUS: u16 = 0x50;

/// Configuration for the WiFi module.
pub const WIFI_CONFIG: u16 = 0x51;

/// Returns a human-readable name for a kommand identifier.
pub fn kommand_name(id: u16) -> &'static str {
    match id {
        PING => "PING",
        PONG => "PONG",
        ERROR => "ERROR",
        LOG => "LOG",
        FILE_READ => "FILE_READ",
        FILE_WRITE => "FILE_WRITE",
        FILE_READ_REPLY => "FILE_READ_REPLY",
        FILE_ERROR => "FILE_ERROR",
        SCREENSHOT => "SCREENSHOT",
        SCREENSHOT_REPLY => "SCREENSHOT_REPLY",
        REBOOT => "REBOOT",
        NMEA_SENTENCE => "NMEA_SENTENCE",
        SK_DATA => "SK_DATA",
        WIFI_STATUS => "WIFI_STATUS",
        WIFI_CONFIG => "WIFI_CONFIG",
        _ => "UNKNOWN",
    }
}

/// Returns true for kommands the device sends without being asked.
pub fn is_unsolicited(id: u16) -> bool {
    matches!(id, LOG | WIFI_STATUS | NMEA_SENTENCE | SK_DATA)
}
