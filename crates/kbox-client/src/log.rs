//! Log records pushed by the device.

use std::fmt;

use serde::Serialize;

use crate::error::{ClientError, Result};

const LOG_HEADER_SIZE: usize = 6;

/// Severity of a device log record.
///
/// The device forwards logs from two sources: the host MCU and the WiFi
/// module. Each has its own debug, info and error levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    HostDebug,
    HostInfo,
    HostError,
    WifiDebug,
    WifiInfo,
    WifiError,
}

impl LogLevel {
    /// Map the wire value to a level.
    pub fn from_wire(value: u16) -> Option<Self> {
        match value {
            0 => Some(LogLevel::HostDebug),
            1 => Some(LogLevel::HostInfo),
            2 => Some(LogLevel::HostError),
            3 => Some(LogLevel::WifiDebug),
            4 => Some(LogLevel::WifiInfo),
            5 => Some(LogLevel::WifiError),
            _ => None,
        }
    }

    /// Two-letter prefix used when printing records.
    pub fn prefix(self) -> &'static str {
        match self {
            LogLevel::HostDebug => "hD",
            LogLevel::HostInfo => "hI",
            LogLevel::HostError => "hE",
            LogLevel::WifiDebug => "wD",
            LogLevel::WifiInfo => "wI",
            LogLevel::WifiError => "wE",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, LogLevel::HostError | LogLevel::WifiError)
    }

    pub fn is_debug(self) -> bool {
        matches!(self, LogLevel::HostDebug | LogLevel::WifiDebug)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// One decoded `LOG` kommand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub level: LogLevel,
    /// Source file as sent by the device, usually a full build path.
    pub file: String,
    pub line: u16,
    pub message: String,
}

impl LogRecord {
    /// Decode a `LOG` payload.
    ///
    /// Layout: `u16 level, u16 line, u16 name_len` (LE), the file name, then
    /// the message. NUL terminators around the message are dropped.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < LOG_HEADER_SIZE {
            return Err(ClientError::protocol(
                format!("log record too short ({} bytes)", payload.len()),
                payload.to_vec(),
            ));
        }

        let level_raw = u16::from_le_bytes([payload[0], payload[1]]);
        let line = u16::from_le_bytes([payload[2], payload[3]]);
        let name_len = usize::from(u16::from_le_bytes([payload[4], payload[5]]));

        let level = LogLevel::from_wire(level_raw).ok_or_else(|| {
            ClientError::protocol(format!("unknown log level {level_raw}"), payload.to_vec())
        })?;

        let rest = &payload[LOG_HEADER_SIZE..];
        if rest.len() < name_len {
            return Err(ClientError::protocol(
                format!(
                    "log file name length {name_len} exceeds record ({} bytes left)",
                    rest.len()
                ),
                payload.to_vec(),
            ));
        }
        let (file, message) = rest.split_at(name_len);

        Ok(Self {
            level,
            file: String::from_utf8_lossy(trim_nul(file)).into_owned(),
            line,
            message: String::from_utf8_lossy(trim_nul(message)).into_owned(),
        })
    }

    /// The source file name without its directory.
    pub fn display_name(&self) -> &str {
        self.file.rsplit('/').next().unwrap_or(&self.file)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} {}",
            self.level,
            self.display_name(),
            self.line,
            self.message
        )
    }
}

fn trim_nul(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| b != 0).map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(level: u16, line: u16, file: &str, message: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&level.to_le_bytes());
        out.extend_from_slice(&line.to_le_bytes());
        out.extend_from_slice(&(file.len() as u16).to_le_bytes());
        out.extend_from_slice(file.as_bytes());
        out.extend_from_slice(message);
        out
    }

    #[test]
    fn decodes_host_info_record() {
        let record =
            LogRecord::decode(&payload(1, 42, "src/host/main.cpp", b"started\0")).unwrap();
        assert_eq!(record.level, LogLevel::HostInfo);
        assert_eq!(record.line, 42);
        assert_eq!(record.file, "src/host/main.cpp");
        assert_eq!(record.message, "started");
        assert_eq!(record.display_name(), "main.cpp");
        assert_eq!(record.to_string(), "hI main.cpp:42 started");
    }

    #[test]
    fn every_wire_level_has_a_prefix() {
        let prefixes: Vec<_> = (0..6)
            .map(|l| LogLevel::from_wire(l).unwrap().prefix())
            .collect();
        assert_eq!(prefixes, ["hD", "hI", "hE", "wD", "wI", "wE"]);
        assert!(LogLevel::from_wire(6).is_none());
    }

    #[test]
    fn unknown_level_is_rejected() {
        let err = LogRecord::decode(&payload(9, 1, "a.c", b"x")).unwrap_err();
        assert!(matches!(err, ClientError::Protocol { .. }));
    }

    #[test]
    fn short_or_truncated_records_are_rejected() {
        assert!(LogRecord::decode(&[0, 0, 1]).is_err());

        let mut truncated = payload(0, 1, "file.c", b"");
        truncated.truncate(8);
        assert!(LogRecord::decode(&truncated).is_err());
    }

    #[test]
    fn message_is_trimmed_and_lossy() {
        let record = LogRecord::decode(&payload(5, 7, "wifi.c", b"\0bad \xff byte\0\0")).unwrap();
        assert_eq!(record.level, LogLevel::WifiError);
        assert_eq!(record.message, "bad \u{fffd} byte");
        assert_eq!(record.display_name(), "wifi.c");
    }

    #[test]
    fn empty_message_and_name() {
        let record = LogRecord::decode(&payload(3, 0, "", b"")).unwrap();
        assert_eq!(record.file, "");
        assert_eq!(record.message, "");
    }
}
