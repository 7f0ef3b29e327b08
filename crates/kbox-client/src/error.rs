use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use kbox_frame::{FrameError, HexDump};

use crate::file::FileErrorCode;

/// What the device reported when it refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFault {
    /// A generic `ERROR` kommand.
    Error,
    /// A `FILE_ERROR` kommand with a non-zero status.
    File { request_id: u32, code: FileErrorCode },
}

impl fmt::Display for DeviceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceFault::Error => f.write_str("device reported an error"),
            DeviceFault::File { request_id, code } => {
                write!(f, "file operation {request_id:#010x} failed: {code}")
            }
        }
    }
}

/// Errors that can occur while talking to a KBox.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The byte channel failed.
    #[error("transport error: {0}")]
    Transport(#[from] kbox_transport::TransportError),

    /// No matching reply arrived in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The device sent something that does not follow the protocol.
    #[error("protocol error: {message} [{}]", HexDump(.frame))]
    Protocol { message: String, frame: Bytes },

    /// The device answered with an error.
    #[error("{fault} [{}]", HexDump(.frame))]
    Device { fault: DeviceFault, frame: Bytes },

    /// A file write block was never acknowledged.
    #[error("no acknowledgement for {file} at offset {offset} after {attempts} attempts")]
    RetriesExhausted {
        file: String,
        offset: u32,
        attempts: u32,
    },

    /// The request cannot be encoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    pub(crate) fn protocol(message: impl Into<String>, frame: impl Into<Bytes>) -> Self {
        ClientError::Protocol {
            message: message.into(),
            frame: frame.into(),
        }
    }

    /// Whether this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_))
    }
}

impl From<FrameError> for ClientError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Timeout(t) => ClientError::Timeout(t),
            FrameError::Transport(err) => ClientError::Transport(err),
            FrameError::PayloadTooLarge { size, max } => ClientError::InvalidRequest(format!(
                "kommand of {size} bytes exceeds the {max} byte MTU"
            )),
            other => {
                let discarded = Bytes::copy_from_slice(other.discarded());
                ClientError::protocol(other.to_string(), discarded)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_map_by_kind() {
        let t = Duration::from_millis(7);
        assert!(matches!(
            ClientError::from(FrameError::Timeout(t)),
            ClientError::Timeout(d) if d == t
        ));
        assert!(matches!(
            ClientError::from(FrameError::InvalidEscape {
                byte: 0x42,
                discarded: Bytes::from_static(b"\xdb\x42"),
            }),
            ClientError::Protocol { .. }
        ));
        assert!(matches!(
            ClientError::from(FrameError::Transport(
                kbox_transport::TransportError::Closed
            )),
            ClientError::Transport(_)
        ));
        assert!(matches!(
            ClientError::from(FrameError::PayloadTooLarge { size: 9, max: 4 }),
            ClientError::InvalidRequest(_)
        ));
    }

    #[test]
    fn framing_error_keeps_discarded_bytes() {
        let err = ClientError::from(FrameError::InvalidEscape {
            byte: 0x42,
            discarded: Bytes::from_static(&[0x10, 0x00, 0xdb, 0x42]),
        });
        assert_eq!(
            err.to_string(),
            "protocol error: invalid SLIP escape (0xdb 0x42) [0x10, 0x00, 0xdb, 0x42]"
        );
    }

    #[test]
    fn protocol_error_shows_frame() {
        let err = ClientError::protocol("bad pong", Bytes::from_static(&[0x01, 0x00, 0x2a]));
        assert_eq!(
            err.to_string(),
            "protocol error: bad pong [0x01, 0x00, 0x2a]"
        );
    }

    #[test]
    fn device_error_shows_fault() {
        let err = ClientError::Device {
            fault: DeviceFault::File {
                request_id: 0x10,
                code: FileErrorCode::NoSuchFile,
            },
            frame: Bytes::from_static(&[0x2f, 0x00]),
        };
        assert_eq!(
            err.to_string(),
            "file operation 0x00000010 failed: no such file [0x2f, 0x00]"
        );
    }
}
