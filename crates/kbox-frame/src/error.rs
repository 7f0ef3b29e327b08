use std::time::Duration;

use bytes::Bytes;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// No bytes arrived before the read timeout expired.
    #[error("timed out waiting for frame data after {0:?}")]
    Timeout(Duration),

    /// A byte other than the delimiter was seen between frames.
    #[error("invalid head of frame (0x{byte:02x})")]
    UnexpectedByte { byte: u8, discarded: Bytes },

    /// The escape byte was followed by something other than an escape code.
    ///
    /// `discarded` ends with the tail of the abandoned frame and the two
    /// offending wire bytes.
    #[error("invalid SLIP escape (0xdb 0x{byte:02x})")]
    InvalidEscape { byte: u8, discarded: Bytes },

    /// A frame being received exceeded the configured maximum size.
    ///
    /// `discarded` holds the start of the abandoned frame.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge {
        size: usize,
        max: usize,
        discarded: Bytes,
    },

    /// The payload exceeds the configured MTU.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A frame is too short to hold a kommand identifier.
    #[error("frame too short to be valid ({len} bytes)")]
    TooShort { len: usize },

    /// The channel under the codec failed.
    #[error("frame transport error: {0}")]
    Transport(#[from] kbox_transport::TransportError),
}

impl FrameError {
    /// Whether this error means the decoder lost frame alignment.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            FrameError::UnexpectedByte { .. }
                | FrameError::InvalidEscape { .. }
                | FrameError::FrameTooLarge { .. }
        )
    }

    /// Bytes the decoder threw away when it lost alignment, capped at
    /// [`crate::DISCARD_PREVIEW`]. Empty for non-framing errors.
    pub fn discarded(&self) -> &[u8] {
        match self {
            FrameError::UnexpectedByte { discarded, .. }
            | FrameError::InvalidEscape { discarded, .. }
            | FrameError::FrameTooLarge { discarded, .. } => discarded.as_ref(),
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::Transport(err.into())
    }
}
