use std::time::Duration;

use crate::error::Result;

/// A duplex byte channel connected to a KBox.
///
/// This is the only thing the protocol layers above need from the medium:
/// a bounded read and a full write. The channel does not know about frames.
pub trait ByteChannel: Send {
    /// Read whatever bytes are available into `buf`, waiting at most `timeout`.
    ///
    /// Returns `Ok(0)` when nothing arrived before the timeout expired. A
    /// timeout is not an error at this layer.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Write all of `bytes` to the channel and flush.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Create another handle to the same underlying channel.
    ///
    /// Used to split a channel into independent reader and writer halves.
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;

    /// Human-readable channel description for diagnostics.
    fn describe(&self) -> String;
}
