use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use kbox_transport::ByteChannel;
use tracing::{trace, warn};

use crate::codec::{Frame, FrameConfig, SlipDecoder};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete SLIP frames from a [`ByteChannel`].
///
/// Handles partial reads internally. Decoder state survives timeouts, so a
/// frame interrupted by a slow link is completed by the next call.
pub struct FrameReader<C> {
    inner: C,
    decoder: SlipDecoder,
    pending: BytesMut,
    config: FrameConfig,
}

impl<C: ByteChannel> FrameReader<C> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: C) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: C, config: FrameConfig) -> Self {
        Self {
            inner,
            decoder: SlipDecoder::new(config.max_frame_size),
            pending: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next raw frame using the configured read timeout.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        self.read_frame_timeout(self.config.read_timeout)
    }

    /// Read the next raw frame, failing with [`FrameError::Timeout`] if no
    /// complete frame arrives within `timeout`.
    pub fn read_frame_timeout(&mut self, timeout: Duration) -> Result<Bytes> {
        self.read_until(Instant::now().checked_add(timeout), timeout)
    }

    /// Read the next raw frame, failing with [`FrameError::Timeout`] once
    /// `deadline` passes.
    ///
    /// The deadline bounds the whole call, not each channel read, so a line
    /// that keeps trickling bytes without ever closing a frame still times
    /// out. Partial frame state survives the timeout.
    pub fn read_frame_until(&mut self, deadline: Instant) -> Result<Bytes> {
        let budget = deadline.saturating_duration_since(Instant::now());
        self.read_until(Some(deadline), budget)
    }

    /// `None` means the deadline is too far away to represent; each channel
    /// read then waits the whole `budget`.
    fn read_until(&mut self, deadline: Option<Instant>, budget: Duration) -> Result<Bytes> {
        loop {
            match self.decoder.decode(&mut self.pending) {
                Ok(Some(frame)) => return Ok(frame),
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, "framing error, waiting for next delimiter");
                    return Err(err);
                }
            }

            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => budget,
            };
            if remaining.is_zero() {
                return Err(self.timed_out(budget));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = self.inner.read_timeout(&mut chunk, remaining)?;
            if read == 0 {
                return Err(self.timed_out(budget));
            }

            self.pending.extend_from_slice(&chunk[..read]);
        }
    }

    fn timed_out(&self, budget: Duration) -> FrameError {
        trace!(
            in_frame = self.decoder.in_frame(),
            partial = self.decoder.partial_len(),
            "read timed out"
        );
        FrameError::Timeout(budget)
    }

    /// Read the next frame and split it into identifier and payload.
    pub fn read_command(&mut self) -> Result<Frame> {
        Frame::decode(self.read_frame()?)
    }

    /// Drop any partial frame and buffered bytes, then wait for a delimiter.
    pub fn resynchronize(&mut self) {
        self.decoder.reset();
        self.pending.clear();
    }

    /// Whether the decoder has seen a delimiter since the last reset.
    pub fn is_synchronized(&self) -> bool {
        self.decoder.is_synchronized()
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Consume the reader and return the inner channel.
    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Update maximum frame size for subsequent decoding.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
        self.decoder.set_max_frame_size(max_frame_size);
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
