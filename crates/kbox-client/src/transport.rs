use std::time::{Duration, Instant};

use bytes::Bytes;
use kbox_frame::kommand::{ERROR, FILE_ERROR, LOG, WIFI_STATUS};
use kbox_frame::{kommand_name, Frame, FrameConfig, FrameError, FrameReader, FrameWriter, HexDump};
use kbox_transport::ByteChannel;
use tracing::{debug, trace, warn};

use crate::error::{ClientError, DeviceFault, Result};
use crate::file::{FileAck, FileErrorCode};
use crate::log::LogRecord;
use crate::sink::{FrameSink, TracingSink};
use crate::wifi::WifiStatus;

/// Sends kommands and waits for their replies on one channel.
///
/// The reader and writer each hold a clone of the channel. The reader's
/// decoder lives as long as the transport, so a frame cut by a timeout is
/// completed by the next exchange. Every waiting method takes `&mut self`,
/// which keeps at most one exchange pending.
pub struct CommandTransport<C> {
    reader: FrameReader<C>,
    writer: FrameWriter<C>,
    sink: Box<dyn FrameSink>,
    description: String,
}

impl<C: ByteChannel> CommandTransport<C> {
    /// Create a transport with the default frame configuration.
    pub fn new(channel: C) -> Result<Self> {
        Self::with_config(channel, FrameConfig::default())
    }

    /// Create a transport with an explicit frame configuration.
    pub fn with_config(channel: C, config: FrameConfig) -> Result<Self> {
        let description = channel.describe();
        let reader_half = channel.try_clone()?;
        Ok(Self {
            reader: FrameReader::with_config(reader_half, config.clone()),
            writer: FrameWriter::with_config(channel, config),
            sink: Box::new(TracingSink),
            description,
        })
    }

    /// Replace the sink that receives pushed frames.
    pub fn set_sink(&mut self, sink: impl FrameSink + 'static) {
        self.sink = Box::new(sink);
    }

    /// Builder form of [`CommandTransport::set_sink`].
    pub fn with_sink(mut self, sink: impl FrameSink + 'static) -> Self {
        self.set_sink(sink);
        self
    }

    /// Send a kommand without waiting for anything.
    pub fn send(&mut self, command: u16, payload: &[u8]) -> Result<()> {
        debug!(
            command,
            name = kommand_name(command),
            len = payload.len(),
            "sending kommand"
        );
        trace!(payload = %HexDump(payload), "< {}", kommand_name(command));
        self.writer.send(command, payload)?;
        Ok(())
    }

    /// Wait for a `reply` kommand and return its payload.
    ///
    /// Pushed logs and status updates are passed to the sink on the way.
    /// `ERROR` and `FILE_ERROR` end the wait with [`ClientError::Device`]
    /// unless one of them is the awaited reply.
    pub fn await_reply(&mut self, reply: u16, timeout: Duration) -> Result<Bytes> {
        self.await_reply_until(reply, Instant::now() + timeout, timeout)
    }

    /// Send a kommand and wait for its reply.
    pub fn exchange(
        &mut self,
        command: u16,
        payload: &[u8],
        reply: u16,
        timeout: Duration,
    ) -> Result<Bytes> {
        self.send(command, payload)?;
        self.await_reply(reply, timeout)
    }

    /// Read until the first well-formed frame, then hand it to the sink.
    ///
    /// Used after opening a port: whatever the device was in the middle of
    /// sending is dropped.
    pub fn synchronize(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.next_frame(deadline, timeout) {
                Ok(Some(frame)) => {
                    debug!(
                        command = frame.command,
                        name = kommand_name(frame.command),
                        "synchronized"
                    );
                    self.dispatch(frame);
                    return Ok(());
                }
                Ok(None) => {}
                Err(ClientError::Protocol { message, .. }) => {
                    debug!(%message, "discarding while synchronizing");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Drop any partial frame and wait for the next delimiter.
    pub fn resynchronize(&mut self) {
        self.reader.resynchronize();
    }

    /// Human-readable description of the channel.
    pub fn describe(&self) -> &str {
        &self.description
    }

    /// Borrow the underlying channel.
    pub fn channel(&self) -> &C {
        self.writer.get_ref()
    }

    pub(crate) fn sink_mut(&mut self) -> &mut dyn FrameSink {
        self.sink.as_mut()
    }

    pub(crate) fn await_reply_until(
        &mut self,
        reply: u16,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<Bytes> {
        loop {
            let Some(frame) = self.next_frame(deadline, timeout)? else {
                continue;
            };

            if frame.command == reply {
                return Ok(frame.payload);
            }
            match frame.command {
                ERROR => {
                    return Err(ClientError::Device {
                        fault: DeviceFault::Error,
                        frame: frame.to_raw(),
                    })
                }
                FILE_ERROR => match FileAck::decode(&frame.payload)? {
                    ack if ack.code == FileErrorCode::Ok => {
                        warn!(request_id = ack.request_id, "stale file acknowledgement");
                        self.sink.on_unexpected(&frame);
                    }
                    ack => {
                        return Err(ClientError::Device {
                            fault: DeviceFault::File {
                                request_id: ack.request_id,
                                code: ack.code,
                            },
                            frame: frame.to_raw(),
                        })
                    }
                },
                _ => self.dispatch(frame),
            }
        }
    }

    /// Pull the next frame. `Ok(None)` means an empty frame was skipped.
    fn next_frame(&mut self, deadline: Instant, timeout: Duration) -> Result<Option<Frame>> {
        let raw = match self.reader.read_frame_until(deadline) {
            Ok(raw) => raw,
            Err(FrameError::Timeout(_)) => return Err(ClientError::Timeout(timeout)),
            Err(err) => return Err(err.into()),
        };
        trace!(len = raw.len(), frame = %HexDump(&raw), "> frame");

        if raw.is_empty() {
            return Ok(None);
        }
        match Frame::decode(raw.clone()) {
            Ok(frame) => Ok(Some(frame)),
            Err(_) => Err(ClientError::protocol("frame too short to be valid", raw)),
        }
    }

    fn dispatch(&mut self, frame: Frame) {
        match frame.command {
            LOG => match LogRecord::decode(&frame.payload) {
                Ok(record) => self.sink.on_log(&record),
                Err(err) => {
                    warn!(error = %err, "undecodable log record");
                    self.sink.on_unexpected(&frame);
                }
            },
            WIFI_STATUS => match WifiStatus::decode(&frame.payload) {
                Ok(status) => self.sink.on_wifi_status(&status),
                Err(err) => {
                    warn!(error = %err, "undecodable wifi status");
                    self.sink.on_unexpected(&frame);
                }
            },
            _ => self.sink.on_unexpected(&frame),
        }
    }
}

impl<C: ByteChannel> std::fmt::Debug for CommandTransport<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTransport")
            .field("channel", &self.description)
            .field("synchronized", &self.reader.is_synchronized())
            .finish()
    }
}
