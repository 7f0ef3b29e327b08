use bytes::BytesMut;
use kbox_transport::ByteChannel;
use tracing::trace;

use crate::codec::{encode_frame, Frame, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes SLIP-framed kommands to a [`ByteChannel`].
pub struct FrameWriter<C> {
    inner: C,
    buf: BytesMut,
    config: FrameConfig,
}

impl<C: ByteChannel> FrameWriter<C> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: C) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: C, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.command, frame.payload.as_ref())
    }

    /// Encode and send a kommand.
    ///
    /// Fails with [`FrameError::PayloadTooLarge`] before touching the channel
    /// if header and payload together exceed the configured MTU.
    pub fn send(&mut self, command: u16, payload: &[u8]) -> Result<()> {
        let size = HEADER_SIZE + payload.len();
        if size > self.config.mtu {
            return Err(FrameError::PayloadTooLarge {
                size,
                max: self.config.mtu,
            });
        }

        self.buf.clear();
        encode_frame(command, payload, &mut self.buf);
        trace!(command, wire_len = self.buf.len(), "sending frame");
        self.inner.write_all(&self.buf)?;
        Ok(())
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Consume the writer and return the inner channel.
    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Update the MTU for subsequent frames.
    pub fn set_mtu(&mut self, mtu: usize) {
        self.config.mtu = mtu;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use kbox_transport::{MemoryChannel, TransportError};

    use super::*;
    use crate::codec::SlipDecoder;
    use crate::reader::FrameReader;

    fn decode_written(channel: &MemoryChannel) -> Vec<Frame> {
        let mut src = BytesMut::from(channel.written().as_slice());
        let mut decoder = SlipDecoder::default();
        let mut frames = Vec::new();
        while let Some(raw) = decoder.decode(&mut src).unwrap() {
            frames.push(Frame::decode(raw).unwrap());
        }
        frames
    }

    #[test]
    fn write_single_frame() {
        let channel = MemoryChannel::new();
        let mut writer = FrameWriter::new(channel.clone());

        writer.send(1, b"hello").unwrap();

        assert_eq!(decode_written(&channel), vec![Frame::new(1, "hello")]);
    }

    #[test]
    fn write_multiple_frames() {
        let channel = MemoryChannel::new();
        let mut writer = FrameWriter::new(channel.clone());

        writer.send(1, b"one").unwrap();
        writer.send(2, b"two").unwrap();
        writer.write_frame(&Frame::new(3, "three")).unwrap();

        assert_eq!(
            decode_written(&channel),
            vec![
                Frame::new(1, "one"),
                Frame::new(2, "two"),
                Frame::new(3, "three")
            ]
        );
    }

    #[test]
    fn ping_bytes_on_the_wire() {
        let channel = MemoryChannel::new();
        let mut writer = FrameWriter::new(channel.clone());

        writer.send(0x00, &42u32.to_le_bytes()).unwrap();

        assert_eq!(
            channel.written(),
            vec![0xC0, 0x00, 0x00, 0x2A, 0x00, 0x00, 0x00, 0xC0]
        );
    }

    #[test]
    fn mtu_counts_the_header() {
        let cfg = FrameConfig {
            mtu: 6,
            ..FrameConfig::default()
        };
        let channel = MemoryChannel::new();
        let mut writer = FrameWriter::with_config(channel.clone(), cfg);

        writer.send(1, b"four").unwrap();
        let err = writer.send(1, b"fives").unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 7, max: 6 }));
        assert_eq!(decode_written(&channel).len(), 1);
    }

    #[test]
    fn closed_channel_propagates() {
        let channel = MemoryChannel::new();
        channel.close();
        let mut writer = FrameWriter::new(channel);
        let err = writer.send(1, b"x").unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transport(TransportError::Closed)
        ));
    }

    #[test]
    fn written_bytes_read_back() {
        let channel = MemoryChannel::new();
        let mut writer = FrameWriter::new(channel.clone());
        writer.send(3, b"\xc0z\xdb").unwrap();

        let echo = MemoryChannel::new();
        echo.push_bytes(channel.take_written());
        let mut reader = FrameReader::new(echo);
        let frame = reader.read_command().unwrap();
        assert_eq!(frame.command, 3);
        assert_eq!(frame.payload.as_ref(), b"\xc0z\xdb");
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(MemoryChannel::new());

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        writer.set_mtu(32);
        assert_eq!(writer.config().mtu, 32);
        let _inner = writer.into_inner();
    }
}
