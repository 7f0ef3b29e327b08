//! `tokio-util` codec for callers that drive the port asynchronously.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, Frame, SlipDecoder, DEFAULT_MAX_FRAME, DEFAULT_MTU, HEADER_SIZE};
use crate::error::FrameError;

/// SLIP kommand codec for [`tokio_util::codec::Framed`].
///
/// Empty frames (two delimiters back to back) are skipped.
#[derive(Debug)]
pub struct KommandCodec {
    decoder: SlipDecoder,
    mtu: usize,
}

impl KommandCodec {
    pub fn new(mtu: usize, max_frame_size: usize) -> Self {
        Self {
            decoder: SlipDecoder::new(max_frame_size),
            mtu,
        }
    }
}

impl Default for KommandCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MTU, DEFAULT_MAX_FRAME)
    }
}

impl Decoder for KommandCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        loop {
            match self.decoder.decode(src)? {
                Some(raw) if raw.is_empty() => continue,
                Some(raw) => return Frame::decode(raw).map(Some),
                None => return Ok(None),
            }
        }
    }
}

impl Encoder<Frame> for KommandCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        let size = HEADER_SIZE + frame.payload.len();
        if size > self.mtu {
            return Err(FrameError::PayloadTooLarge {
                size,
                max: self.mtu,
            });
        }
        encode_frame(frame.command, &frame.payload, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;

    #[tokio::test]
    async fn stream_of_frames_with_noise() {
        let mut wire = b"boot\xc0\xc0".to_vec();
        let mut buf = BytesMut::new();
        encode_frame(0x10, b"log line", &mut buf);
        encode_frame(0x01, &7u32.to_le_bytes(), &mut buf);
        wire.extend_from_slice(&buf);

        let mut framed = FramedRead::new(wire.as_slice(), KommandCodec::default());
        let first = framed.next().await.unwrap().unwrap();
        assert_eq!(first, Frame::new(0x10, "log line"));
        let second = framed.next().await.unwrap().unwrap();
        assert_eq!(second.command, 0x01);
        assert!(framed.next().await.is_none());
    }

    #[tokio::test]
    async fn sink_encodes_and_enforces_mtu() {
        let mut out = Vec::new();
        {
            let mut framed = FramedWrite::new(&mut out, KommandCodec::new(4, DEFAULT_MAX_FRAME));
            framed.send(Frame::new(0, "ab")).await.unwrap();
            let err = framed.send(Frame::new(0, "abc")).await.unwrap_err();
            assert!(matches!(err, FrameError::PayloadTooLarge { size: 5, max: 4 }));
        }
        assert_eq!(out, b"\xc0\x00\x00ab\xc0");
    }
}
