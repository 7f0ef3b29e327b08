use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame delimiter.
pub const END: u8 = 0xC0;
/// Escape byte.
pub const ESC: u8 = 0xDB;
/// Escaped form of [`END`] (follows [`ESC`]).
pub const ESC_END: u8 = 0xDC;
/// Escaped form of [`ESC`] (follows [`ESC`]).
pub const ESC_ESC: u8 = 0xDD;

/// Kommand header: identifier (2 bytes, LE).
pub const HEADER_SIZE: usize = 2;

/// Default largest kommand frame the host will send: 15000 bytes.
pub const DEFAULT_MTU: usize = 15_000;

/// Default largest frame the decoder will accumulate: 64 KiB.
pub const DEFAULT_MAX_FRAME: usize = 64 * 1024;

/// Most bytes a framing error keeps from the frame it abandoned.
pub const DISCARD_PREVIEW: usize = 32;

/// A kommand frame: identifier plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The kommand identifier.
    pub command: u16,
    /// The kommand payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(command: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }

    /// Split a de-framed buffer into identifier and payload.
    pub fn decode(mut raw: Bytes) -> Result<Self> {
        if raw.len() < HEADER_SIZE {
            return Err(FrameError::TooShort { len: raw.len() });
        }
        let command = raw.get_u16_le();
        Ok(Self {
            command,
            payload: raw,
        })
    }

    /// The unescaped size of this frame (header + payload).
    pub fn raw_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// The unescaped bytes of this frame.
    pub fn to_raw(&self) -> Bytes {
        let mut raw = BytesMut::with_capacity(self.raw_size());
        raw.put_u16_le(self.command);
        raw.put_slice(&self.payload);
        raw.freeze()
    }
}

/// Encode a kommand into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────────────────────────────────┬──────┐
/// │ 0xC0 │ escape( command (2B LE) ++ payload )     │ 0xC0 │
/// └──────┴──────────────────────────────────────────┴──────┘
/// ```
/// Inside the frame `0xC0` is sent as `DB DC` and `0xDB` as `DB DD`.
pub fn encode_frame(command: u16, payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(2 + 2 * (HEADER_SIZE + payload.len()));
    dst.put_u8(END);
    escape_into(&command.to_le_bytes(), dst);
    escape_into(payload, dst);
    dst.put_u8(END);
}

/// Append SLIP-escaped `raw` bytes to `dst`, without delimiters.
pub fn escape_into(raw: &[u8], dst: &mut BytesMut) {
    for &b in raw {
        match b {
            END => dst.put_slice(&[ESC, ESC_END]),
            ESC => dst.put_slice(&[ESC, ESC_ESC]),
            _ => dst.put_u8(b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Idle,
    Accumulating,
    Escape,
}

/// Incremental SLIP decoder.
///
/// Bytes seen before the first delimiter are dropped silently so a host can
/// attach to a stream mid-frame. Once a delimiter has been seen the decoder
/// is synchronized, and a stray byte between frames is an error. Any error
/// puts the decoder back into the unsynchronized state.
#[derive(Debug)]
pub struct SlipDecoder {
    state: DecodeState,
    buf: BytesMut,
    synchronized: bool,
    max_frame_size: usize,
}

impl Default for SlipDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME)
    }
}

impl SlipDecoder {
    /// Create a decoder that rejects frames larger than `max_frame_size`.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            state: DecodeState::Idle,
            buf: BytesMut::new(),
            synchronized: false,
            max_frame_size,
        }
    }

    /// Feed one byte. Returns a complete frame when `byte` closes one.
    pub fn push(&mut self, byte: u8) -> Result<Option<Bytes>> {
        let result = self.step(byte);
        if result.is_err() {
            self.reset();
        }
        result
    }

    /// Consume bytes from `src` until a frame completes or `src` is empty.
    ///
    /// Bytes following a completed frame are left in `src`.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        for i in 0..src.len() {
            match self.push(src[i]) {
                Ok(Some(frame)) => {
                    src.advance(i + 1);
                    return Ok(Some(frame));
                }
                Ok(None) => {}
                Err(err) => {
                    src.advance(i + 1);
                    return Err(err);
                }
            }
        }
        src.clear();
        Ok(None)
    }

    /// Drop any partial frame and wait for the next delimiter.
    pub fn reset(&mut self) {
        self.state = DecodeState::Idle;
        self.buf.clear();
        self.synchronized = false;
    }

    /// Whether a delimiter has been seen since creation or the last reset.
    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    /// Whether a frame is partially accumulated.
    pub fn in_frame(&self) -> bool {
        self.state != DecodeState::Idle
    }

    /// Number of bytes accumulated for the current frame.
    pub fn partial_len(&self) -> usize {
        self.buf.len()
    }

    /// Update the maximum frame size for subsequent bytes.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.max_frame_size = max_frame_size;
    }

    fn step(&mut self, byte: u8) -> Result<Option<Bytes>> {
        match self.state {
            DecodeState::Idle => {
                if byte == END {
                    self.state = DecodeState::Accumulating;
                    self.buf.clear();
                    self.synchronized = true;
                    Ok(None)
                } else if self.synchronized {
                    Err(FrameError::UnexpectedByte {
                        byte,
                        discarded: Bytes::copy_from_slice(&[byte]),
                    })
                } else {
                    Ok(None)
                }
            }
            DecodeState::Accumulating => match byte {
                END => {
                    self.state = DecodeState::Idle;
                    Ok(Some(self.buf.split().freeze()))
                }
                ESC => {
                    self.state = DecodeState::Escape;
                    Ok(None)
                }
                _ => self.append(byte),
            },
            DecodeState::Escape => {
                let decoded = match byte {
                    ESC_END => END,
                    ESC_ESC => ESC,
                    other => {
                        return Err(FrameError::InvalidEscape {
                            byte: other,
                            discarded: self.discarded_tail(&[ESC, other]),
                        })
                    }
                };
                self.state = DecodeState::Accumulating;
                self.append(decoded)
            }
        }
    }

    fn append(&mut self, byte: u8) -> Result<Option<Bytes>> {
        if self.buf.len() >= self.max_frame_size {
            let head = self.buf.len().min(DISCARD_PREVIEW);
            return Err(FrameError::FrameTooLarge {
                size: self.buf.len() + 1,
                max: self.max_frame_size,
                discarded: Bytes::copy_from_slice(&self.buf[..head]),
            });
        }
        self.buf.put_u8(byte);
        Ok(None)
    }

    /// Last bytes of the partial frame followed by `wire`.
    fn discarded_tail(&self, wire: &[u8]) -> Bytes {
        let keep = DISCARD_PREVIEW.saturating_sub(wire.len()).min(self.buf.len());
        let mut out = BytesMut::with_capacity(keep + wire.len());
        out.put_slice(&self.buf[self.buf.len() - keep..]);
        out.put_slice(wire);
        out.freeze()
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest kommand (header + payload) the writer will send. Default: 15000.
    pub mtu: usize,
    /// Largest frame the reader will accumulate. Default: 64 KiB.
    pub max_frame_size: usize,
    /// Read timeout used by [`crate::FrameReader::read_frame`]. Default: 1s.
    pub read_timeout: std::time::Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            max_frame_size: DEFAULT_MAX_FRAME,
            read_timeout: std::time::Duration::from_secs(1),
        }
    }
}
