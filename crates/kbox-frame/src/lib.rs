//! SLIP framing for the KBox serial protocol.
//!
//! Every message on the wire is a kommand: a little-endian `u16` identifier
//! followed by a payload, escaped and wrapped in `0xC0` delimiters. This crate
//! turns a [`kbox_transport::ByteChannel`] into a stream of [`Frame`]s and
//! back, and resynchronizes on the next delimiter after line noise.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod dump;
pub mod error;
pub mod kommand;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::KommandCodec;
pub use codec::{
    encode_frame, escape_into, Frame, FrameConfig, SlipDecoder, DEFAULT_MAX_FRAME, DEFAULT_MTU,
    DISCARD_PREVIEW, END, ESC, ESC_END, ESC_ESC, HEADER_SIZE,
};
pub use dump::HexDump;
pub use error::{FrameError, Result};
pub use kommand::{is_unsolicited, kommand_name};
pub use reader::FrameReader;
pub use writer::FrameWriter;
