//! Byte channel abstraction for talking to a KBox.
//!
//! Provides a unified interface over the media a KBox can be reached on:
//! - USB serial ports ([`SerialChannel`])
//! - In-memory scripted channels for tests ([`MemoryChannel`])
//!
//! This is the lowest layer of the stack. Everything else builds on top of
//! the [`ByteChannel`] trait provided here.

pub mod error;
pub mod memory;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::{MemoryChannel, Responder};
pub use serial::{list_ports, SerialChannel};
pub use traits::ByteChannel;
