//! Host-side tooling for the KBox marine instrument.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte channels (serial port, in-memory)
//! - [`frame`]: SLIP framing of kommands
//! - [`client`]: command transport, file transfer and the device command set

/// Re-export transport types.
pub mod transport {
    pub use kbox_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use kbox_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use kbox_client::*;
}

pub use kbox_client::{open, ClientConfig, ClientError, Kbox};
