use std::time::Duration;

use kbox_frame::FrameConfig;

/// Default time to wait for the reply to a kommand.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(1);

/// Settings for the file transfer engine.
#[derive(Debug, Clone)]
pub struct FileTransferConfig {
    /// Largest block requested per `FILE_READ`. Default: 32 MiB, so the
    /// device decides how much it sends.
    pub read_block_size: u32,
    /// Bytes per `FILE_WRITE` chunk. Default: 2000.
    pub write_chunk_size: usize,
    /// Total attempts per write chunk, first send included. Default: 3.
    pub write_retries: u32,
    /// How long to wait for each write acknowledgement. Default: 100ms.
    pub write_ack_timeout: Duration,
    /// How long to wait for each read reply. Default: 1s.
    pub read_timeout: Duration,
}

impl Default for FileTransferConfig {
    fn default() -> Self {
        Self {
            read_block_size: 32 * 1024 * 1024,
            write_chunk_size: 2000,
            write_retries: 3,
            write_ack_timeout: Duration::from_millis(100),
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// Size of the device screen in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenGeometry {
    pub width: u16,
    pub height: u16,
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
        }
    }
}

/// Configuration for a [`crate::Kbox`] session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Reply timeout for ping and screenshot exchanges.
    pub exchange_timeout: Duration,
    /// Frame codec settings.
    pub frame: FrameConfig,
    /// File transfer settings.
    pub files: FileTransferConfig,
    /// Screen size used to reassemble screenshots.
    pub screen: ScreenGeometry,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
            frame: FrameConfig::default(),
            files: FileTransferConfig::default(),
            screen: ScreenGeometry::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    pub fn with_frame(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_files(mut self, files: FileTransferConfig) -> Self {
        self.files = files;
        self
    }

    pub fn with_screen(mut self, screen: ScreenGeometry) -> Self {
        self.screen = screen;
        self
    }
}
