use std::time::{Duration, Instant};

use bytes::Bytes;
use kbox_frame::kommand::{
    LOG, PING, PONG, REBOOT, SCREENSHOT, SCREENSHOT_REPLY, WIFI_CONFIG, WIFI_STATUS,
};
use kbox_transport::ByteChannel;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::file::{FileTransfer, TransferStats};
use crate::log::LogRecord;
use crate::screenshot::{ScreenChunk, Screenshot};
use crate::sink::FrameSink;
use crate::transport::CommandTransport;
use crate::wifi::{WifiConfig, WifiStatus};

/// Payload the device requires before it will reboot.
pub const REBOOT_MAGIC: &[u8] = b"H0LDFA57\0";

/// Answer to a ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingReply {
    pub nonce: u32,
    pub rtt: Duration,
}

/// A KBox reached over a byte channel.
///
/// Wraps a [`CommandTransport`] and exposes the device's command set.
pub struct Kbox<C> {
    transport: CommandTransport<C>,
    config: ClientConfig,
}

impl<C: ByteChannel> Kbox<C> {
    /// Create a client with default settings.
    pub fn new(channel: C) -> Result<Self> {
        Self::with_config(channel, ClientConfig::default())
    }

    pub fn with_config(channel: C, config: ClientConfig) -> Result<Self> {
        let transport = CommandTransport::with_config(channel, config.frame.clone())?;
        Ok(Self { transport, config })
    }

    /// Replace the sink that receives pushed frames.
    pub fn set_sink(&mut self, sink: impl FrameSink + 'static) {
        self.transport.set_sink(sink);
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport_mut(&mut self) -> &mut CommandTransport<C> {
        &mut self.transport
    }

    /// Skip whatever the device was sending until the first whole frame.
    pub fn synchronize(&mut self, timeout: Duration) -> Result<()> {
        self.transport.synchronize(timeout)
    }

    /// Ping the device. The reply must echo `nonce`.
    pub fn ping(&mut self, nonce: u32) -> Result<PingReply> {
        let started = Instant::now();
        let reply = self.transport.exchange(
            PING,
            &nonce.to_le_bytes(),
            PONG,
            self.config.exchange_timeout,
        )?;
        let rtt = started.elapsed();

        let echoed: [u8; 4] = reply.as_ref().try_into().map_err(|_| {
            ClientError::protocol(
                format!("pong with wrong size ({} bytes instead of 4)", reply.len()),
                reply.clone(),
            )
        })?;
        let echoed = u32::from_le_bytes(echoed);
        if echoed != nonce {
            return Err(ClientError::protocol(
                format!("pong for nonce {echoed}, expected {nonce}"),
                reply,
            ));
        }

        debug!(nonce, rtt_us = rtt.as_micros() as u64, "pong");
        Ok(PingReply { nonce, rtt })
    }

    /// Ask the device to reboot. Nothing is awaited.
    pub fn reboot(&mut self) -> Result<()> {
        info!("rebooting device");
        self.transport.send(REBOOT, REBOOT_MAGIC)
    }

    /// Capture the rows starting at `line`. The device picks how many.
    pub fn capture_from(&mut self, line: u16) -> Result<ScreenChunk> {
        let reply = self.transport.exchange(
            SCREENSHOT,
            &line.to_le_bytes(),
            SCREENSHOT_REPLY,
            self.config.exchange_timeout,
        )?;
        ScreenChunk::decode(&reply, line, self.config.screen.width)
    }

    /// Capture the whole screen.
    pub fn screenshot(&mut self) -> Result<Screenshot> {
        let started = Instant::now();
        let geometry = self.config.screen;
        let mut shot = Screenshot::with_capacity(geometry.width, geometry.height);
        let mut requests = 0u32;

        while !shot.is_complete() {
            let chunk = self.capture_from(shot.rows())?;
            requests += 1;
            shot.push_chunk(chunk);
        }

        info!(
            rows = shot.rows(),
            requests,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "captured screenshot"
        );
        Ok(shot)
    }

    /// Send a WiFi configuration. Nothing is awaited.
    pub fn configure_wifi(&mut self, config: &WifiConfig) -> Result<()> {
        let payload = config.encode()?;
        self.transport.send(WIFI_CONFIG, &payload)
    }

    /// Wait for the device to push a WiFi status.
    pub fn wait_wifi_status(&mut self, timeout: Duration) -> Result<WifiStatus> {
        let payload = self.transport.await_reply(WIFI_STATUS, timeout)?;
        WifiStatus::decode(&payload)
    }

    /// Wait for the device to push a log record.
    pub fn wait_log(&mut self, timeout: Duration) -> Result<LogRecord> {
        let payload = self.transport.await_reply(LOG, timeout)?;
        LogRecord::decode(&payload)
    }

    /// Wait for a log record accepted by `matches`.
    ///
    /// Records that do not match go to the sink. Fails with
    /// [`ClientError::Timeout`] if none matched before `timeout`.
    pub fn wait_log_matching<F>(&mut self, mut matches: F, timeout: Duration) -> Result<LogRecord>
    where
        F: FnMut(&LogRecord) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let payload = self.transport.await_reply_until(LOG, deadline, timeout)?;
            let record = LogRecord::decode(&payload)?;
            if matches(&record) {
                return Ok(record);
            }
            self.transport.sink_mut().on_log(&record);
        }
    }

    /// File operations using the configured transfer settings.
    pub fn files(&mut self) -> FileTransfer<'_, C> {
        FileTransfer::new(&mut self.transport, &self.config.files)
    }

    pub fn read_block(&mut self, name: &str, offset: u32, max: u32) -> Result<Bytes> {
        self.files().read_block(name, offset, max)
    }

    pub fn read_file(&mut self, name: &str) -> Result<(Vec<u8>, TransferStats)> {
        self.files().read_file(name)
    }

    pub fn write_block(&mut self, name: &str, offset: u32, chunk: &[u8]) -> Result<()> {
        self.files().write_block(name, offset, chunk)
    }

    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<TransferStats> {
        self.files().write_file(name, data)
    }
}

impl<C: ByteChannel> std::fmt::Debug for Kbox<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kbox")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .finish()
    }
}
