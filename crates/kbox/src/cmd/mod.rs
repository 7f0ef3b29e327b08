use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kbox_client::{
    open_with_config, ClientConfig, FrameSink, Kbox, LogRecord, TracingSink, WifiStatus,
};
use kbox_frame::Frame;
use kbox_transport::{list_ports, SerialChannel};
use tracing::{info, warn};

use crate::exit::{client_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::{print_log, print_wifi_status, OutputFormat};

pub mod duration;
pub mod fread;
pub mod fwrite;
pub mod logs;
pub mod ping;
pub mod reboot;
pub mod screenshot;
pub mod version;
pub mod wificonfig;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ping the device and print round-trip times.
    Ping(PingArgs),
    /// Stream device logs until interrupted.
    Logs,
    /// Reboot the device.
    Reboot,
    /// Capture the screen to a PNG file.
    Screenshot(ScreenshotArgs),
    /// Read a file from the device.
    Fread(FreadArgs),
    /// Write a file to the device.
    Fwrite(FwriteArgs),
    /// Send a WiFi configuration and follow the status updates.
    Wificonfig(WificonfigArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Serial settings shared by every command that talks to the device.
#[derive(Debug, Clone)]
pub struct Connection {
    pub port: Option<String>,
    pub baud: u32,
    pub timeout: Duration,
    pub sync_timeout: Duration,
}

impl Connection {
    /// Open the port, attach a printing sink and wait for the first frame.
    pub fn connect(&self, format: OutputFormat) -> CliResult<Kbox<SerialChannel>> {
        let port = self.port.as_deref().ok_or_else(missing_port)?;
        let config = ClientConfig::default().with_exchange_timeout(self.timeout);
        let mut kbox = open_with_config(port, self.baud, config)
            .map_err(|err| client_error("open failed", err))?;
        kbox.set_sink(PrintSink { format });
        info!(port, baud = self.baud, "connected");

        match kbox.synchronize(self.sync_timeout) {
            Ok(()) => {}
            Err(err) if err.is_timeout() => {
                warn!(
                    timeout_ms = self.sync_timeout.as_millis() as u64,
                    "device silent during synchronization, proceeding"
                );
            }
            Err(err) => return Err(client_error("synchronize failed", err)),
        }
        Ok(kbox)
    }
}

fn missing_port() -> CliError {
    let mut message = String::from("no serial port given (use --port or KBOX_PORT)");
    if let Ok(ports) = list_ports() {
        if !ports.is_empty() {
            message.push_str(&format!("; available: {}", ports.join(", ")));
        }
    }
    CliError::new(USAGE, message)
}

/// Prints pushed logs and WiFi status, leaves the rest to tracing.
struct PrintSink {
    format: OutputFormat,
}

impl FrameSink for PrintSink {
    fn on_log(&mut self, record: &LogRecord) {
        print_log(record, self.format);
    }

    fn on_wifi_status(&mut self, status: &WifiStatus) {
        print_wifi_status(status, self.format);
    }

    fn on_unexpected(&mut self, frame: &Frame) {
        TracingSink.on_unexpected(frame);
    }
}

/// Clears `running` on Ctrl-C. Loops check it between exchanges.
pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

pub fn run(command: Command, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ping(args) => ping::run(args, connection, format),
        Command::Logs => logs::run(connection, format),
        Command::Reboot => reboot::run(connection, format),
        Command::Screenshot(args) => screenshot::run(args, connection, format),
        Command::Fread(args) => fread::run(args, connection, format),
        Command::Fwrite(args) => fwrite::run(args, connection, format),
        Command::Wificonfig(args) => wificonfig::run(args, connection, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PingArgs {
    /// Stop after N pings. Default: ping until interrupted.
    #[arg(long, short = 'c')]
    pub count: Option<u32>,
    /// Pause between pings (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
}

#[derive(Args, Debug)]
pub struct ScreenshotArgs {
    /// Destination PNG file.
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct FreadArgs {
    /// File name on the device.
    pub remote: String,
    /// Local destination, `-` for stdout. Default: the remote file name.
    pub dest: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct FwriteArgs {
    /// Local file to upload.
    pub local: PathBuf,
    /// File name on the device. Default: the local file name.
    pub remote: Option<String>,
}

#[derive(Args, Debug)]
pub struct WificonfigArgs {
    /// Vessel name announced by the device.
    pub vessel: String,
    /// SSID of the access point the device creates.
    #[arg(long, requires = "ap_password")]
    pub ap_ssid: Option<String>,
    /// Password of the access point the device creates.
    #[arg(long, requires = "ap_ssid")]
    pub ap_password: Option<String>,
    /// SSID of the network the device joins.
    #[arg(long, requires = "client_password")]
    pub client_ssid: Option<String>,
    /// Password of the network the device joins.
    #[arg(long, requires = "client_ssid")]
    pub client_password: Option<String>,
    /// Stop after this many status updates. Default: follow until interrupted.
    #[arg(long)]
    pub count: Option<u32>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
