mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::duration::parse_duration;
use crate::cmd::{Command, Connection};
use crate::exit::CliResult;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "kbox", version, about = "Talk to a KBox over its serial link")]
struct Cli {
    /// Serial port the KBox is attached to.
    #[arg(long, short = 'p', env = "KBOX_PORT", global = true)]
    port: Option<String>,

    /// Serial baud rate.
    #[arg(long, env = "KBOX_BAUD", default_value_t = kbox_transport::SerialChannel::DEFAULT_BAUD_RATE, global = true)]
    baud: u32,

    /// Time to wait for each reply (e.g. 500ms, 2s).
    #[arg(long, default_value = "1s", global = true)]
    timeout: String,

    /// Time to wait for the first frame after opening the port.
    #[arg(long, default_value = "3s", global = true)]
    sync_timeout: String,

    /// Trace every frame on the wire.
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn connection(&self) -> CliResult<Connection> {
        Ok(Connection {
            port: self.port.clone(),
            baud: self.baud,
            timeout: parse_duration(&self.timeout)?,
            sync_timeout: parse_duration(&self.sync_timeout)?,
        })
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level.effective(cli.debug));

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cli
        .connection()
        .and_then(|connection| cmd::run(cli.command, &connection, format));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fread_with_global_flags() {
        let cli = Cli::try_parse_from([
            "kbox",
            "--port",
            "/dev/ttyUSB0",
            "fread",
            "log.txt",
            "-",
            "--timeout",
            "500ms",
        ])
        .expect("fread args should parse");

        assert_eq!(cli.port.as_deref(), Some("/dev/ttyUSB0"));
        let connection = cli.connection().unwrap();
        assert_eq!(connection.timeout, std::time::Duration::from_millis(500));
        assert!(matches!(cli.command, Command::Fread(ref args) if args.remote == "log.txt"));
    }

    #[test]
    fn baud_defaults_to_device_rate() {
        let cli = Cli::try_parse_from(["kbox", "reboot"]).expect("reboot should parse");
        assert_eq!(cli.baud, 1_000_000);
        assert!(!cli.debug);
        assert!(matches!(cli.command, Command::Reboot));
    }

    #[test]
    fn wifi_password_requires_ssid() {
        let err = Cli::try_parse_from(["kbox", "wificonfig", "Sula", "--ap-password", "secret"])
            .expect_err("password without ssid should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_ping_options() {
        let cli = Cli::try_parse_from(["kbox", "ping", "--count", "3", "--interval", "250ms"])
            .expect("ping args should parse");
        match cli.command {
            Command::Ping(args) => {
                assert_eq!(args.count, Some(3));
                assert_eq!(args.interval, "250ms");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bad_timeout_is_usage_error() {
        let cli = Cli::try_parse_from(["kbox", "--timeout", "soon", "logs"]).unwrap();
        assert_eq!(cli.connection().unwrap_err().code, exit::USAGE);
    }
}
