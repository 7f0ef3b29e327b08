use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use kbox_client::{LogRecord, PingReply, TransferStats, WifiStatus};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct LogOutput<'a> {
    #[serde(flatten)]
    record: &'a LogRecord,
    prefix: &'a str,
    timestamp: String,
}

#[derive(Serialize)]
struct WifiOutput<'a> {
    #[serde(flatten)]
    status: &'a WifiStatus,
    timestamp: String,
}

#[derive(Serialize)]
struct PingOutput {
    nonce: u32,
    rtt_ms: f64,
}

#[derive(Serialize)]
struct TransferOutput<'a> {
    operation: &'a str,
    file: &'a str,
    bytes: u64,
    blocks: u32,
    elapsed_ms: u128,
    bytes_per_sec: Option<f64>,
}

pub fn print_log(record: &LogRecord, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&LogOutput {
            record,
            prefix: record.level.prefix(),
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => print_table(
            &["LEVEL", "SOURCE", "MESSAGE"],
            vec![
                record.level.prefix().to_string(),
                format!("{}:{}", record.display_name(), record.line),
                record.message.clone(),
            ],
        ),
        OutputFormat::Pretty | OutputFormat::Raw => println!("> {record}"),
    }
}

pub fn print_wifi_status(status: &WifiStatus, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&WifiOutput {
            status,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => print_table(
            &["STATE", "IP", "DHCP", "TCP", "SIGNALK"],
            vec![
                status.state.to_string(),
                status.ip.to_string(),
                status.dhcp_clients.to_string(),
                status.tcp_clients.to_string(),
                status.signalk_clients.to_string(),
            ],
        ),
        OutputFormat::Pretty | OutputFormat::Raw => println!("WIFI-STATUS: {status}"),
    }
}

pub fn print_ping(reply: &PingReply, format: OutputFormat) {
    let rtt_ms = reply.rtt.as_secs_f64() * 1000.0;
    match format {
        OutputFormat::Json => print_json(&PingOutput {
            nonce: reply.nonce,
            rtt_ms,
        }),
        OutputFormat::Table => print_table(
            &["PONG", "RTT (ms)"],
            vec![reply.nonce.to_string(), format!("{rtt_ms:.2}")],
        ),
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!("PONG[{}] in {rtt_ms:.2} ms", reply.nonce)
        }
    }
}

/// Transfer summaries go to stderr when stdout carries file data.
pub fn print_transfer(operation: &str, file: &str, stats: &TransferStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&TransferOutput {
            operation,
            file,
            bytes: stats.bytes,
            blocks: stats.blocks,
            elapsed_ms: stats.elapsed.as_millis(),
            bytes_per_sec: stats.bytes_per_sec(),
        }),
        OutputFormat::Table => print_table(
            &["OPERATION", "FILE", "BYTES", "BLOCKS", "ELAPSED (ms)"],
            vec![
                operation.to_string(),
                file.to_string(),
                stats.bytes.to_string(),
                stats.blocks.to_string(),
                stats.elapsed.as_millis().to_string(),
            ],
        ),
        OutputFormat::Pretty => println!("{operation} {file}: {stats}"),
        OutputFormat::Raw => eprintln!("{operation} {file}: {stats}"),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: &[&str], row: Vec<String>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec())
        .add_row(row);
    println!("{table}");
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
