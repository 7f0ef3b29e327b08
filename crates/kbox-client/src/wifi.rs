//! WiFi module status and configuration.

use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

use crate::error::{ClientError, Result};

const STATUS_SIZE: usize = 12;

/// State reported by the WiFi module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WifiState {
    Starting,
    Ready,
    Configured,
    Other(u16),
}

impl From<u16> for WifiState {
    fn from(value: u16) -> Self {
        match value {
            0 => WifiState::Starting,
            1 => WifiState::Ready,
            2 => WifiState::Configured,
            n => WifiState::Other(n),
        }
    }
}

impl fmt::Display for WifiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WifiState::Starting => f.write_str("starting"),
            WifiState::Ready => f.write_str("ready"),
            WifiState::Configured => f.write_str("configured"),
            WifiState::Other(n) => write!(f, "state {n}"),
        }
    }
}

/// A decoded `WIFI_STATUS` kommand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WifiStatus {
    pub state: WifiState,
    pub dhcp_clients: u16,
    pub tcp_clients: u16,
    pub signalk_clients: u16,
    pub ip: Ipv4Addr,
}

impl WifiStatus {
    /// Decode a `WIFI_STATUS` payload: four LE `u16` fields followed by the
    /// IPv4 address in network byte order.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < STATUS_SIZE {
            return Err(ClientError::protocol(
                format!(
                    "wifi status too short ({} bytes, need {STATUS_SIZE})",
                    payload.len()
                ),
                payload.to_vec(),
            ));
        }
        let field = |i: usize| u16::from_le_bytes([payload[i], payload[i + 1]]);
        Ok(Self {
            state: WifiState::from(field(0)),
            dhcp_clients: field(2),
            tcp_clients: field(4),
            signalk_clients: field(6),
            ip: Ipv4Addr::new(payload[8], payload[9], payload[10], payload[11]),
        })
    }
}

impl fmt::Display for WifiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state: {} ip: {} clients dhcp: {}, tcp: {}, signalk: {}",
            self.state, self.ip, self.dhcp_clients, self.tcp_clients, self.signalk_clients
        )
    }
}

/// SSID and password for one WiFi mode.
#[derive(Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

impl WifiCredentials {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field(
                "password",
                &format_args!("<redacted:{} bytes>", self.password.len()),
            )
            .finish()
    }
}

/// Settings sent with `WIFI_CONFIG`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WifiConfig {
    /// Access point to create, if any.
    pub access_point: Option<WifiCredentials>,
    /// Network to join, if any.
    pub client: Option<WifiCredentials>,
    /// Vessel identifier (SignalK URN).
    pub vessel: String,
}

impl WifiConfig {
    /// Encode the `WIFI_CONFIG` payload.
    ///
    /// Each mode is a presence flag followed by `ssid\0password\0`, or by
    /// `\0\0` when the mode is off. The vessel identifier comes last.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for mode in [&self.access_point, &self.client] {
            match mode {
                Some(credentials) => {
                    out.push(1);
                    push_cstr(&mut out, "ssid", &credentials.ssid)?;
                    push_cstr(&mut out, "password", &credentials.password)?;
                }
                None => out.extend_from_slice(&[0, 0, 0]),
            }
        }
        push_cstr(&mut out, "vessel", &self.vessel)?;
        Ok(out)
    }
}

/// Append `value` with a NUL terminator, rejecting embedded NULs.
pub(crate) fn push_cstr(out: &mut Vec<u8>, what: &str, value: &str) -> Result<()> {
    if value.as_bytes().contains(&0) {
        return Err(ClientError::InvalidRequest(format!(
            "{what} must not contain a NUL byte"
        )));
    }
    out.extend_from_slice(value.as_bytes());
    out.push(0);
    Ok(())
}
