use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kbox_client::{ClientError, WifiConfig, WifiCredentials};
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, Connection, WificonfigArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_wifi_status, OutputFormat};

pub fn run(args: WificonfigArgs, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    let config = build_config(&args);
    let mut kbox = connection.connect(format)?;

    kbox.configure_wifi(&config)
        .map_err(|err| client_error("wifi configuration failed", err))?;
    info!(vessel = %config.vessel, "wifi configuration sent");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut seen = 0u32;
    while running.load(Ordering::SeqCst) {
        if args.count.is_some_and(|count| seen >= count) {
            break;
        }
        match kbox.wait_wifi_status(connection.timeout) {
            Ok(status) => {
                seen += 1;
                print_wifi_status(&status, format);
            }
            Err(ClientError::Timeout(_)) => continue,
            Err(err @ ClientError::Protocol { .. }) => {
                warn!(error = %err, "skipping malformed frame");
            }
            Err(err) => return Err(client_error("wifi status failed", err)),
        }
    }

    Ok(SUCCESS)
}

fn build_config(args: &WificonfigArgs) -> WifiConfig {
    let pair = |ssid: &Option<String>, password: &Option<String>| match (ssid, password) {
        (Some(ssid), Some(password)) => Some(WifiCredentials::new(ssid, password)),
        _ => None,
    };
    WifiConfig {
        access_point: pair(&args.ap_ssid, &args.ap_password),
        client: pair(&args.client_ssid, &args.client_password),
        vessel: args.vessel.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_complete_pairs_are_sent() {
        let args = WificonfigArgs {
            vessel: "Sula".to_string(),
            ap_ssid: Some("kbox".to_string()),
            ap_password: Some("secret".to_string()),
            client_ssid: None,
            client_password: None,
            count: None,
        };
        let config = build_config(&args);
        assert_eq!(
            config.access_point,
            Some(WifiCredentials::new("kbox", "secret"))
        );
        assert_eq!(config.client, None);
        assert_eq!(config.vessel, "Sula");
    }
}
