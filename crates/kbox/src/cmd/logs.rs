use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kbox_client::ClientError;
use tracing::warn;

use crate::cmd::{install_ctrlc_handler, Connection};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_log, OutputFormat};

pub fn run(connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    let mut kbox = connection.connect(format)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        match kbox.wait_log(connection.timeout) {
            Ok(record) => print_log(&record, format),
            Err(ClientError::Timeout(_)) => continue,
            Err(err @ ClientError::Protocol { .. }) => {
                warn!(error = %err, "skipping malformed frame");
            }
            Err(err) => return Err(client_error("log stream failed", err)),
        }
    }

    Ok(SUCCESS)
}
