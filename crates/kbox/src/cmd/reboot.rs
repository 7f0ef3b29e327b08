use tracing::info;

use crate::cmd::Connection;
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    let mut kbox = connection.connect(format)?;
    kbox.reboot()
        .map_err(|err| client_error("reboot failed", err))?;
    info!("reboot requested");
    Ok(SUCCESS)
}
