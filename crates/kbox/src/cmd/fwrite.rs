use std::path::Path;

use crate::cmd::{Connection, FwriteArgs};
use crate::exit::{client_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_transfer, OutputFormat};

pub fn run(args: FwriteArgs, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    let remote = remote_name(&args.local, args.remote.as_deref())?;
    let data = std::fs::read(&args.local)
        .map_err(|err| io_error(&format!("cannot read {}", args.local.display()), err))?;

    let mut kbox = connection.connect(format)?;
    let stats = kbox
        .write_file(&remote, &data)
        .map_err(|err| client_error(&format!("write of {remote} failed"), err))?;

    print_transfer("write", &remote, &stats, format);
    Ok(SUCCESS)
}

fn remote_name(local: &Path, remote: Option<&str>) -> CliResult<String> {
    if let Some(remote) = remote {
        return Ok(remote.to_string());
    }
    local
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            CliError::new(
                USAGE,
                format!("cannot derive a remote name from {}", local.display()),
            )
        })
}
