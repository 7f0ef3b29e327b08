use std::path::{Path, PathBuf};

use crate::cmd::{Connection, FreadArgs};
use crate::exit::{client_error, io_error, CliResult, SUCCESS};
use crate::output::{print_raw, print_transfer, OutputFormat};

pub fn run(args: FreadArgs, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    let dest = destination(&args.remote, args.dest.as_deref());

    let mut kbox = connection.connect(format)?;
    let (data, stats) = kbox
        .read_file(&args.remote)
        .map_err(|err| client_error(&format!("read of {} failed", args.remote), err))?;

    match dest {
        None => {
            print_raw(&data);
            // stdout carries the file, so the summary may only go to stderr.
            print_transfer("read", &args.remote, &stats, OutputFormat::Raw);
        }
        Some(path) => {
            std::fs::write(&path, &data).map_err(|err| {
                io_error(&format!("cannot write {}", path.display()), err)
            })?;
            print_transfer("read", &args.remote, &stats, format);
        }
    }
    Ok(SUCCESS)
}

/// `None` means stdout.
fn destination(remote: &str, dest: Option<&Path>) -> Option<PathBuf> {
    match dest {
        Some(path) if path == Path::new("-") => None,
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(
            Path::new(remote)
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| remote.into()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_means_stdout() {
        assert_eq!(destination("log.txt", Some(Path::new("-"))), None);
    }

    #[test]
    fn defaults_to_remote_basename() {
        assert_eq!(
            destination("logs/2024.txt", None),
            Some(PathBuf::from("2024.txt"))
        );
        assert_eq!(
            destination("a.txt", Some(Path::new("/tmp/b.txt"))),
            Some(PathBuf::from("/tmp/b.txt"))
        );
    }
}
