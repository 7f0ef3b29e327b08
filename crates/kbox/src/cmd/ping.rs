use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::warn;

use crate::cmd::duration::parse_duration;
use crate::cmd::{install_ctrlc_handler, Connection, PingArgs};
use crate::exit::{client_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_ping, OutputFormat};

pub fn run(args: PingArgs, connection: &Connection, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let mut kbox = connection.connect(format)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut nonce: u32 = 0;
    let mut answered = 0u32;
    while running.load(Ordering::SeqCst) {
        if args.count.is_some_and(|count| nonce >= count) {
            break;
        }

        match kbox.ping(nonce) {
            Ok(reply) => {
                answered += 1;
                print_ping(&reply, format);
            }
            Err(err) if err.is_timeout() => warn!(nonce, "no pong before timeout"),
            Err(err) => return Err(client_error("ping failed", err)),
        }
        nonce = nonce.wrapping_add(1);
        thread::sleep(interval);
    }

    if nonce > 0 && answered == 0 {
        return Ok(FAILURE);
    }
    Ok(SUCCESS)
}
