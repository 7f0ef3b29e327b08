//! Ping a real KBox a few times.
//!
//! Run with:
//!   cargo run --example ping-device -- /dev/ttyUSB0

use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = std::env::args()
        .nth(1)
        .ok_or("usage: ping-device <serial-port>")?;

    let mut kbox = kbox::open(&port)?;
    if let Err(err) = kbox.synchronize(Duration::from_secs(3)) {
        eprintln!("no frame from the device yet ({err}), pinging anyway");
    }

    for nonce in 0..5 {
        match kbox.ping(nonce) {
            Ok(reply) => println!("PONG[{}] in {:?}", reply.nonce, reply.rtt),
            Err(err) if err.is_timeout() => println!("ping {nonce}: timeout"),
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
