//! Drive the client against a fake device living in a `MemoryChannel`.
//!
//! The fake answers pings and pushes a log record before every pong, which
//! the default sink forwards to tracing.
//!
//! Run with:
//!   cargo run --example simulated-device

use bytes::BytesMut;
use kbox::client::Kbox;
use kbox::frame::kommand::{LOG, PING, PONG};
use kbox::frame::{encode_frame, Frame, SlipDecoder};
use kbox::transport::MemoryChannel;

fn log_payload(message: &str) -> Vec<u8> {
    let file = "main.cpp";
    let mut p = 1u16.to_le_bytes().to_vec();
    p.extend_from_slice(&7u16.to_le_bytes());
    p.extend_from_slice(&(file.len() as u16).to_le_bytes());
    p.extend_from_slice(file.as_bytes());
    p.extend_from_slice(message.as_bytes());
    p
}

fn answer(frame: Frame, out: &mut BytesMut) {
    if frame.command == PING {
        encode_frame(LOG, &log_payload("got a ping"), out);
        encode_frame(PONG, &frame.payload, out);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let channel = MemoryChannel::new();
    channel.set_responder(|bytes| {
        let mut src = BytesMut::from(bytes);
        let mut decoder = SlipDecoder::default();
        let mut out = BytesMut::new();
        while let Ok(Some(raw)) = decoder.decode(&mut src) {
            if let Ok(frame) = Frame::decode(raw) {
                answer(frame, &mut out);
            }
        }
        out.to_vec()
    });

    let mut kbox = Kbox::new(channel)?;
    for nonce in [7, 8, 9] {
        let reply = kbox.ping(nonce)?;
        println!("PONG[{}] in {:?}", reply.nonce, reply.rtt);
    }
    Ok(())
}
