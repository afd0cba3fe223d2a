//! Authorisation against a scripted terminal
//!
//! Run with `RUST_LOG=debug` to see every packet on the wire.

use tracing_subscriber::EnvFilter;
use zvt::{ControlCode, Packet, Request, ScriptedTransport, Transmission};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Ack, "insert card", "PIN entry", receipt line, completion
    let terminal = ScriptedTransport::new()
        .then_frame([0x80, 0x00, 0x00])
        .then_frame([0x04, 0xFF, 0x01, 0x0A])
        .then_frame([0x04, 0xFF, 0x01, 0x0E])
        .then_frame([0x06, 0xD1, 0x04, b'T', b'E', b'S', b'T'])
        .then_frame([0x06, 0x0F, 0x00]);

    let mut transmission = Transmission::new(terminal);
    transmission.connect().await?;

    // Amount 12.34 EUR as BCD behind tag 04
    let authorisation = Packet::with_payload(
        ControlCode::AUTHORISATION,
        vec![0x04u8, 0x00, 0x00, 0x00, 0x00, 0x12, 0x34],
    );
    let request = Request::from_packet(authorisation)
        .wait_for_completion(true)
        .with_listener(|packet: &Packet| println!("terminal: {}", packet));

    let status = transmission.transmit(request).await?;
    println!("Cycle finished: {:?}", status);

    if let Some(request) = transmission.last_as::<Request>() {
        println!("Approved: {}", request.succeeded());
    }

    println!("History:");
    for entry in transmission.history() {
        println!("  {:?} {} {}", entry.direction, entry.at.format("%H:%M:%S%.3f"), entry.packet);
    }

    transmission.disconnect().await?;
    Ok(())
}
