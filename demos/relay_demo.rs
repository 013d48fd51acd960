//! Relay demo: streams synthetic frames to a pipe until Ctrl-C.
//!
//! ```text
//! cargo run --example relay_demo -- --list
//! cargo run --example relay_demo -- zigbee 15 [pipe-name]
//! wireshark -k -i /tmp/fcatsniffer
//! ```
//!
//! Logs go to stderr (`RUST_LOG=debug` for more), control lines to stdout.

use std::time::Duration;

use serde_json::json;
use sniffer_relay::control::{build_catalog, write_stdout_json, write_stdout_line};
use sniffer_relay::{ProtocolRegistry, Relay};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("--list") {
        write_stdout_line(&build_catalog(ProtocolRegistry::global())?)?;
        return Ok(());
    }

    let protocol = args.first().map(String::as_str).unwrap_or("ble");
    let channel: u8 = match args.get(1) {
        Some(channel) => channel.parse()?,
        None => 37,
    };
    let pipe_name = args.get(2).map(String::as_str).unwrap_or("fcatsniffer");

    let mut relay = Relay::builder()
        .protocol(protocol)
        .channel(channel)
        .pipe_name(pipe_name)
        .build()?;

    for command in relay.startup_commands() {
        info!("Startup command {} -> {:02X?}", command, command.to_frame()?.as_ref());
    }

    relay.start()?;
    write_stdout_line(&relay.ready_message()?)?;

    let sender = relay.sender();
    let producer = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        let mut sequence: u32 = 0;
        loop {
            ticker.tick().await;
            sequence = sequence.wrapping_add(1);
            sender.submit(sequence.to_le_bytes().to_vec());
        }
    });

    tokio::signal::ctrl_c().await?;
    producer.abort();

    relay.stop().await?;
    let stats = relay.stats();
    info!(
        "Stopped: {} submitted, {} written, {} overwritten, {} failed, {} rejected, {} sessions",
        stats.submitted, stats.written, stats.overwritten, stats.failed, stats.rejected, stats.sessions
    );
    write_stdout_json(&json!({ "state": relay.state(), "stats": stats }))?;
    Ok(())
}
