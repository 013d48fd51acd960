//! Control messages written to stdout.
//!
//! - the protocol catalog: every PHY with its channels, for front-ends that
//!   build a selection menu
//! - the `$ready` notification: sent once the pipe exists, tells the parent
//!   where to point the consumer
//!
//! # Example
//!
//! ```
//! use sniffer_relay::control::build_ready_message;
//! use sniffer_relay::protocol::ProtocolRegistry;
//!
//! let zigbee = ProtocolRegistry::global().resolve("zigbee").unwrap();
//! let json = build_ready_message("/tmp/fcatsniffer", zigbee, 11, 147).unwrap();
//! assert!(json.contains("$ready"));
//! ```

use serde_json::{json, Value};

use crate::error::Result;
use crate::protocol::{ProtocolDescriptor, ProtocolRegistry};

/// Version reported in control messages.
pub const RELAY_VERSION: &str = env!("CARGO_PKG_VERSION");

fn descriptor_entry(index: usize, descriptor: &ProtocolDescriptor) -> Value {
    json!({
        "index": index,
        "name": descriptor.name(),
        "aliases": descriptor.aliases(),
        "phy": descriptor.phy_index(),
        "label": descriptor.label(),
        "linkType": descriptor.link_type(),
        "profile": descriptor.profile(),
        "channels": descriptor.channels()
    })
}

/// Build the catalog of all protocols in registry order.
pub fn build_catalog(registry: &ProtocolRegistry) -> Result<String> {
    let protocols: Vec<Value> = registry
        .iter()
        .enumerate()
        .map(|(index, descriptor)| descriptor_entry(index, descriptor))
        .collect();

    let msg = json!({
        "protocols": protocols,
        "version": RELAY_VERSION
    });

    Ok(serde_json::to_string(&msg)?)
}

/// Build the `$ready` JSON-RPC notification.
///
/// # Arguments
///
/// * `pipe_path` - OS path the consumer should open
/// * `descriptor` - PHY being captured
/// * `channel` - selected channel, must be in the descriptor's plan
/// * `link_type` - link type announced in the pcap global header
pub fn build_ready_message(
    pipe_path: &str,
    descriptor: &ProtocolDescriptor,
    channel: u8,
    link_type: u32,
) -> Result<String> {
    let frequency = descriptor.frequency_of(channel)?;

    let msg = json!({
        "jsonrpc": "2.0",
        "method": "$ready",
        "params": {
            "pipe": pipe_path,
            "protocol": descriptor.name(),
            "profile": descriptor.profile(),
            "channel": channel,
            "frequency": frequency,
            "linkType": link_type,
            "version": RELAY_VERSION
        }
    });

    Ok(serde_json::to_string(&msg)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnifferError;

    fn parse(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_catalog_lists_builtin_protocols_in_order() {
        let parsed = parse(&build_catalog(ProtocolRegistry::global()).unwrap());
        let protocols = parsed["protocols"].as_array().unwrap();

        assert_eq!(protocols.len(), 4);
        assert_eq!(protocols[0]["name"], "Bluetooth LE");
        assert_eq!(protocols[3]["name"], "LoRa");
        assert_eq!(protocols[3]["index"], 3);
        assert_eq!(parsed["version"], RELAY_VERSION);
    }

    #[test]
    fn test_catalog_entry_fields() {
        let parsed = parse(&build_catalog(ProtocolRegistry::global()).unwrap());
        let ble = &parsed["protocols"][0];

        assert_eq!(ble["phy"], 0x13);
        assert_eq!(ble["linkType"], 147);
        assert_eq!(ble["profile"], "default");
        assert_eq!(ble["aliases"][1], "bluetooth");
        assert_eq!(ble["channels"][1]["channel"], 38);
        assert_eq!(ble["channels"][1]["frequency"], 2426.0);
    }

    #[test]
    fn test_catalog_of_empty_registry() {
        let parsed = parse(&build_catalog(&ProtocolRegistry::new(Vec::new())).unwrap());
        assert!(parsed["protocols"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_ready_message_format() {
        let thread = ProtocolRegistry::global().resolve("thread").unwrap();
        let parsed = parse(&build_ready_message("/tmp/fcatsniffer", thread, 15, 147).unwrap());

        assert_eq!(parsed["jsonrpc"], "2.0");
        assert_eq!(parsed["method"], "$ready");
        assert_eq!(parsed["params"]["pipe"], "/tmp/fcatsniffer");
        assert_eq!(parsed["params"]["protocol"], "Thread");
        assert_eq!(parsed["params"]["profile"], "thread");
        assert_eq!(parsed["params"]["channel"], 15);
        assert_eq!(parsed["params"]["frequency"], 2425.0);
        assert_eq!(parsed["params"]["linkType"], 147);
    }

    #[test]
    fn test_ready_message_rejects_unknown_channel() {
        let ble = ProtocolRegistry::global().resolve("ble").unwrap();
        let err = build_ready_message("/tmp/x", ble, 1, 147).unwrap_err();
        assert!(matches!(err, SnifferError::UnknownChannel { channel: 1, .. }));
    }
}
