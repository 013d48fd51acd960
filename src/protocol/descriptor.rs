//! Static description of one wireless PHY.
//!
//! A [`ProtocolDescriptor`] carries everything needed to configure the
//! sniffer for a PHY: the firmware PHY identity byte, the channel plan and
//! the pcap link type the captured frames are tagged with.
//!
//! # Example
//!
//! ```
//! use sniffer_relay::protocol::{Profile, ProtocolDescriptor};
//!
//! let phy = ProtocolDescriptor::builder("Sub-GHz", 0x14)
//!     .label("433 MHz - Freq Band")
//!     .base_frequency(433.0)
//!     .spacing(0.5)
//!     .channel(0, 433.0)
//!     .channel(1, 433.5)
//!     .link_type(148)
//!     .alias("subghz")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(phy.frequency_of(1).unwrap(), 433.5);
//! assert_eq!(phy.profile(), Profile::Default);
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::frequency::FixedFrequency;
use crate::capture::link_type;
use crate::error::{Result, SnifferError};

/// One entry of a channel plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Channel {
    /// Channel number as the user selects it.
    #[serde(rename = "channel")]
    pub index: u8,
    /// Center frequency in MHz.
    #[serde(rename = "frequency")]
    pub frequency_mhz: f64,
}

/// Higher-layer profile a PHY is captured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Default,
    Zigbee,
    Thread,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Profile::Default => "Default",
            Profile::Zigbee => "Zigbee",
            Profile::Thread => "Thread",
        };
        f.write_str(name)
    }
}

/// Immutable description of a PHY supported by the sniffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolDescriptor {
    phy_index: u8,
    name: String,
    label: String,
    base_frequency: f64,
    spacing: f64,
    channels: Vec<Channel>,
    link_type: u32,
    aliases: Vec<String>,
    profile: Profile,
}

impl ProtocolDescriptor {
    /// Start building a descriptor.
    pub fn builder(name: &str, phy_index: u8) -> DescriptorBuilder {
        DescriptorBuilder::new(name, phy_index)
    }

    /// PHY identity byte sent with `CFG_PHY`.
    #[inline]
    pub fn phy_index(&self) -> u8 {
        self.phy_index
    }

    /// Display name (e.g. "Bluetooth LE").
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Band label (e.g. "2405 MHz - Freq Band").
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Base frequency in MHz.
    #[inline]
    pub fn base_frequency(&self) -> f64 {
        self.base_frequency
    }

    /// Channel spacing in MHz.
    #[inline]
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Channel plan in registration order.
    #[inline]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Channel numbers in registration order.
    pub fn channel_indices(&self) -> Vec<u8> {
        self.channels.iter().map(|c| c.index).collect()
    }

    /// pcap link-type code for frames captured on this PHY.
    #[inline]
    pub fn link_type(&self) -> u32 {
        self.link_type
    }

    /// Alternative names accepted by the registry.
    #[inline]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Aliases joined for help output ("ble, bluetooth, bluetoothle").
    pub fn alias_list(&self) -> String {
        self.aliases.join(", ")
    }

    /// Profile tag.
    #[inline]
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Case-sensitive match against the display name or any alias.
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    /// Check whether a channel is part of the plan.
    pub fn has_channel(&self, channel: u8) -> bool {
        self.channels.iter().any(|c| c.index == channel)
    }

    /// Frequency of a channel in MHz.
    pub fn frequency_of(&self, channel: u8) -> Result<f64> {
        self.channels
            .iter()
            .find(|c| c.index == channel)
            .map(|c| c.frequency_mhz)
            .ok_or_else(|| SnifferError::UnknownChannel {
                protocol: self.name.clone(),
                channel,
            })
    }

    /// Frequency of a channel in the firmware's 16.16 representation.
    pub fn fixed_frequency_of(&self, channel: u8) -> Result<FixedFrequency> {
        FixedFrequency::from_mhz(self.frequency_of(channel)?)
    }
}

impl fmt::Display for ProtocolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PHY Index: 0x{:02X}", self.phy_index)?;
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "PHY Label: {}", self.label)?;
        writeln!(f, "Base Frequency: {}", self.base_frequency)?;
        writeln!(f, "Spacing: {}", self.spacing)?;
        let channels: Vec<String> = self
            .channels
            .iter()
            .map(|c| format!("({}, {})", c.index, c.frequency_mhz))
            .collect();
        writeln!(f, "Channel Range: [{}]", channels.join(", "))?;
        write!(f, "PCAP Header: {}", self.link_type)
    }
}

/// Fluent builder for [`ProtocolDescriptor`].
///
/// `build()` rejects channel plans that repeat a channel index.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    inner: ProtocolDescriptor,
}

impl DescriptorBuilder {
    fn new(name: &str, phy_index: u8) -> Self {
        Self {
            inner: ProtocolDescriptor {
                phy_index,
                name: name.to_string(),
                label: name.to_string(),
                base_frequency: 0.0,
                spacing: 0.0,
                channels: Vec::new(),
                link_type: link_type::USER0,
                aliases: Vec::new(),
                profile: Profile::Default,
            },
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.inner.label = label.to_string();
        self
    }

    pub fn base_frequency(mut self, mhz: f64) -> Self {
        self.inner.base_frequency = mhz;
        self
    }

    pub fn spacing(mut self, mhz: f64) -> Self {
        self.inner.spacing = mhz;
        self
    }

    /// Append one channel to the plan.
    pub fn channel(mut self, index: u8, frequency_mhz: f64) -> Self {
        self.inner.channels.push(Channel {
            index,
            frequency_mhz,
        });
        self
    }

    /// Append a regular plan: `base + spacing * (index - first)` for each index.
    pub fn spaced_channels(mut self, indices: std::ops::RangeInclusive<u8>) -> Self {
        let first = *indices.start();
        for index in indices {
            let frequency_mhz =
                self.inner.base_frequency + self.inner.spacing * f64::from(index - first);
            self.inner.channels.push(Channel {
                index,
                frequency_mhz,
            });
        }
        self
    }

    pub fn link_type(mut self, link_type: u32) -> Self {
        self.inner.link_type = link_type;
        self
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.inner.aliases.push(alias.to_string());
        self
    }

    pub fn profile(mut self, profile: Profile) -> Self {
        self.inner.profile = profile;
        self
    }

    /// Validate and produce the descriptor.
    pub fn build(self) -> Result<ProtocolDescriptor> {
        let mut seen = HashSet::with_capacity(self.inner.channels.len());
        for channel in &self.inner.channels {
            if !seen.insert(channel.index) {
                return Err(SnifferError::DuplicateChannel {
                    protocol: self.inner.name.clone(),
                    channel: channel.index,
                });
            }
        }
        Ok(self.inner)
    }
}
