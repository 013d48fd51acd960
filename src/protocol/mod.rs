//! Protocol module - PHY descriptors, channel plans and the registry.
//!
//! This module describes the radios the sniffer can capture:
//! - [`ProtocolDescriptor`]: identity byte, channel plan, pcap link type
//! - [`ProtocolRegistry`]: the ordered table of supported PHYs
//! - [`FixedFrequency`]: the firmware's 16.16 frequency representation

mod descriptor;
mod frequency;
mod registry;

pub use descriptor::{Channel, DescriptorBuilder, Profile, ProtocolDescriptor};
pub use frequency::{FixedFrequency, FRACTION_UNITS_PER_MHZ, FREQUENCY_FIELD_SIZE};
pub use registry::{
    lora_bandwidth_khz, ProtocolRegistry, LORA_BANDWIDTHS_KHZ, PHY_BLE, PHY_IEEE_802_15_4,
    PHY_LORA,
};
