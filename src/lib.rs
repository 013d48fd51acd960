//! # sniffer-relay
//!
//! Host-side relay for multi-PHY radio sniffers.
//!
//! This crate turns a protocol/channel selection into the command sequence
//! the sniffer firmware expects, and streams captured frames to a packet
//! analyzer (Wireshark, tshark) as a live pcap stream over a FIFO or named
//! pipe.
//!
//! ## Architecture
//!
//! - **Protocols** ([`protocol`]): registry of PHYs and their channel plans
//! - **Commands** ([`command`]): opcode + payload, framed for the device link
//! - **Capture format** ([`capture`]): pcap global header and records
//! - **Pipe** ([`pipe`], [`transport`]): last-write-wins slot drained by a
//!   background task into a FIFO (Unix) or named pipe (Windows)
//! - **Control** ([`control`]): JSON catalog and `$ready` lines on stdout
//!
//! ## Example
//!
//! ```ignore
//! use sniffer_relay::Relay;
//!
//! #[tokio::main]
//! async fn main() -> sniffer_relay::Result<()> {
//!     let mut relay = Relay::builder().protocol("ble").channel(37).build()?;
//!     relay.start()?;
//!     relay.submit_frame(vec![0xd6, 0xbe, 0x89, 0x8e]);
//!     relay.stop().await
//! }
//! ```

pub mod capture;
pub mod command;
pub mod config;
pub mod control;
pub mod error;
pub mod pipe;
pub mod protocol;
pub mod transport;

mod relay;

pub use command::{Command, CommandEncoder, Opcode};
pub use config::{CaptureConfig, CapturePlan, ProtocolSelector};
pub use error::{Result, SnifferError};
pub use pipe::{FrameSender, PipeConfig, PipeState, PipeStats, StreamingPipe};
pub use protocol::{ProtocolDescriptor, ProtocolRegistry};
pub use relay::{Relay, RelayBuilder};
