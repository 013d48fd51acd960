//! Relay builder and runtime handle.
//!
//! The [`RelayBuilder`] provides a fluent API for selecting the PHY,
//! channel and pipe. The [`Relay`] ties the pieces together:
//! 1. Resolve protocol and channel against the registry
//! 2. Precompute the startup commands for the device link
//! 3. Create the pipe and wait for a consumer in the background
//! 4. Forward captured frames to the consumer
//!
//! # Example
//!
//! ```ignore
//! use sniffer_relay::Relay;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut relay = Relay::builder()
//!         .protocol("zigbee")
//!         .channel(15)
//!         .pipe_name("fcatsniffer")
//!         .build()?;
//!
//!     for frame in relay.startup_frames()? {
//!         serial.write_all(&frame).await?;
//!     }
//!
//!     relay.start()?;
//!     let sender = relay.sender();
//!     // sender.submit(frame) from the serial reader
//!     relay.stop().await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use bytes::Bytes;
use tracing::info;

use crate::command::Command;
use crate::config::{CaptureConfig, CapturePlan, ProtocolSelector};
use crate::control::build_ready_message;
use crate::error::{Result, SnifferError};
use crate::pipe::{FrameSender, PipeState, PipeStats, StreamingPipe, DEFAULT_RETRY_INTERVAL};
use crate::protocol::{FixedFrequency, ProtocolDescriptor, ProtocolRegistry};
use crate::transport::DEFAULT_PIPE_NAME;

/// Builder for configuring and creating a relay.
pub struct RelayBuilder {
    protocol: Option<ProtocolSelector>,
    channel: Option<u8>,
    pipe_name: String,
    link_type: Option<u32>,
    retry_interval: Duration,
    registry: Option<ProtocolRegistry>,
}

impl RelayBuilder {
    pub fn new() -> Self {
        Self {
            protocol: None,
            channel: None,
            pipe_name: DEFAULT_PIPE_NAME.to_string(),
            link_type: None,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            registry: None,
        }
    }

    /// Select the protocol by display name or alias.
    pub fn protocol(mut self, name: &str) -> Self {
        self.protocol = Some(ProtocolSelector::from(name));
        self
    }

    /// Select the protocol by registry index.
    pub fn protocol_index(mut self, index: usize) -> Self {
        self.protocol = Some(ProtocolSelector::Index(index));
        self
    }

    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Set the pipe name.
    ///
    /// Default: `fcatsniffer`
    pub fn pipe_name(mut self, name: &str) -> Self {
        self.pipe_name = name.to_string();
        self
    }

    /// Override the link type announced to the consumer.
    pub fn link_type(mut self, link_type: u32) -> Self {
        self.link_type = Some(link_type);
        self
    }

    /// Set the delay after a failed attach.
    ///
    /// Default: 500 ms
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Use a custom protocol table instead of the built-in one.
    pub fn registry(mut self, registry: ProtocolRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Configuration equivalent to this builder.
    pub fn to_config(&self) -> Result<CaptureConfig> {
        let protocol = self
            .protocol
            .clone()
            .ok_or_else(|| SnifferError::InvalidConfig("no protocol selected".to_string()))?;
        let channel = self
            .channel
            .ok_or_else(|| SnifferError::InvalidConfig("no channel selected".to_string()))?;

        Ok(CaptureConfig {
            protocol,
            channel,
            pipe_name: self.pipe_name.clone(),
            link_type: self.link_type,
        })
    }

    /// Validate the selection and build the relay.
    ///
    /// Nothing is created on the OS until [`Relay::start`].
    pub fn build(self) -> Result<Relay> {
        let config = self.to_config()?;
        let registry = self.registry.as_ref().unwrap_or(ProtocolRegistry::global());

        let mut plan = config.resolve(registry)?;
        plan.pipe.retry_interval = self.retry_interval;
        Ok(Relay::from_plan(plan))
    }
}

impl Default for RelayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured capture relay.
pub struct Relay {
    descriptor: ProtocolDescriptor,
    channel: u8,
    frequency: FixedFrequency,
    commands: Vec<Command>,
    pipe: StreamingPipe,
}

impl Relay {
    pub fn builder() -> RelayBuilder {
        RelayBuilder::new()
    }

    /// Build a relay from a configuration using the built-in registry.
    pub fn from_config(config: &CaptureConfig) -> Result<Self> {
        Ok(Self::from_plan(config.resolve(ProtocolRegistry::global())?))
    }

    /// Build a relay from an already validated plan.
    pub fn from_plan(plan: CapturePlan<'_>) -> Self {
        Self {
            descriptor: plan.descriptor.clone(),
            channel: plan.channel,
            frequency: plan.frequency,
            commands: plan.commands,
            pipe: StreamingPipe::new(plan.pipe),
        }
    }

    pub fn descriptor(&self) -> &ProtocolDescriptor {
        &self.descriptor
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn frequency(&self) -> FixedFrequency {
        self.frequency
    }

    /// Commands to send to the device before capturing, in order.
    pub fn startup_commands(&self) -> &[Command] {
        &self.commands
    }

    /// Startup commands as device packets.
    pub fn startup_frames(&self) -> Result<Vec<Bytes>> {
        self.commands.iter().map(Command::to_frame).collect()
    }

    /// `$ready` message for the control channel.
    pub fn ready_message(&self) -> Result<String> {
        build_ready_message(
            self.pipe.path(),
            &self.descriptor,
            self.channel,
            self.pipe.config().link_type,
        )
    }

    /// Create the pipe and start waiting for a consumer.
    pub fn start(&mut self) -> Result<()> {
        self.pipe.start()?;
        info!(
            "Relaying {} channel {} ({} MHz) on {}",
            self.descriptor.name(),
            self.channel,
            self.frequency.to_mhz(),
            self.pipe.path()
        );
        Ok(())
    }

    /// Forward a captured frame. Never blocks.
    pub fn submit_frame(&self, frame: impl Into<Bytes>) -> bool {
        self.pipe.submit_frame(frame)
    }

    pub fn sender(&self) -> FrameSender {
        self.pipe.sender()
    }

    pub fn pipe_path(&self) -> &str {
        self.pipe.path()
    }

    pub fn state(&self) -> PipeState {
        self.pipe.state()
    }

    pub fn stats(&self) -> PipeStats {
        self.pipe.stats()
    }

    /// Stop streaming and remove the pipe.
    pub async fn stop(&mut self) -> Result<()> {
        self.pipe.stop().await?;
        info!("Relay on {} stopped", self.pipe.path());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Opcode;
    use crate::transport::resolve_pipe_path;

    #[test]
    fn test_builder_creation() {
        let relay = Relay::builder().protocol("ble").channel(39).build().unwrap();
        assert_eq!(relay.descriptor().name(), "Bluetooth LE");
        assert_eq!(relay.channel(), 39);
        assert_eq!(relay.frequency().integer_mhz, 2480);
        assert_eq!(relay.pipe_path(), resolve_pipe_path("fcatsniffer"));
        assert_eq!(relay.state(), PipeState::Created);
    }

    #[test]
    fn test_builder_requires_protocol_and_channel() {
        assert!(matches!(
            Relay::builder().channel(11).build(),
            Err(SnifferError::InvalidConfig(_))
        ));
        assert!(matches!(
            Relay::builder().protocol("zigbee").build(),
            Err(SnifferError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_builder_method_chaining() {
        let config = Relay::builder()
            .protocol_index(2)
            .channel(20)
            .pipe_name("thread-capture")
            .link_type(230)
            .retry_interval(Duration::from_millis(50))
            .to_config()
            .unwrap();

        assert_eq!(config.protocol, ProtocolSelector::Index(2));
        assert_eq!(config.pipe_name, "thread-capture");
        assert_eq!(config.link_type, Some(230));
    }

    #[test]
    fn test_builder_custom_registry() {
        let custom = ProtocolDescriptor::builder("Custom", 0x20)
            .channel(1, 868.3)
            .alias("c")
            .build()
            .unwrap();
        let relay = Relay::builder()
            .registry(ProtocolRegistry::new(vec![custom]))
            .protocol("c")
            .channel(1)
            .build()
            .unwrap();

        assert_eq!(relay.descriptor().phy_index(), 0x20);
        assert_eq!(relay.startup_commands()[2].payload(), &[0x20]);
    }

    #[test]
    fn test_startup_frames_are_enveloped() {
        let relay = Relay::builder().protocol("zb").channel(11).build().unwrap();
        let frames = relay.startup_frames().unwrap();

        assert_eq!(frames.len(), 5);
        assert_eq!(relay.startup_commands()[0].opcode(), Opcode::Ping);
        for frame in &frames {
            assert_eq!(&frame[..2], &[0x40, 0x53]);
            assert_eq!(&frame[frame.len() - 2..], &[0x40, 0x45]);
        }
        assert_eq!(
            Command::from_frame(&frames[3]).unwrap(),
            relay.startup_commands()[3]
        );
    }

    #[test]
    fn test_ready_message() {
        let relay = Relay::builder()
            .protocol("lora")
            .channel(1)
            .pipe_name("lora-test")
            .build()
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&relay.ready_message().unwrap()).unwrap();

        assert_eq!(parsed["params"]["pipe"], resolve_pipe_path("lora-test"));
        assert_eq!(parsed["params"]["linkType"], 148);
        assert_eq!(parsed["params"]["frequency"], 434.0);
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let name = format!("sniffer-relay-unit-{}", std::process::id());
        let mut relay = Relay::builder()
            .protocol("ble")
            .channel(37)
            .pipe_name(&name)
            .build()
            .unwrap();

        relay.start().unwrap();
        assert_eq!(relay.state(), PipeState::Opening);
        relay.submit_frame(&b"adv"[..]);
        assert_eq!(relay.stats().submitted, 1);

        relay.stop().await.unwrap();
        assert_eq!(relay.state(), PipeState::Closed);

        #[cfg(unix)]
        assert!(!std::path::Path::new(relay.pipe_path()).exists());
    }
}
