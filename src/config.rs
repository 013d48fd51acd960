//! Capture configuration.
//!
//! A [`CaptureConfig`] is the serializable form of "what to sniff and where
//! to stream it". [`CaptureConfig::resolve`] checks it against a registry and
//! produces a [`CapturePlan`] with everything precomputed, so no device
//! command is built from an invalid selection.
//!
//! ```json
//! { "protocol": "zigbee", "channel": 15, "pipe_name": "fcatsniffer" }
//! ```
//!
//! `protocol` may also be a registry index (`"protocol": 1`).

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{Result, SnifferError};
use crate::pipe::PipeConfig;
use crate::protocol::{FixedFrequency, ProtocolDescriptor, ProtocolRegistry};
use crate::transport::DEFAULT_PIPE_NAME;

/// How a protocol is selected: by display name/alias or by registry index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProtocolSelector {
    Index(usize),
    Name(String),
}

impl ProtocolSelector {
    /// Look the selector up in a registry.
    pub fn resolve<'r>(&self, registry: &'r ProtocolRegistry) -> Result<&'r ProtocolDescriptor> {
        match self {
            ProtocolSelector::Index(index) => registry.resolve_by_index(*index),
            ProtocolSelector::Name(name) => registry.resolve(name),
        }
    }
}

impl fmt::Display for ProtocolSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolSelector::Index(index) => write!(f, "#{}", index),
            ProtocolSelector::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for ProtocolSelector {
    fn from(name: &str) -> Self {
        ProtocolSelector::Name(name.to_string())
    }
}

impl From<usize> for ProtocolSelector {
    fn from(index: usize) -> Self {
        ProtocolSelector::Index(index)
    }
}

fn default_pipe_name() -> String {
    DEFAULT_PIPE_NAME.to_string()
}

/// What to capture and where to stream it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfig {
    pub protocol: ProtocolSelector,
    pub channel: u8,
    /// Pipe name, without directory.
    #[serde(default = "default_pipe_name")]
    pub pipe_name: String,
    /// Override for the descriptor's link type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<u32>,
}

impl CaptureConfig {
    pub fn new(protocol: impl Into<ProtocolSelector>, channel: u8) -> Self {
        Self {
            protocol: protocol.into(),
            channel,
            pipe_name: default_pipe_name(),
            link_type: None,
        }
    }

    /// Parse a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CaptureConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Check fields that do not need a registry.
    pub fn validate(&self) -> Result<()> {
        if self.pipe_name.is_empty() {
            return Err(SnifferError::InvalidConfig(
                "pipe_name must not be empty".to_string(),
            ));
        }
        if self.pipe_name.contains(['/', '\\']) {
            return Err(SnifferError::InvalidConfig(format!(
                "pipe_name {:?} must not contain path separators",
                self.pipe_name
            )));
        }
        Ok(())
    }

    /// Validate against a registry and precompute the capture plan.
    pub fn resolve<'r>(&self, registry: &'r ProtocolRegistry) -> Result<CapturePlan<'r>> {
        self.validate()?;

        let descriptor = self.protocol.resolve(registry)?;
        let commands = descriptor.commands().startup_sequence(self.channel)?;
        let frequency = descriptor.fixed_frequency_of(self.channel)?;
        let link_type = self.link_type.unwrap_or(descriptor.link_type());

        Ok(CapturePlan {
            descriptor,
            channel: self.channel,
            frequency,
            commands,
            pipe: PipeConfig::new(self.pipe_name.clone(), link_type),
        })
    }
}

/// A validated capture selection.
#[derive(Debug, Clone)]
pub struct CapturePlan<'r> {
    pub descriptor: &'r ProtocolDescriptor,
    pub channel: u8,
    pub frequency: FixedFrequency,
    /// Startup commands in send order.
    pub commands: Vec<Command>,
    pub pipe: PipeConfig,
}

impl CapturePlan<'_> {
    /// Startup commands as device packets, in send order.
    pub fn startup_frames(&self) -> Result<Vec<Bytes>> {
        self.commands.iter().map(Command::to_frame).collect()
    }
}
