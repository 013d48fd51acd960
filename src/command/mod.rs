//! Command module - sniffer control commands.
//!
//! A [`Command`] is an opcode byte plus a payload. Its wire form is
//! `[opcode] ++ payload`; [`Command::to_frame`] wraps it in the packet
//! envelope the firmware reads from the serial line.
//!
//! [`CommandEncoder`] builds the commands for one PHY:
//!
//! ```
//! use sniffer_relay::command::{CommandEncoder, Opcode};
//! use sniffer_relay::protocol::ProtocolRegistry;
//!
//! let zigbee = ProtocolRegistry::global().resolve("zigbee").unwrap();
//! let startup = CommandEncoder::new(zigbee).startup_sequence(11).unwrap();
//!
//! let opcodes: Vec<Opcode> = startup.iter().map(|c| c.opcode()).collect();
//! assert_eq!(
//!     opcodes,
//!     vec![Opcode::Ping, Opcode::Stop, Opcode::CfgPhy, Opcode::CfgFrequency, Opcode::Start]
//! );
//! ```

mod frame;

pub use frame::{END_OF_FRAME, FRAME_OVERHEAD, START_OF_FRAME};

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, SnifferError};
use crate::protocol::ProtocolDescriptor;

/// Command opcodes understood by the sniffer firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Liveness check.
    Ping = 0x40,
    /// Start streaming captured frames.
    Start = 0x41,
    /// Stop streaming.
    Stop = 0x42,
    /// Set the radio frequency (16.16 fixed point MHz).
    CfgFrequency = 0x45,
    /// Select the PHY.
    CfgPhy = 0x47,
    /// Set the BLE initiator address to follow.
    CfgBleInitiatorAddress = 0x70,
}

impl Opcode {
    /// Raw opcode byte.
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = SnifferError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x40 => Ok(Opcode::Ping),
            0x41 => Ok(Opcode::Start),
            0x42 => Ok(Opcode::Stop),
            0x45 => Ok(Opcode::CfgFrequency),
            0x47 => Ok(Opcode::CfgPhy),
            0x70 => Ok(Opcode::CfgBleInitiatorAddress),
            other => Err(SnifferError::InvalidCommandFrame(format!(
                "unknown opcode 0x{:02X}",
                other
            ))),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Ping => "PING",
            Opcode::Start => "START",
            Opcode::Stop => "STOP",
            Opcode::CfgFrequency => "CFG_FREQUENCY",
            Opcode::CfgPhy => "CFG_PHY",
            Opcode::CfgBleInitiatorAddress => "CFG_BLE_INITIATOR_ADDRESS",
        };
        f.write_str(name)
    }
}

/// A control command: opcode plus payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: Opcode,
    payload: Bytes,
}

impl Command {
    /// Create a command with a payload.
    pub fn new(opcode: Opcode, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Create a command with an empty payload.
    pub fn bare(opcode: Opcode) -> Self {
        Self {
            opcode,
            payload: Bytes::new(),
        }
    }

    pub fn ping() -> Self {
        Self::bare(Opcode::Ping)
    }

    pub fn stop() -> Self {
        Self::bare(Opcode::Stop)
    }

    pub fn start() -> Self {
        Self::bare(Opcode::Start)
    }

    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Wire form: `[opcode] ++ payload`.
    pub fn wire_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.payload.len());
        buf.put_u8(self.opcode.as_byte());
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if !self.payload.is_empty() {
            write!(f, " [")?;
            for (i, b) in self.payload.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:02X}", b)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// Builds control commands for one PHY.
#[derive(Debug, Clone, Copy)]
pub struct CommandEncoder<'a> {
    descriptor: &'a ProtocolDescriptor,
}

impl<'a> CommandEncoder<'a> {
    pub fn new(descriptor: &'a ProtocolDescriptor) -> Self {
        Self { descriptor }
    }

    /// Descriptor this encoder builds commands for.
    pub fn descriptor(&self) -> &'a ProtocolDescriptor {
        self.descriptor
    }

    pub fn ping(&self) -> Command {
        Command::ping()
    }

    pub fn stop(&self) -> Command {
        Command::stop()
    }

    pub fn start(&self) -> Command {
        Command::start()
    }

    /// `CFG_PHY` with the descriptor's PHY identity byte.
    pub fn configure_phy(&self) -> Command {
        Command::new(
            Opcode::CfgPhy,
            Bytes::copy_from_slice(&[self.descriptor.phy_index()]),
        )
    }

    /// `CFG_FREQUENCY` for a channel of the descriptor's plan.
    ///
    /// Payload: integer MHz (LE u16) then fraction in 1/65536 MHz (LE u16).
    pub fn configure_frequency(&self, channel: u8) -> Result<Command> {
        let frequency = self.descriptor.fixed_frequency_of(channel)?;
        Ok(Command::new(
            Opcode::CfgFrequency,
            Bytes::copy_from_slice(&frequency.encode()),
        ))
    }

    /// `CFG_BLE_INITIATOR_ADDRESS` with the raw address bytes.
    ///
    /// Only meaningful for BLE, but accepted for every PHY.
    pub fn configure_initiator_address(&self, address: &[u8]) -> Command {
        Command::new(
            Opcode::CfgBleInitiatorAddress,
            Bytes::copy_from_slice(address),
        )
    }

    /// Commands that bring the sniffer from any state to capturing on `channel`.
    ///
    /// Always `[ping, stop, configure_phy, configure_frequency, start]`.
    /// The device must be stopped before it is reconfigured and the
    /// frequency must be set before `start`.
    pub fn startup_sequence(&self, channel: u8) -> Result<Vec<Command>> {
        let configure_frequency = self.configure_frequency(channel)?;
        Ok(vec![
            self.ping(),
            self.stop(),
            self.configure_phy(),
            configure_frequency,
            self.start(),
        ])
    }
}

impl ProtocolDescriptor {
    /// Command encoder for this PHY.
    pub fn commands(&self) -> CommandEncoder<'_> {
        CommandEncoder::new(self)
    }
}
