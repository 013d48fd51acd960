//! Device packet envelope for commands.
//!
//! ```text
//! ┌──────────┬────────┬──────────┬─────────┬──────┬──────────┐
//! │ SOF      │ Opcode │ Length   │ Payload │ FCS  │ EOF      │
//! │ 40 53    │ 1 byte │ u16 LE   │ N bytes │ 1    │ 40 45    │
//! └──────────┴────────┴──────────┴─────────┴──────┴──────────┘
//! ```
//!
//! FCS is the low byte of the sum of opcode, both length bytes and the payload.

use bytes::{BufMut, Bytes, BytesMut};

use super::{Command, Opcode};
use crate::error::{Result, SnifferError};

/// Start-of-frame marker.
pub const START_OF_FRAME: [u8; 2] = [0x40, 0x53];

/// End-of-frame marker.
pub const END_OF_FRAME: [u8; 2] = [0x40, 0x45];

/// Envelope bytes around the payload (SOF + opcode + length + FCS + EOF).
pub const FRAME_OVERHEAD: usize = 2 + 1 + 2 + 1 + 2;

fn fcs(opcode: u8, length: [u8; 2], payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(
            opcode.wrapping_add(length[0]).wrapping_add(length[1]),
            |acc, b| acc.wrapping_add(*b),
        )
}

impl Command {
    /// Wrap the command in the device packet envelope.
    ///
    /// Fails if the payload does not fit the 16-bit length field.
    ///
    /// # Example
    ///
    /// ```
    /// use sniffer_relay::command::Command;
    ///
    /// let frame = Command::ping().to_frame().unwrap();
    /// assert_eq!(frame.as_ref(), &[0x40, 0x53, 0x40, 0x00, 0x00, 0x40, 0x40, 0x45]);
    /// ```
    pub fn to_frame(&self) -> Result<Bytes> {
        let length = u16::try_from(self.payload.len()).map_err(|_| {
            SnifferError::InvalidCommandFrame(format!(
                "payload of {} bytes exceeds 16-bit length field",
                self.payload.len()
            ))
        })?;
        let length = length.to_le_bytes();
        let opcode = self.opcode.as_byte();

        let mut buf = BytesMut::with_capacity(FRAME_OVERHEAD + self.payload.len());
        buf.extend_from_slice(&START_OF_FRAME);
        buf.put_u8(opcode);
        buf.extend_from_slice(&length);
        buf.extend_from_slice(&self.payload);
        buf.put_u8(fcs(opcode, length, &self.payload));
        buf.extend_from_slice(&END_OF_FRAME);
        Ok(buf.freeze())
    }

    /// Parse and validate one enveloped command.
    ///
    /// Checks markers, length, opcode and FCS.
    pub fn from_frame(buf: &[u8]) -> Result<Self> {
        if buf.len() < FRAME_OVERHEAD {
            return Err(SnifferError::InvalidCommandFrame(format!(
                "frame of {} bytes is shorter than the {} byte envelope",
                buf.len(),
                FRAME_OVERHEAD
            )));
        }

        if buf[0..2] != START_OF_FRAME {
            return Err(SnifferError::InvalidCommandFrame(
                "missing start-of-frame marker".to_string(),
            ));
        }

        let opcode = Opcode::try_from(buf[2])?;
        let length = [buf[3], buf[4]];
        let payload_len = u16::from_le_bytes(length) as usize;

        if buf.len() != FRAME_OVERHEAD + payload_len {
            return Err(SnifferError::InvalidCommandFrame(format!(
                "length field says {} payload bytes, frame carries {}",
                payload_len,
                buf.len() - FRAME_OVERHEAD
            )));
        }

        let payload = &buf[5..5 + payload_len];
        let expected = fcs(buf[2], length, payload);
        let actual = buf[5 + payload_len];
        if expected != actual {
            return Err(SnifferError::InvalidCommandFrame(format!(
                "FCS mismatch: expected 0x{:02X}, got 0x{:02X}",
                expected, actual
            )));
        }

        if buf[buf.len() - 2..] != END_OF_FRAME {
            return Err(SnifferError::InvalidCommandFrame(
                "missing end-of-frame marker".to_string(),
            ));
        }

        Ok(Command::new(opcode, Bytes::copy_from_slice(payload)))
    }
}
