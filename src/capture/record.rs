//! pcap records.
//!
//! A record is a 16-byte header (seconds, microseconds, included length,
//! original length) followed by the raw frame. The relay never truncates,
//! so both lengths are the frame length, and a frame longer than the snap
//! length is rejected instead of written.
//!
//! # Example
//!
//! ```
//! use sniffer_relay::capture::{record, RECORD_HEADER_SIZE};
//!
//! let bytes = record(b"\x01\x02\x03", 1_000_000).unwrap();
//! assert_eq!(bytes.len(), RECORD_HEADER_SIZE + 3);
//! assert_eq!(&bytes[..4], &[1, 0, 0, 0]); // 1 second
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use byteorder_slice::LittleEndian;
use bytes::Bytes;
use pcap_file::pcap::PcapPacket;
use pcap_file::TsResolution;

use super::header::{DEFAULT_SNAPLEN, RECORD_HEADER_SIZE};
use crate::error::{Result, SnifferError};

/// A decoded record with its frame bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    /// Capture time in microseconds since the Unix epoch.
    pub captured_at_micros: u64,
    /// Length of the frame on the air.
    pub orig_len: u32,
    /// Frame bytes (zero-copy via `bytes::Bytes`).
    pub data: Bytes,
}

impl CaptureRecord {
    pub fn new(captured_at_micros: u64, data: Bytes) -> Self {
        Self {
            captured_at_micros,
            orig_len: data.len() as u32,
            data,
        }
    }

    pub(crate) fn from_packet(packet: &PcapPacket<'_>) -> Self {
        Self {
            captured_at_micros: packet.timestamp.as_micros() as u64,
            orig_len: packet.orig_len,
            data: Bytes::copy_from_slice(&packet.data),
        }
    }

    /// Get a reference to the frame bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn captured_at_micros(&self) -> u64 {
        self.captured_at_micros
    }
}

/// Check that a frame fits in one record.
pub fn check_frame_len(len: usize) -> Result<u32> {
    match u32::try_from(len) {
        Ok(len) if len <= DEFAULT_SNAPLEN => Ok(len),
        _ => Err(SnifferError::FrameTooLarge {
            len,
            snaplen: DEFAULT_SNAPLEN,
        }),
    }
}

/// Build a complete record (header + frame) as a single buffer.
///
/// # Errors
///
/// [`SnifferError::FrameTooLarge`] if the frame exceeds the snap length.
pub fn record(frame: &[u8], captured_at_micros: u64) -> Result<Bytes> {
    let len = check_frame_len(frame.len())?;

    let mut buf = Vec::with_capacity(RECORD_HEADER_SIZE + frame.len());
    PcapPacket::new(Duration::from_micros(captured_at_micros), len, frame).write_to::<_, LittleEndian>(
        &mut buf,
        TsResolution::MicroSecond,
        DEFAULT_SNAPLEN,
    )?;
    Ok(Bytes::from(buf))
}

/// Current wall-clock time in microseconds since the Unix epoch.
pub fn epoch_micros_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
