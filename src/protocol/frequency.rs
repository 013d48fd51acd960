//! 16.16 fixed-point frequency encoding.
//!
//! The sniffer firmware takes the radio frequency as two little-endian
//! 16-bit fields:
//! ```text
//! ┌──────────────┬────────────────────────┐
//! │ Integer MHz  │ Fraction (1/65536 MHz) │
//! │ 2 bytes LE   │ 2 bytes LE             │
//! └──────────────┴────────────────────────┘
//! ```

use crate::error::{Result, SnifferError};

/// Size of the encoded frequency field in bytes.
pub const FREQUENCY_FIELD_SIZE: usize = 4;

/// Fraction units per MHz (2^16).
pub const FRACTION_UNITS_PER_MHZ: u32 = 65_536;

/// A frequency split into integer MHz and 1/65536 MHz units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFrequency {
    /// Whole megahertz.
    pub integer_mhz: u16,
    /// Fractional megahertz in units of 1/65536 MHz.
    pub fraction: u16,
}

impl FixedFrequency {
    /// Convert a frequency in MHz.
    ///
    /// The fraction is `round((f - floor(f)) * 65536)`. A fraction that
    /// rounds up to a full MHz carries into the integer part.
    ///
    /// # Example
    ///
    /// ```
    /// use sniffer_relay::protocol::FixedFrequency;
    ///
    /// let f = FixedFrequency::from_mhz(433.5).unwrap();
    /// assert_eq!(f.integer_mhz, 433);
    /// assert_eq!(f.fraction, 32768);
    /// ```
    pub fn from_mhz(mhz: f64) -> Result<Self> {
        if !mhz.is_finite() || mhz < 0.0 {
            return Err(SnifferError::FrequencyOutOfRange(mhz));
        }

        let mut integer = mhz.floor();
        let mut fraction = ((mhz - integer) * f64::from(FRACTION_UNITS_PER_MHZ)).round();
        if fraction >= f64::from(FRACTION_UNITS_PER_MHZ) {
            integer += 1.0;
            fraction = 0.0;
        }

        if integer > f64::from(u16::MAX) {
            return Err(SnifferError::FrequencyOutOfRange(mhz));
        }

        Ok(Self {
            integer_mhz: integer as u16,
            fraction: fraction as u16,
        })
    }

    /// Frequency in MHz.
    pub fn to_mhz(&self) -> f64 {
        f64::from(self.integer_mhz)
            + f64::from(self.fraction) / f64::from(FRACTION_UNITS_PER_MHZ)
    }

    /// Encode as the 4-byte little-endian command payload.
    pub fn encode(&self) -> [u8; FREQUENCY_FIELD_SIZE] {
        let mut buf = [0u8; FREQUENCY_FIELD_SIZE];
        buf[0..2].copy_from_slice(&self.integer_mhz.to_le_bytes());
        buf[2..4].copy_from_slice(&self.fraction.to_le_bytes());
        buf
    }

    /// Decode from a command payload.
    ///
    /// Returns `None` if the buffer is shorter than 4 bytes.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < FREQUENCY_FIELD_SIZE {
            return None;
        }
        Some(Self {
            integer_mhz: u16::from_le_bytes([buf[0], buf[1]]),
            fraction: u16::from_le_bytes([buf[2], buf[3]]),
        })
    }
}
