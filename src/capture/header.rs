//! pcap global header.
//!
//! Global header (once per stream, 24 bytes):
//! ```text
//! ┌──────────┬───────┬───────┬──────────┬─────────┬─────────┬───────────┐
//! │ Magic    │ Major │ Minor │ Thiszone │ Sigfigs │ Snaplen │ Link type │
//! │ u32      │ u16   │ u16   │ i32      │ u32     │ u32     │ u32       │
//! └──────────┴───────┴───────┴──────────┴─────────┴─────────┴───────────┘
//! ```
//!
//! All multi-byte integers are Little Endian, timestamps have microsecond
//! resolution. The byte layout is produced by `pcap_file`.

use bytes::Bytes;
use pcap_file::pcap::PcapHeader;
use pcap_file::{DataLink, Endianness, TsResolution};

use crate::error::Result;

/// pcap format version written by this crate.
pub const VERSION_MAJOR: u16 = 2;
pub const VERSION_MINOR: u16 = 4;

/// Snapshot length declared in the global header.
///
/// Frames longer than this cannot be written as a single record.
pub const DEFAULT_SNAPLEN: u32 = 65_535;

/// Global header size in bytes (fixed, exactly 24).
pub const GLOBAL_HEADER_SIZE: usize = 24;

/// Record header size in bytes (fixed, exactly 16).
pub const RECORD_HEADER_SIZE: usize = 16;

/// pcap link-type codes used by the sniffer PHYs.
pub mod link_type {
    /// DLT_USER0, Wireshark decodes it with a user-configured dissector.
    pub const USER0: u32 = 147;
    /// DLT_USER1.
    pub const USER1: u32 = 148;
    /// IEEE 802.15.4 without FCS.
    pub const IEEE802_15_4_NOFCS: u32 = 230;
    /// Bluetooth LE link layer with pseudo-header.
    pub const BLUETOOTH_LE_LL_WITH_PHDR: u32 = 256;
}

/// Header for a stream of `link_type` frames with the fixed constants.
pub fn pcap_header(link_type: u32) -> PcapHeader {
    PcapHeader {
        version_major: VERSION_MAJOR,
        version_minor: VERSION_MINOR,
        ts_correction: 0,
        ts_accuracy: 0,
        snaplen: DEFAULT_SNAPLEN,
        datalink: DataLink::from(link_type),
        ts_resolution: TsResolution::MicroSecond,
        endianness: Endianness::Little,
    }
}

/// Encode the 24-byte global header for a link type.
///
/// # Example
///
/// ```
/// use sniffer_relay::capture::global_header;
///
/// let bytes = global_header(147).unwrap();
/// assert_eq!(&bytes[..4], &[0xd4, 0xc3, 0xb2, 0xa1]);
/// assert_eq!(&bytes[20..], &[147, 0, 0, 0]);
/// ```
pub fn global_header(link_type: u32) -> Result<Bytes> {
    let mut buf = Vec::with_capacity(GLOBAL_HEADER_SIZE);
    pcap_header(link_type).write_to(&mut buf)?;
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_header_layout() {
        let bytes = global_header(link_type::IEEE802_15_4_NOFCS).unwrap();
        assert_eq!(
            &bytes[..],
            &[
                0xd4, 0xc3, 0xb2, 0xa1, // magic
                0x02, 0x00, 0x04, 0x00, // version 2.4
                0x00, 0x00, 0x00, 0x00, // thiszone
                0x00, 0x00, 0x00, 0x00, // sigfigs
                0xff, 0xff, 0x00, 0x00, // snaplen 65535
                0xe6, 0x00, 0x00, 0x00, // link type 230
            ]
        );
    }

    #[test]
    fn test_global_header_size_is_exactly_24() {
        assert_eq!(GLOBAL_HEADER_SIZE, 24);
        assert_eq!(global_header(147).unwrap().len(), 24);
    }

    #[test]
    fn test_global_header_reads_back() {
        let bytes = global_header(148).unwrap();
        let (rest, header) = PcapHeader::from_slice(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(header, pcap_header(148));
        assert_eq!(u32::from(header.datalink), link_type::USER1);
    }

    #[test]
    fn test_user_link_types_keep_their_code() {
        for code in [
            link_type::USER0,
            link_type::USER1,
            link_type::IEEE802_15_4_NOFCS,
            link_type::BLUETOOTH_LE_LL_WITH_PHDR,
        ] {
            let bytes = global_header(code).unwrap();
            assert_eq!(&bytes[20..], &code.to_le_bytes());
        }
    }
}
