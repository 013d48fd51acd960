//! Incremental reader for a live pcap byte stream.
//!
//! Bytes arrive in arbitrary chunks; [`CaptureBuffer`] keeps whatever the
//! `pcap_file` parser cannot consume yet (`IncompleteBuffer`) and retries on
//! the next push. The global header is expected once per session.
//!
//! # Example
//!
//! ```
//! use sniffer_relay::capture::{global_header, record, CaptureBuffer};
//!
//! let mut buffer = CaptureBuffer::new();
//! let mut stream = global_header(147).unwrap().to_vec();
//! stream.extend_from_slice(&record(b"frame", 1).unwrap());
//!
//! let records = buffer.push(&stream).unwrap();
//! assert_eq!(buffer.link_type(), Some(147));
//! assert_eq!(records[0].data(), b"frame");
//! ```

use bytes::{Buf, BytesMut};
use pcap_file::pcap::{PcapHeader, PcapParser};
use pcap_file::PcapError;

use super::record::CaptureRecord;
use crate::error::{Result, SnifferError};

/// Buffer for accumulating pcap stream bytes and extracting records.
pub struct CaptureBuffer {
    buffer: BytesMut,
    /// Set once the global header has been parsed.
    parser: Option<PcapParser>,
}

impl CaptureBuffer {
    /// Create a new capture buffer expecting a global header first.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            parser: None,
        }
    }

    /// Push data into the buffer and extract all complete records.
    ///
    /// Partial data is kept for the next push.
    ///
    /// # Errors
    ///
    /// [`SnifferError::MalformedCapture`] on a bad global header or a record
    /// the parser rejects (e.g. longer than the declared snap length).
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<CaptureRecord>> {
        self.buffer.extend_from_slice(data);

        let mut records = Vec::new();
        let mut rest: &[u8] = &self.buffer;

        if self.parser.is_none() {
            match PcapParser::new(rest) {
                Ok((remaining, parser)) => {
                    rest = remaining;
                    self.parser = Some(parser);
                }
                Err(PcapError::IncompleteBuffer) => return Ok(records),
                Err(e) => return Err(malformed(e)),
            }
        }

        if let Some(parser) = &self.parser {
            loop {
                match parser.next_packet(rest) {
                    Ok((remaining, packet)) => {
                        records.push(CaptureRecord::from_packet(&packet));
                        rest = remaining;
                    }
                    Err(PcapError::IncompleteBuffer) => break,
                    Err(e) => return Err(malformed(e)),
                }
            }
        }

        let consumed = self.buffer.len() - rest.len();
        self.buffer.advance(consumed);
        Ok(records)
    }

    /// Global header, once it has been parsed.
    pub fn global_header(&self) -> Option<PcapHeader> {
        self.parser.as_ref().map(PcapParser::header)
    }

    /// Link type declared by the stream, once known.
    pub fn link_type(&self) -> Option<u32> {
        self.global_header().map(|h| u32::from(h.datalink))
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and expect a new global header.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.parser = None;
    }
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn malformed(err: PcapError) -> SnifferError {
    SnifferError::MalformedCapture(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{global_header, record};
    use byteorder_slice::LittleEndian;
    use pcap_file::pcap::RawPcapPacket;
    use std::borrow::Cow;

    fn stream_of(frames: &[&[u8]]) -> Vec<u8> {
        let mut bytes = global_header(147).unwrap().to_vec();
        for (i, frame) in frames.iter().enumerate() {
            bytes.extend_from_slice(&record(frame, i as u64).unwrap());
        }
        bytes
    }

    #[test]
    fn test_multiple_records_in_one_push() {
        let mut buffer = CaptureBuffer::new();
        let records = buffer.push(&stream_of(&[b"one", b"two", b"three"])).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[2].data(), b"three");
        assert_eq!(records[1].captured_at_micros(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_byte_by_byte_delivery() {
        let mut buffer = CaptureBuffer::new();
        let bytes = stream_of(&[b"abc", b"", b"defg"]);

        let mut records = Vec::new();
        for b in &bytes {
            records.extend(buffer.push(std::slice::from_ref(b)).unwrap());
        }

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].data(), b"abc");
        assert!(records[1].data().is_empty());
        assert_eq!(records[2].data(), b"defg");
    }

    #[test]
    fn test_waits_for_global_header() {
        let mut buffer = CaptureBuffer::new();
        let bytes = stream_of(&[b"x"]);

        assert!(buffer.push(&bytes[..10]).unwrap().is_empty());
        assert!(buffer.global_header().is_none());
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.push(&bytes[10..]).unwrap().len(), 1);
        assert_eq!(buffer.link_type(), Some(147));
    }

    #[test]
    fn test_partial_record_is_kept() {
        let mut buffer = CaptureBuffer::new();
        let bytes = stream_of(&[b"abcdef"]);
        let split = bytes.len() - 3;

        assert!(buffer.push(&bytes[..split]).unwrap().is_empty());
        assert_eq!(buffer.len(), split - 24);
        assert_eq!(buffer.push(&bytes[split..]).unwrap()[0].data(), b"abcdef");
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut buffer = CaptureBuffer::new();
        let mut bytes = stream_of(&[]);
        bytes[0] = 0x00;
        let err = buffer.push(&bytes).unwrap_err();
        assert!(matches!(err, SnifferError::MalformedCapture(_)));
    }

    #[test]
    fn test_oversized_record_rejected() {
        let mut buffer = CaptureBuffer::new();
        let mut bytes = global_header(147).unwrap().to_vec();
        let oversized = RawPcapPacket {
            ts_sec: 0,
            ts_frac: 0,
            incl_len: 70_000,
            orig_len: 70_000,
            data: Cow::Owned(vec![0u8; 70_000]),
        };
        oversized.write_to::<_, LittleEndian>(&mut bytes).unwrap();

        let err = buffer.push(&bytes).unwrap_err();
        assert!(err.to_string().contains("incl_len > snap_len"));
    }

    #[test]
    fn test_reset() {
        let mut buffer = CaptureBuffer::new();
        buffer.push(&stream_of(&[b"a"])).unwrap();
        buffer.reset();
        assert!(buffer.global_header().is_none());
        assert_eq!(buffer.push(&stream_of(&[b"b"])).unwrap()[0].data(), b"b");
    }
}
