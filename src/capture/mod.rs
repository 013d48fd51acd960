//! Capture module - pcap framing for the live stream.
//!
//! This module implements the byte format delivered to the consumer:
//! - 24-byte global header, once per stream
//! - 16-byte record header + raw frame, per packet
//! - [`CaptureBuffer`] for parsing such a stream back incrementally

mod buffer;
mod header;
mod record;

pub use buffer::CaptureBuffer;
pub use header::{
    global_header, link_type, pcap_header, DEFAULT_SNAPLEN, GLOBAL_HEADER_SIZE,
    RECORD_HEADER_SIZE, VERSION_MAJOR, VERSION_MINOR,
};
pub use record::{check_frame_len, epoch_micros_now, record, CaptureRecord};
