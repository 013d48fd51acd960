//! Error types for sniffer-relay.

use thiserror::Error;

/// Main error type for all relay operations.
#[derive(Debug, Error)]
pub enum SnifferError {
    /// I/O error outside of the pipe worker (stdout, config files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (config and control output).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No registered protocol has this name or alias.
    #[error("Unknown protocol: {0}")]
    UnknownProtocol(String),

    /// Protocol index outside the registry table.
    #[error("Protocol index {index} out of range (registry has {count} protocols)")]
    ProtocolIndexOutOfRange { index: usize, count: usize },

    /// Channel index not present in the descriptor's channel plan.
    #[error("Unknown channel {channel} for protocol {protocol}")]
    UnknownChannel { protocol: String, channel: u8 },

    /// Channel plan contains the same index twice.
    #[error("Duplicate channel {channel} in channel plan of {protocol}")]
    DuplicateChannel { protocol: String, channel: u8 },

    /// Frequency cannot be expressed in the 16.16 fixed-point field.
    #[error("Frequency {0} MHz cannot be encoded as 16.16 fixed point")]
    FrequencyOutOfRange(f64),

    /// Device command packet failed validation.
    #[error("Invalid command frame: {0}")]
    InvalidCommandFrame(String),

    /// pcap byte stream failed validation.
    #[error("Malformed capture stream: {0}")]
    MalformedCapture(String),

    /// Frame does not fit in a single record.
    #[error("Frame of {len} bytes exceeds snap length {snaplen}")]
    FrameTooLarge { len: usize, snaplen: u32 },

    /// pcap encoding error.
    #[error("pcap error: {0}")]
    Pcap(#[from] pcap_file::PcapError),

    /// OS pipe object could not be created.
    #[error("Failed to create pipe {path}: {source}")]
    PipeCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No consumer is attached to the pipe.
    #[error("Pipe consumer disconnected")]
    ConsumerDisconnected,

    /// Pipe-level fault while talking to the consumer.
    #[error("Pipe transport fault: {0}")]
    TransportFault(#[source] std::io::Error),

    /// OS pipe object could not be removed on stop.
    #[error("Failed to release pipe {path}: {source}")]
    ResourceCleanupFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration rejected before anything was started.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The pipe worker task died or was started twice.
    #[error("Pipe worker error: {0}")]
    Worker(String),
}

impl SnifferError {
    /// Classify a pipe write error.
    ///
    /// Errors meaning "nobody is reading" map to [`SnifferError::ConsumerDisconnected`],
    /// everything else to [`SnifferError::TransportFault`].
    pub fn from_pipe_write(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::WriteZero => SnifferError::ConsumerDisconnected,
            _ => SnifferError::TransportFault(err),
        }
    }
}

/// Result type alias using SnifferError.
pub type Result<T> = std::result::Result<T, SnifferError>;
