//! Control output - catalog and `$ready` messages over stdout.
//!
//! The data plane is the pcap stream on the pipe. The control plane is a
//! line-oriented JSON channel on stdout that front-ends parse:
//!
//! 1. Front-end asks for the catalog and shows protocols/channels
//! 2. Relay creates the pipe
//! 3. Relay sends `$ready` with the pipe path
//! 4. Front-end starts the consumer on that path
//!
//! # Example
//!
//! ```ignore
//! use sniffer_relay::control::{build_ready_message, write_stdout_line};
//!
//! let msg = build_ready_message(pipe.path(), descriptor, channel, link_type)?;
//! write_stdout_line(&msg)?;
//! ```

mod catalog;
mod stdio;

pub use catalog::{build_catalog, build_ready_message, RELAY_VERSION};
pub use stdio::{write_line, write_stdout_json, write_stdout_line};
