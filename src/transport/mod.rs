//! Transport module - platform-specific pipe handling.
//!
//! Provides abstraction over:
//! - FIFOs under `/tmp` (Linux/macOS)
//! - Message-mode Named Pipes (Windows)
//!
//! The pipe worker only sees the [`PipeEndpoint`] trait, so tests can swap in
//! in-memory endpoints.

mod pipe;

use std::future::Future;
use std::pin::Pin;

use tokio::io::AsyncWrite;

use crate::error::Result;

pub use pipe::{platform_endpoint, resolve_pipe_path, PlatformEndpoint, DEFAULT_PIPE_NAME};

#[cfg(unix)]
pub use pipe::{FifoEndpoint, DEFAULT_ATTACH_POLL_INTERVAL};

#[cfg(windows)]
pub use pipe::NamedPipeEndpoint;

/// Boxed future type for endpoint operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Write half handed to the pipe worker once a consumer is attached.
pub type PipeWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// An OS pipe object a single consumer can attach to.
///
/// Lifecycle: `create` (idempotent), then any number of `attach` calls (one
/// per consumer session), then `release`.
pub trait PipeEndpoint: Send + 'static {
    /// Path of the OS object.
    fn path(&self) -> &str;

    /// Create the OS object if it does not exist yet.
    fn create(&mut self) -> Result<()>;

    /// Wait until a consumer attaches and return a writer connected to it.
    ///
    /// The returned future must be cancel-safe: dropping it leaves the
    /// endpoint ready for another `attach`.
    fn attach(&mut self) -> BoxFuture<'_, Result<PipeWriter>>;

    /// Remove the OS object.
    fn release(&mut self) -> Result<()>;
}
