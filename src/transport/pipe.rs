//! Platform-specific pipe implementation.
//!
//! - Unix: FIFO at `/tmp/<name>`
//! - Windows: Named Pipe at `\\.\pipe\<name>`, message mode, one instance
//!
//! # Example
//!
//! ```ignore
//! use sniffer_relay::transport::{platform_endpoint, PipeEndpoint};
//!
//! let mut endpoint = platform_endpoint("fcatsniffer");
//! endpoint.create()?;
//! let writer = endpoint.attach().await?; // waits for Wireshark
//! ```

use crate::error::{Result, SnifferError};

use super::{BoxFuture, PipeEndpoint, PipeWriter};

/// Pipe name used when none is configured.
pub const DEFAULT_PIPE_NAME: &str = "fcatsniffer";

/// Resolve a pipe name to the platform path.
///
/// Format:
/// - Unix: `/tmp/{name}`
/// - Windows: `\\.\pipe\{name}`
pub fn resolve_pipe_path(name: &str) -> String {
    #[cfg(unix)]
    {
        format!("/tmp/{}", name)
    }

    #[cfg(windows)]
    {
        format!(r"\\.\pipe\{}", name)
    }
}

// ============================================================================
// Unix Implementation
// ============================================================================

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use nix::errno::Errno;
    use nix::sys::stat::Mode;
    use nix::unistd::mkfifo;
    use tokio::net::unix::pipe;
    use tracing::debug;

    /// How often to retry opening the write end while no reader is present.
    pub const DEFAULT_ATTACH_POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// FIFO special file.
    ///
    /// Opening the write end of a FIFO fails with `ENXIO` until a reader
    /// exists, so [`attach`](PipeEndpoint::attach) retries on a short
    /// interval.
    #[derive(Debug)]
    pub struct FifoEndpoint {
        path: String,
        poll_interval: Duration,
    }

    impl FifoEndpoint {
        /// FIFO for a pipe name, placed under `/tmp`.
        pub fn new(name: &str) -> Self {
            Self::at_path(resolve_pipe_path(name))
        }

        /// FIFO at an explicit path.
        pub fn at_path(path: impl Into<String>) -> Self {
            Self {
                path: path.into(),
                poll_interval: DEFAULT_ATTACH_POLL_INTERVAL,
            }
        }

        /// Set the reader poll interval.
        pub fn with_poll_interval(mut self, interval: Duration) -> Self {
            self.poll_interval = interval;
            self
        }
    }

    impl PipeEndpoint for FifoEndpoint {
        fn path(&self) -> &str {
            &self.path
        }

        fn create(&mut self) -> Result<()> {
            match mkfifo(self.path.as_str(), Mode::from_bits_truncate(0o666)) {
                Ok(()) => {
                    debug!("Created FIFO at {}", self.path);
                    Ok(())
                }
                // Left behind by an earlier run, or created by the consumer.
                Err(Errno::EEXIST) => Ok(()),
                Err(errno) => Err(SnifferError::PipeCreationFailed {
                    path: self.path.clone(),
                    source: std::io::Error::from(errno),
                }),
            }
        }

        fn attach(&mut self) -> BoxFuture<'_, Result<PipeWriter>> {
            Box::pin(async move {
                if !Path::new(&self.path).exists() {
                    self.create()?;
                }

                loop {
                    match pipe::OpenOptions::new().open_sender(&self.path) {
                        Ok(sender) => return Ok(Box::new(sender) as PipeWriter),
                        Err(e) if e.raw_os_error() == Some(Errno::ENXIO as i32) => {
                            tokio::time::sleep(self.poll_interval).await;
                        }
                        Err(e) => return Err(SnifferError::TransportFault(e)),
                    }
                }
            })
        }

        fn release(&mut self) -> Result<()> {
            std::fs::remove_file(&self.path).map_err(|source| {
                SnifferError::ResourceCleanupFailed {
                    path: self.path.clone(),
                    source,
                }
            })?;
            debug!("Removed FIFO at {}", self.path);
            Ok(())
        }
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(windows)]
mod windows_impl {
    use super::*;
    use tokio::net::windows::named_pipe::{NamedPipeServer, PipeMode, ServerOptions};
    use tracing::debug;

    const PIPE_BUFFER_SIZE: u32 = 64 * 1024;

    /// Windows Named Pipe server, single instance, message mode.
    ///
    /// The pipe instance is handed to the worker on attach; the next attach
    /// creates a fresh instance.
    #[derive(Debug)]
    pub struct NamedPipeEndpoint {
        path: String,
        server: Option<NamedPipeServer>,
    }

    impl NamedPipeEndpoint {
        /// Named pipe for a pipe name, placed under `\\.\pipe\`.
        pub fn new(name: &str) -> Self {
            Self::at_path(resolve_pipe_path(name))
        }

        /// Named pipe at an explicit path.
        pub fn at_path(path: impl Into<String>) -> Self {
            Self {
                path: path.into(),
                server: None,
            }
        }
    }

    impl PipeEndpoint for NamedPipeEndpoint {
        fn path(&self) -> &str {
            &self.path
        }

        fn create(&mut self) -> Result<()> {
            if self.server.is_some() {
                return Ok(());
            }

            let server = ServerOptions::new()
                .first_pipe_instance(true)
                .pipe_mode(PipeMode::Message)
                .max_instances(1)
                .in_buffer_size(PIPE_BUFFER_SIZE)
                .out_buffer_size(PIPE_BUFFER_SIZE)
                .create(&self.path)
                .map_err(|source| SnifferError::PipeCreationFailed {
                    path: self.path.clone(),
                    source,
                })?;

            debug!("Created named pipe at {}", self.path);
            self.server = Some(server);
            Ok(())
        }

        fn attach(&mut self) -> BoxFuture<'_, Result<PipeWriter>> {
            Box::pin(async move {
                self.create()?;

                let server = match self.server.as_ref() {
                    Some(server) => server,
                    None => {
                        return Err(SnifferError::Worker(
                            "named pipe instance missing".to_string(),
                        ))
                    }
                };
                server.connect().await.map_err(SnifferError::TransportFault)?;

                match self.server.take() {
                    Some(server) => Ok(Box::new(server) as PipeWriter),
                    None => Err(SnifferError::Worker(
                        "named pipe instance missing".to_string(),
                    )),
                }
            })
        }

        fn release(&mut self) -> Result<()> {
            // Closing the last handle removes the pipe.
            self.server = None;
            Ok(())
        }
    }
}

// ============================================================================
// Platform-independent re-exports
// ============================================================================

#[cfg(unix)]
pub use unix_impl::{FifoEndpoint, DEFAULT_ATTACH_POLL_INTERVAL};

#[cfg(windows)]
pub use windows_impl::NamedPipeEndpoint;

/// Endpoint type for the current platform.
#[cfg(unix)]
pub type PlatformEndpoint = FifoEndpoint;

/// Endpoint type for the current platform.
#[cfg(windows)]
pub type PlatformEndpoint = NamedPipeEndpoint;

/// Create the platform endpoint for a pipe name.
pub fn platform_endpoint(name: &str) -> PlatformEndpoint {
    PlatformEndpoint::new(name)
}
