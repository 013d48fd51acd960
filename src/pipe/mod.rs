//! Streaming pipe - live pcap stream to a single external consumer.
//!
//! The capture path submits frames without ever blocking; a background task
//! waits for a consumer (Wireshark, tshark, ...) to attach to the OS pipe and
//! forwards the most recent frame as a pcap record.
//!
//! # Example
//!
//! ```ignore
//! use sniffer_relay::pipe::{PipeConfig, StreamingPipe};
//!
//! let mut pipe = StreamingPipe::new(PipeConfig::new("fcatsniffer", 147));
//! pipe.start()?;
//! pipe.submit_frame(frame_bytes);
//! // ...
//! pipe.stop().await?;
//! ```

mod slot;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::capture::{epoch_micros_now, global_header, link_type};
use crate::error::{Result, SnifferError};
use crate::transport::{platform_endpoint, PipeEndpoint, PlatformEndpoint, DEFAULT_PIPE_NAME};

pub use slot::{PendingFrame, PendingSlot, PipeStats};

use worker::{drain_loop, WorkerContext};

/// Delay before retrying after a failed attach.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Configuration for a streaming pipe.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeConfig {
    /// Pipe name; resolved to `/tmp/<name>` or `\\.\pipe\<name>`.
    pub name: String,
    /// Link type written in the global header.
    pub link_type: u32,
    /// Wait after an attach error before trying again.
    pub retry_interval: Duration,
}

impl PipeConfig {
    pub fn new(name: impl Into<String>, link_type: u32) -> Self {
        Self {
            name: name.into(),
            link_type,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PIPE_NAME, link_type::USER0)
    }
}

/// Lifecycle of a streaming pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipeState {
    /// Constructed, worker not running.
    Created,
    /// Waiting for a consumer to attach.
    Opening,
    /// Consumer attached, frames are being written.
    Streaming,
    /// Stop requested, worker winding down.
    Stopping,
    /// Worker joined and OS object released.
    Closed,
}

/// Cloneable handle for submitting frames from any thread.
#[derive(Clone)]
pub struct FrameSender {
    slot: Arc<PendingSlot>,
}

impl FrameSender {
    /// Submit a frame stamped with the current time.
    ///
    /// Returns `true` if an unflushed older frame was replaced.
    pub fn submit(&self, frame: impl Into<Bytes>) -> bool {
        self.submit_at(frame, epoch_micros_now())
    }

    /// Submit a frame with an explicit capture time.
    ///
    /// Frames longer than [`DEFAULT_SNAPLEN`](crate::capture::DEFAULT_SNAPLEN)
    /// are dropped and counted in [`PipeStats::rejected`].
    pub fn submit_at(&self, frame: impl Into<Bytes>, captured_at_micros: u64) -> bool {
        self.slot
            .submit(PendingFrame::new(frame.into(), captured_at_micros))
    }
}

/// A live pcap stream over a platform pipe.
pub struct StreamingPipe<E: PipeEndpoint = PlatformEndpoint> {
    config: PipeConfig,
    path: String,
    /// `None` while the worker owns it, and after release.
    endpoint: Option<E>,
    opened: bool,
    slot: Arc<PendingSlot>,
    state: Arc<watch::Sender<PipeState>>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<E>>,
}

impl StreamingPipe<PlatformEndpoint> {
    /// Pipe backed by the platform endpoint for `config.name`.
    pub fn new(config: PipeConfig) -> Self {
        let endpoint = platform_endpoint(&config.name);
        Self::with_endpoint(config, endpoint)
    }
}

impl<E: PipeEndpoint> StreamingPipe<E> {
    /// Pipe backed by a caller-supplied endpoint.
    pub fn with_endpoint(config: PipeConfig, endpoint: E) -> Self {
        let (state, _) = watch::channel(PipeState::Created);
        Self {
            path: endpoint.path().to_string(),
            config,
            endpoint: Some(endpoint),
            opened: false,
            slot: Arc::new(PendingSlot::new()),
            state: Arc::new(state),
            cancel: CancellationToken::new(),
            worker: None,
        }
    }

    /// Create the OS pipe object.
    ///
    /// Idempotent while the pipe is not closed.
    pub fn open(&mut self) -> Result<()> {
        if self.opened {
            return Ok(());
        }

        let endpoint = self
            .endpoint
            .as_mut()
            .ok_or_else(|| SnifferError::Worker("pipe is closed".to_string()))?;
        endpoint.create()?;
        self.opened = true;
        debug!("Opened pipe {}", self.path);
        Ok(())
    }

    /// Open if needed and spawn the drain worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Err(SnifferError::Worker("pipe already started".to_string()));
        }

        let session_header = global_header(self.config.link_type)?;
        self.open()?;
        let endpoint = self
            .endpoint
            .take()
            .ok_or_else(|| SnifferError::Worker("pipe is closed".to_string()))?;

        let ctx = WorkerContext {
            slot: self.slot.clone(),
            state: self.state.clone(),
            cancel: self.cancel.clone(),
            session_header,
            retry_interval: self.config.retry_interval,
        };

        self.state.send_replace(PipeState::Opening);
        self.worker = Some(tokio::spawn(drain_loop(endpoint, ctx)));
        debug!("Started pipe worker for {}", self.path);
        Ok(())
    }

    /// Stop the worker and release the OS object.
    ///
    /// Safe to call in any state, including while waiting for a consumer.
    pub async fn stop(&mut self) -> Result<()> {
        self.cancel.cancel();
        self.state.send_replace(PipeState::Stopping);

        let endpoint = match self.worker.take() {
            Some(handle) => match handle.await {
                Ok(endpoint) => Some(endpoint),
                Err(e) => {
                    error!("Pipe worker for {} failed: {}", self.path, e);
                    self.opened = false;
                    self.state.send_replace(PipeState::Closed);
                    return Err(SnifferError::Worker(e.to_string()));
                }
            },
            None => self.endpoint.take(),
        };

        self.slot.clear();

        let result = match endpoint {
            Some(mut endpoint) if self.opened => endpoint.release(),
            _ => Ok(()),
        };
        self.opened = false;
        self.state.send_replace(PipeState::Closed);

        if let Err(e) = &result {
            warn!("Failed to release pipe {}: {}", self.path, e);
        }
        result
    }

    /// Submit a frame stamped with the current time.
    ///
    /// Never blocks. Returns `true` if an unflushed older frame was replaced.
    pub fn submit_frame(&self, frame: impl Into<Bytes>) -> bool {
        self.sender().submit(frame)
    }

    /// Handle for submitting frames from other tasks or threads.
    pub fn sender(&self) -> FrameSender {
        FrameSender {
            slot: self.slot.clone(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipeState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<PipeState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> PipeStats {
        self.slot.stats()
    }

    /// OS path of the pipe.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &PipeConfig {
        &self.config
    }

    /// Check if the worker is running.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }
}

impl<E: PipeEndpoint> Drop for StreamingPipe<E> {
    fn drop(&mut self) {
        // The worker exits on its own; release needs `stop().await`.
        self.cancel.cancel();
    }
}
