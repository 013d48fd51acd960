//! Drain worker: waits for a consumer, then writes pending frames as pcap
//! records until the consumer goes away or the pipe is stopped.
//!
//! # Architecture
//!
//! ```text
//! capture path ─► PendingSlot (last-write-wins) ─► worker ─► PipeWriter ─► consumer
//! ```
//!
//! Every successful attach is a new pcap session: the global header goes out
//! once, before the first record of that session.

use std::io::IoSlice;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::slot::PendingSlot;
use super::PipeState;
use crate::capture::record;
use crate::error::SnifferError;
use crate::transport::PipeEndpoint;

/// Shared state the worker needs from its [`StreamingPipe`](super::StreamingPipe).
pub(crate) struct WorkerContext {
    pub slot: Arc<PendingSlot>,
    pub state: Arc<watch::Sender<PipeState>>,
    pub cancel: CancellationToken,
    /// Encoded global header, written at the start of every session.
    pub session_header: Bytes,
    pub retry_interval: Duration,
}

/// Main worker loop. Returns the endpoint so the owner can release it.
pub(crate) async fn drain_loop<E: PipeEndpoint>(mut endpoint: E, ctx: WorkerContext) -> E {
    'session: loop {
        ctx.state.send_replace(PipeState::Opening);
        debug!("Waiting for consumer on {}", endpoint.path());

        let attached = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break 'session,
            attached = endpoint.attach() => attached,
        };

        let mut writer = match attached {
            Ok(writer) => writer,
            Err(e) => {
                warn!("Failed to attach consumer on {}: {}", endpoint.path(), e);
                tokio::select! {
                    biased;
                    _ = ctx.cancel.cancelled() => break 'session,
                    _ = tokio::time::sleep(ctx.retry_interval) => continue 'session,
                }
            }
        };

        ctx.slot.record_session();
        ctx.state.send_replace(PipeState::Streaming);
        info!("Consumer attached on {}", endpoint.path());

        let mut header_sent = false;
        loop {
            let frame = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => break 'session,
                frame = ctx.slot.next() => frame,
            };

            let record = match record(&frame.data, frame.captured_at_micros) {
                Ok(record) => record,
                Err(e) => {
                    ctx.slot.record_rejected();
                    warn!("Dropping frame for {}: {}", endpoint.path(), e);
                    continue;
                }
            };

            let header = (!header_sent).then_some(&ctx.session_header[..]);
            let written = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => break 'session,
                written = write_session_frame(&mut writer, header, &record) => written,
            };

            match written {
                Ok(()) => {
                    header_sent = true;
                    ctx.slot.record_written();
                }
                Err(e) => {
                    ctx.slot.record_failed();
                    match SnifferError::from_pipe_write(e) {
                        SnifferError::ConsumerDisconnected => {
                            info!("Consumer detached from {}, frame dropped", endpoint.path())
                        }
                        other => warn!("Write to {} failed, frame dropped: {}", endpoint.path(), other),
                    }
                    // Dropping the writer closes our end of the broken connection.
                    continue 'session;
                }
            }
        }
    }

    ctx.state.send_replace(PipeState::Stopping);
    debug!("Pipe worker for {} stopped", endpoint.path());
    endpoint
}

/// Write one encoded record, preceded by the global header when given.
///
/// Uses scatter/gather I/O; a partial write continues with the remaining
/// bytes.
pub(crate) async fn write_session_frame<W>(
    writer: &mut W,
    global_header: Option<&[u8]>,
    record: &[u8],
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut parts: Vec<&[u8]> = Vec::with_capacity(2);
    if let Some(header) = global_header {
        parts.push(header);
    }
    parts.push(record);

    let total_size: usize = parts.iter().map(|p| p.len()).sum();
    let mut total_written = 0;

    while total_written < total_size {
        let slices = remaining_slices(&parts, total_written);
        let written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            ));
        }
        total_written += written;
    }

    writer.flush().await
}

/// Build IoSlice array for the data not yet written.
fn remaining_slices<'a>(parts: &[&'a [u8]], skip_bytes: usize) -> Vec<IoSlice<'a>> {
    let mut slices = Vec::with_capacity(parts.len());
    let mut skipped = 0;

    for part in parts {
        let start = skipped;
        let end = skipped + part.len();

        if skip_bytes < end {
            let start_in_part = skip_bytes.saturating_sub(start);
            slices.push(IoSlice::new(&part[start_in_part..]));
        }
        skipped = end;
    }

    slices
}
