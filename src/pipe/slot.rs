//! Single-slot, last-write-wins handoff between the capture path and the
//! pipe worker.
//!
//! The producer never blocks: [`PendingSlot::submit`] replaces whatever
//! frame is still waiting. The worker sleeps on a [`Notify`] until a frame
//! is present, so there is no poll delay between submission and write.
//! Counters are plain atomics and can be read from any thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::warn;

use crate::capture::check_frame_len;

/// A captured frame waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFrame {
    /// Raw frame bytes, opaque to the relay.
    pub data: Bytes,
    /// Capture time in microseconds since the Unix epoch.
    pub captured_at_micros: u64,
}

impl PendingFrame {
    pub fn new(data: Bytes, captured_at_micros: u64) -> Self {
        Self {
            data,
            captured_at_micros,
        }
    }
}

/// Snapshot of pipe counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipeStats {
    /// Frames handed to the pipe.
    pub submitted: u64,
    /// Frames replaced before the worker picked them up.
    pub overwritten: u64,
    /// Records written to a consumer.
    pub written: u64,
    /// Writes that failed (frame lost).
    pub failed: u64,
    /// Frames dropped because they do not fit in a record.
    pub rejected: u64,
    /// Consumer attachments (one pcap session each).
    pub sessions: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    overwritten: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    sessions: AtomicU64,
}

/// Mutex-guarded slot holding at most one frame.
#[derive(Debug, Default)]
pub struct PendingSlot {
    frame: Mutex<Option<PendingFrame>>,
    notify: Notify,
    counters: Counters,
}

impl PendingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<PendingFrame>> {
        // A panic while holding the lock cannot leave a half-written Option.
        self.frame.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Put a frame in the slot, replacing any unflushed one.
    ///
    /// Returns `true` if an older frame was dropped. A frame longer than the
    /// snap length is counted as rejected and leaves the slot untouched.
    pub fn submit(&self, frame: PendingFrame) -> bool {
        if let Err(e) = check_frame_len(frame.data.len()) {
            self.record_rejected();
            warn!("Dropping frame: {}", e);
            return false;
        }

        let replaced = self.lock().replace(frame).is_some();

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        if replaced {
            self.counters.overwritten.fetch_add(1, Ordering::Relaxed);
        }

        self.notify.notify_one();
        replaced
    }

    /// Take the pending frame, leaving the slot empty.
    pub fn take(&self) -> Option<PendingFrame> {
        self.lock().take()
    }

    /// Wait until a frame is pending and take it.
    pub async fn next(&self) -> PendingFrame {
        loop {
            if let Some(frame) = self.take() {
                return frame;
            }
            self.notify.notified().await;
        }
    }

    /// Check if a frame is waiting.
    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Drop the pending frame, if any.
    pub fn clear(&self) {
        self.lock().take();
    }

    /// Current counters.
    pub fn stats(&self) -> PipeStats {
        PipeStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            overwritten: self.counters.overwritten.load(Ordering::Relaxed),
            written: self.counters.written.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            sessions: self.counters.sessions.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_written(&self) {
        self.counters.written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.counters.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_session(&self) {
        self.counters.sessions.fetch_add(1, Ordering::Relaxed);
    }
}
