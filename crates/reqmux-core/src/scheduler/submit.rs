//! Cross-thread submission path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Instant;

use crate::error::SchedulerError;
use crate::request::{Completion, CompletionSink, Request, TransferHandle};

/// A request on its way from a caller thread to the scheduler thread.
///
/// A submission dropped before the scheduler took its sink (for instance
/// still queued when the scheduler goes away) completes with `NotInitialized`.
pub(crate) struct Submission {
    pub handle: TransferHandle,
    pub request: Request,
    pub submitted_at: Instant,
    sink: Option<Box<dyn CompletionSink>>,
}

impl Submission {
    pub fn take_sink(&mut self) -> Option<Box<dyn CompletionSink>> {
        self.sink.take()
    }
}

impl Drop for Submission {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            tracing::debug!(handle = %self.handle, "submission dropped before intake");
            sink.complete(Completion::failed(self.handle, SchedulerError::NotInitialized));
        }
    }
}

/// Cloneable handle for submitting requests from any thread. Never blocks on I/O.
#[derive(Clone)]
pub struct Submitter {
    tx: mpsc::Sender<Submission>,
    next_handle: Arc<AtomicU64>,
    live: Arc<AtomicBool>,
}

impl Submitter {
    pub(crate) fn new(tx: mpsc::Sender<Submission>, live: Arc<AtomicBool>) -> Self {
        Self {
            tx,
            next_handle: Arc::new(AtomicU64::new(1)),
            live,
        }
    }

    /// Hand `request` to the scheduler. `sink` receives exactly one completion.
    ///
    /// Fails with `NotInitialized` when the transport context is not live or
    /// the scheduler is gone; the sink is dropped unused in that case.
    pub fn submit(
        &self,
        request: Request,
        sink: Box<dyn CompletionSink>,
    ) -> Result<TransferHandle, SchedulerError> {
        if !self.live.load(Ordering::Acquire) {
            return Err(SchedulerError::NotInitialized);
        }
        let handle = TransferHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let submission = Submission {
            handle,
            request,
            submitted_at: Instant::now(),
            sink: Some(sink),
        };
        // On a failed send the caller gets the error, so the sink is dropped unused.
        self.tx.send(submission).map_err(|mpsc::SendError(mut rejected)| {
            rejected.take_sink();
            SchedulerError::NotInitialized
        })?;
        tracing::debug!(%handle, "request submitted");
        Ok(handle)
    }
}
