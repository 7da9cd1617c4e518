//! Throttled request scheduler.
//!
//! Caller threads submit through a `Submitter`; the thread that owns the
//! `TransportContext` calls `Scheduler::tick` at its own cadence. Each tick
//! takes in new submissions, advances the multiplexer, drains finished
//! transfers to their completion sinks, tops up the in-flight set under the
//! `AdmissionBudget`, and finally runs the optional secondary request source.
//!
//! Failed transfers are not retried here; that is the request layer's call.
//! Cancellation is not supported: a caller that no longer cares simply
//! ignores the completion.

mod admission;
mod registry;
mod report;
mod submit;


use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::context::{RequestOptions, TransportContext};
use crate::error::SchedulerError;
use crate::request::Completion;
use crate::transport::{Multiplexer, Transport};

pub use admission::{AdmissionBudget, AdmissionOutcome};
pub use registry::{Registry, RegistryEntry};
pub use report::{SecondarySource, TickReport};
pub use submit::Submitter;

use submit::Submission;

type TransferOf<T> = <<T as Transport>::Mux as Multiplexer>::Transfer;

pub struct Scheduler<T: Transport> {
    budget: AdmissionBudget,
    registry: Registry<TransferOf<T>>,
    in_flight: usize,
    intake: mpsc::Receiver<Submission>,
    submitter: Submitter,
    secondary: Option<Box<dyn SecondarySource>>,
    hitch_threshold: Duration,
}

impl<T: Transport> Scheduler<T> {
    /// Scheduler bound to `ctx`. Submissions are accepted while `ctx` is initialized.
    pub fn new(ctx: &TransportContext<T>, budget: AdmissionBudget) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            budget,
            registry: Registry::new(),
            in_flight: 0,
            intake: rx,
            submitter: Submitter::new(tx, ctx.liveness()),
            secondary: None,
            hitch_threshold: Duration::ZERO,
        }
    }

    /// Log a warning for ticks slower than `threshold` (zero disables).
    pub fn with_hitch_threshold(mut self, threshold: Duration) -> Self {
        self.hitch_threshold = threshold;
        self
    }

    /// Install the lower-priority request source run at the end of every tick.
    pub fn set_secondary_source(&mut self, source: Box<dyn SecondarySource>) {
        self.secondary = Some(source);
    }

    pub fn submitter(&self) -> Submitter {
        self.submitter.clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Requests known to the scheduler (pending or in flight).
    pub fn registered(&self) -> usize {
        self.registry.len()
    }

    /// Nothing pending and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.registry.is_empty() && self.in_flight == 0
    }

    /// One scheduling step. Never waits on network I/O.
    pub fn tick(
        &mut self,
        ctx: &mut TransportContext<T>,
        delta: Duration,
    ) -> Result<TickReport, SchedulerError> {
        let started = Instant::now();
        let (mux, share, options) = ctx.parts_mut().ok_or(SchedulerError::NotInitialized)?;
        let mut report = TickReport::default();

        self.take_submissions(mux, share, options);

        if self.in_flight > 0 {
            if let Err(code) = mux.advance() {
                tracing::warn!(%code, "multiplexer advance failed");
            }
            report.completed = self.drain_completions(mux);
        }

        let admission = admission::admit(&mut self.registry, mux, self.budget, &mut self.in_flight);
        report.admitted = admission.admitted;
        report.rejected = admission.rejected;
        let scheduler_time = started.elapsed();

        let secondary_time = match self.secondary.as_mut() {
            Some(source) => {
                let t = Instant::now();
                source.tick(delta);
                t.elapsed()
            }
            None => Duration::ZERO,
        };

        report.in_flight = self.in_flight;
        report.pending = self.registry.unadmitted_count();
        report.elapsed = scheduler_time + secondary_time;

        report.hitch = !self.hitch_threshold.is_zero() && report.elapsed > self.hitch_threshold;
        if report.hitch {
            tracing::warn!(
                "hitch in request scheduler: scheduler tick {:.1} ms, secondary source {:.1} ms, {} request(s) registered",
                scheduler_time.as_secs_f64() * 1000.0,
                secondary_time.as_secs_f64() * 1000.0,
                self.registry.len()
            );
        }
        tracing::trace!(
            in_flight = report.in_flight,
            admitted = report.admitted,
            completed = report.completed,
            pending = report.pending,
            "tick"
        );
        Ok(report)
    }

    /// Move queued submissions into the registry, preparing their transfers.
    fn take_submissions(&mut self, mux: &T::Mux, share: &T::Share, options: &RequestOptions) {
        while let Ok(mut sub) = self.intake.try_recv() {
            let Some(sink) = sub.take_sink() else {
                continue;
            };
            let handle = sub.handle;
            match mux.begin_transfer(handle, &sub.request, options, share) {
                Ok(transfer) => {
                    let entry = RegistryEntry::new(handle, sink, sub.submitted_at, transfer);
                    if let Err(dup) = self.registry.insert(entry) {
                        tracing::warn!(%handle, "duplicate transfer handle; dropping submission");
                        dup.sink.complete(Completion::failed(
                            handle,
                            SchedulerError::RegistryInvariantViolation(handle),
                        ));
                    }
                }
                Err(code) => {
                    tracing::warn!(%handle, %code, url = sub.request.url(), "could not begin transfer");
                    sink.complete(Completion::failed(handle, SchedulerError::TransferFailed(code)));
                }
            }
        }
    }

    /// Dispatch every finished transfer the multiplexer reports. Returns how many were delivered.
    fn drain_completions(&mut self, mux: &mut T::Mux) -> usize {
        let mut delivered = 0;
        while let Some((handle, code)) = mux.poll_completion() {
            let response = mux.remove_transfer(handle);
            if response.is_some() {
                self.in_flight = self.in_flight.saturating_sub(1);
            }
            let Some(entry) = self.registry.retire(handle) else {
                tracing::warn!(
                    error = %SchedulerError::RegistryInvariantViolation(handle),
                    "dropping completion"
                );
                continue;
            };
            let outcome = if code.is_ok() {
                Ok(response.unwrap_or_default())
            } else {
                Err(SchedulerError::TransferFailed(code))
            };
            tracing::debug!(%handle, %code, "transfer completed");
            entry.sink.complete(Completion {
                handle,
                code,
                outcome,
            });
            delivered += 1;
        }
        delivered
    }

    /// Fail every queued or registered request with `NotInitialized`.
    /// Only meaningful once the context has been shut down.
    pub fn abandon_pending(&mut self) -> usize {
        let mut abandoned = 0;
        while let Ok(mut sub) = self.intake.try_recv() {
            if let Some(sink) = sub.take_sink() {
                sink.complete(Completion::failed(sub.handle, SchedulerError::NotInitialized));
                abandoned += 1;
            }
        }
        for entry in self.registry.drain() {
            entry
                .sink
                .complete(Completion::failed(entry.handle, SchedulerError::NotInitialized));
            abandoned += 1;
        }
        self.in_flight = 0;
        abandoned
    }
}
