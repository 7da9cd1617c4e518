//! Admission controller: promotes the oldest pending handles into the multiplexer.

use crate::config::HttpConfig;
use crate::error::SchedulerError;
use crate::request::{Completion, ResultCode, TransferHandle};
use crate::transport::Multiplexer;

use super::registry::Registry;

/// Concurrency caps; zero means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionBudget {
    pub max_simultaneous: usize,
    pub max_added_per_tick: usize,
}

impl AdmissionBudget {
    pub fn new(max_simultaneous: usize, max_added_per_tick: usize) -> Self {
        Self {
            max_simultaneous,
            max_added_per_tick,
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    fn has_room(&self, in_flight: usize) -> bool {
        self.max_simultaneous == 0 || in_flight < self.max_simultaneous
    }

    fn under_tick_cap(&self, added: usize) -> bool {
        self.max_added_per_tick == 0 || added < self.max_added_per_tick
    }
}

impl From<&HttpConfig> for AdmissionBudget {
    fn from(http: &HttpConfig) -> Self {
        Self::new(http.max_simultaneous_requests, http.max_requests_added_per_tick)
    }
}

/// What one admission pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionOutcome {
    pub admitted: usize,
    pub rejected: usize,
}

/// Admit oldest-first while both caps allow. A rejected handle still counts
/// against the per-tick cap and is retired with an `AdmissionRejected`
/// completion; it is never retried here.
pub(crate) fn admit<M: Multiplexer>(
    registry: &mut Registry<M::Transfer>,
    mux: &mut M,
    budget: AdmissionBudget,
    in_flight: &mut usize,
) -> AdmissionOutcome {
    let mut outcome = AdmissionOutcome::default();
    let mut added = 0usize;
    let mut rejected: Vec<(TransferHandle, ResultCode)> = Vec::new();

    while budget.has_room(*in_flight) && budget.under_tick_cap(added) {
        let Some(handle) = registry.find_oldest_unadmitted() else {
            break;
        };
        let Some(entry) = registry.get_mut(handle) else {
            break;
        };
        entry.admitted = true;
        added += 1;

        let result = match entry.transfer.take() {
            Some(transfer) => mux.add_transfer(handle, transfer),
            None => Err(ResultCode::INTERNAL),
        };
        match result {
            Ok(()) => {
                entry.in_flight = true;
                *in_flight += 1;
                outcome.admitted += 1;
                entry.sink.on_admission(handle, &Ok(()));
                tracing::debug!(%handle, in_flight = *in_flight, "transfer admitted");
            }
            Err(code) => {
                tracing::warn!(%handle, %code, "failed to add transfer to multiplexer");
                entry
                    .sink
                    .on_admission(handle, &Err(SchedulerError::AdmissionRejected(code)));
                rejected.push((handle, code));
            }
        }
    }

    for (handle, code) in rejected {
        if let Some(entry) = registry.retire(handle) {
            entry.sink.complete(Completion::failed(
                handle,
                SchedulerError::AdmissionRejected(code),
            ));
            outcome.rejected += 1;
        }
    }
    outcome
}
