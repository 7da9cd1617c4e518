//! Per-tick observability and the secondary request source hook.

use std::time::Duration;

/// What one `Scheduler::tick` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Transfers in flight after the tick.
    pub in_flight: usize,
    /// Transfers admitted into the multiplexer during this tick.
    pub admitted: usize,
    /// Transfers the multiplexer refused during this tick.
    pub rejected: usize,
    /// Completions delivered during this tick.
    pub completed: usize,
    /// Requests still waiting for admission.
    pub pending: usize,
    pub elapsed: Duration,
    /// The tick took longer than the hitch threshold (always false when the threshold is zero).
    pub hitch: bool,
}

/// Lower-priority request source ticked after admission (e.g. single-shot
/// requests that do not go through the multiplexer).
pub trait SecondarySource {
    fn tick(&mut self, delta: Duration);
}

impl<F> SecondarySource for F
where
    F: FnMut(Duration),
{
    fn tick(&mut self, delta: Duration) {
        self(delta)
    }
}
