//! Completion sinks: where a request's admission result and completion go.

use std::sync::mpsc;

use crate::error::SchedulerError;

use super::{Completion, TransferHandle};

/// Receives the outcome of one submitted request.
///
/// `complete` is called exactly once per submitted handle, from the scheduler
/// thread. Sinks must not block.
pub trait CompletionSink: Send {
    /// Called when admission into the multiplexer was attempted.
    fn on_admission(&mut self, _handle: TransferHandle, _result: &Result<(), SchedulerError>) {}

    fn complete(self: Box<Self>, completion: Completion);
}

impl CompletionSink for mpsc::Sender<Completion> {
    fn complete(self: Box<Self>, completion: Completion) {
        // Receiver gone means the caller chose to ignore the completion.
        let _ = self.send(completion);
    }
}

impl CompletionSink for tokio::sync::oneshot::Sender<Completion> {
    fn complete(self: Box<Self>, completion: Completion) {
        let _ = (*self).send(completion);
    }
}

/// Sink that runs a closure on completion.
pub struct Callback<F>(pub F);

impl<F> CompletionSink for Callback<F>
where
    F: FnOnce(Completion) + Send,
{
    fn complete(self: Box<Self>, completion: Completion) {
        let Callback(f) = *self;
        f(completion)
    }
}

pub fn callback_sink<F>(f: F) -> Box<dyn CompletionSink>
where
    F: FnOnce(Completion) + Send + 'static,
{
    Box::new(Callback(f))
}

/// Future-style sink: await the returned receiver for the completion.
pub fn oneshot_sink() -> (
    Box<dyn CompletionSink>,
    tokio::sync::oneshot::Receiver<Completion>,
) {
    let (tx, rx) = tokio::sync::oneshot::channel();
    (Box::new(tx), rx)
}
