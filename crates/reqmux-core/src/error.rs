//! Error taxonomy shared by the registry, scheduler and transport context.

use crate::request::{ResultCode, TransferHandle};

/// Errors surfaced by the scheduler and the transport context.
///
/// Per-transfer variants (`AdmissionRejected`, `TransferFailed`) only ever
/// reach the owning request's completion sink. Context creation variants are
/// fatal for networking; everything else is recoverable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// Operation attempted before the transport context was initialized (or after shutdown).
    #[error("transport context is not initialized")]
    NotInitialized,
    /// `init` called on a context that is already initialized.
    #[error("transport context is already initialized")]
    AlreadyInitialized,
    /// The underlying transport library refused to initialize.
    #[error("transport library initialization failed: {0}")]
    TransportInit(String),
    #[error("could not create transfer multiplexer; HTTP transfers will not function")]
    MultiplexerCreateFailed,
    #[error("could not create shared connection cache")]
    ShareCacheCreateFailed,
    /// The multiplexer refused this transfer. Not retried by the scheduler.
    #[error("multiplexer rejected transfer (code {0})")]
    AdmissionRejected(ResultCode),
    /// Transport-level failure, reported verbatim.
    #[error("transfer failed (code {0})")]
    TransferFailed(ResultCode),
    /// The multiplexer reported a finished transfer the registry does not know.
    #[error("completion reported for unknown transfer {0}")]
    RegistryInvariantViolation(TransferHandle),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl SchedulerError {
    /// True for errors after which the process cannot offer networking.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SchedulerError::MultiplexerCreateFailed
                | SchedulerError::ShareCacheCreateFailed
                | SchedulerError::TransportInit(_)
        )
    }

    /// Transport result code carried by per-transfer errors.
    pub fn result_code(&self) -> Option<ResultCode> {
        match self {
            SchedulerError::AdmissionRejected(code) | SchedulerError::TransferFailed(code) => {
                Some(*code)
            }
            _ => None,
        }
    }
}
