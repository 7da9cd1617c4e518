//! Transport contract required by the scheduler.
//!
//! The scheduler never speaks HTTP itself. A `Transport` sets up the
//! underlying library and creates one `Multiplexer`, which drives many
//! transfers with a single non-blocking `advance` call and reports finished
//! transfers through `poll_completion`. `curl` is the production backend.

pub mod curl;

#[cfg(test)]
pub(crate) mod fake;

use crate::config::HttpConfig;
use crate::context::RequestOptions;
use crate::error::SchedulerError;
use crate::request::{Request, Response, ResultCode, TransferHandle};

/// Drives many concurrent transfers. Owned and touched by the scheduler thread only.
pub trait Multiplexer {
    /// Shared cache handle created by the owning `Transport`.
    type Share;
    /// A transfer prepared for `add_transfer` but not yet admitted.
    type Transfer;

    /// Allocate and configure the transport-side transfer for `request`.
    fn begin_transfer(
        &self,
        handle: TransferHandle,
        request: &Request,
        options: &RequestOptions,
        share: &Self::Share,
    ) -> Result<Self::Transfer, ResultCode>;

    /// Add a prepared transfer to the active set.
    fn add_transfer(&mut self, handle: TransferHandle, transfer: Self::Transfer)
        -> Result<(), ResultCode>;

    /// Remove a finished transfer from the active set and collect its response.
    /// Returns `None` when `handle` is not in the active set.
    fn remove_transfer(&mut self, handle: TransferHandle) -> Option<Response>;

    /// Make non-blocking progress on every active transfer; returns how many are still running.
    fn advance(&mut self) -> Result<u32, ResultCode>;

    /// Next finished transfer and its result code, if any.
    fn poll_completion(&mut self) -> Option<(TransferHandle, ResultCode)>;
}

/// Process-wide transport library lifecycle.
pub trait Transport {
    type Share;
    type Mux: Multiplexer<Share = Self::Share>;

    fn init_library(&mut self) -> Result<(), SchedulerError>;

    /// `None` is fatal for networking.
    fn create_multiplexer(&mut self, http: &HttpConfig) -> Option<Self::Mux>;

    /// Cache for connection, session and name-resolution reuse. `None` is fatal.
    fn create_share_cache(&mut self, http: &HttpConfig) -> Option<Self::Share>;

    fn cleanup_library(&mut self);
}
