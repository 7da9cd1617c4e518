//! Retry and backoff policy for the request layer.
//!
//! The scheduler never retries; callers classify a `Completion` here and
//! decide whether to resubmit.

mod classify;
mod policy;

pub use classify::{classify_completion, classify_curl_error, classify_http_status, classify_result_code};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
