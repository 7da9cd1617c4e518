//! CLI command handlers, one per file.

mod config;
pub(crate) mod fetch;
mod trust;

pub use config::run_config;
pub use fetch::run_fetch;
pub use trust::run_trust;
