pub mod config;
pub mod logging;

pub mod context;
pub mod driver;
pub mod error;
pub mod request;
pub mod retry;
pub mod scheduler;
pub mod transport;

pub use context::TransportContext;
pub use driver::DriverHandle;
pub use error::SchedulerError;
pub use request::{Completion, CompletionSink, Method, Request, Response, ResultCode, TransferHandle};
pub use scheduler::{AdmissionBudget, Scheduler, Submitter, TickReport};
pub use transport::curl::CurlTransport;
