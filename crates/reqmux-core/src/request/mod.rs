//! Request, response and completion types exchanged with the scheduler.
//!
//! A `Request` is owned by the caller until it is handed to a `Submitter`;
//! from then on the scheduler thread is its only mutator until the single
//! `Completion` is delivered through the request's `CompletionSink`.

mod sink;

use std::fmt;
use std::str::FromStr;

use crate::error::SchedulerError;

pub use sink::{callback_sink, oneshot_sink, Callback, CompletionSink};

/// Opaque identifier for one network transfer. Allocated once per submission,
/// never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransferHandle(pub u64);

impl fmt::Display for TransferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Transport result code (libcurl `CURLcode` / `CURLMcode` for the curl backend).
/// Zero means the transfer completed at the transport level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(pub i32);

impl ResultCode {
    pub const OK: ResultCode = ResultCode(0);
    /// Used when the scheduler itself could not hand a transfer over (no prepared transfer).
    pub const INTERNAL: ResultCode = ResultCode(-1);

    pub fn is_ok(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            other => Err(SchedulerError::InvalidRequest(format!(
                "unsupported method {}",
                other
            ))),
        }
    }
}

/// One HTTP operation. Headers and body are opaque to the scheduler; the
/// transport applies them when the transfer begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    /// Build a request for an absolute http(s) URL.
    pub fn new(method: Method, url: &str) -> Result<Self, SchedulerError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SchedulerError::InvalidRequest(format!("{}: {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(SchedulerError::InvalidRequest(format!(
                    "unsupported scheme {} in {}",
                    scheme, url
                )))
            }
        }
        Ok(Self {
            method,
            url: parsed.to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        })
    }

    pub fn get(url: &str) -> Result<Self, SchedulerError> {
        Self::new(Method::Get, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }
}

/// Response collected by the transport for a finished transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// HTTP status of the final response (0 if none was received).
    pub status: u32,
    /// Raw header lines of the final response, status line first.
    pub headers: Vec<String>,
    pub body: Vec<u8>,
}

impl Response {
    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (k, v) = line.split_once(':')?;
            if k.trim().eq_ignore_ascii_case(name) {
                Some(v.trim())
            } else {
                None
            }
        })
    }
}

/// The single notification delivered for a submitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub handle: TransferHandle,
    pub code: ResultCode,
    pub outcome: Result<Response, SchedulerError>,
}

impl Completion {
    pub(crate) fn failed(handle: TransferHandle, error: SchedulerError) -> Self {
        Self {
            handle,
            code: error.result_code().unwrap_or(ResultCode::INTERNAL),
            outcome: Err(error),
        }
    }

    /// True when the transfer finished at the transport level (any HTTP status).
    pub fn is_transport_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}
