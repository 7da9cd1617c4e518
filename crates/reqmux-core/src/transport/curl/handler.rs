//! Easy2 Handler collecting the response of one transfer in the curl backend.

use std::str;

use crate::request::Response;

/// Handler state for one transfer. Implements curl's Handler for Easy2.
#[derive(Debug, Default)]
pub struct ResponseCollector {
    pub(super) headers: Vec<String>,
    pub(super) body: Vec<u8>,
}

impl ResponseCollector {
    /// Move the collected response out, leaving the collector empty.
    pub(super) fn take_response(&mut self, status: u32) -> Response {
        Response {
            status,
            headers: std::mem::take(&mut self.headers),
            body: std::mem::take(&mut self.body),
        }
    }
}

impl curl::easy::Handler for ResponseCollector {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(s) = str::from_utf8(data) {
            let line = s.trim_end();
            if line.starts_with("HTTP/") {
                // Redirects and 100-continue produce several header blocks; keep the last.
                self.headers.clear();
                self.headers.push(line.to_string());
            } else if !line.is_empty() {
                self.headers.push(line.to_string());
            }
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        self.body.extend_from_slice(data);
        Ok(data.len())
    }
}
