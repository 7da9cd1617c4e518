//! libcurl backend: one `curl::multi::Multi` drives every admitted `Easy2`,
//! and one share handle carries DNS, TLS session and cookie data across them.

mod handler;
mod multiplexer;
mod setup;
mod share;

use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::SchedulerError;

use super::Transport;

pub use handler::ResponseCollector;
pub use multiplexer::{CurlMultiplexer, CurlTransfer};
pub use share::SharedCache;

/// libcurl lifecycle.
#[derive(Debug, Default)]
pub struct CurlTransport {
    initialized: bool,
}

impl CurlTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for CurlTransport {
    type Share = SharedCache;
    type Mux = CurlMultiplexer;

    fn init_library(&mut self) -> Result<(), SchedulerError> {
        curl::init();
        self.initialized = true;
        log_version_info();
        Ok(())
    }

    fn create_multiplexer(&mut self, http: &HttpConfig) -> Option<CurlMultiplexer> {
        let mut multi = curl::multi::Multi::new();
        if http.max_cached_connections > 0 {
            if let Err(e) = multi.set_max_connects(http.max_cached_connections) {
                tracing::warn!("curl multi: could not limit cached connections: {}", e);
            }
        }
        Some(CurlMultiplexer::new(multi))
    }

    fn create_share_cache(&mut self, http: &HttpConfig) -> Option<SharedCache> {
        SharedCache::new(Duration::from_secs(http.dns_cache_timeout_secs))
    }

    fn cleanup_library(&mut self) {
        // curl-rust tears libcurl down at process exit; nothing to release per context.
        if self.initialized {
            tracing::debug!("libcurl transport released");
            self.initialized = false;
        }
    }
}

fn log_version_info() {
    let info = curl::Version::get();
    tracing::info!("using libcurl {}", info.version());
    tracing::info!(" - built for {}", info.host());
    match info.ssl_version() {
        Some(ssl) if info.feature_ssl() => tracing::info!(" - supports SSL with {}", ssl),
        _ => tracing::info!(" - NO SSL SUPPORT!"),
    }
    if info.feature_libz() {
        if let Some(libz) = info.libz_version() {
            tracing::info!(" - supports HTTP deflate (compression) using libz {}", libz);
        }
    }
    let features = [
        ("ssl", info.feature_ssl()),
        ("libz", info.feature_libz()),
        ("debug", info.feature_debug()),
        ("ipv6", info.feature_ipv6()),
        ("async_dns", info.feature_async_dns()),
        ("largefile", info.feature_largefile()),
        ("idn", info.feature_idn()),
        ("http2", info.feature_http2()),
    ];
    let enabled: Vec<&str> = features
        .iter()
        .filter(|(_, on)| *on)
        .map(|(name, _)| *name)
        .collect();
    tracing::info!(" - other features: {}", enabled.join(", "));
}
