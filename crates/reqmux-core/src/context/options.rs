//! Per-transfer options resolved once at context init.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::HttpConfig;

/// Options every transfer of a context is started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub proxy: Option<String>,
    pub reuse_connections: bool,
    /// Trust bundle handed to the transport; `None` means its built-in default.
    pub trust_bundle: Option<PathBuf>,
    pub verify_peer: bool,
    pub connect_timeout: Duration,
    pub transfer_timeout: Option<Duration>,
    pub follow_redirects: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::resolve(&HttpConfig::default(), None)
    }
}

impl RequestOptions {
    /// Combine configuration with the resolved trust bundle.
    pub fn resolve(http: &HttpConfig, trust_bundle: Option<PathBuf>) -> Self {
        let verify_peer = derive_verify_peer(trust_bundle.as_deref(), http.verify_peer);
        Self {
            proxy: normalize_proxy(http.proxy_address.as_deref()),
            reuse_connections: http.reuse_connections,
            trust_bundle,
            verify_peer,
            connect_timeout: Duration::from_secs(http.connect_timeout_secs),
            transfer_timeout: (http.transfer_timeout_secs > 0)
                .then(|| Duration::from_secs(http.transfer_timeout_secs)),
            follow_redirects: http.follow_redirects,
        }
    }

    /// Print the effective options at info level.
    pub fn log(&self) {
        tracing::info!("request options (configurable via config file and environment):");
        tracing::info!(
            " - verify_peer = {}  - peer certificates will {}be verified",
            self.verify_peer,
            if self.verify_peer { "" } else { "NOT " }
        );
        match self.proxy.as_deref() {
            Some(proxy) => tracing::info!(" - proxy = '{}'", proxy),
            None => tracing::info!(" - proxy = none"),
        }
        tracing::info!(
            " - reuse_connections = {}  - connections will {}be reused",
            self.reuse_connections,
            if self.reuse_connections { "" } else { "NOT " }
        );
        match self.trust_bundle.as_deref() {
            Some(path) => tracing::info!(" - trust_bundle = {}", path.display()),
            None => tracing::info!(" - trust_bundle = none (transport build-time default)"),
        }
    }
}

/// Peer verification is only possible with a trust bundle; otherwise it is
/// forced off regardless of `configured`.
pub fn derive_verify_peer(trust_bundle: Option<&Path>, configured: bool) -> bool {
    trust_bundle.is_some() && configured
}

fn normalize_proxy(proxy: Option<&str>) -> Option<String> {
    let proxy = proxy?;
    let trimmed = proxy.trim();
    if trimmed.is_empty() {
        tracing::warn!("proxy address is set but empty; not using a proxy");
        return None;
    }
    Some(trimmed.to_string())
}
