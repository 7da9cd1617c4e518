use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// HTTP transport and admission settings (`[http]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Maximum transfers in flight at once (0 = unbounded).
    pub max_simultaneous_requests: usize,
    /// Maximum transfers newly admitted per tick (0 = unbounded).
    pub max_requests_added_per_tick: usize,
    /// Optional HTTP proxy; an empty string is treated as unset.
    pub proxy_address: Option<String>,
    /// Reuse connections between transfers.
    pub reuse_connections: bool,
    /// Verify peer certificates. Forced off when no trust bundle is found.
    pub verify_peer: bool,
    pub connect_timeout_secs: u64,
    /// Whole-transfer timeout (0 = none).
    pub transfer_timeout_secs: u64,
    pub follow_redirects: bool,
    /// Upper bound on cached idle connections (0 = transport default).
    pub max_cached_connections: usize,
    /// How long shared DNS entries are kept.
    pub dns_cache_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_simultaneous_requests: 0,
            max_requests_added_per_tick: 0,
            proxy_address: None,
            reuse_connections: true,
            verify_peer: true,
            connect_timeout_secs: 30,
            transfer_timeout_secs: 300,
            follow_redirects: true,
            max_cached_connections: 0,
            dns_cache_timeout_secs: 60,
        }
    }
}

/// Trust bundle discovery (`[trust]` in config.toml).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Bundles checked before the well-known system locations.
    pub extra_bundles: Vec<PathBuf>,
    /// Directory of individual PEM certificates; enables bundle generation
    /// when no well-known bundle exists.
    pub system_cert_dir: Option<PathBuf>,
    /// Bundle copied verbatim into the generated file instead of the system directory.
    pub override_bundle: Option<PathBuf>,
    /// Certificates appended after the system directory contents.
    pub additions: Option<PathBuf>,
    /// Where the generated `ca-bundle.pem` goes (default: XDG state dir).
    pub output_dir: Option<PathBuf>,
}

/// Headless driver settings (`[driver]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Pause between ticks of the scheduler thread.
    pub tick_interval_ms: u64,
    /// Ticks slower than this are logged as hitches (0 = off).
    pub hitch_threshold_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 5,
            hitch_threshold_ms: 20,
        }
    }
}

/// Global configuration loaded from `~/.config/reqmux/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReqmuxConfig {
    pub http: HttpConfig,
    pub trust: TrustConfig,
    pub driver: DriverConfig,
}

pub const ENV_MAX_SIMULTANEOUS: &str = "REQMUX_MAX_SIMULTANEOUS";
pub const ENV_MAX_ADDED_PER_TICK: &str = "REQMUX_MAX_ADDED_PER_TICK";
pub const ENV_HTTP_PROXY: &str = "REQMUX_HTTP_PROXY";
pub const ENV_NO_REUSE_CONN: &str = "REQMUX_NO_REUSE_CONN";
pub const ENV_VERIFY_PEER: &str = "REQMUX_VERIFY_PEER";

impl ReqmuxConfig {
    /// Apply environment overrides from the process environment.
    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup` (an environment accessor). Unparseable
    /// values are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(n) = parse_env_usize(&lookup, ENV_MAX_SIMULTANEOUS) {
            self.http.max_simultaneous_requests = n;
        }
        if let Some(n) = parse_env_usize(&lookup, ENV_MAX_ADDED_PER_TICK) {
            self.http.max_requests_added_per_tick = n;
        }
        if let Some(proxy) = lookup(ENV_HTTP_PROXY) {
            self.http.proxy_address = Some(proxy);
        }
        if let Some(v) = lookup(ENV_NO_REUSE_CONN) {
            match parse_bool(&v) {
                Some(no_reuse) => self.http.reuse_connections = !no_reuse,
                None => tracing::warn!("ignoring {}={:?}: expected a boolean", ENV_NO_REUSE_CONN, v),
            }
        }
        if let Some(v) = lookup(ENV_VERIFY_PEER) {
            match parse_bool(&v) {
                Some(verify) => self.http.verify_peer = verify,
                None => tracing::warn!("ignoring {}={:?}: expected a boolean", ENV_VERIFY_PEER, v),
            }
        }
    }
}

fn parse_env_usize<F>(lookup: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("ignoring {}={:?}: expected a non-negative integer", key, raw);
            None
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("reqmux")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ReqmuxConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ReqmuxConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ReqmuxConfig = toml::from_str(&data)?;
    Ok(cfg)
}
