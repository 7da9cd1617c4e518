//! Trust bundle discovery.
//!
//! `resolve_trust_bundle` is pure over its inputs: the caller supplies the
//! existence check and the fallback generator, so discovery can be tested
//! without touching the real filesystem.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::TrustConfig;

/// Well-known CA bundle locations on Linux distributions, checked in order.
pub const DEFAULT_BUNDLE_PATHS: &[&str] = &[
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/ssl/ca-bundle.pem",
];

pub const GENERATED_BUNDLE_NAME: &str = "ca-bundle.pem";

/// First candidate for which `exists` holds; otherwise whatever `fallback` produces.
pub fn resolve_trust_bundle<E, F>(candidates: &[PathBuf], exists: E, fallback: F) -> Option<PathBuf>
where
    E: Fn(&Path) -> bool,
    F: FnOnce() -> Option<PathBuf>,
{
    for candidate in candidates {
        tracing::debug!("checking if '{}' exists", candidate.display());
        if exists(candidate.as_path()) {
            return Some(candidate.clone());
        }
    }
    fallback()
}

/// Candidates from config followed by the well-known locations.
pub fn candidate_paths(trust: &TrustConfig) -> Vec<PathBuf> {
    trust
        .extra_bundles
        .iter()
        .cloned()
        .chain(DEFAULT_BUNDLE_PATHS.iter().map(PathBuf::from))
        .collect()
}

/// Assembles a PEM bundle from a directory of system certificates.
#[derive(Debug, Clone)]
pub struct BundleGenerator {
    pub system_cert_dir: PathBuf,
    pub override_bundle: Option<PathBuf>,
    pub additions: Option<PathBuf>,
    pub output: PathBuf,
}

impl BundleGenerator {
    /// Generator for `trust`, or `None` when no system certificate directory is configured.
    pub fn from_config(trust: &TrustConfig) -> Option<Self> {
        let system_cert_dir = trust.system_cert_dir.clone()?;
        let output_dir = match trust.output_dir.clone() {
            Some(dir) => dir,
            None => default_output_dir()?,
        };
        Some(Self {
            system_cert_dir,
            override_bundle: trust.override_bundle.clone(),
            additions: trust.additions.clone(),
            output: output_dir.join(GENERATED_BUNDLE_NAME),
        })
    }

    /// Reuse an existing generated bundle or write a new one. `None` on failure.
    pub fn generate(&self) -> Option<PathBuf> {
        if self.output.is_file() {
            tracing::info!("using existing PEM file: '{}'", self.output.display());
            return Some(self.output.clone());
        }
        match self.write_bundle() {
            Ok(()) => {
                tracing::info!("using generated PEM file: '{}'", self.output.display());
                Some(self.output.clone())
            }
            Err(e) => {
                tracing::warn!(
                    "failed to generate a PEM cert bundle at {}: {}; TLS may not work",
                    self.output.display(),
                    e
                );
                let _ = fs::remove_file(&self.output);
                None
            }
        }
    }

    fn write_bundle(&self) -> io::Result<()> {
        if let Some(parent) = self.output.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&self.output)?;

        if let Some(contents) = self.override_bundle.as_deref().and_then(read_optional) {
            out.write_all(&contents)?;
            return out.flush();
        }

        let mut certs: Vec<PathBuf> = fs::read_dir(&self.system_cert_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        certs.sort();
        for cert in &certs {
            // Unreadable entries are skipped; the rest of the directory still counts.
            if let Some(contents) = read_optional(cert) {
                write_pem(&mut out, &contents)?;
            }
        }
        if let Some(contents) = self.additions.as_deref().and_then(read_optional) {
            write_pem(&mut out, &contents)?;
        }
        out.flush()
    }
}

fn read_optional(path: &Path) -> Option<Vec<u8>> {
    fs::read(path).ok()
}

fn write_pem(out: &mut fs::File, contents: &[u8]) -> io::Result<()> {
    out.write_all(contents)?;
    if !contents.ends_with(b"\n") {
        out.write_all(b"\n")?;
    }
    Ok(())
}

fn default_output_dir() -> Option<PathBuf> {
    xdg::BaseDirectories::with_prefix("reqmux")
        .ok()
        .and_then(|dirs| dirs.create_state_directory("certs").ok())
}

/// Full discovery for `trust`: configured and well-known bundles first, then
/// generation when a system certificate directory is configured.
pub fn discover(trust: &TrustConfig) -> Option<PathBuf> {
    let found = resolve_trust_bundle(
        &candidate_paths(trust),
        |p| p.is_file(),
        || BundleGenerator::from_config(trust).and_then(|g| g.generate()),
    );
    if found.is_none() {
        tracing::info!("did not find a cert bundle in any of known locations, TLS may not work");
    }
    found
}
