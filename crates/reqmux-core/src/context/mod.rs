//! Transport context: the explicitly constructed owner of the transport
//! library, the multiplexer and the shared cache.
//!
//! One context is meant to live for the whole networking lifetime of a
//! process; tests create as many isolated contexts as they like. Requests may
//! only be submitted between `init` and `shutdown`.

mod options;
pub mod trust;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{HttpConfig, ReqmuxConfig};
use crate::error::SchedulerError;
use crate::transport::Transport;

pub use options::{derive_verify_peer, RequestOptions};

struct ContextState<T: Transport> {
    multiplexer: T::Mux,
    share: T::Share,
    options: RequestOptions,
}

pub struct TransportContext<T: Transport> {
    transport: T,
    state: Option<ContextState<T>>,
    live: Arc<AtomicBool>,
}

impl<T: Transport> TransportContext<T> {
    /// Uninitialized context; call `init` before submitting anything.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: None,
            live: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Initialize with trust bundle discovery from `cfg.trust`.
    pub fn init(&mut self, cfg: &ReqmuxConfig) -> Result<(), SchedulerError> {
        self.init_with(&cfg.http, || trust::discover(&cfg.trust))
    }

    /// Initialize: transport library, multiplexer, shared cache, then request
    /// options with the trust bundle from `resolve_trust`.
    ///
    /// A second call logs a warning and returns `AlreadyInitialized` without
    /// touching the running context.
    pub fn init_with<R>(&mut self, http: &HttpConfig, resolve_trust: R) -> Result<(), SchedulerError>
    where
        R: FnOnce() -> Option<PathBuf>,
    {
        if self.state.is_some() {
            tracing::warn!("transport context already initialized");
            return Err(SchedulerError::AlreadyInitialized);
        }

        self.transport.init_library()?;

        let Some(multiplexer) = self.transport.create_multiplexer(http) else {
            tracing::error!("could not create transfer multiplexer; HTTP transfers will not function");
            self.transport.cleanup_library();
            return Err(SchedulerError::MultiplexerCreateFailed);
        };
        let Some(share) = self.transport.create_share_cache(http) else {
            tracing::error!("could not create shared connection cache");
            drop(multiplexer);
            self.transport.cleanup_library();
            return Err(SchedulerError::ShareCacheCreateFailed);
        };

        let options = RequestOptions::resolve(http, resolve_trust());
        options.log();

        self.state = Some(ContextState {
            multiplexer,
            share,
            options,
        });
        self.live.store(true, Ordering::Release);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn options(&self) -> Option<&RequestOptions> {
        self.state.as_ref().map(|s| &s.options)
    }

    /// Destroy the multiplexer and shared cache, then release the transport library.
    ///
    /// The caller must make sure no transfers are in flight. No-op when not initialized.
    pub fn shutdown(&mut self) {
        self.live.store(false, Ordering::Release);
        let Some(state) = self.state.take() else {
            return;
        };
        drop(state);
        self.transport.cleanup_library();
        tracing::info!("transport context shut down");
    }

    /// Flag observed by submitters: true between `init` and `shutdown`.
    pub(crate) fn liveness(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.live)
    }

    pub(crate) fn parts_mut(&mut self) -> Option<(&mut T::Mux, &T::Share, &RequestOptions)> {
        let state = self.state.as_mut()?;
        Some((&mut state.multiplexer, &state.share, &state.options))
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Drop for TransportContext<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
