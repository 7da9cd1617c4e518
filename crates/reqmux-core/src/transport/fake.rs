//! In-memory transport for scheduler and context tests. Tests script
//! completions and rejections through a shared `FakeControl`.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::HttpConfig;
use crate::context::RequestOptions;
use crate::error::SchedulerError;
use crate::request::{Request, Response, ResultCode, TransferHandle};

use super::{Multiplexer, Transport};

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub active: Vec<TransferHandle>,
    /// Every successful `add_transfer`, in order.
    pub added: Vec<TransferHandle>,
    pub finished: VecDeque<(TransferHandle, ResultCode)>,
    pub reject_urls: HashSet<String>,
    pub fail_begin_urls: HashSet<String>,
    pub max_active_seen: usize,
    pub advance_calls: usize,
    pub init_calls: usize,
    pub cleanup_calls: usize,
    pub last_options: Option<RequestOptions>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeControl(Arc<Mutex<FakeState>>);

impl FakeControl {
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.0.lock().unwrap()
    }

    /// Report `handle` as finished with `code` on the next poll.
    pub fn finish(&self, handle: TransferHandle, code: ResultCode) {
        self.state().finished.push_back((handle, code));
    }

    pub fn finish_all(&self, code: ResultCode) {
        let mut st = self.state();
        let active = st.active.clone();
        for h in active {
            if !st.finished.iter().any(|(f, _)| *f == h) {
                st.finished.push_back((h, code));
            }
        }
    }

    pub fn reject(&self, url: &str) {
        self.state().reject_urls.insert(url.to_string());
    }

    pub fn fail_begin(&self, url: &str) {
        self.state().fail_begin_urls.insert(url.to_string());
    }

    pub fn active(&self) -> Vec<TransferHandle> {
        self.state().active.clone()
    }

    pub fn added(&self) -> Vec<TransferHandle> {
        self.state().added.clone()
    }
}

pub(crate) struct FakeMultiplexer {
    control: FakeControl,
}

impl Multiplexer for FakeMultiplexer {
    type Share = ();
    type Transfer = String;

    fn begin_transfer(
        &self,
        _handle: TransferHandle,
        request: &Request,
        options: &RequestOptions,
        _share: &(),
    ) -> Result<String, ResultCode> {
        let mut st = self.control.state();
        st.last_options = Some(options.clone());
        if st.fail_begin_urls.contains(request.url()) {
            return Err(ResultCode(3));
        }
        Ok(request.url().to_string())
    }

    fn add_transfer(&mut self, handle: TransferHandle, url: String) -> Result<(), ResultCode> {
        let mut st = self.control.state();
        if st.reject_urls.contains(&url) {
            return Err(ResultCode(2));
        }
        st.active.push(handle);
        st.added.push(handle);
        st.max_active_seen = st.max_active_seen.max(st.active.len());
        Ok(())
    }

    fn remove_transfer(&mut self, handle: TransferHandle) -> Option<Response> {
        let mut st = self.control.state();
        let pos = st.active.iter().position(|h| *h == handle)?;
        st.active.remove(pos);
        Some(Response {
            status: 200,
            headers: vec!["HTTP/1.1 200 OK".to_string()],
            body: format!("body {}", handle.0).into_bytes(),
        })
    }

    fn advance(&mut self) -> Result<u32, ResultCode> {
        let mut st = self.control.state();
        st.advance_calls += 1;
        Ok(st.active.len() as u32)
    }

    fn poll_completion(&mut self) -> Option<(TransferHandle, ResultCode)> {
        self.control.state().finished.pop_front()
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    pub control: FakeControl,
    pub fail_init: bool,
    pub fail_multiplexer: bool,
    pub fail_share: bool,
}

impl FakeTransport {
    pub fn new(control: FakeControl) -> Self {
        Self {
            control,
            ..Self::default()
        }
    }
}

impl Transport for FakeTransport {
    type Share = ();
    type Mux = FakeMultiplexer;

    fn init_library(&mut self) -> Result<(), SchedulerError> {
        self.control.state().init_calls += 1;
        if self.fail_init {
            return Err(SchedulerError::TransportInit("fake init failure".to_string()));
        }
        Ok(())
    }

    fn create_multiplexer(&mut self, _http: &HttpConfig) -> Option<FakeMultiplexer> {
        if self.fail_multiplexer {
            return None;
        }
        Some(FakeMultiplexer {
            control: self.control.clone(),
        })
    }

    fn create_share_cache(&mut self, _http: &HttpConfig) -> Option<()> {
        if self.fail_share {
            None
        } else {
            Some(())
        }
    }

    fn cleanup_library(&mut self) {
        self.control.state().cleanup_calls += 1;
    }
}
