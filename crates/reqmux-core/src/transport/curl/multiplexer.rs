//! `Multiplexer` over `curl::multi::Multi`: perform, messages, add/remove Easy2 handles.

use std::collections::{HashMap, VecDeque};

use curl::easy::Easy2;
use curl::multi::{Easy2Handle, Multi};

use crate::context::RequestOptions;
use crate::request::{Request, Response, ResultCode, TransferHandle};
use crate::transport::Multiplexer;

use super::handler::ResponseCollector;
use super::setup::build_easy;
use super::SharedCache;

fn easy_code(e: &curl::Error) -> ResultCode {
    ResultCode(e.code() as i32)
}

fn multi_code(e: &curl::MultiError) -> ResultCode {
    ResultCode(e.code() as i32)
}

/// A configured easy handle waiting for admission, with the share it is attached to.
pub struct CurlTransfer {
    easy: Easy2<ResponseCollector>,
    share: SharedCache,
}

/// Field order matters: the easy handle is cleaned up before its share reference goes.
struct ActiveTransfer {
    easy: Easy2Handle<ResponseCollector>,
    _share: SharedCache,
}

/// Active Easy2 handles keyed by transfer handle. The transfer handle is
/// stored as the easy handle's token so `messages` can map back to it.
pub struct CurlMultiplexer {
    multi: Multi,
    active: HashMap<TransferHandle, ActiveTransfer>,
    finished: VecDeque<(TransferHandle, ResultCode)>,
}

impl CurlMultiplexer {
    pub(super) fn new(multi: Multi) -> Self {
        Self {
            multi,
            active: HashMap::new(),
            finished: VecDeque::new(),
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Move every pending "done" message from curl into `finished`.
    fn read_messages(&mut self) {
        let finished = &mut self.finished;
        self.multi.messages(|msg| {
            let Some(result) = msg.result() else {
                return;
            };
            match msg.token() {
                Ok(token) => {
                    let code = match result {
                        Ok(()) => ResultCode::OK,
                        Err(e) => easy_code(&e),
                    };
                    finished.push_back((TransferHandle(token as u64), code));
                }
                Err(e) => tracing::warn!("curl multi: finished transfer without token: {}", e),
            }
        });
    }
}

impl Multiplexer for CurlMultiplexer {
    type Share = SharedCache;
    type Transfer = CurlTransfer;

    fn begin_transfer(
        &self,
        handle: TransferHandle,
        request: &Request,
        options: &RequestOptions,
        share: &SharedCache,
    ) -> Result<Self::Transfer, ResultCode> {
        let easy = build_easy(request, options, share).map_err(|e| {
            tracing::warn!(%handle, url = request.url(), "curl easy setup failed: {}", e);
            easy_code(&e)
        })?;
        Ok(CurlTransfer {
            easy,
            share: share.clone(),
        })
    }

    fn add_transfer(
        &mut self,
        handle: TransferHandle,
        transfer: Self::Transfer,
    ) -> Result<(), ResultCode> {
        let CurlTransfer { easy, share } = transfer;
        let mut easy_handle = self.multi.add2(easy).map_err(|e| multi_code(&e))?;
        if let Err(e) = easy_handle.set_token(handle.0 as usize) {
            let _ = self.multi.remove2(easy_handle);
            return Err(easy_code(&e));
        }
        self.active.insert(
            handle,
            ActiveTransfer {
                easy: easy_handle,
                _share: share,
            },
        );
        Ok(())
    }

    fn remove_transfer(&mut self, handle: TransferHandle) -> Option<Response> {
        let ActiveTransfer { easy, _share } = self.active.remove(&handle)?;
        match self.multi.remove2(easy) {
            Ok(mut easy) => {
                let status = easy.response_code().unwrap_or(0);
                Some(easy.get_mut().take_response(status))
            }
            Err(e) => {
                tracing::warn!(%handle, "curl multi remove: {}", e);
                Some(Response::default())
            }
        }
    }

    fn advance(&mut self) -> Result<u32, ResultCode> {
        self.multi.perform().map_err(|e| multi_code(&e))
    }

    fn poll_completion(&mut self) -> Option<(TransferHandle, ResultCode)> {
        if self.finished.is_empty() {
            self.read_messages();
        }
        self.finished.pop_front()
    }
}
