//! libcurl share handle: DNS cache, TLS sessions and cookies shared by every
//! transfer of one context.
//!
//! Only the scheduler thread touches the handle, so no lock callbacks are set.

use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;
use std::time::Duration;

use curl::easy::Easy2;

const SHARED_DATA: [curl_sys::curl_lock_data; 3] = [
    curl_sys::CURL_LOCK_DATA_DNS,
    curl_sys::CURL_LOCK_DATA_SSL_SESSION,
    curl_sys::CURL_LOCK_DATA_COOKIE,
];

struct ShareHandle(NonNull<curl_sys::CURLSH>);

impl ShareHandle {
    fn new() -> Option<Self> {
        let raw = unsafe { curl_sys::curl_share_init() };
        let handle = ShareHandle(NonNull::new(raw)?);
        for data in SHARED_DATA {
            let rc = unsafe { curl_sys::curl_share_setopt(raw, curl_sys::CURLSHOPT_SHARE, data) };
            if rc != curl_sys::CURLSHE_OK {
                tracing::warn!(
                    "curl share: cannot share data kind {}: {}",
                    data,
                    curl::ShareError::new(rc)
                );
                return None;
            }
        }
        Some(handle)
    }
}

impl Drop for ShareHandle {
    fn drop(&mut self) {
        let rc = unsafe { curl_sys::curl_share_cleanup(self.0.as_ptr()) };
        if rc != curl_sys::CURLSHE_OK {
            tracing::warn!("curl share cleanup: {}", curl::ShareError::new(rc));
        }
    }
}

/// Shared cache of one context. Every transfer attached to it holds a clone,
/// so the handle is released only after the last easy handle using it.
#[derive(Clone)]
pub struct SharedCache {
    handle: Rc<ShareHandle>,
    pub dns_cache_timeout: Duration,
}

impl SharedCache {
    /// `None` when libcurl cannot allocate or configure the share handle.
    pub fn new(dns_cache_timeout: Duration) -> Option<Self> {
        Some(Self {
            handle: Rc::new(ShareHandle::new()?),
            dns_cache_timeout,
        })
    }

    /// Point `easy` at this share. The caller keeps a clone alive for as long as `easy` lives.
    pub(super) fn attach<H>(&self, easy: &Easy2<H>) -> Result<(), curl::Error> {
        let rc = unsafe {
            curl_sys::curl_easy_setopt(easy.raw(), curl_sys::CURLOPT_SHARE, self.handle.0.as_ptr())
        };
        if rc == curl_sys::CURLE_OK {
            Ok(())
        } else {
            Err(curl::Error::new(rc))
        }
    }

    /// Number of owners (the context plus live transfers).
    pub fn holders(&self) -> usize {
        Rc::strong_count(&self.handle)
    }
}

impl fmt::Debug for SharedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCache")
            .field("holders", &self.holders())
            .field("dns_cache_timeout", &self.dns_cache_timeout)
            .finish()
    }
}
