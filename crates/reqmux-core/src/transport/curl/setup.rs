//! Build a configured Easy2 for one request.

use curl::easy::{Easy2, List};

use crate::context::RequestOptions;
use crate::request::{Method, Request};

use super::handler::ResponseCollector;
use super::SharedCache;

/// Create an Easy2 for `request`, applying method, headers, body, proxy,
/// trust and timeout options, attached to `share`.
pub(super) fn build_easy(
    request: &Request,
    options: &RequestOptions,
    share: &SharedCache,
) -> Result<Easy2<ResponseCollector>, curl::Error> {
    let mut easy = Easy2::new(ResponseCollector::default());
    easy.url(request.url())?;

    match request.method() {
        Method::Get => easy.get(true)?,
        Method::Head => easy.nobody(true)?,
        Method::Post => {
            easy.post(true)?;
            easy.post_fields_copy(request.body_bytes())?;
        }
        m @ (Method::Put | Method::Delete | Method::Patch) => {
            easy.custom_request(m.as_str())?;
            if !request.body_bytes().is_empty() {
                easy.post_fields_copy(request.body_bytes())?;
            }
        }
    }

    if !request.headers().is_empty() {
        let mut list = List::new();
        for (k, v) in request.headers() {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;
    }

    if let Some(proxy) = options.proxy.as_deref() {
        easy.proxy(proxy)?;
    }
    if let Some(bundle) = options.trust_bundle.as_deref() {
        easy.cainfo(bundle)?;
    }
    easy.ssl_verify_peer(options.verify_peer)?;
    easy.ssl_verify_host(options.verify_peer)?;
    if !options.reuse_connections {
        easy.forbid_reuse(true)?;
    }

    easy.follow_location(options.follow_redirects)?;
    if options.follow_redirects {
        easy.max_redirections(10)?;
    }
    easy.connect_timeout(options.connect_timeout)?;
    if let Some(timeout) = options.transfer_timeout {
        easy.timeout(timeout)?;
    }
    easy.dns_cache_timeout(share.dns_cache_timeout)?;
    share.attach(&easy)?;

    Ok(easy)
}
