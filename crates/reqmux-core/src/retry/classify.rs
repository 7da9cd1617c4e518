//! Map completions (transport result codes and HTTP statuses) onto retry kinds.

use crate::error::SchedulerError;
use crate::request::{Completion, ResultCode};
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a transport result code as reported in a `Completion`.
pub fn classify_result_code(code: ResultCode) -> ErrorKind {
    let Ok(raw) = curl_sys::CURLcode::try_from(code.0) else {
        return ErrorKind::Other;
    };
    if raw == curl_sys::CURLE_OK {
        return ErrorKind::Other;
    }
    classify_curl_error(&curl::Error::new(raw))
}

/// `None` when the request needs no retry (transport success and a status
/// below 400); otherwise the kind of failure.
pub fn classify_completion(completion: &Completion) -> Option<ErrorKind> {
    match &completion.outcome {
        Ok(response) if response.status < 400 => None,
        Ok(response) => Some(classify_http_status(response.status)),
        Err(SchedulerError::AdmissionRejected(_)) => Some(ErrorKind::Rejected),
        Err(SchedulerError::TransferFailed(code)) => Some(classify_result_code(*code)),
        Err(_) => Some(ErrorKind::Other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Response, TransferHandle};

    fn completion(outcome: Result<Response, SchedulerError>) -> Completion {
        let code = match &outcome {
            Ok(_) => ResultCode::OK,
            Err(e) => e.result_code().unwrap_or(ResultCode::INTERNAL),
        };
        Completion {
            handle: TransferHandle(1),
            code,
            outcome,
        }
    }

    fn status(status: u32) -> Result<Response, SchedulerError> {
        Ok(Response {
            status,
            ..Response::default()
        })
    }

    #[test]
    fn http_429_and_503_throttled() {
        assert_eq!(classify_http_status(429), ErrorKind::Throttled);
        assert_eq!(classify_http_status(503), ErrorKind::Throttled);
    }

    #[test]
    fn http_5xx_retryable() {
        assert!(matches!(classify_http_status(500), ErrorKind::Http5xx(500)));
        assert!(matches!(classify_http_status(502), ErrorKind::Http5xx(502)));
    }

    #[test]
    fn http_4xx_other() {
        assert_eq!(classify_http_status(404), ErrorKind::Other);
        assert_eq!(classify_http_status(403), ErrorKind::Other);
    }

    #[test]
    fn curl_codes() {
        // CURLE_COULDNT_CONNECT, CURLE_OPERATION_TIMEDOUT, CURLE_URL_MALFORMAT
        assert_eq!(classify_result_code(ResultCode(7)), ErrorKind::Connection);
        assert_eq!(classify_result_code(ResultCode(6)), ErrorKind::Connection);
        assert_eq!(classify_result_code(ResultCode(28)), ErrorKind::Timeout);
        assert_eq!(classify_result_code(ResultCode(3)), ErrorKind::Other);
        assert_eq!(classify_result_code(ResultCode::INTERNAL), ErrorKind::Other);
        assert_eq!(classify_result_code(ResultCode::OK), ErrorKind::Other);
        assert_eq!(classify_result_code(ResultCode(i32::MIN)), ErrorKind::Other);
    }

    #[test]
    fn completions() {
        assert_eq!(classify_completion(&completion(status(200))), None);
        assert_eq!(classify_completion(&completion(status(304))), None);
        assert_eq!(
            classify_completion(&completion(status(503))),
            Some(ErrorKind::Throttled)
        );
        assert_eq!(
            classify_completion(&completion(Err(SchedulerError::TransferFailed(ResultCode(7))))),
            Some(ErrorKind::Connection)
        );
        assert_eq!(
            classify_completion(&completion(Err(SchedulerError::AdmissionRejected(ResultCode(2))))),
            Some(ErrorKind::Rejected)
        );
        assert_eq!(
            classify_completion(&completion(Err(SchedulerError::NotInitialized))),
            Some(ErrorKind::Other)
        );
    }
}
