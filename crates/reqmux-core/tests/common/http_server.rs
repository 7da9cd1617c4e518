//! Minimal HTTP/1.1 server for integration tests.
//!
//! Routes:
//! - `GET /status/<code>`: responds with that status and body `status <code>`.
//! - `GET /slow/<ms>`: sleeps, then 200 with body `slow <ms>`.
//! - `* /echo`: 200; body is `<METHOD>\n<request body>`, the `X-Test` request
//!   header comes back as `X-Echo`.
//!
//! Every connection is closed after one response. The server tracks how many
//! requests it is handling at once.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ServerStats {
    active: AtomicUsize,
    max_active: AtomicUsize,
    requests: AtomicUsize,
}

impl ServerStats {
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct TestServer {
    /// Base URL with trailing slash, e.g. "http://127.0.0.1:12345/".
    pub base: String,
    pub stats: Arc<ServerStats>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }
}

/// Starts the server on a background thread. It runs until the process exits.
pub fn start() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let stats = Arc::new(ServerStats::default());
    let server_stats = Arc::clone(&stats);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let stats = Arc::clone(&server_stats);
            thread::spawn(move || handle(stream, &stats));
        }
    });
    TestServer {
        base: format!("http://127.0.0.1:{}/", port),
        stats,
    }
}

/// A local port with nothing listening on it.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

struct Incoming {
    method: String,
    path: String,
    test_header: Option<String>,
    body: Vec<u8>,
}

fn handle(mut stream: TcpStream, stats: &ServerStats) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    stats.enter();
    let (status, extra, body) = route(&req);
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n",
        status,
        body.len(),
        extra
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(&body);
    stats.leave();
}

fn route(req: &Incoming) -> (String, String, Vec<u8>) {
    let path = req.path.trim_start_matches('/');
    if let Some(code) = path.strip_prefix("status/") {
        let code: u16 = code.parse().unwrap_or(500);
        return (
            format!("{} {}", code, reason(code)),
            String::new(),
            format!("status {}", code).into_bytes(),
        );
    }
    if let Some(ms) = path.strip_prefix("slow/") {
        let ms: u64 = ms.parse().unwrap_or(0);
        thread::sleep(Duration::from_millis(ms));
        return ("200 OK".to_string(), String::new(), format!("slow {}", ms).into_bytes());
    }
    if path == "echo" {
        let extra = match &req.test_header {
            Some(v) => format!("X-Echo: {}\r\n", v),
            None => String::new(),
        };
        let mut body = format!("{}\n", req.method).into_bytes();
        body.extend_from_slice(&req.body);
        return ("200 OK".to_string(), extra, body);
    }
    ("404 Not Found".to_string(), String::new(), b"not found".to_vec())
}

fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Incoming> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = std::str::from_utf8(&data[..header_end]).ok()?.to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0usize;
    let mut test_header = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("x-test") {
                test_header = Some(value.trim().to_string());
            }
        }
    }

    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);
    Some(Incoming {
        method,
        path,
        test_header,
        body,
    })
}
