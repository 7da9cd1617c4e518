//! Integration test: the curl-backed scheduler against a local HTTP server.
//!
//! Exercises the driver thread end to end (limits, failures, methods) and the
//! caller-driven tick loop.

mod common;

use std::collections::HashSet;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use reqmux::config::{HttpConfig, ReqmuxConfig};
use reqmux::driver;
use reqmux::request::{oneshot_sink, Completion, Method, Request, ResultCode};
use reqmux::scheduler::{AdmissionBudget, Scheduler};
use reqmux::{CurlTransport, SchedulerError, TransportContext};

fn driver_config(max_simultaneous: usize, max_per_tick: usize) -> ReqmuxConfig {
    let mut cfg = ReqmuxConfig::default();
    cfg.http.max_simultaneous_requests = max_simultaneous;
    cfg.http.max_requests_added_per_tick = max_per_tick;
    cfg.http.connect_timeout_secs = 5;
    cfg.http.transfer_timeout_secs = 10;
    cfg.driver.tick_interval_ms = 1;
    cfg.driver.hitch_threshold_ms = 0;
    cfg
}

fn recv(rx: &mpsc::Receiver<Completion>) -> Completion {
    rx.recv_timeout(Duration::from_secs(15))
        .expect("completion within timeout")
}

#[test]
fn concurrent_requests_respect_simultaneous_limit() {
    let server = common::http_server::start();
    let driver = driver::spawn(CurlTransport::new, driver_config(2, 1)).unwrap();
    let submitter = driver.submitter();

    let (tx, rx) = mpsc::channel::<Completion>();
    let mut handles = HashSet::new();
    for _ in 0..6 {
        let request = Request::get(&server.url("slow/100")).unwrap();
        handles.insert(submitter.submit(request, Box::new(tx.clone())).unwrap());
    }

    let mut seen = HashSet::new();
    for _ in 0..6 {
        let done = recv(&rx);
        assert_eq!(done.code, ResultCode::OK);
        let response = done.outcome.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"slow 100");
        assert!(seen.insert(done.handle), "duplicate completion");
    }
    assert_eq!(seen, handles);
    assert!(
        server.stats.max_active() <= 2,
        "server saw {} concurrent requests",
        server.stats.max_active()
    );
    assert_eq!(server.stats.requests(), 6);
    driver.shutdown();
}

#[test]
fn http_error_status_is_a_response() {
    let server = common::http_server::start();
    let driver = driver::spawn(CurlTransport::new, driver_config(0, 0)).unwrap();
    let (tx, rx) = mpsc::channel::<Completion>();
    driver
        .submitter()
        .submit(Request::get(&server.url("status/404")).unwrap(), Box::new(tx))
        .unwrap();
    let done = recv(&rx);
    assert_eq!(done.code, ResultCode::OK);
    let response = done.outcome.unwrap();
    assert_eq!(response.status, 404);
    assert_eq!(response.body, b"status 404");
    driver.shutdown();
}

#[test]
fn refused_connection_reports_transport_code() {
    let driver = driver::spawn(CurlTransport::new, driver_config(0, 0)).unwrap();
    let (tx, rx) = mpsc::channel::<Completion>();
    driver
        .submitter()
        .submit(Request::get(&common::http_server::closed_port_url()).unwrap(), Box::new(tx))
        .unwrap();
    let done = recv(&rx);
    assert_eq!(done.code, ResultCode(7));
    assert_eq!(
        done.outcome,
        Err(SchedulerError::TransferFailed(ResultCode(7)))
    );
    driver.shutdown();
}

#[tokio::test]
async fn post_body_and_headers_reach_server() {
    let server = common::http_server::start();
    let driver = driver::spawn(CurlTransport::new, driver_config(0, 0)).unwrap();
    let request = Request::new(Method::Post, &server.url("echo"))
        .unwrap()
        .header("X-Test", "hello")
        .body(b"payload".to_vec());
    let (sink, rx) = oneshot_sink();
    driver.submitter().submit(request, sink).unwrap();

    let done = tokio::time::timeout(Duration::from_secs(15), rx)
        .await
        .unwrap()
        .unwrap();
    let response = done.outcome.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"POST\npayload");
    assert_eq!(response.header("x-echo"), Some("hello"));

    tokio::task::spawn_blocking(move || driver.shutdown())
        .await
        .unwrap();
}

#[test]
fn put_and_head_requests() {
    let server = common::http_server::start();
    let driver = driver::spawn(CurlTransport::new, driver_config(0, 0)).unwrap();
    let submitter = driver.submitter();
    let (tx, rx) = mpsc::channel::<Completion>();

    let put = submitter
        .submit(
            Request::new(Method::Put, &server.url("echo"))
                .unwrap()
                .body(b"x".to_vec()),
            Box::new(tx.clone()),
        )
        .unwrap();
    let head = submitter
        .submit(
            Request::new(Method::Head, &server.url("status/200")).unwrap(),
            Box::new(tx),
        )
        .unwrap();

    for _ in 0..2 {
        let done = recv(&rx);
        let response = done.outcome.unwrap();
        if done.handle == put {
            assert_eq!(response.body, b"PUT\nx");
        } else {
            assert_eq!(done.handle, head);
            assert_eq!(response.status, 200);
            assert!(response.body.is_empty());
        }
    }
    driver.shutdown();
}

#[test]
fn caller_driven_tick_loop() {
    let server = common::http_server::start();
    let mut ctx = TransportContext::new(CurlTransport::new());
    ctx.init_with(&HttpConfig::default(), || None).unwrap();
    assert_eq!(ctx.options().map(|o| o.verify_peer), Some(false));

    let mut scheduler = Scheduler::new(&ctx, AdmissionBudget::new(1, 1));
    let (tx, rx) = mpsc::channel::<Completion>();
    for i in 0..3 {
        let request = Request::get(&server.url(&format!("status/{}", 200 + i))).unwrap();
        scheduler.submitter().submit(request, Box::new(tx.clone())).unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(15);
    let mut statuses = Vec::new();
    while statuses.len() < 3 {
        assert!(Instant::now() < deadline, "timed out");
        let report = scheduler.tick(&mut ctx, Duration::from_millis(1)).unwrap();
        assert!(report.in_flight <= 1);
        for done in rx.try_iter() {
            statuses.push(done.outcome.unwrap().status);
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(statuses, vec![200, 201, 202]);
    assert!(scheduler.is_idle());

    ctx.shutdown();
    assert!(!ctx.is_initialized());
    let (tx, _rx) = mpsc::channel::<Completion>();
    assert_eq!(
        scheduler
            .submitter()
            .submit(Request::get(&server.url("status/200")).unwrap(), Box::new(tx)),
        Err(SchedulerError::NotInitialized)
    );
}
