//! `reqmux fetch` – submit URLs through the scheduler and report each completion.

use anyhow::{anyhow, bail, Context, Result};
use reqmux::config::ReqmuxConfig;
use reqmux::driver;
use reqmux::request::{oneshot_sink, Completion, Method, Request};
use reqmux::retry::{classify_completion, RetryDecision, RetryPolicy};
use reqmux::scheduler::Submitter;
use reqmux::{CurlTransport, DriverHandle};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

use crate::cli::FetchArgs;

pub async fn run_fetch(mut cfg: ReqmuxConfig, args: FetchArgs) -> Result<()> {
    apply_overrides(&mut cfg, &args);
    let requests = build_requests(&args)?;
    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir {}", dir.display()))?;
    }

    let handle = driver::spawn(CurlTransport::new, cfg).context("start HTTP driver")?;
    let policy = RetryPolicy::with_attempts(args.retries);

    let mut tasks = Vec::with_capacity(requests.len());
    for request in requests {
        let submitter = handle.submitter();
        tasks.push(tokio::spawn(fetch_one(submitter, request, policy)));
    }

    let total = tasks.len();
    let reported = report_all(tasks, args.output_dir.as_deref()).await;
    let failed = finish_with_driver(handle, reported).await?;
    if failed > 0 {
        bail!("{} of {} request(s) failed", failed, total);
    }
    Ok(())
}

/// Await every fetch task in order, print its completion and save bodies to
/// `output_dir`. Returns how many requests failed.
pub(crate) async fn report_all(
    tasks: Vec<JoinHandle<(String, Result<Completion>)>>,
    output_dir: Option<&Path>,
) -> Result<usize> {
    let mut failed = 0;
    for (index, task) in tasks.into_iter().enumerate() {
        let (url, result) = task.await.context("fetch task panicked")?;
        match result {
            Ok(completion) => {
                print_completion(&url, &completion);
                if !report_ok(&completion) {
                    failed += 1;
                }
                if let (Some(dir), Ok(response)) = (output_dir, &completion.outcome) {
                    let path = dir.join(file_name_for(&url, index));
                    std::fs::write(&path, &response.body)
                        .with_context(|| format!("write {}", path.display()))?;
                }
            }
            Err(e) => {
                println!("ERR  {}  {:#}", url, e);
                failed += 1;
            }
        }
    }
    Ok(failed)
}

/// Shut the driver down off the async workers, then hand back `outcome`.
/// Joining the driver thread blocks, so it never happens on a runtime thread.
pub(crate) async fn finish_with_driver<T>(handle: DriverHandle, outcome: Result<T>) -> Result<T> {
    tokio::task::spawn_blocking(move || handle.shutdown())
        .await
        .context("driver shutdown")?;
    outcome
}

fn apply_overrides(cfg: &mut ReqmuxConfig, args: &FetchArgs) {
    if let Some(n) = args.max_simultaneous {
        cfg.http.max_simultaneous_requests = n;
    }
    if let Some(n) = args.max_per_tick {
        cfg.http.max_requests_added_per_tick = n;
    }
    if let Some(proxy) = &args.proxy {
        cfg.http.proxy_address = Some(proxy.clone());
    }
    if args.no_reuse_conn {
        cfg.http.reuse_connections = false;
    }
}

fn build_requests(args: &FetchArgs) -> Result<Vec<Request>> {
    let method: Method = args.method.parse()?;
    let headers = args
        .headers
        .iter()
        .map(|h| parse_header(h))
        .collect::<Result<Vec<_>>>()?;
    args.urls
        .iter()
        .map(|url| {
            let mut request = Request::new(method, url)?;
            for (name, value) in &headers {
                request = request.header(name.clone(), value.clone());
            }
            if let Some(data) = &args.data {
                request = request.body(data.as_bytes().to_vec());
            }
            Ok(request)
        })
        .collect()
}

/// Split `Name: value` into its parts.
pub(crate) fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header must be `Name: value`, got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("empty header name in {:?}", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Submit `request`, resubmitting while the retry policy allows.
async fn fetch_one(
    submitter: Submitter,
    request: Request,
    policy: RetryPolicy,
) -> (String, Result<Completion>) {
    let url = request.url().to_string();
    let mut attempt = 1u32;
    let result = loop {
        let (sink, rx) = oneshot_sink();
        if let Err(e) = submitter.submit(request.clone(), sink) {
            break Err(e.into());
        }
        let completion = match rx.await {
            Ok(c) => c,
            Err(_) => break Err(anyhow!("scheduler dropped the request")),
        };
        let Some(kind) = classify_completion(&completion) else {
            break Ok(completion);
        };
        match policy.decide(attempt, kind) {
            RetryDecision::NoRetry => break Ok(completion),
            RetryDecision::RetryAfter(delay) => {
                tracing::debug!(%url, attempt, ?kind, ?delay, "retrying request");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    };
    (url, result)
}

fn report_ok(completion: &Completion) -> bool {
    matches!(&completion.outcome, Ok(r) if r.status < 400)
}

fn print_completion(url: &str, completion: &Completion) {
    match &completion.outcome {
        Ok(response) => println!("{:<4} {}  {} bytes", response.status, url, response.body.len()),
        Err(e) => println!("ERR  {}  {} (code {})", url, e, completion.code),
    }
}

/// Output file for the `index`-th URL: its last path segment, prefixed with
/// the index so duplicate names do not collide.
pub(crate) fn file_name_for(url: &str, index: usize) -> PathBuf {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let last = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .unwrap_or("index");
    let safe: String = last
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "._-".contains(c) { c } else { '_' })
        .collect();
    PathBuf::from(format!("{}-{}", index, safe))
}
