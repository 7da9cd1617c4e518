//! Headless driver: a dedicated thread that owns the transport context and
//! the scheduler and ticks them at a fixed cadence.
//!
//! Everything transport-related stays on the `reqmux-http` thread; callers only
//! ever hold a `Submitter`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::ReqmuxConfig;
use crate::context::TransportContext;
use crate::error::SchedulerError;
use crate::scheduler::{AdmissionBudget, Scheduler, Submitter};
use crate::transport::Transport;

const THREAD_NAME: &str = "reqmux-http";

pub struct DriverHandle {
    submitter: Submitter,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// Start the driver thread. `make_transport` runs on that thread, so the
/// transport itself does not need to be `Send`.
///
/// Returns once the context is initialized; fatal init errors are returned
/// here and the thread is joined.
pub fn spawn<T, F>(make_transport: F, cfg: ReqmuxConfig) -> Result<DriverHandle, SchedulerError>
where
    T: Transport + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (ready_tx, ready_rx) = mpsc::channel::<Result<Submitter, SchedulerError>>();
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    let thread = thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || {
            let mut ctx = TransportContext::new(make_transport());
            if let Err(e) = ctx.init(&cfg) {
                let _ = ready_tx.send(Err(e));
                return;
            }
            let mut scheduler = Scheduler::new(&ctx, AdmissionBudget::from(&cfg.http))
                .with_hitch_threshold(Duration::from_millis(cfg.driver.hitch_threshold_ms));
            if ready_tx.send(Ok(scheduler.submitter())).is_err() {
                return;
            }
            let interval = Duration::from_millis(cfg.driver.tick_interval_ms);
            run_loop(&mut ctx, &mut scheduler, &stop_flag, interval);
        })
        .map_err(|e| SchedulerError::TransportInit(format!("spawn {}: {}", THREAD_NAME, e)))?;

    match ready_rx.recv() {
        Ok(Ok(submitter)) => {
            tracing::debug!("driver thread started");
            Ok(DriverHandle {
                submitter,
                stop,
                thread: Some(thread),
            })
        }
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e)
        }
        Err(_) => {
            let _ = thread.join();
            Err(SchedulerError::TransportInit(
                "driver thread exited during startup".to_string(),
            ))
        }
    }
}

fn run_loop<T: Transport>(
    ctx: &mut TransportContext<T>,
    scheduler: &mut Scheduler<T>,
    stop: &AtomicBool,
    interval: Duration,
) {
    let mut last = Instant::now();
    loop {
        let now = Instant::now();
        let delta = now.duration_since(last);
        last = now;

        if let Err(e) = scheduler.tick(ctx, delta) {
            tracing::error!(error = %e, "scheduler tick failed; stopping driver");
            break;
        }
        if stop.load(Ordering::Acquire) && scheduler.is_idle() {
            break;
        }
        thread::sleep(interval);
    }

    ctx.shutdown();
    let abandoned = scheduler.abandon_pending();
    if abandoned > 0 {
        tracing::warn!(abandoned, "requests abandoned at shutdown");
    }
    tracing::debug!("driver thread exiting");
}

impl DriverHandle {
    pub fn submitter(&self) -> Submitter {
        self.submitter.clone()
    }

    /// Wait for every registered request to complete, shut the context down
    /// and join the driver thread.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("driver thread panicked");
            }
        }
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
