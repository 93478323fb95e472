//! # LogWriter: tracing-backed event renderer
//!
//! Renders every pool [`Event`] as one `tracing` record under the
//! `poolvisor` target. Install any `tracing` subscriber (for example
//! `tracing_subscriber::fmt`) to see the output.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO poolvisor: worker forked worker=1 active=1
//! INFO poolvisor: worker started worker=1 via=ready elapsed_ms=12
//! WARN poolvisor: worker exited abnormally, restarting worker=1 status="exit status: 1"
//! INFO poolvisor: stopping worker worker=2 active=2 timeout_ms=5000
//! ERROR poolvisor: reload failed reason="worker 4 exited too early" left_queued=1
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "poolvisor";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.map(|w| w.get());
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::WorkerForked => {
                info!(target: TARGET, worker, replaces = e.replaces.map(|w| w.get()), active = e.active, "worker forked");
            }
            EventKind::WorkerStarted => {
                info!(target: TARGET, worker, via = reason, elapsed_ms = e.elapsed_ms, "worker started");
            }
            EventKind::StartupFailed => {
                error!(target: TARGET, worker, reason, "worker failed to start");
            }
            EventKind::WorkerStopping => {
                info!(target: TARGET, worker, active = e.active, timeout_ms = e.timeout_ms, "stopping worker");
            }
            EventKind::WorkerKilled => {
                warn!(target: TARGET, worker, reason, "worker killed");
            }
            EventKind::WorkerExited => {
                info!(target: TARGET, worker, active = e.active, status = reason, "worker exited");
            }
            EventKind::WorkerCrashed => {
                warn!(target: TARGET, worker, active = e.active, status = reason, "worker exited abnormally, restarting");
            }
            EventKind::ReloadRequested => {
                info!(target: TARGET, queued = e.queued, "reload requested");
            }
            EventKind::ReloadStep => {
                info!(target: TARGET, worker, queued = e.queued, "reloading worker");
            }
            EventKind::ReloadCompleted => {
                info!(target: TARGET, "reload completed");
            }
            EventKind::ReloadFailed => {
                error!(target: TARGET, worker, reason, left_queued = e.queued, "reload failed");
            }
            EventKind::ShutdownRequested => {
                info!(target: TARGET, "shutdown requested");
            }
            EventKind::AllStopped => {
                info!(target: TARGET, "all workers stopped");
            }
            EventKind::ShutdownTimeout => {
                error!(target: TARGET, timeout_ms = e.timeout_ms, reason, "shutdown timeout exceeded");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                warn!(target: TARGET, kind = ?e.kind, reason, "subscriber problem");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
