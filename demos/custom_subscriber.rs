//! # Example: custom_subscriber
//!
//! Demonstrates how to build and attach a custom event subscriber.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for pool metrics.
//! - Wire the subscriber in with [`SupervisorBuilder::with_subscribers`].
//!
//! ## Flow
//! ```text
//! Supervisor::run()
//!     ├─► control loop publish(WorkerForked / WorkerStarted / ReloadStep / ...)
//!     └─► subscriber_listener
//!           └─► SubscriberSet.emit() ──► PoolStats.on_event()
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use poolvisor::{Event, EventKind, PoolConfig, Subscribe, Supervisor};

/// Counts lifecycle events and prints a line for the interesting ones.
/// In real life, you could export metrics, ship logs, or trigger alerts.
#[derive(Default)]
struct PoolStats {
    forked: AtomicU64,
    crashed: AtomicU64,
    reload_steps: AtomicU64,
}

#[async_trait::async_trait]
impl Subscribe for PoolStats {
    async fn on_event(&self, ev: &Event) {
        let worker = ev.worker.map(|w| w.to_string()).unwrap_or_else(|| "-".into());
        match ev.kind {
            EventKind::WorkerForked => {
                self.forked.fetch_add(1, Ordering::Relaxed);
                println!(
                    "[stats] forked:   worker={worker} active={}",
                    ev.active.unwrap_or(0)
                );
            }
            EventKind::WorkerStarted => {
                println!(
                    "[stats] started:  worker={worker} via={} after={}ms",
                    ev.reason.as_deref().unwrap_or("?"),
                    ev.elapsed_ms.unwrap_or(0)
                );
            }
            EventKind::WorkerCrashed => {
                self.crashed.fetch_add(1, Ordering::Relaxed);
                println!("[stats] crashed:  worker={worker}");
            }
            EventKind::ReloadStep => {
                self.reload_steps.fetch_add(1, Ordering::Relaxed);
                println!(
                    "[stats] reload:   worker={worker} left={}",
                    ev.queued.unwrap_or(0)
                );
            }
            EventKind::ReloadFailed => {
                println!(
                    "[stats] reload failed: {}",
                    ev.reason.as_deref().unwrap_or("<none>")
                );
            }
            EventKind::AllStopped => {
                println!(
                    "[stats] done: forked={} crashed={} reload_steps={}",
                    self.forked.load(Ordering::Relaxed),
                    self.crashed.load(Ordering::Relaxed),
                    self.reload_steps.load(Ordering::Relaxed),
                );
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "pool-stats"
    }

    fn queue_capacity(&self) -> usize {
        256
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Workers never print READY: they count as started once the grace period elapses.
    let mut cfg = PoolConfig::new("/bin/sh");
    cfg.args = vec!["-c".into(), "cat >/dev/null".into()];
    cfg.size = Some(2);
    cfg.startup_grace_timeout = Duration::from_millis(300);

    let stats = Arc::new(PoolStats::default());
    let sup = Supervisor::builder(cfg)
        .with_subscribers(vec![stats as Arc<dyn Subscribe>])
        .build()?;

    let handle = sup.handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        if let Err(e) = handle.reload().await {
            eprintln!("reload error: {e}");
        }
        handle.shutdown();
    });

    sup.run().await?;
    Ok(())
}
