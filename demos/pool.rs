//! # Example: pool
//!
//! Supervises three shell workers and walks through the pool lifecycle:
//! initial fill, a rolling reload, crash recovery, and graceful shutdown.
//!
//! Each worker prints `READY`, reports its id once as a message, then waits
//! for stdin to close (the supervisor's disconnect) before announcing
//! `STOPPING` and exiting.
//!
//! ## Flow
//! ```text
//! Supervisor::run()
//!     ├─► fill: workers 1..3 ──► READY ──► OfficiallyStarted
//!     ├─► t=1s  handle.reload(): 4 replaces 1, 5 replaces 2, 6 replaces 3
//!     ├─► t=+1s kill -9 <pid of first worker> ──► WorkerCrashed ──► replacement
//!     └─► t=+1s handle.shutdown() ──► stdin closed ──► AllStopped
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=poolvisor=info cargo run --example pool --features logging
//! ```
//! Send `kill -HUP <pid>` to the demo process to trigger another reload.

use std::sync::Arc;
use std::time::Duration;

use poolvisor::{LogWriter, PoolConfig, Subscribe, Supervisor, WorkerId};
use tracing_subscriber::EnvFilter;

const WORKER: &str = r#"
echo READY
echo "worker $POOLVISOR_WORKER_ID up"
while read -r _; do :; done
echo STOPPING
exit 0
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("poolvisor=info")),
        )
        .init();

    let mut cfg = PoolConfig::new("/bin/sh");
    cfg.args = vec!["-c".into(), WORKER.into()];
    cfg.size = Some(3);
    cfg.graceful_stop_timeout = Duration::from_secs(2);
    cfg.startup_grace_timeout = Duration::from_secs(2);

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(cfg)
        .with_subscribers(subs)
        .with_message_handler(|worker: WorkerId, msg: &str| {
            tracing::info!(%worker, msg, "message from worker");
        })
        .build()?;

    let handle = sup.handle();
    let script = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        match handle.reload().await {
            Ok(()) => println!("[demo] reload finished"),
            Err(e) => println!("[demo] reload failed: {e}"),
        }
        for w in handle.workers().await {
            println!("[demo] worker {} {:?} pid={:?}", w.id, w.state, w.pid);
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
        if let Some(pid) = handle.workers().await.first().and_then(|w| w.pid) {
            println!("[demo] killing pid {pid}");
            let _ = tokio::process::Command::new("kill")
                .args(["-9", &pid.to_string()])
                .status()
                .await;
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
        println!("[demo] shutting down");
        handle.shutdown();
    });

    sup.run().await?;
    script.await?;
    Ok(())
}
