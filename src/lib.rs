//! # poolvisor
//!
//! **Poolvisor** keeps a fixed-size pool of worker processes alive.
//!
//! It starts `size` copies of a worker executable, decides when each one has
//! officially started, replaces workers that crash, and performs zero-downtime
//! rolling reloads: every worker is replaced one at a time, and an old worker
//! is retired only after its replacement started.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   PoolHandle (reload / workers / subscribe / shutdown)      OS signals
//!        │                                                   (HUP, INT, TERM)
//!        ▼                                                        │
//! ┌───────────────────────────────────────────────────────────────▼───┐
//! │  Supervisor control loop (one task, owns all pool state)          │
//! │  - Registry (active + retiring workers)                           │
//! │  - ReloadQueue (serialized replace-then-retire)                   │
//! │  - per-worker timer slot (startup grace / graceful stop)          │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        │ create           │ disconnect       │ terminate     │ publish
//!        ▼                  ▼                  ▼               ▼
//! ┌──────────────────────────────────────────────┐   ┌──────────────────┐
//! │ ProcessHost (CommandHost, or your own)       │   │ Bus (broadcast)  │
//! │   worker #1   worker #2   ...   worker #N    │   └────────┬─────────┘
//! └──────┬───────────────────────────────────────┘            ▼
//!        │ SignalSink: ready / message / exited      subscriber_listener
//!        └──────────────► control loop                        ▼
//!                                                       SubscriberSet
//!                                                   ┌─────────┼─────────┐
//!                                                   ▼         ▼         ▼
//!                                               LogWriter   sub2  ...  subN
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! create ──► Starting ──┬─ ready / startup grace elapsed ──► OfficiallyStarted
//!                       └─ exit ──► startup failure (not replaced)
//!
//! OfficiallyStarted ──┬─ unexpected exit ──► WorkerCrashed ──► replacement spawned
//!                     └─ retire ──► Stopping ──┬─ exit ──► Exited
//!                                              └─ graceful_stop_timeout ──► terminate
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                      |
//! |-------------------|--------------------------------------------------------------|-----------------------------------------|
//! | **Supervision**   | Fill, crash recovery, rolling reload, graceful shutdown.     | [`Supervisor`], [`PoolHandle`]          |
//! | **Process hosts** | Pluggable process creation; `tokio::process` by default.     | [`ProcessHost`], [`CommandHost`]        |
//! | **Subscriber API**| Hook into pool events (logging, metrics, custom subscribers).| [`Subscribe`], [`Event`]                |
//! | **Hooks**         | Run code around SIGHUP reloads, receive worker messages.     | [`ReloadHooks`], [`MessageHandler`]     |
//! | **Errors**        | Typed errors for configuration, startup, reload, runtime.    | [`ConfigError`], [`ReloadError`], ...   |
//! | **Configuration** | Centralize pool settings.                                    | [`PoolConfig`]                          |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] that renders events through `tracing`.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use poolvisor::{PoolConfig, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = PoolConfig::new("./bin/server");
//!     cfg.args = vec!["--port".into(), "8080".into()];
//!     cfg.size = Some(4);
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn poolvisor::Subscribe>> = vec![Arc::new(poolvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn poolvisor::Subscribe>> = Vec::new();
//!
//!     let sup = Supervisor::builder(cfg)
//!         .with_subscribers(subs)
//!         .with_message_handler(|worker: poolvisor::WorkerId, msg: &str| {
//!             println!("worker {worker}: {msg}");
//!         })
//!         .build()?;
//!
//!     // SIGHUP reloads every worker, SIGINT/SIGTERM stop the pool.
//!     sup.run().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod host;
mod subscribers;

// ---- Public re-exports ----

pub use self::core::{
    DefaultHooks, LifecycleState, MessageHandler, PoolConfig, PoolHandle, ReloadCallback,
    ReloadHooks, Supervisor, SupervisorBuilder, WORKER_ID_ENV, WorkerId, WorkerInfo,
};
pub use error::{ConfigError, HostError, ReloadError, RuntimeError, StartupError};
pub use events::{Bus, Event, EventKind};
pub use host::{
    CommandHost, ExitReport, HostSetup, ProcessHost, SignalSink, SpawnRequest, WorkerProcess,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose the built-in tracing subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
