//! # Supervisor: keeps a pool of worker processes alive.
//!
//! The [`Supervisor`] owns the event bus, the subscriber set, and the command
//! channel of the control loop. [`Supervisor::run`] fills the pool and then
//! drives the loop until a graceful shutdown completes.
//!
//! ## Key responsibilities
//! - fill the pool with `size` workers and replace those that crash
//! - run rolling reloads on request (handle or SIGHUP)
//! - subscribe to the [`Bus`] and **fan-out** events via [`SubscriberSet`]
//! - handle OS termination signals and shut down within
//!   [`PoolConfig::shutdown_timeout`]
//!
//! ## High-level architecture
//! ```text
//! Inputs:
//!   PoolConfig + ProcessHost + subscribers + hooks ──► SupervisorBuilder::build()
//!
//! run():
//!   fan-out listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   signal tasks:     SIGINT/SIGTERM/SIGQUIT ─► PoolHandle::shutdown()
//!                     SIGHUP ─► before_reload ─► PoolHandle::reload() ─► after_reload
//!   Pool::fill(size)
//!   Pool::drive(rx) ◄── Command ── host signals, timers, PoolHandle
//!
//! Shutdown path:
//!   Command::Shutdown
//!     └─► Bus.publish(ShutdownRequested), pending reload gets Err(ShuttingDown)
//!     └─► retire every worker (disconnect, forced kill after graceful_stop_timeout)
//!     └─► wait for all exits until shutdown_timeout:
//!            ├─ drained   → Bus.publish(AllStopped), Ok(())
//!            └─ timed out → Bus.publish(ShutdownTimeout), Err(ShutdownTimeout)
//! ```
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use poolvisor::{PoolConfig, Subscribe, Supervisor};
//! #[cfg(feature = "logging")]
//! use poolvisor::LogWriter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = PoolConfig::new("./server");
//!     cfg.size = Some(4);
//!
//!     let mut subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!     #[cfg(feature = "logging")]
//!     subs.push(Arc::new(LogWriter::new()));
//!
//!     let sup = Supervisor::builder(cfg).with_subscribers(subs).build()?;
//!     let handle = sup.handle();
//!     tokio::spawn(async move {
//!         let _ = handle.reload().await;
//!     });
//!     sup.run().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::error::{ReloadError, RuntimeError};
use crate::events::{Bus, Event};
use crate::host::ProcessHost;
use crate::subscribers::{Subscribe, SubscriberSet};

use super::builder::SupervisorBuilder;
use super::command::{CommandRx, CommandTx};
use super::config::PoolConfig;
use super::handle::PoolHandle;
use super::hooks::{MessageHandler, ReloadHooks};
use super::pool::Pool;
use super::signals::{HangupSignal, ShutdownSignals};

/// Supervises a pool of worker processes.
pub struct Supervisor {
    cfg: PoolConfig,
    host: Arc<dyn ProcessHost>,
    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
    hooks: Arc<dyn ReloadHooks>,
    on_message: Option<Arc<dyn MessageHandler>>,
    tx: CommandTx,
    rx: CommandRx,
}

impl Supervisor {
    /// Starts building a supervisor for `cfg`.
    pub fn builder(cfg: PoolConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: PoolConfig,
        host: Arc<dyn ProcessHost>,
        subscribers: Vec<Arc<dyn Subscribe>>,
        hooks: Arc<dyn ReloadHooks>,
        on_message: Option<Arc<dyn MessageHandler>>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            cfg,
            host,
            bus,
            subscribers,
            hooks,
            on_message,
            tx,
            rx,
        }
    }

    /// Returns a handle for reloads, snapshots, events, and shutdown.
    ///
    /// Handles taken before [`run`](Self::run) queue their requests until the
    /// control loop starts.
    pub fn handle(&self) -> PoolHandle {
        PoolHandle::new(self.tx.clone(), self.bus.clone())
    }

    /// Fills the pool and supervises it until a graceful shutdown completes.
    ///
    /// Returns [`RuntimeError::Signal`] if signal handlers cannot be installed
    /// (before any worker is spawned), or [`RuntimeError::ShutdownTimeout`] if
    /// workers are still alive when the shutdown deadline passes.
    pub async fn run(self) -> Result<(), RuntimeError> {
        let Self {
            cfg,
            host,
            bus,
            subscribers,
            hooks,
            on_message,
            tx,
            rx,
        } = self;
        let handle = PoolHandle::new(tx.clone(), bus.clone());

        let mut signal_tasks = JoinSet::new();
        if cfg.shutdown_on_signal {
            let signals = ShutdownSignals::install().map_err(RuntimeError::Signal)?;
            signal_tasks.spawn(shutdown_on_signal(signals, handle.clone()));
        }
        if cfg.reload_on_signal {
            let hangup = HangupSignal::install().map_err(RuntimeError::Signal)?;
            signal_tasks.spawn(reload_on_signal(hangup, handle.clone(), hooks));
        }

        let fanout_token = CancellationToken::new();
        let subs = SubscriberSet::new(subscribers, bus.clone());
        let fanout = subscriber_listener(bus.subscribe(), subs, fanout_token.clone());

        let size = cfg.desired_size();
        tracing::debug!(target: "poolvisor", size, exec = %cfg.exec.display(), "filling pool");
        let mut pool = Pool::new(cfg, host, bus, tx, on_message);
        pool.fill(size);
        let res = pool.drive(rx).await;

        signal_tasks.shutdown().await;
        fanout_token.cancel();
        let _ = fanout.await;
        res
    }
}

/// Forwards bus events to the subscriber set until cancelled, then drains
/// what is already buffered and stops the subscriber workers.
fn subscriber_listener(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                ev = rx.recv() => match ev {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(target: "poolvisor", skipped, "subscriber fan-out lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        set.shutdown().await;
    })
}

async fn shutdown_on_signal(mut signals: ShutdownSignals, handle: PoolHandle) {
    signals.recv().await;
    handle.shutdown();
}

/// One reload per SIGHUP; a newer signal supersedes the notification of an
/// older one, whose `after_reload` is then skipped.
async fn reload_on_signal(mut hangup: HangupSignal, handle: PoolHandle, hooks: Arc<dyn ReloadHooks>) {
    let mut reloads = JoinSet::new();
    while hangup.recv().await.is_some() {
        reloads.spawn(hooked_reload(handle.clone(), Arc::clone(&hooks)));
        while reloads.try_join_next().is_some() {}
    }
}

pub(super) async fn hooked_reload(handle: PoolHandle, hooks: Arc<dyn ReloadHooks>) {
    hooks.before_reload().await;
    let res = handle.reload().await;
    if !matches!(res, Err(ReloadError::Superseded)) {
        hooks.after_reload(&res).await;
    }
}
