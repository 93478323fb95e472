//! # PoolHandle: control surface of a running supervisor.
//!
//! A cheap, cloneable handle that sends commands to the control loop. It stays
//! valid after the supervisor stopped; requests then fail or return empty
//! results instead of panicking.

use tokio::sync::{broadcast, oneshot};

use crate::error::ReloadError;
use crate::events::{Bus, Event};

use super::command::{Command, CommandTx};
use super::reload::ReloadCallback;
use super::worker::WorkerInfo;

/// Handle for controlling and observing a [`Supervisor`](crate::Supervisor).
#[derive(Clone, Debug)]
pub struct PoolHandle {
    tx: CommandTx,
    bus: Bus,
}

impl PoolHandle {
    pub(crate) fn new(tx: CommandTx, bus: Bus) -> Self {
        Self { tx, bus }
    }

    /// Requests a rolling reload of every active worker.
    ///
    /// `on_done` runs on the control loop once the reload queue drains
    /// (`Ok`) or a replacement fails to start (`Err`). If another request
    /// arrives first, its callback replaces this one and `on_done` is dropped
    /// without being called.
    pub fn request_reload<F>(&self, on_done: F)
    where
        F: FnOnce(Result<(), ReloadError>) + Send + 'static,
    {
        let callback: ReloadCallback = Box::new(on_done);
        if let Err(rejected) = self.tx.send(Command::Reload(callback)) {
            if let Command::Reload(callback) = rejected.0 {
                callback(Err(ReloadError::ShuttingDown));
            }
        }
    }

    /// Requests a rolling reload and waits for its outcome.
    ///
    /// Returns [`ReloadError::Superseded`] when a newer request took over the
    /// notification before this one completed.
    pub async fn reload(&self) -> Result<(), ReloadError> {
        let (tx, rx) = oneshot::channel();
        self.request_reload(move |res| {
            let _ = tx.send(res);
        });
        rx.await.unwrap_or(Err(ReloadError::Superseded))
    }

    /// Snapshot of the active workers in ascending id order.
    ///
    /// Empty once the supervisor stopped.
    pub async fn workers(&self) -> Vec<WorkerInfo> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(Command::Workers(tx)).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Receives every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Starts a graceful shutdown; `Supervisor::run` returns once it completes.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}
