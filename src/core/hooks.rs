//! User extension points: reload hooks and the worker message handler.

use async_trait::async_trait;

use crate::error::ReloadError;

use super::worker::WorkerId;

/// Hooks around a signal-triggered reload.
///
/// Only the SIGHUP path runs them; [`PoolHandle::reload`](crate::PoolHandle::reload)
/// does not. A reload superseded by a newer signal skips `after_reload`.
#[async_trait]
pub trait ReloadHooks: Send + Sync + 'static {
    /// Runs before the reload is requested (for example to rebuild assets).
    async fn before_reload(&self) {}

    /// Receives the reload result. The default logs failures.
    async fn after_reload(&self, result: &Result<(), ReloadError>) {
        if let Err(err) = result {
            tracing::error!(target: "poolvisor", error = %err, "reload error");
        }
    }
}

/// Hooks that keep every default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

#[async_trait]
impl ReloadHooks for DefaultHooks {}

/// Receives application messages sent by workers.
///
/// Called on the control loop; must not block.
pub trait MessageHandler: Send + Sync + 'static {
    /// One message from `worker`.
    fn on_message(&self, worker: WorkerId, payload: &str);
}

impl<F> MessageHandler for F
where
    F: Fn(WorkerId, &str) + Send + Sync + 'static,
{
    fn on_message(&self, worker: WorkerId, payload: &str) {
        self(worker, payload)
    }
}
