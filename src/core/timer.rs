//! # Cancellable per-worker timers.
//!
//! A [`PendingTimer`] is a sleeping task that posts [`Command::Timer`] into the
//! control loop when it elapses. Dropping the `PendingTimer` cancels the task
//! through a [`CancellationToken`] drop guard.
//!
//! A timer that already posted its command cannot be recalled; the control
//! loop therefore acts on `Command::Timer` only if the worker's timer slot
//! still holds a timer of that kind (see [`Worker::clear_timer`]).
//!
//! [`Worker::clear_timer`]: super::worker::Worker::clear_timer

use std::time::Duration;

use tokio_util::sync::{CancellationToken, DropGuard};

use super::command::{Command, CommandTx};
use super::worker::WorkerId;

/// Which race a timer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    /// Startup grace period.
    Start,
    /// Graceful stop period before a forced kill.
    Stop,
}

pub(crate) struct PendingTimer {
    kind: TimerKind,
    _cancel: DropGuard,
}

impl PendingTimer {
    /// Spawns the sleep task. Must be called inside a tokio runtime.
    pub(crate) fn arm(kind: TimerKind, id: WorkerId, after: Duration, tx: &CommandTx) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    let _ = tx.send(Command::Timer { id, kind });
                }
            }
        });

        Self {
            kind,
            _cancel: token.drop_guard(),
        }
    }

    pub(crate) fn kind(&self) -> TimerKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _timer = PendingTimer::arm(TimerKind::Start, WorkerId::new(1), Duration::from_secs(5), &tx);

        match rx.recv().await {
            Some(Command::Timer { id, kind }) => {
                assert_eq!(id, WorkerId::new(1));
                assert_eq!(kind, TimerKind::Start);
            }
            _ => panic!("expected timer command"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_cancels() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = PendingTimer::arm(TimerKind::Stop, WorkerId::new(2), Duration::from_secs(5), &tx);
        drop(timer);
        drop(tx);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.recv().await.is_none());
    }
}
