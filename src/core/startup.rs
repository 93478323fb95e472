//! # Startup detector: did a new worker start successfully?
//!
//! Three signals race for every new worker; the first one to arrive decides:
//!
//! ```text
//!                 ┌─ Ready ─────────────► OfficiallyStarted, success (via "ready")
//! start timer ────┼─ GraceElapsed ──────► OfficiallyStarted, success (via "grace_elapsed")
//! (armed at fork) └─ Exited{deliberate} ─► success, state untouched (killed on purpose)
//!                    Exited{crash}  ─────► failure: "worker N exited too early"
//! ```
//!
//! The race is decided by clearing the worker's start-timer slot. A signal that
//! finds the slot empty lost the race and produces no verdict, so every worker
//! gets exactly one verdict even when a timer command was already queued.

use crate::error::StartupError;

use super::timer::TimerKind;
use super::worker::{LifecycleState, Worker};

/// A competitor in the startup race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartupSignal {
    Ready,
    GraceElapsed,
    Exited { deliberate: bool },
}

/// Outcome of the startup race.
#[derive(Debug, Clone)]
pub(crate) enum Verdict {
    /// The worker is now `OfficiallyStarted`.
    Started { via: &'static str },
    /// The worker was stopped on purpose before it finished starting.
    StoppedWhileStarting,
    /// The worker died on its own before finishing starting.
    Failed(StartupError),
}

impl Verdict {
    pub(crate) fn into_result(self) -> Result<(), StartupError> {
        match self {
            Verdict::Started { .. } | Verdict::StoppedWhileStarting => Ok(()),
            Verdict::Failed(err) => Err(err),
        }
    }
}

/// Feeds one signal into `worker`'s startup race.
///
/// Returns `Some` only for the signal that wins the race.
pub(crate) fn resolve(worker: &mut Worker, signal: StartupSignal) -> Option<Verdict> {
    if !worker.clear_timer(TimerKind::Start) {
        return None;
    }

    let verdict = match signal {
        StartupSignal::Ready => {
            worker.advance(LifecycleState::OfficiallyStarted);
            Verdict::Started { via: "ready" }
        }
        StartupSignal::GraceElapsed => {
            worker.advance(LifecycleState::OfficiallyStarted);
            Verdict::Started {
                via: "grace_elapsed",
            }
        }
        StartupSignal::Exited { deliberate: true } => Verdict::StoppedWhileStarting,
        StartupSignal::Exited { deliberate: false } => {
            Verdict::Failed(StartupError::ExitedTooEarly { worker: worker.id })
        }
    };
    Some(verdict)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::core::timer::PendingTimer;
    use crate::core::worker::{Purpose, WorkerId};
    use crate::host::WorkerProcess;

    struct Inert;

    impl WorkerProcess for Inert {
        fn disconnect(&mut self) {}
        fn terminate(&mut self) {}
    }

    fn starting_worker(id: u64) -> Worker {
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = WorkerId::new(id);
        let timer = PendingTimer::arm(TimerKind::Start, id, Duration::from_secs(5), &tx);
        Worker::new(id, Box::new(Inert), Purpose::Fill, timer)
    }

    #[tokio::test(start_paused = true)]
    async fn ready_wins_and_late_timer_is_ignored() {
        let mut w = starting_worker(1);

        let v = resolve(&mut w, StartupSignal::Ready).unwrap();
        assert!(matches!(v, Verdict::Started { via: "ready" }));
        assert_eq!(w.state(), LifecycleState::OfficiallyStarted);
        assert_eq!(w.timer_kind(), None);

        assert!(resolve(&mut w, StartupSignal::GraceElapsed).is_none());
        assert!(resolve(&mut w, StartupSignal::Exited { deliberate: false }).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn grace_elapsed_counts_as_started() {
        let mut w = starting_worker(2);
        let v = resolve(&mut w, StartupSignal::GraceElapsed).unwrap();
        assert!(matches!(v, Verdict::Started { via: "grace_elapsed" }));
        assert!(w.is_officially_started());
        assert!(resolve(&mut w, StartupSignal::Ready).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn early_crash_fails_with_worker_id() {
        let mut w = starting_worker(3);
        let v = resolve(&mut w, StartupSignal::Exited { deliberate: false }).unwrap();
        let err = v.into_result().unwrap_err();
        assert_eq!(err.to_string(), "worker 3 exited too early");
        assert_eq!(w.state(), LifecycleState::Starting);
    }

    #[tokio::test(start_paused = true)]
    async fn deliberate_stop_during_startup_is_success() {
        let mut w = starting_worker(4);
        let v = resolve(&mut w, StartupSignal::Exited { deliberate: true }).unwrap();
        assert!(matches!(v, Verdict::StoppedWhileStarting));
        assert!(v.into_result().is_ok());
    }
}
