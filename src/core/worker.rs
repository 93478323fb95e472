//! # Worker: one supervised process and its lifecycle state.
//!
//! ```text
//!  Starting ──► OfficiallyStarted ──► Stopping ──► Exited
//!     │                 │                            ▲
//!     └─────────────────┴────────────────────────────┘
//! ```
//!
//! ## Rules
//! - Transitions only move forward; [`Worker::advance`] rejects anything else.
//! - A worker holds a single timer slot: the startup grace timer while
//!   `Starting`, the forced-kill timer while `Stopping`. Both can never be armed
//!   at once.
//! - A worker spawned by the control loop is `listed` one turn after its
//!   creation; until then reload snapshots and [`WorkerInfo`] lists skip it.
//! - `deliberate` is set before the supervisor disconnects or terminates the
//!   worker; the exit handler uses it to tell a retirement from a crash.

use std::fmt;
use std::time::{Duration, SystemTime};

use tokio::time::Instant;

use crate::host::WorkerProcess;

use super::timer::{PendingTimer, TimerKind};

/// Identity of a worker, unique for the lifetime of a supervisor.
///
/// Assigned from a counter starting at 1; ordering follows creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub(crate) u64);

impl WorkerId {
    /// Wraps a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Spawned; startup race still running.
    Starting,
    /// Signalled readiness or survived the startup grace period.
    OfficiallyStarted,
    /// Graceful disconnect requested; forced kill pending.
    Stopping,
    /// Process is gone.
    Exited,
}

impl LifecycleState {
    /// Whether `self → next` is one of the allowed forward transitions.
    pub fn can_advance_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Starting, OfficiallyStarted)
                | (Starting, Exited)
                | (OfficiallyStarted, Stopping)
                | (OfficiallyStarted, Exited)
                | (Stopping, Exited)
        )
    }
}

/// Why a worker was spawned; decides who consumes its startup verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Purpose {
    /// Initial fill of the pool.
    Fill,
    /// Crash recovery.
    Replacement,
    /// Reload step replacing `old`.
    Reload { old: WorkerId },
}

/// Read-only view of a registered worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInfo {
    /// Worker id.
    pub id: WorkerId,
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Wall-clock creation time.
    pub forked_at: SystemTime,
    /// Time since creation.
    pub uptime: Duration,
    /// OS process id, if the host knows it.
    pub pid: Option<u32>,
}

pub(crate) struct Worker {
    pub(crate) id: WorkerId,
    pub(crate) process: Box<dyn WorkerProcess>,
    pub(crate) purpose: Purpose,
    pub(crate) deliberate: bool,
    pub(crate) listed: bool,
    state: LifecycleState,
    started_at: Instant,
    forked_at: SystemTime,
    timer: Option<PendingTimer>,
}

impl Worker {
    /// A freshly created worker with its startup timer armed.
    pub(crate) fn new(
        id: WorkerId,
        process: Box<dyn WorkerProcess>,
        purpose: Purpose,
        start_timer: PendingTimer,
    ) -> Self {
        debug_assert_eq!(start_timer.kind(), TimerKind::Start);
        Self {
            id,
            process,
            purpose,
            deliberate: false,
            listed: false,
            state: LifecycleState::Starting,
            started_at: Instant::now(),
            forked_at: SystemTime::now(),
            timer: Some(start_timer),
        }
    }

    pub(crate) fn state(&self) -> LifecycleState {
        self.state
    }

    pub(crate) fn is_officially_started(&self) -> bool {
        self.state == LifecycleState::OfficiallyStarted
    }

    pub(crate) fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Moves to `next` if the transition is allowed; returns whether it happened.
    pub(crate) fn advance(&mut self, next: LifecycleState) -> bool {
        if self.state.can_advance_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    /// Clears the timer slot if it holds a timer of `kind`, cancelling it.
    ///
    /// Returns `false` when no such timer was armed (already consumed).
    pub(crate) fn clear_timer(&mut self, kind: TimerKind) -> bool {
        match &self.timer {
            Some(timer) if timer.kind() == kind => {
                self.timer = None;
                true
            }
            _ => false,
        }
    }

    /// Arms the forced-kill timer; only valid once `Stopping`.
    pub(crate) fn arm_stop_timer(&mut self, timer: PendingTimer) {
        debug_assert_eq!(self.state, LifecycleState::Stopping);
        debug_assert!(self.timer.is_none(), "timer slot already armed");
        self.timer = Some(timer);
    }

    #[cfg(test)]
    pub(crate) fn timer_kind(&self) -> Option<TimerKind> {
        self.timer.as_ref().map(PendingTimer::kind)
    }

    pub(crate) fn info(&self) -> WorkerInfo {
        WorkerInfo {
            id: self.id,
            state: self.state,
            forked_at: self.forked_at,
            uptime: self.uptime(),
            pid: self.process.pid(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleState::*;

    #[test]
    fn only_forward_transitions_are_allowed() {
        let all = [Starting, OfficiallyStarted, Stopping, Exited];
        let allowed = [
            (Starting, OfficiallyStarted),
            (Starting, Exited),
            (OfficiallyStarted, Stopping),
            (OfficiallyStarted, Exited),
            (Stopping, Exited),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_advance_to(to),
                    allowed.contains(&(from, to)),
                    "{from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn worker_id_orders_by_creation() {
        let mut ids = vec![WorkerId::new(3), WorkerId::new(1), WorkerId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![WorkerId::new(1), WorkerId::new(2), WorkerId::new(3)]);
        assert_eq!(WorkerId::new(12).to_string(), "12");
    }
}
