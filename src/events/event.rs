//! # Runtime events emitted by the pool supervisor.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Worker lifecycle**: forked, started, stopping, killed, exited, crashed
//! - **Reload**: requested, per-worker step, completed, failed
//! - **Shutdown**: requested, all stopped, timeout
//! - **Subscriber health**: overflow, panic
//!
//! The [`Event`] struct carries additional metadata such as the worker id,
//! the registry size right after the transition, and failure reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use poolvisor::{Event, EventKind, WorkerId};
//!
//! let ev = Event::new(EventKind::WorkerCrashed)
//!     .with_worker(WorkerId::new(3))
//!     .with_active(2)
//!     .with_reason("exit status: 1");
//!
//! assert_eq!(ev.kind, EventKind::WorkerCrashed);
//! assert_eq!(ev.worker, Some(WorkerId::new(3)));
//! assert_eq!(ev.active, Some(2));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::WorkerId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: subscriber name and panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and drop reason ("full", "closed")
    SubscriberOverflow,

    // === Worker lifecycle ===
    /// A worker process was created and registered.
    ///
    /// Sets:
    /// - `worker`: new worker id
    /// - `replaces`: old worker id when spawned by a reload step
    /// - `active`: registry size after registration
    WorkerForked,

    /// A worker became officially started.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `reason`: `"ready"` (readiness signal) or `"grace_elapsed"` (survived the timer)
    /// - `elapsed_ms`: time since the worker was forked
    WorkerStarted,

    /// A worker failed its startup race (early death or spawn failure).
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `reason`: failure message
    StartupFailed,

    /// A worker was retired: graceful disconnect requested, removed from the registry.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `active`: registry size after removal
    /// - `timeout_ms`: graceful stop timeout before a forced kill
    WorkerStopping,

    /// A worker was forcibly terminated.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `reason`: `"stop_timeout"` or `"never_started"`
    WorkerKilled,

    /// A worker exited after a deliberate stop, or died while still starting.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `active`: registry size after removal
    /// - `reason`: exit status description
    WorkerExited,

    /// An officially started worker exited unexpectedly; one replacement is spawned.
    ///
    /// Sets:
    /// - `worker`: crashed worker id
    /// - `active`: registry size after removal (before the replacement registers)
    /// - `reason`: exit status description
    WorkerCrashed,

    // === Reload ===
    /// A reload was requested.
    ///
    /// Sets:
    /// - `queued`: queue length after merging the registry snapshot
    ReloadRequested,

    /// A reload step began replacing one worker.
    ///
    /// Sets:
    /// - `worker`: the old worker being replaced
    /// - `queued`: ids still waiting behind it
    ReloadStep,

    /// The reload queue drained without failures.
    ReloadCompleted,

    /// A reload chain stopped on a failure.
    ///
    /// Sets:
    /// - `worker`: the old worker that could not be replaced (if any)
    /// - `reason`: failure message
    /// - `queued`: ids left in the queue for the next request
    ReloadFailed,

    // === Shutdown ===
    /// Shutdown requested (OS signal or explicit handle call).
    ShutdownRequested,

    /// Every worker exited within the shutdown timeout.
    AllStopped,

    /// Shutdown timeout exceeded; some workers never reported their exit.
    ShutdownTimeout,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Worker the event is about.
    pub worker: Option<WorkerId>,
    /// Old worker replaced by `worker` (reload steps only).
    pub replaces: Option<WorkerId>,
    /// Registry size right after the transition.
    pub active: Option<u32>,
    /// Reload queue length.
    pub queued: Option<u32>,
    /// Time since fork in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
    /// Timeout attached to the transition in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, exit statuses, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            replaces: None,
            active: None,
            queued: None,
            elapsed_ms: None,
            timeout_ms: None,
            reason: None,
        }
    }

    /// Attaches a worker id.
    #[inline]
    pub fn with_worker(mut self, id: WorkerId) -> Self {
        self.worker = Some(id);
        self
    }

    /// Attaches the id of the worker being replaced.
    #[inline]
    pub fn with_replaces(mut self, id: WorkerId) -> Self {
        self.replaces = Some(id);
        self
    }

    /// Attaches the registry size.
    #[inline]
    pub fn with_active(mut self, n: usize) -> Self {
        self.active = Some(clamp_u32(n));
        self
    }

    /// Attaches the reload queue length.
    #[inline]
    pub fn with_queued(mut self, n: usize) -> Self {
        self.queued = Some(clamp_u32(n));
        self
    }

    /// Attaches an elapsed duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(millis(d));
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(millis(d));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    /// True for the two subscriber-health kinds.
    ///
    /// These are never re-published through a subscriber queue to avoid feedback loops.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

fn millis(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

fn clamp_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::WorkerForked);
        let b = Event::new(EventKind::WorkerForked);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn durations_are_clamped_to_u32_millis() {
        let ev = Event::new(EventKind::WorkerStopping)
            .with_timeout(Duration::from_secs(u64::MAX / 2))
            .with_elapsed(Duration::from_millis(1500));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
        assert_eq!(ev.elapsed_ms, Some(1500));
    }
}
