//! # Rolling reload queue.
//!
//! Bookkeeping for the serialized replace-then-retire cycle. The control loop
//! drives the side effects (spawn, terminate, retire); this type only decides
//! *which* worker is next and *who* gets notified.
//!
//! ```text
//! request(snapshot, cb) ──► merge new ids ──► pending = cb ──► start if idle
//!
//! pop_next() ──► active = Some(old) ──► (loop spawns replacement)
//!     │
//!     ├─ replacement started ──► loop retires old ──► pop_next() ...
//!     ├─ replacement failed  ──► abort(): active = None, queue kept, cb(Err)
//!     └─ queue empty         ──► complete(): active = None, cb(Ok)
//! ```
//!
//! ## Rules
//! - At most one replacement is in flight (`active`).
//! - Merging never duplicates a queued id and never re-adds the in-flight id.
//!   A replacement spawned this turn is not in the snapshot yet; it is listed
//!   on the next loop turn (see `Command::Listed`).
//! - Only the most recent callback is kept; earlier ones are dropped unseen.

use std::collections::VecDeque;

use crate::error::ReloadError;

use super::worker::WorkerId;

/// Completion notifier for a reload request.
///
/// Invoked on the control loop: it must return quickly and must not block.
pub type ReloadCallback = Box<dyn FnOnce(Result<(), ReloadError>) + Send + 'static>;

#[derive(Default)]
pub(crate) struct ReloadQueue {
    queue: VecDeque<WorkerId>,
    active: Option<WorkerId>,
    pending: Option<ReloadCallback>,
}

impl ReloadQueue {
    /// Merges `snapshot` and stores `callback`.
    ///
    /// Returns `true` when nothing is in flight and processing should start.
    pub(crate) fn request(
        &mut self,
        snapshot: impl IntoIterator<Item = WorkerId>,
        callback: ReloadCallback,
    ) -> bool {
        for id in snapshot {
            if self.active != Some(id) && !self.queue.contains(&id) {
                self.queue.push_back(id);
            }
        }
        self.pending = Some(callback);
        self.active.is_none()
    }

    /// Pops the next id into the in-flight slot. `None` when the queue is empty.
    pub(crate) fn pop_next(&mut self) -> Option<WorkerId> {
        self.active = self.queue.pop_front();
        self.active
    }

    pub(crate) fn in_flight(&self) -> Option<WorkerId> {
        self.active
    }

    /// Number of ids still waiting.
    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    /// The queue drained: clears the in-flight slot and hands back the callback.
    pub(crate) fn complete(&mut self) -> Option<ReloadCallback> {
        self.active = None;
        self.pending.take()
    }

    /// A step failed: same as [`complete`](Self::complete) but the remaining
    /// ids stay queued for the next request.
    pub(crate) fn abort(&mut self) -> Option<ReloadCallback> {
        self.complete()
    }

    /// Drops every queued id (shutdown) and hands back the callback.
    pub(crate) fn cancel(&mut self) -> Option<ReloadCallback> {
        self.queue.clear();
        self.complete()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn ids(raw: &[u64]) -> Vec<WorkerId> {
        raw.iter().copied().map(WorkerId::new).collect()
    }

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> ReloadCallback) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = Arc::clone(&log);
            move |name: &'static str| -> ReloadCallback {
                let log = Arc::clone(&log);
                Box::new(move |_res| log.lock().unwrap().push(name))
            }
        };
        (log, make)
    }

    #[test]
    fn first_request_starts_processing() {
        let (_log, cb) = recorder();
        let mut q = ReloadQueue::default();
        assert!(q.request(ids(&[1, 2]), cb("a")));
        assert_eq!(q.pop_next(), Some(WorkerId::new(1)));
        assert_eq!(q.in_flight(), Some(WorkerId::new(1)));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn overlapping_request_merges_without_duplicates_and_keeps_latest_callback() {
        let (log, cb) = recorder();
        let mut q = ReloadQueue::default();
        q.request(ids(&[1, 2]), cb("first"));
        q.pop_next();

        // 1 is in flight, 2 is queued: 3 and 4 are new.
        assert!(!q.request(ids(&[1, 2, 3, 4]), cb("second")));
        assert_eq!(q.len(), 3);

        assert_eq!(q.pop_next(), Some(WorkerId::new(2)));
        assert_eq!(q.pop_next(), Some(WorkerId::new(3)));
        assert_eq!(q.pop_next(), Some(WorkerId::new(4)));
        assert_eq!(q.pop_next(), None);
        (q.complete().unwrap())(Ok(()));

        assert_eq!(*log.lock().unwrap(), vec!["second"]);
        assert_eq!(q.in_flight(), None);
    }

    #[test]
    fn abort_keeps_remaining_ids_queued() {
        let (log, cb) = recorder();
        let mut q = ReloadQueue::default();
        q.request(ids(&[1, 2]), cb("a"));
        q.pop_next();

        (q.abort().unwrap())(Err(ReloadError::ShuttingDown));
        assert_eq!(q.in_flight(), None);
        assert_eq!(q.len(), 1);
        assert!(q.abort().is_none());

        // The next request picks up where the failed one stopped.
        assert!(q.request(ids(&[1, 2]), cb("b")));
        assert_eq!(q.pop_next(), Some(WorkerId::new(2)));
        assert_eq!(q.pop_next(), Some(WorkerId::new(1)));
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn cancel_drops_queue() {
        let (_log, cb) = recorder();
        let mut q = ReloadQueue::default();
        q.request(ids(&[1, 2, 3]), cb("a"));
        q.pop_next();
        assert!(q.cancel().is_some());
        assert_eq!(q.len(), 0);
        assert_eq!(q.pop_next(), None);
    }
}
