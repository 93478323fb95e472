//! # Worker registry: which workers count toward pool capacity.
//!
//! Two ordered maps:
//! - **active**: workers currently counted as part of the pool;
//! - **retiring**: workers whose disconnect was requested but whose exit has
//!   not been observed yet. They keep their process handle and forced-kill
//!   timer here, but no longer count toward capacity.
//!
//! ## Rules
//! - Ids iterate in ascending order (creation order), so a snapshot is
//!   deterministic.
//! - A worker is in at most one of the two maps.
//! - Only the control loop touches the registry.

use std::collections::BTreeMap;

use super::worker::{Worker, WorkerId, WorkerInfo};

#[derive(Default)]
pub(crate) struct Registry {
    active: BTreeMap<WorkerId, Worker>,
    retiring: BTreeMap<WorkerId, Worker>,
}

impl Registry {
    pub(crate) fn insert(&mut self, worker: Worker) {
        self.active.insert(worker.id, worker);
    }

    /// Number of active workers.
    pub(crate) fn len(&self) -> usize {
        self.active.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: WorkerId) -> bool {
        self.active.contains_key(&id)
    }

    pub(crate) fn get_mut(&mut self, id: WorkerId) -> Option<&mut Worker> {
        self.active.get_mut(&id)
    }

    /// Active or retiring worker.
    pub(crate) fn find_mut(&mut self, id: WorkerId) -> Option<&mut Worker> {
        match self.active.get_mut(&id) {
            Some(w) => Some(w),
            None => self.retiring.get_mut(&id),
        }
    }

    /// Ascending ids of every active worker, listed or not.
    pub(crate) fn ids(&self) -> Vec<WorkerId> {
        self.active.keys().copied().collect()
    }

    /// Ascending snapshot of listed active ids.
    pub(crate) fn snapshot(&self) -> Vec<WorkerId> {
        self.active
            .values()
            .filter(|w| w.listed)
            .map(|w| w.id)
            .collect()
    }

    /// Moves an active worker to the retiring set.
    pub(crate) fn retire(&mut self, id: WorkerId) -> Option<&mut Worker> {
        let worker = self.active.remove(&id)?;
        Some(self.retiring.entry(id).or_insert(worker))
    }

    /// Removes a worker from whichever map holds it (its process exited).
    pub(crate) fn take(&mut self, id: WorkerId) -> Option<Worker> {
        self.active.remove(&id).or_else(|| self.retiring.remove(&id))
    }

    /// True when no worker process (active or retiring) remains.
    pub(crate) fn is_drained(&self) -> bool {
        self.active.is_empty() && self.retiring.is_empty()
    }

    /// Ids of every worker whose exit has not been observed.
    pub(crate) fn live_ids(&self) -> Vec<WorkerId> {
        let mut ids: Vec<WorkerId> = self
            .active
            .keys()
            .chain(self.retiring.keys())
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn infos(&self) -> Vec<WorkerInfo> {
        self.active
            .values()
            .filter(|w| w.listed)
            .map(Worker::info)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::core::timer::{PendingTimer, TimerKind};
    use crate::core::worker::Purpose;
    use crate::host::WorkerProcess;

    struct Inert;

    impl WorkerProcess for Inert {
        fn disconnect(&mut self) {}
        fn terminate(&mut self) {}
    }

    fn worker(id: u64) -> Worker {
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = WorkerId::new(id);
        let timer = PendingTimer::arm(TimerKind::Start, id, Duration::from_secs(5), &tx);
        let mut w = Worker::new(id, Box::new(Inert), Purpose::Fill, timer);
        w.listed = id.get() != 4;
        w
    }

    #[tokio::test(start_paused = true)]
    async fn retire_removes_from_capacity_but_keeps_the_worker() {
        let mut reg = Registry::default();
        for id in [3, 1, 2] {
            reg.insert(worker(id));
        }
        assert_eq!(reg.ids(), vec![WorkerId::new(1), WorkerId::new(2), WorkerId::new(3)]);

        assert!(reg.retire(WorkerId::new(2)).is_some());
        assert_eq!(reg.len(), 2);
        assert!(!reg.contains(WorkerId::new(2)));
        assert!(reg.find_mut(WorkerId::new(2)).is_some());
        assert_eq!(reg.live_ids().len(), 3);
        assert!(reg.retire(WorkerId::new(2)).is_none());

        assert!(reg.take(WorkerId::new(2)).is_some());
        assert!(reg.take(WorkerId::new(2)).is_none());
        assert_eq!(reg.live_ids(), vec![WorkerId::new(1), WorkerId::new(3)]);
        assert!(!reg.is_drained());
    }

    #[tokio::test(start_paused = true)]
    async fn unlisted_workers_are_left_out_of_snapshots() {
        let mut reg = Registry::default();
        for id in [1, 4, 2] {
            reg.insert(worker(id));
        }
        assert_eq!(reg.snapshot(), vec![WorkerId::new(1), WorkerId::new(2)]);
        assert_eq!(reg.infos().len(), 2);
        assert_eq!(reg.ids().len(), 3);

        reg.find_mut(WorkerId::new(4)).unwrap().listed = true;
        assert_eq!(
            reg.snapshot(),
            vec![WorkerId::new(1), WorkerId::new(2), WorkerId::new(4)]
        );
    }
}
