//! In-memory [`ProcessHost`] for supervisor tests.
//!
//! Tests drive workers by hand (`ready`, `crash`, ...). By default a worker
//! honours `disconnect` by exiting; `set_stubborn(true)` makes it ignore the
//! request so the forced-kill timer has to fire, and `set_unkillable(true)`
//! makes `terminate` record the call without the process exiting.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::WorkerId;
use crate::error::HostError;

use super::process::{ExitReport, HostSetup, ProcessHost, SignalSink, SpawnRequest, WorkerProcess};

#[derive(Default)]
struct FakeState {
    setup: Option<HostSetup>,
    sinks: BTreeMap<WorkerId, SignalSink>,
    created: Vec<WorkerId>,
    disconnected: Vec<WorkerId>,
    terminated: Vec<WorkerId>,
    stubborn: bool,
    unkillable: bool,
    failing_spawns: usize,
}

#[derive(Clone, Default)]
pub(crate) struct FakeHost {
    state: Arc<Mutex<FakeState>>,
}

impl FakeHost {
    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn sink(&self, id: WorkerId) -> SignalSink {
        self.lock().sinks.get(&id).cloned().expect("unknown worker")
    }

    pub(crate) fn setup(&self) -> Option<HostSetup> {
        self.lock().setup.clone()
    }

    pub(crate) fn created(&self) -> Vec<WorkerId> {
        self.lock().created.clone()
    }

    pub(crate) fn disconnected(&self) -> Vec<WorkerId> {
        self.lock().disconnected.clone()
    }

    pub(crate) fn terminated(&self) -> Vec<WorkerId> {
        self.lock().terminated.clone()
    }

    pub(crate) fn set_stubborn(&self, stubborn: bool) {
        self.lock().stubborn = stubborn;
    }

    pub(crate) fn set_unkillable(&self, unkillable: bool) {
        self.lock().unkillable = unkillable;
    }

    pub(crate) fn fail_next_spawns(&self, n: usize) {
        self.lock().failing_spawns = n;
    }

    pub(crate) fn ready(&self, id: WorkerId) {
        self.sink(id).ready();
    }

    pub(crate) fn message(&self, id: WorkerId, payload: &str) {
        self.sink(id).message(payload);
    }

    pub(crate) fn crash(&self, id: WorkerId) {
        self.sink(id).exited(ExitReport::code(1));
    }

    pub(crate) fn exit_deliberately(&self, id: WorkerId) {
        self.sink(id).exited(ExitReport::code(0).deliberate());
    }
}

impl ProcessHost for FakeHost {
    fn configure(&self, setup: &HostSetup) -> Result<(), HostError> {
        let mut state = self.lock();
        if state.setup.is_some() {
            return Err(HostError::AlreadyAttached);
        }
        state.setup = Some(setup.clone());
        Ok(())
    }

    fn create(
        &self,
        request: &SpawnRequest<'_>,
        sink: SignalSink,
    ) -> Result<Box<dyn WorkerProcess>, HostError> {
        let mut state = self.lock();
        if state.setup.is_none() {
            return Err(HostError::NotConfigured);
        }
        if state.failing_spawns > 0 {
            state.failing_spawns -= 1;
            return Err(HostError::Spawn(std::io::Error::other("spawn refused")));
        }
        state.created.push(request.id);
        state.sinks.insert(request.id, sink);
        Ok(Box::new(FakeProcess {
            id: request.id,
            host: self.clone(),
        }))
    }
}

struct FakeProcess {
    id: WorkerId,
    host: FakeHost,
}

impl WorkerProcess for FakeProcess {
    fn disconnect(&mut self) {
        let mut state = self.host.lock();
        state.disconnected.push(self.id);
        if !state.stubborn {
            if let Some(sink) = state.sinks.get(&self.id) {
                sink.exited(ExitReport::code(0));
            }
        }
    }

    fn terminate(&mut self) {
        let mut state = self.host.lock();
        state.terminated.push(self.id);
        if state.unkillable {
            return;
        }
        if let Some(sink) = state.sinks.get(&self.id) {
            sink.exited(ExitReport::signaled(9));
        }
    }
}
