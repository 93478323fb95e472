//! # Pool: the supervisor's state machine.
//!
//! Owns the registry, the reload queue and the process host, and turns each
//! [`Command`] into state transitions plus side effects (spawn, disconnect,
//! terminate, publish). Every handler runs to completion inside one control
//! loop turn.
//!
//! ## Event flow
//! ```text
//! spawn(purpose) ── host.create ──► Worker{Starting, start timer} ──► WorkerForked
//!                                      └─ next turn: Listed ──► visible to snapshots
//!
//! Ready / start timer / early exit ──► startup::resolve ──► verdict
//!     verdict ──► purpose:
//!        Fill, Replacement ──► (logged only)
//!        Reload{old}       ──► Ok: retire(old), reload_next()
//!                              Err: abort reload, callback(Err)
//!
//! Exited ──► take from registry
//!        ├─ deliberate or never started ──► WorkerExited
//!        └─ officially started, not deliberate ──► WorkerCrashed ──► spawn(Replacement)
//!
//! retire(id) ──► deliberate = true ──► Stopping + stop timer ──► disconnect()
//!            └─ stop timer fires ──► terminate() ──► WorkerKilled
//! ```

use std::sync::Arc;

use tokio::time::Instant;

use crate::error::{ReloadError, RuntimeError, StartupError};
use crate::events::{Bus, Event, EventKind};
use crate::host::{ExitReport, ProcessHost, SignalSink, SpawnRequest};

use super::command::{Command, CommandRx, CommandTx, HostSignal};
use super::config::PoolConfig;
use super::hooks::MessageHandler;
use super::registry::Registry;
use super::reload::{ReloadCallback, ReloadQueue};
use super::startup::{self, StartupSignal, Verdict};
use super::timer::{PendingTimer, TimerKind};
use super::worker::{LifecycleState, Purpose, Worker, WorkerId};

pub(crate) struct Pool {
    cfg: PoolConfig,
    host: Arc<dyn ProcessHost>,
    bus: Bus,
    tx: CommandTx,
    on_message: Option<Arc<dyn MessageHandler>>,
    registry: Registry,
    reload: ReloadQueue,
    next_id: u64,
    shutdown_deadline: Option<Instant>,
}

impl Pool {
    pub(crate) fn new(
        cfg: PoolConfig,
        host: Arc<dyn ProcessHost>,
        bus: Bus,
        tx: CommandTx,
        on_message: Option<Arc<dyn MessageHandler>>,
    ) -> Self {
        Self {
            cfg,
            host,
            bus,
            tx,
            on_message,
            registry: Registry::default(),
            reload: ReloadQueue::default(),
            next_id: 1,
            shutdown_deadline: None,
        }
    }

    /// Spawns `size` workers, independently of each other's outcome.
    pub(crate) fn fill(&mut self, size: usize) {
        for _ in 0..size {
            self.spawn(Purpose::Fill);
        }
    }

    /// Runs the control loop until a shutdown completes or times out.
    pub(crate) async fn drive(mut self, mut rx: CommandRx) -> Result<(), RuntimeError> {
        loop {
            let next = match self.shutdown_deadline {
                None => rx.recv().await,
                Some(deadline) => match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(next) => next,
                    Err(_) => return Err(self.shutdown_timed_out()),
                },
            };
            // The pool holds a sender, so the channel never closes while it runs.
            let Some(cmd) = next else {
                return Ok(());
            };
            self.handle(cmd);

            if self.shutdown_deadline.is_some() && self.registry.is_drained() {
                self.bus.publish(Event::new(EventKind::AllStopped));
                return Ok(());
            }
        }
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Host { id, signal } => match signal {
                HostSignal::Ready => self.race(id, StartupSignal::Ready),
                HostSignal::Message(payload) => {
                    if let Some(handler) = &self.on_message {
                        handler.on_message(id, &payload);
                    }
                }
                HostSignal::Exited(report) => self.on_exit(id, report),
            },
            Command::Listed(id) => {
                if let Some(worker) = self.registry.find_mut(id) {
                    worker.listed = true;
                }
            }
            Command::Timer {
                id,
                kind: TimerKind::Start,
            } => self.race(id, StartupSignal::GraceElapsed),
            Command::Timer {
                id,
                kind: TimerKind::Stop,
            } => self.on_stop_timeout(id),
            Command::Reload(callback) => self.request_reload(callback),
            Command::Workers(reply) => {
                let _ = reply.send(self.registry.infos());
            }
            Command::Shutdown => self.begin_shutdown(),
        }
    }

    fn shutting_down(&self) -> bool {
        self.shutdown_deadline.is_some()
    }

    // ---------------------------
    // Spawning and startup
    // ---------------------------

    /// Creates a worker for `purpose`.
    ///
    /// Fill workers are listed at once. Any other worker is listed on the next
    /// turn, so reload requests already queued behind this turn do not see it.
    fn spawn(&mut self, purpose: Purpose) {
        if self.shutting_down() {
            return;
        }
        let id = WorkerId(self.next_id);
        self.next_id += 1;

        let request = SpawnRequest {
            id,
            env: &self.cfg.env,
        };
        let sink = SignalSink::new(id, self.tx.clone());

        match self.host.create(&request, sink) {
            Ok(process) => {
                let timer = PendingTimer::arm(
                    TimerKind::Start,
                    id,
                    self.cfg.startup_grace_timeout,
                    &self.tx,
                );
                let mut worker = Worker::new(id, process, purpose, timer);
                if purpose == Purpose::Fill {
                    worker.listed = true;
                } else {
                    let _ = self.tx.send(Command::Listed(id));
                }
                self.registry.insert(worker);

                let mut ev = Event::new(EventKind::WorkerForked)
                    .with_worker(id)
                    .with_active(self.registry.len());
                if let Purpose::Reload { old } = purpose {
                    ev = ev.with_replaces(old);
                }
                self.bus.publish(ev);
            }
            Err(err) => {
                let err = StartupError::Spawn {
                    worker: id,
                    reason: err.to_string(),
                };
                self.on_verdict(id, purpose, Verdict::Failed(err));
            }
        }
    }

    /// Feeds a readiness or grace-timer signal into the startup race.
    fn race(&mut self, id: WorkerId, signal: StartupSignal) {
        let Some(worker) = self.registry.find_mut(id) else {
            return;
        };
        let Some(verdict) = startup::resolve(worker, signal) else {
            return;
        };
        let purpose = worker.purpose;
        let elapsed = worker.uptime();

        if let Verdict::Started { via } = &verdict {
            self.bus.publish(
                Event::new(EventKind::WorkerStarted)
                    .with_worker(id)
                    .with_reason(*via)
                    .with_elapsed(elapsed),
            );
        }
        self.on_verdict(id, purpose, verdict);
    }

    /// Routes a startup verdict to whoever is waiting for it.
    fn on_verdict(&mut self, id: WorkerId, purpose: Purpose, verdict: Verdict) {
        let outcome = verdict.into_result();
        if let Err(err) = &outcome {
            self.bus.publish(
                Event::new(EventKind::StartupFailed)
                    .with_worker(id)
                    .with_reason(err.to_string()),
            );
        }

        let Purpose::Reload { old } = purpose else {
            return;
        };
        if self.reload.in_flight() != Some(old) {
            return;
        }
        match outcome {
            Ok(()) => {
                self.retire(old);
                self.reload_next();
            }
            Err(err) => self.reload_failed(old, err),
        }
    }

    // ---------------------------
    // Exit, crash recovery, retirement
    // ---------------------------

    fn on_exit(&mut self, id: WorkerId, report: ExitReport) {
        let Some(mut worker) = self.registry.take(id) else {
            return;
        };
        let deliberate = worker.deliberate || report.deliberate;
        let crashed = !deliberate && worker.is_officially_started();

        let verdict = startup::resolve(&mut worker, StartupSignal::Exited { deliberate });
        worker.clear_timer(TimerKind::Stop);
        worker.advance(LifecycleState::Exited);

        let kind = if crashed {
            EventKind::WorkerCrashed
        } else {
            EventKind::WorkerExited
        };
        self.bus.publish(
            Event::new(kind)
                .with_worker(id)
                .with_active(self.registry.len())
                .with_reason(report.to_string()),
        );

        let purpose = worker.purpose;
        drop(worker);
        if let Some(verdict) = verdict {
            self.on_verdict(id, purpose, verdict);
        }
        if crashed {
            self.spawn(Purpose::Replacement);
        }
    }

    /// Takes a worker out of the pool: disconnect, forced kill after the grace period.
    fn retire(&mut self, id: WorkerId) {
        let timeout = self.cfg.graceful_stop_timeout;
        let Some(worker) = self.registry.retire(id) else {
            return;
        };
        let already_stopping = std::mem::replace(&mut worker.deliberate, true);
        let mut ev = Event::new(EventKind::WorkerStopping).with_worker(id);

        match worker.state() {
            LifecycleState::OfficiallyStarted => {
                worker.advance(LifecycleState::Stopping);
                worker.arm_stop_timer(PendingTimer::arm(TimerKind::Stop, id, timeout, &self.tx));
                worker.process.disconnect();
                ev = ev.with_timeout(timeout);
            }
            // Never served traffic: no grace period owed.
            LifecycleState::Starting if !already_stopping => kill_while_starting(worker),
            _ => {}
        }

        self.bus.publish(ev.with_active(self.registry.len()));
    }

    fn on_stop_timeout(&mut self, id: WorkerId) {
        let Some(worker) = self.registry.find_mut(id) else {
            return;
        };
        if !worker.clear_timer(TimerKind::Stop) {
            return;
        }
        worker.process.terminate();
        self.bus.publish(
            Event::new(EventKind::WorkerKilled)
                .with_worker(id)
                .with_reason("stop_timeout"),
        );
    }

    // ---------------------------
    // Rolling reload
    // ---------------------------

    fn request_reload(&mut self, callback: ReloadCallback) {
        if self.shutting_down() {
            callback(Err(ReloadError::ShuttingDown));
            return;
        }
        let start = self.reload.request(self.registry.snapshot(), callback);
        self.bus
            .publish(Event::new(EventKind::ReloadRequested).with_queued(self.reload.len()));
        if start {
            self.reload_next();
        }
    }

    fn reload_next(&mut self) {
        while let Some(old) = self.reload.pop_next() {
            let Some(worker) = self.registry.get_mut(old) else {
                continue;
            };
            self.bus.publish(
                Event::new(EventKind::ReloadStep)
                    .with_worker(old)
                    .with_queued(self.reload.len()),
            );

            if !worker.is_officially_started() {
                worker.deliberate = true;
                kill_while_starting(worker);
                self.bus.publish(
                    Event::new(EventKind::WorkerKilled)
                        .with_worker(old)
                        .with_reason("never_started"),
                );
            }
            self.spawn(Purpose::Reload { old });
            return;
        }

        let callback = self.reload.complete();
        self.bus.publish(Event::new(EventKind::ReloadCompleted));
        if let Some(callback) = callback {
            callback(Ok(()));
        }
    }

    fn reload_failed(&mut self, old: WorkerId, err: StartupError) {
        let callback = self.reload.abort();
        self.bus.publish(
            Event::new(EventKind::ReloadFailed)
                .with_worker(old)
                .with_reason(err.to_string())
                .with_queued(self.reload.len()),
        );
        if let Some(callback) = callback {
            callback(Err(ReloadError::Startup(err)));
        }
    }

    // ---------------------------
    // Shutdown
    // ---------------------------

    fn begin_shutdown(&mut self) {
        if self.shutting_down() {
            return;
        }
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.shutdown_deadline = Some(Instant::now() + self.cfg.shutdown_timeout);

        if let Some(callback) = self.reload.cancel() {
            callback(Err(ReloadError::ShuttingDown));
        }
        for id in self.registry.ids() {
            self.retire(id);
        }
    }

    fn shutdown_timed_out(&self) -> RuntimeError {
        let stuck = self.registry.live_ids();
        self.bus.publish(
            Event::new(EventKind::ShutdownTimeout)
                .with_timeout(self.cfg.shutdown_timeout)
                .with_reason(format!("stuck workers: {stuck:?}")),
        );
        RuntimeError::ShutdownTimeout {
            timeout: self.cfg.shutdown_timeout,
            stuck,
        }
    }
}

/// Terminates a worker that is still `Starting`. Its grace timer is dropped in
/// the same turn, so a slow exit can no longer promote it to started.
fn kill_while_starting(worker: &mut Worker) {
    worker.clear_timer(TimerKind::Start);
    worker.process.terminate();
}
