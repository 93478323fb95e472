//! # Process host contract.
//!
//! The supervisor never forks processes itself. It drives a [`ProcessHost`],
//! which creates worker processes and reports what happens to them through a
//! [`SignalSink`]:
//!
//! ```text
//!  Supervisor ── configure(HostSetup) ──► ProcessHost   (once)
//!  Supervisor ── create(SpawnRequest, sink) ──► Box<dyn WorkerProcess>
//!                                                  │ disconnect() / terminate()
//!  worker process ── ready / message / exited ──► SignalSink ──► control loop
//! ```
//!
//! ## Rules for implementors
//! - `create` must not block; long-running I/O belongs in spawned tasks.
//! - Every created process must eventually produce exactly one `exited` signal
//!   (duplicates are ignored by the supervisor).
//! - `disconnect` asks for a graceful stop and may be ignored by the worker;
//!   `terminate` kills immediately.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::core::{Command, CommandTx, HostSignal, WorkerId};
use crate::error::HostError;

/// One-time host setup derived from [`PoolConfig`](crate::PoolConfig).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostSetup {
    /// Absolute path of the worker executable.
    pub exec: PathBuf,
    /// Arguments passed to every worker.
    pub args: Vec<String>,
    /// Discard worker diagnostics instead of inheriting them.
    pub silent: bool,
}

/// Parameters of a single worker creation.
#[derive(Debug)]
pub struct SpawnRequest<'a> {
    /// Id the supervisor assigned to the new worker.
    pub id: WorkerId,
    /// Extra environment for the worker.
    pub env: &'a HashMap<String, String>,
}

/// How a worker process ended.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExitReport {
    /// The worker announced its own stop (self-initiated, not a crash).
    pub deliberate: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal, if the process was killed (unix only).
    pub signal: Option<i32>,
}

impl ExitReport {
    /// An exit with the given code.
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Self::default()
        }
    }

    /// A process killed by `signal`.
    pub fn signaled(signal: i32) -> Self {
        Self {
            signal: Some(signal),
            ..Self::default()
        }
    }

    /// Marks the exit as self-initiated.
    pub fn deliberate(mut self) -> Self {
        self.deliberate = true;
        self
    }
}

impl fmt::Display for ExitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "killed by signal {signal}"),
            (None, None) => f.write_str("unknown exit status"),
        }
    }
}

/// Channel through which a host reports one worker's lifecycle signals.
///
/// Cheap to clone; sending never blocks. Signals sent after the supervisor
/// stopped are dropped.
#[derive(Clone, Debug)]
pub struct SignalSink {
    id: WorkerId,
    tx: CommandTx,
}

impl SignalSink {
    pub(crate) fn new(id: WorkerId, tx: CommandTx) -> Self {
        Self { id, tx }
    }

    /// The worker this sink reports for.
    pub fn worker(&self) -> WorkerId {
        self.id
    }

    /// The worker is ready to serve (for example it started listening).
    pub fn ready(&self) {
        self.send(HostSignal::Ready);
    }

    /// The worker sent an application message.
    pub fn message(&self, payload: impl Into<String>) {
        self.send(HostSignal::Message(payload.into()));
    }

    /// The worker process is gone.
    pub fn exited(&self, report: ExitReport) {
        self.send(HostSignal::Exited(report));
    }

    fn send(&self, signal: HostSignal) {
        let _ = self.tx.send(Command::Host {
            id: self.id,
            signal,
        });
    }
}

/// Creates worker processes for one supervisor.
pub trait ProcessHost: Send + Sync + 'static {
    /// One-time setup before any `create` call.
    ///
    /// A host serves a single supervisor: a second call must fail with
    /// [`HostError::AlreadyAttached`].
    fn configure(&self, setup: &HostSetup) -> Result<(), HostError>;

    /// Starts a new worker process and returns its exclusively owned handle.
    fn create(
        &self,
        request: &SpawnRequest<'_>,
        sink: SignalSink,
    ) -> Result<Box<dyn WorkerProcess>, HostError>;
}

/// Handle to one running worker process, owned by the supervisor.
pub trait WorkerProcess: Send + 'static {
    /// Requests a graceful stop (closes the worker's communication channel).
    fn disconnect(&mut self);

    /// Kills the process immediately.
    fn terminate(&mut self);

    /// OS process id, when known.
    fn pid(&self) -> Option<u32> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_report_display() {
        assert_eq!(ExitReport::code(1).to_string(), "exit code 1");
        assert_eq!(ExitReport::signaled(9).to_string(), "killed by signal 9");
        assert_eq!(ExitReport::default().to_string(), "unknown exit status");
        assert!(ExitReport::code(0).deliberate().deliberate);
    }
}
