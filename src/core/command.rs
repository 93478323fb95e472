//! Inputs of the supervisor control loop.
//!
//! Everything that can change pool state arrives here as a [`Command`]: host
//! signals, timer expiries and requests from [`PoolHandle`](crate::PoolHandle).
//! The loop handles one command per turn, so no two handlers ever race.

use tokio::sync::{mpsc, oneshot};

use crate::host::ExitReport;

use super::reload::ReloadCallback;
use super::timer::TimerKind;
use super::worker::{WorkerId, WorkerInfo};

pub(crate) type CommandTx = mpsc::UnboundedSender<Command>;
pub(crate) type CommandRx = mpsc::UnboundedReceiver<Command>;

/// Lifecycle signal reported by a process host for one worker.
#[derive(Debug)]
pub(crate) enum HostSignal {
    Ready,
    Message(String),
    Exited(ExitReport),
}

pub(crate) enum Command {
    Host { id: WorkerId, signal: HostSignal },
    /// A worker spawned on an earlier turn becomes visible to snapshots.
    Listed(WorkerId),
    Timer { id: WorkerId, kind: TimerKind },
    Reload(ReloadCallback),
    Workers(oneshot::Sender<Vec<WorkerInfo>>),
    Shutdown,
}
