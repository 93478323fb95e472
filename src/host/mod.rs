//! Process host adapter: the boundary between the supervisor and OS processes.
//!
//! - [`process`]: the [`ProcessHost`] / [`WorkerProcess`] traits and the
//!   [`SignalSink`] used to report readiness, messages and exits;
//! - [`command`]: [`CommandHost`], a `tokio::process` implementation.

mod command;
#[cfg(test)]
pub(crate) mod fake;
mod process;

pub use command::CommandHost;
pub use process::{ExitReport, HostSetup, ProcessHost, SignalSink, SpawnRequest, WorkerProcess};
