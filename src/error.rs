//! Error types used by the poolvisor runtime and process hosts.
//!
//! - [`ConfigError`]: setup failures, returned synchronously by the builder.
//! - [`StartupError`]: a worker did not survive its startup race.
//! - [`ReloadError`]: a rolling reload was aborted or its caller superseded.
//! - [`RuntimeError`]: the control loop itself could not finish cleanly.
//! - [`HostError`]: failures reported by a [`ProcessHost`](crate::ProcessHost).
//!
//! Every enum provides `as_label` (stable snake_case label for logs/metrics).
//! Crash exits of healthy workers are deliberately **not** errors: they are
//! recovered by the supervisor and only published as events.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::core::WorkerId;

/// # Errors raised while building a supervisor.
///
/// All of them are fatal and never retried.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `PoolConfig::exec` is empty.
    #[error("an executable path for workers is required")]
    MissingExec,

    /// The current process is itself a supervised worker.
    #[error("supervisor cannot run inside a worker process (worker id {worker})")]
    NotSupervisor {
        /// Worker id found in the environment.
        worker: String,
    },

    /// The process host already serves another supervisor.
    #[error("process host already has a supervisor attached")]
    AlreadyAttached,

    /// The process host rejected its setup.
    #[error("process host setup failed: {0}")]
    Host(HostError),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use poolvisor::ConfigError;
    ///
    /// assert_eq!(ConfigError::MissingExec.as_label(), "config_missing_exec");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::MissingExec => "config_missing_exec",
            ConfigError::NotSupervisor { .. } => "config_not_supervisor",
            ConfigError::AlreadyAttached => "config_already_attached",
            ConfigError::Host(_) => "config_host",
        }
    }
}

impl From<HostError> for ConfigError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::AlreadyAttached => ConfigError::AlreadyAttached,
            other => ConfigError::Host(other),
        }
    }
}

/// # A worker failed to start.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum StartupError {
    /// The worker exited (not deliberately) before its startup race completed.
    #[error("worker {worker} exited too early")]
    ExitedTooEarly {
        /// The worker that died.
        worker: WorkerId,
    },

    /// The process host could not create the worker process.
    #[error("worker {worker} could not be spawned: {reason}")]
    Spawn {
        /// The id reserved for the worker.
        worker: WorkerId,
        /// Host-provided failure description.
        reason: String,
    },
}

impl StartupError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StartupError::ExitedTooEarly { .. } => "startup_exited_too_early",
            StartupError::Spawn { .. } => "startup_spawn_failed",
        }
    }

    /// The worker this failure refers to.
    pub fn worker(&self) -> WorkerId {
        match self {
            StartupError::ExitedTooEarly { worker } | StartupError::Spawn { worker, .. } => *worker,
        }
    }
}

/// # A rolling reload did not complete.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ReloadError {
    /// A replacement worker failed to start; the reload chain stopped there.
    #[error("reload aborted: {0}")]
    Startup(#[from] StartupError),

    /// The supervisor is shutting down.
    #[error("supervisor is shutting down")]
    ShuttingDown,

    /// A newer reload request took over the completion notification.
    ///
    /// Only surfaced by [`PoolHandle::reload`](crate::PoolHandle::reload);
    /// callback-based requests are dropped silently instead.
    #[error("reload notification superseded by a newer request")]
    Superseded,
}

impl ReloadError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use poolvisor::ReloadError;
    ///
    /// assert_eq!(ReloadError::ShuttingDown.as_label(), "reload_shutting_down");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ReloadError::Startup(_) => "reload_startup_failed",
            ReloadError::ShuttingDown => "reload_shutting_down",
            ReloadError::Superseded => "reload_superseded",
        }
    }

    /// Human-readable message for logs.
    pub fn as_message(&self) -> String {
        match self {
            ReloadError::Startup(err) => format!("replacement failed: {err}"),
            ReloadError::ShuttingDown => "shutting down".to_string(),
            ReloadError::Superseded => "superseded".to_string(),
        }
    }
}

/// # Errors produced by the supervisor control loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Some workers were still alive when the shutdown timeout elapsed.
    #[error("shutdown timeout {timeout:?} exceeded; stuck workers: {stuck:?}")]
    ShutdownTimeout {
        /// The configured shutdown timeout.
        timeout: Duration,
        /// Workers whose exit was never observed.
        stuck: Vec<WorkerId>,
    },

    /// Installing OS signal listeners failed.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use poolvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::ShutdownTimeout { timeout: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_shutdown_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::ShutdownTimeout { .. } => "runtime_shutdown_timeout",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }

    /// Human-readable message for logs.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::ShutdownTimeout { timeout, stuck } => {
                format!("shutdown timeout after {timeout:?}; stuck workers={stuck:?}")
            }
            RuntimeError::Signal(err) => format!("signal handlers: {err}"),
        }
    }
}

/// # Errors reported by process hosts.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HostError {
    /// `configure` was called a second time.
    #[error("process host is already configured")]
    AlreadyAttached,

    /// `create` was called before `configure`.
    #[error("process host is not configured")]
    NotConfigured,

    /// The OS refused to start the process.
    #[error("failed to spawn worker process: {0}")]
    Spawn(#[source] io::Error),
}

impl HostError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HostError::AlreadyAttached => "host_already_attached",
            HostError::NotConfigured => "host_not_configured",
            HostError::Spawn(_) => "host_spawn_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_already_attached_maps_to_config_error() {
        let err: ConfigError = HostError::AlreadyAttached.into();
        assert!(matches!(err, ConfigError::AlreadyAttached));

        let err: ConfigError = HostError::NotConfigured.into();
        assert_eq!(err.as_label(), "config_host");
    }

    #[test]
    fn startup_error_names_the_worker() {
        let err = StartupError::ExitedTooEarly { worker: WorkerId(7) };
        assert_eq!(err.to_string(), "worker 7 exited too early");
        assert_eq!(err.worker(), WorkerId(7));

        let reload: ReloadError = err.into();
        assert_eq!(reload.as_label(), "reload_startup_failed");
        assert_eq!(reload.to_string(), "reload aborted: worker 7 exited too early");
    }
}
