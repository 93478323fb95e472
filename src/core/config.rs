//! # Pool configuration.
//!
//! [`PoolConfig`] is a plain struct with public fields and a [`Default`]; it is
//! read-only once the supervisor is built.
//!
//! ## Sentinel values
//! - `size = None` → one worker per available processing unit
//! - `exec` empty → rejected by the builder (`ConfigError::MissingExec`)

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::host::HostSetup;

/// Environment variable carrying the worker id into every worker process.
///
/// Its presence also marks a process as a worker: a supervisor refuses to
/// start where it is set.
pub const WORKER_ID_ENV: &str = "POOLVISOR_WORKER_ID";

/// Configuration of a worker pool.
///
/// ## Field semantics
/// - `exec`, `args`, `silent`: handed to the process host once, before any worker exists
/// - `size`: desired number of workers (`None` = CPU count)
/// - `env`: extra environment for every worker
/// - `graceful_stop_timeout`: wait after a disconnect before killing the worker
/// - `startup_grace_timeout`: a worker alive this long counts as started
/// - `reload_on_signal`: SIGHUP triggers a rolling reload
/// - `shutdown_on_signal`: SIGINT/SIGTERM/SIGQUIT stop the pool
/// - `shutdown_timeout`: bound on waiting for all workers to exit during shutdown
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Worker executable (required). Relative paths resolve against the current directory.
    pub exec: PathBuf,
    /// Arguments for every worker.
    pub args: Vec<String>,
    /// Desired worker count.
    pub size: Option<usize>,
    /// Extra worker environment.
    pub env: HashMap<String, String>,
    /// Discard worker diagnostics output.
    pub silent: bool,
    /// Grace period between a disconnect request and a forced kill.
    pub graceful_stop_timeout: Duration,
    /// Startup grace period.
    pub startup_grace_timeout: Duration,
    /// Reload on SIGHUP.
    pub reload_on_signal: bool,
    /// Shut down on termination signals.
    pub shutdown_on_signal: bool,
    /// Upper bound for the whole shutdown sequence.
    pub shutdown_timeout: Duration,
    /// Event bus capacity.
    pub bus_capacity: usize,
}

impl PoolConfig {
    /// Default configuration for the given worker executable.
    pub fn new(exec: impl Into<PathBuf>) -> Self {
        Self {
            exec: exec.into(),
            ..Self::default()
        }
    }

    /// Resolves `size`, falling back to the number of processing units.
    pub fn desired_size(&self) -> usize {
        self.size.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Checks the configuration; `worker_env` is the value of [`WORKER_ID_ENV`]
    /// in the current process, if any.
    pub(crate) fn validate(&self, worker_env: Option<String>) -> Result<(), ConfigError> {
        if self.exec.as_os_str().is_empty() {
            return Err(ConfigError::MissingExec);
        }
        if let Some(worker) = worker_env {
            return Err(ConfigError::NotSupervisor { worker });
        }
        Ok(())
    }

    /// Host setup with `exec` made absolute.
    pub(crate) fn host_setup(&self) -> HostSetup {
        HostSetup {
            exec: std::path::absolute(&self.exec).unwrap_or_else(|_| self.exec.clone()),
            args: self.args.clone(),
            silent: self.silent,
        }
    }
}

impl Default for PoolConfig {
    /// Default configuration:
    ///
    /// - `exec` empty (must be set)
    /// - `size = None` (CPU count)
    /// - `graceful_stop_timeout = 5s`, `startup_grace_timeout = 5s`
    /// - `reload_on_signal = true`, `shutdown_on_signal = true`
    /// - `shutdown_timeout = 10s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            exec: PathBuf::new(),
            args: Vec::new(),
            size: None,
            env: HashMap::new(),
            silent: false,
            graceful_stop_timeout: Duration::from_millis(5000),
            startup_grace_timeout: Duration::from_millis(5000),
            reload_on_signal: true,
            shutdown_on_signal: true,
            shutdown_timeout: Duration::from_secs(10),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_is_required() {
        let err = PoolConfig::default().validate(None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingExec));
    }

    #[test]
    fn refuses_to_run_inside_a_worker() {
        let err = PoolConfig::new("worker.sh")
            .validate(Some("3".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotSupervisor { ref worker } if worker == "3"));
    }

    #[test]
    fn size_defaults_to_cpu_count() {
        let mut cfg = PoolConfig::new("worker.sh");
        assert!(cfg.desired_size() >= 1);
        cfg.size = Some(0);
        assert_eq!(cfg.desired_size(), 0);
    }

    #[test]
    fn host_setup_makes_exec_absolute() {
        let mut cfg = PoolConfig::new("bin/worker");
        cfg.args = vec!["--port".into(), "8080".into()];
        cfg.silent = true;
        let setup = cfg.host_setup();
        assert!(setup.exec.is_absolute());
        assert!(setup.exec.ends_with("bin/worker"));
        assert_eq!(setup.args, cfg.args);
        assert!(setup.silent);
    }
}
