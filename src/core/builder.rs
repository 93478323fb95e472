use std::sync::Arc;

use crate::error::ConfigError;
use crate::host::{CommandHost, ProcessHost};
use crate::subscribers::Subscribe;

use super::config::{PoolConfig, WORKER_ID_ENV};
use super::hooks::{DefaultHooks, MessageHandler, ReloadHooks};
use super::supervisor::Supervisor;

/// Builder for a [`Supervisor`] with optional host, subscribers, and hooks.
pub struct SupervisorBuilder {
    cfg: PoolConfig,
    host: Option<Arc<dyn ProcessHost>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    hooks: Arc<dyn ReloadHooks>,
    on_message: Option<Arc<dyn MessageHandler>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: PoolConfig) -> Self {
        Self {
            cfg,
            host: None,
            subscribers: Vec::new(),
            hooks: Arc::new(DefaultHooks),
            on_message: None,
        }
    }

    /// Uses a custom process host instead of [`CommandHost`].
    pub fn with_host(mut self, host: Arc<dyn ProcessHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive pool events (forks, crashes, reload steps, ...)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the hooks run around SIGHUP-triggered reloads.
    pub fn with_hooks(mut self, hooks: Arc<dyn ReloadHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Sets the handler for application messages sent by workers.
    pub fn with_message_handler(mut self, handler: impl MessageHandler) -> Self {
        self.on_message = Some(Arc::new(handler));
        self
    }

    /// Validates the configuration and attaches the process host.
    ///
    /// Fails with:
    /// - [`ConfigError::MissingExec`] when `exec` is empty;
    /// - [`ConfigError::NotSupervisor`] when called inside a worker process;
    /// - [`ConfigError::AlreadyAttached`] when the host serves another supervisor.
    pub fn build(self) -> Result<Supervisor, ConfigError> {
        let worker_env = std::env::var(WORKER_ID_ENV).ok();
        self.build_with_env(worker_env)
    }

    pub(crate) fn build_with_env(
        self,
        worker_env: Option<String>,
    ) -> Result<Supervisor, ConfigError> {
        self.cfg.validate(worker_env)?;

        let host = self
            .host
            .unwrap_or_else(|| Arc::new(CommandHost::new()) as Arc<dyn ProcessHost>);
        host.configure(&self.cfg.host_setup())?;

        Ok(Supervisor::new_internal(
            self.cfg,
            host,
            self.subscribers,
            self.hooks,
            self.on_message,
        ))
    }
}
