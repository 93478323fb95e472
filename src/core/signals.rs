//! # OS signal triggers.
//!
//! - [`ShutdownSignals`]: completes on a termination signal.
//! - [`HangupSignal`]: yields once per reload request.
//!
//! ## Signals
//! **Unix platforms:**
//! - shutdown: `SIGINT`, `SIGTERM`, `SIGQUIT`
//! - reload: `SIGHUP`
//!
//! **Other platforms:**
//! - shutdown: `Ctrl-C` via [`tokio::signal::ctrl_c`]
//! - reload: never fires
//!
//! Listeners are registered in the constructors so registration errors surface
//! synchronously from `Supervisor::run`.

use std::io;

/// Termination signal listener.
pub(crate) struct ShutdownSignals {
    #[cfg(unix)]
    streams: [tokio::signal::unix::Signal; 3],
}

impl ShutdownSignals {
    #[cfg(unix)]
    pub(crate) fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            streams: [
                signal(SignalKind::interrupt())?,
                signal(SignalKind::terminate())?,
                signal(SignalKind::quit())?,
            ],
        })
    }

    #[cfg(not(unix))]
    pub(crate) fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Waits for the next termination signal.
    #[cfg(unix)]
    pub(crate) async fn recv(&mut self) {
        let [sigint, sigterm, sigquit] = &mut self.streams;
        tokio::select! {
            _ = sigint.recv()  => {},
            _ = sigterm.recv() => {},
            _ = sigquit.recv() => {},
        }
    }

    /// Waits for the next termination signal.
    #[cfg(not(unix))]
    pub(crate) async fn recv(&mut self) {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Reload signal listener.
pub(crate) struct HangupSignal {
    #[cfg(unix)]
    stream: tokio::signal::unix::Signal,
}

impl HangupSignal {
    #[cfg(unix)]
    pub(crate) fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            stream: signal(SignalKind::hangup())?,
        })
    }

    #[cfg(not(unix))]
    pub(crate) fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Waits for the next reload signal; `None` once the listener is closed.
    #[cfg(unix)]
    pub(crate) async fn recv(&mut self) -> Option<()> {
        self.stream.recv().await
    }

    /// Waits for the next reload signal; `None` once the listener is closed.
    #[cfg(not(unix))]
    pub(crate) async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}
