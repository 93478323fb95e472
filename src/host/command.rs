//! # CommandHost: worker processes via `tokio::process`.
//!
//! Line protocol on the worker's **stdout**:
//! - a line equal to the ready token (default `READY`) reports readiness;
//! - a line equal to the stopping token (default `STOPPING`) marks the next
//!   exit as self-initiated;
//! - any other line is forwarded as a message.
//!
//! The worker's **stdin** is its communication channel: `disconnect` closes it,
//! so a worker drains and exits when it reads EOF. Every worker also receives
//! [`WORKER_ID_ENV`](crate::WORKER_ID_ENV) in its environment.

use std::process::{ExitStatus, Stdio};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::oneshot;

use crate::core::WORKER_ID_ENV;
use crate::error::HostError;

use super::process::{ExitReport, HostSetup, ProcessHost, SignalSink, SpawnRequest, WorkerProcess};

/// How long buffered stdout lines are still read after the child exited.
const DRAIN_AFTER_EXIT: Duration = Duration::from_millis(100);

/// [`ProcessHost`] spawning OS processes with `tokio::process::Command`.
///
/// Must be used from inside a tokio runtime.
#[derive(Debug)]
pub struct CommandHost {
    setup: OnceLock<HostSetup>,
    ready_token: String,
    stopping_token: String,
}

impl Default for CommandHost {
    fn default() -> Self {
        Self {
            setup: OnceLock::new(),
            ready_token: "READY".to_string(),
            stopping_token: "STOPPING".to_string(),
        }
    }
}

impl CommandHost {
    /// Creates an unconfigured host with the default protocol tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the readiness line.
    #[must_use]
    pub fn with_ready_token(mut self, token: impl Into<String>) -> Self {
        self.ready_token = token.into();
        self
    }

    /// Overrides the self-initiated stop line.
    #[must_use]
    pub fn with_stopping_token(mut self, token: impl Into<String>) -> Self {
        self.stopping_token = token.into();
        self
    }
}

impl ProcessHost for CommandHost {
    fn configure(&self, setup: &HostSetup) -> Result<(), HostError> {
        self.setup
            .set(setup.clone())
            .map_err(|_| HostError::AlreadyAttached)
    }

    fn create(
        &self,
        request: &SpawnRequest<'_>,
        sink: SignalSink,
    ) -> Result<Box<dyn WorkerProcess>, HostError> {
        let setup = self.setup.get().ok_or(HostError::NotConfigured)?;

        let mut cmd = Command::new(&setup.exec);
        cmd.args(&setup.args)
            .envs(request.env)
            .env(WORKER_ID_ENV, request.id.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if setup.silent {
                Stdio::null()
            } else {
                Stdio::inherit()
            })
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(HostError::Spawn)?;
        let pid = child.id();
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (kill_tx, kill_rx) = oneshot::channel();

        let watcher = Watcher {
            sink,
            ready_token: self.ready_token.clone(),
            stopping_token: self.stopping_token.clone(),
            stopping: AtomicBool::new(false),
        };
        tokio::spawn(watcher.run(child, stdout, kill_rx));

        Ok(Box::new(CommandProcess {
            stdin,
            kill: Some(kill_tx),
            pid,
        }))
    }
}

/// Supervisor-side handle of a spawned command.
struct CommandProcess {
    stdin: Option<ChildStdin>,
    kill: Option<oneshot::Sender<()>>,
    pid: Option<u32>,
}

impl WorkerProcess for CommandProcess {
    fn disconnect(&mut self) {
        self.stdin.take();
    }

    fn terminate(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// Background task translating stdout lines and the exit status into signals.
struct Watcher {
    sink: SignalSink,
    ready_token: String,
    stopping_token: String,
    stopping: AtomicBool,
}

impl Watcher {
    async fn run(
        self,
        mut child: Child,
        stdout: Option<ChildStdout>,
        mut kill_rx: oneshot::Receiver<()>,
    ) {
        let mut lines = stdout.map(|out| BufReader::new(out).lines());
        let mut kill_pending = true;

        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                // Fires on an explicit kill and when the handle is dropped.
                _ = &mut kill_rx, if kill_pending => {
                    kill_pending = false;
                    let _ = child.start_kill();
                }
                line = next_line(&mut lines), if lines.is_some() => match line {
                    Some(line) => self.on_line(&line),
                    None => lines = None,
                },
            }
        };

        if let Some(lines) = lines.as_mut() {
            let drain = async {
                while let Ok(Some(line)) = lines.next_line().await {
                    self.on_line(&line);
                }
            };
            let _ = tokio::time::timeout(DRAIN_AFTER_EXIT, drain).await;
        }

        let mut report = match status {
            Ok(status) => exit_report(status),
            Err(_) => ExitReport::default(),
        };
        report.deliberate = self.stopping.load(Ordering::Relaxed);
        self.sink.exited(report);
    }

    fn on_line(&self, line: &str) {
        let trimmed = line.trim_end();
        if trimmed == self.ready_token {
            self.sink.ready();
        } else if trimmed == self.stopping_token {
            self.stopping.store(true, Ordering::Relaxed);
        } else {
            self.sink.message(trimmed);
        }
    }
}

async fn next_line(lines: &mut Option<Lines<BufReader<ChildStdout>>>) -> Option<String> {
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => None,
    }
}

#[cfg(unix)]
fn exit_report(status: ExitStatus) -> ExitReport {
    use std::os::unix::process::ExitStatusExt;

    ExitReport {
        deliberate: false,
        code: status.code(),
        signal: status.signal(),
    }
}

#[cfg(not(unix))]
fn exit_report(status: ExitStatus) -> ExitReport {
    ExitReport {
        deliberate: false,
        code: status.code(),
        signal: None,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::collections::HashMap;

    use tokio::sync::mpsc;

    use super::*;
    use crate::core::{Command as LoopCommand, HostSignal, WorkerId};

    fn shell_host(script: &str) -> CommandHost {
        let host = CommandHost::new();
        host.configure(&HostSetup {
            exec: "/bin/sh".into(),
            args: vec!["-c".to_string(), script.to_string()],
            silent: true,
        })
        .unwrap();
        host
    }

    async fn next_signal(rx: &mut mpsc::UnboundedReceiver<LoopCommand>) -> HostSignal {
        match rx.recv().await.unwrap() {
            LoopCommand::Host { signal, .. } => signal,
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn second_configure_is_refused() {
        let host = shell_host("true");
        let err = host
            .configure(&HostSetup {
                exec: "/bin/true".into(),
                args: vec![],
                silent: false,
            })
            .unwrap_err();
        assert!(matches!(err, HostError::AlreadyAttached));
    }

    #[tokio::test]
    async fn create_requires_configure() {
        let host = CommandHost::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let env = HashMap::new();
        let req = SpawnRequest {
            id: WorkerId::new(1),
            env: &env,
        };
        let err = host
            .create(&req, SignalSink::new(WorkerId::new(1), tx))
            .err()
            .unwrap();
        assert!(matches!(err, HostError::NotConfigured));
    }

    #[tokio::test]
    async fn reports_ready_messages_and_exit() {
        let host = shell_host("echo READY; echo \"hello $POOLVISOR_WORKER_ID $GREETING\"; exit 3");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let env = HashMap::from([("GREETING".to_string(), "hi".to_string())]);
        let req = SpawnRequest {
            id: WorkerId::new(4),
            env: &env,
        };
        let _process = host.create(&req, SignalSink::new(WorkerId::new(4), tx)).unwrap();

        assert!(matches!(next_signal(&mut rx).await, HostSignal::Ready));
        match next_signal(&mut rx).await {
            HostSignal::Message(msg) => assert_eq!(msg, "hello 4 hi"),
            _ => panic!("expected message"),
        }
        match next_signal(&mut rx).await {
            HostSignal::Exited(report) => {
                assert_eq!(report.code, Some(3));
                assert!(!report.deliberate);
            }
            _ => panic!("expected exit"),
        }
    }

    #[tokio::test]
    async fn disconnect_closes_stdin() {
        let host = shell_host("cat >/dev/null; echo STOPPING; exit 0");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let env = HashMap::new();
        let req = SpawnRequest {
            id: WorkerId::new(1),
            env: &env,
        };
        let mut process = host.create(&req, SignalSink::new(WorkerId::new(1), tx)).unwrap();
        process.disconnect();

        match next_signal(&mut rx).await {
            HostSignal::Exited(report) => {
                assert_eq!(report.code, Some(0));
                assert!(report.deliberate);
            }
            _ => panic!("expected exit"),
        }
    }

    #[tokio::test]
    async fn custom_tokens_replace_the_defaults() {
        let host = CommandHost::new()
            .with_ready_token("UP")
            .with_stopping_token("BYE");
        host.configure(&HostSetup {
            exec: "/bin/sh".into(),
            args: vec![
                "-c".to_string(),
                "echo READY; echo UP; echo BYE; exit 0".to_string(),
            ],
            silent: false,
        })
        .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let env = HashMap::new();
        let req = SpawnRequest {
            id: WorkerId::new(2),
            env: &env,
        };
        let _process = host.create(&req, SignalSink::new(WorkerId::new(2), tx)).unwrap();

        // The default token is plain output once overridden.
        match next_signal(&mut rx).await {
            HostSignal::Message(msg) => assert_eq!(msg, "READY"),
            _ => panic!("expected message"),
        }
        assert!(matches!(next_signal(&mut rx).await, HostSignal::Ready));
        match next_signal(&mut rx).await {
            HostSignal::Exited(report) => {
                assert_eq!(report.code, Some(0));
                assert!(report.deliberate);
            }
            _ => panic!("expected exit"),
        }
    }

    #[tokio::test]
    async fn terminate_kills_the_process() {
        let host = shell_host("sleep 30");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let env = HashMap::new();
        let req = SpawnRequest {
            id: WorkerId::new(1),
            env: &env,
        };
        let mut process = host.create(&req, SignalSink::new(WorkerId::new(1), tx)).unwrap();
        assert!(process.pid().is_some());
        process.terminate();

        match next_signal(&mut rx).await {
            HostSignal::Exited(report) => assert_eq!(report.signal, Some(9)),
            _ => panic!("expected exit"),
        }
    }
}
