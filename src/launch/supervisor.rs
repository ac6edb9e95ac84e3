//! Browser/backend process supervision.
//!
//! Spawns the configured executable, streams its output, and resolves its
//! exit as a value rather than a callback. The top-level runtime owns the
//! supervisor and wires shutdown into it explicitly through a watch channel;
//! there is no ambient global process handle.

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Errors raised when a child process cannot be started.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The executable could not be spawned.
    #[error("failed to start {executable}: {source}")]
    Spawn {
        /// The executable that failed to start.
        executable: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Observable lifecycle of the supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// No process has been started yet.
    Idle,
    /// Spawn is in progress.
    Starting,
    /// The child is running.
    Running,
    /// The child exited with the given code.
    Exited(i32),
    /// The child could not be started.
    Failed,
}

/// How a supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Normal exit with a code.
    Exited(i32),
    /// Killed by a signal before it could report a code.
    Terminated,
}

impl ExitOutcome {
    fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => Self::Exited(code),
            None => Self::Terminated,
        }
    }

    /// Whether this outcome is a clean exit.
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Exit code to propagate to the parent process. Signal deaths map to
    /// the conventional 130.
    pub fn code(&self) -> i32 {
        match self {
            Self::Exited(code) => *code,
            Self::Terminated => 130,
        }
    }
}

/// What to do with the child's standard streams.
#[derive(Debug, Clone)]
pub enum StdioMode {
    /// Child inherits the parent's streams (launcher path).
    Inherit,
    /// Child output is piped and forwarded to the log line by line,
    /// prefixed with the tag (gateway path).
    Forward(String),
}

/// Static description of what to launch and how.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Executable to spawn.
    pub executable: PathBuf,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
    /// Extra environment for the child.
    pub envs: Vec<(String, String)>,
    /// Standard stream handling.
    pub stdio: StdioMode,
    /// Delay before a keep-alive restart.
    pub restart_delay: Duration,
}

impl SupervisorConfig {
    /// Config with inherited stdio and the default restart delay.
    pub fn new(executable: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            executable: executable.into(),
            args,
            envs: Vec::new(),
            stdio: StdioMode::Inherit,
            restart_delay: Duration::from_secs(5),
        }
    }
}

/// A running child process plus its state publisher.
pub struct ProcessHandle {
    child: Child,
    state: Arc<watch::Sender<SupervisorState>>,
}

impl ProcessHandle {
    /// OS process id, while the child is alive.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Waits for the child to exit and publishes the terminal state.
    ///
    /// Cancel-safe: dropping the future leaves the child running.
    pub async fn wait(&mut self) -> ExitOutcome {
        let outcome = match self.child.wait().await {
            Ok(status) => ExitOutcome::from_status(status),
            Err(err) => {
                error!(error = %err, "failed waiting on child process");
                ExitOutcome::Exited(-1)
            }
        };
        let _ = self.state.send(SupervisorState::Exited(outcome.code()));
        outcome
    }

    /// Relays a termination request to the child so it can release its
    /// resources, falling back to a hard kill when the signal cannot be
    /// delivered.
    pub async fn terminate(&mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            let delivered = Command::new("kill")
                .arg("-TERM")
                .arg(pid.to_string())
                .status()
                .await
                .map(|status| status.success())
                .unwrap_or(false);
            if delivered {
                return;
            }
            warn!(pid, "could not deliver SIGTERM, killing child");
        }

        let _ = self.child.start_kill();
    }
}

/// Launches and monitors one child process at a time.
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    state: Arc<watch::Sender<SupervisorState>>,
    state_rx: watch::Receiver<SupervisorState>,
}

impl ProcessSupervisor {
    /// Creates a supervisor for the given config. Nothing is spawned yet.
    pub fn new(config: SupervisorConfig) -> Self {
        let (tx, rx) = watch::channel(SupervisorState::Idle);
        Self {
            config,
            state: Arc::new(tx),
            state_rx: rx,
        }
    }

    /// A receiver observing the supervisor's state transitions.
    pub fn state(&self) -> watch::Receiver<SupervisorState> {
        self.state_rx.clone()
    }

    /// Spawns the configured executable.
    pub async fn launch(&self) -> Result<ProcessHandle, LaunchError> {
        let _ = self.state.send(SupervisorState::Starting);

        let mut command = Command::new(&self.config.executable);
        command.args(&self.config.args);
        for (key, value) in &self.config.envs {
            command.env(key, value);
        }
        command.kill_on_drop(true);

        match &self.config.stdio {
            StdioMode::Inherit => {
                command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
            StdioMode::Forward(_) => {
                command
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
        }

        let mut child = command.spawn().map_err(|source| {
            let _ = self.state.send(SupervisorState::Failed);
            LaunchError::Spawn {
                executable: self.config.executable.display().to_string(),
                source,
            }
        })?;

        if let StdioMode::Forward(tag) = &self.config.stdio {
            if let Some(stdout) = child.stdout.take() {
                spawn_line_forwarder(stdout, tag.clone());
            }
            if let Some(stderr) = child.stderr.take() {
                spawn_line_forwarder(stderr, tag.clone());
            }
        }

        info!(
            executable = %self.config.executable.display(),
            pid = child.id(),
            "process started"
        );
        let _ = self.state.send(SupervisorState::Running);

        Ok(ProcessHandle {
            child,
            state: Arc::clone(&self.state),
        })
    }

    /// Waits for the child, relaying a shutdown request as a termination
    /// signal and awaiting the child before returning.
    pub async fn supervise(
        &self,
        handle: &mut ProcessHandle,
        shutdown: &mut watch::Receiver<bool>,
    ) -> ExitOutcome {
        tokio::select! {
            outcome = handle.wait() => outcome,
            _ = shutdown_requested(shutdown) => {
                info!(pid = handle.id(), "forwarding termination to child");
                handle.terminate().await;
                handle.wait().await
            }
        }
    }

    /// Launches the child once and returns its exit outcome. The launcher
    /// path: spawn failure is terminal and the exit code propagates.
    pub async fn run_once(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<ExitOutcome, LaunchError> {
        let mut handle = self.launch().await?;
        Ok(self.supervise(&mut handle, &mut shutdown).await)
    }

    /// Runs the child in keep-alive mode: a clean exit ends the loop, any
    /// other outcome schedules a restart after the configured delay. A
    /// shutdown request terminates the child and stops restarting.
    pub async fn run_keep_alive(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                return;
            }

            let mut handle = match self.launch().await {
                Ok(handle) => handle,
                Err(err) => {
                    error!(error = %err, "backend failed to start");
                    if sleep_or_shutdown(self.config.restart_delay, &mut shutdown).await {
                        return;
                    }
                    continue;
                }
            };

            let outcome = self.supervise(&mut handle, &mut shutdown).await;

            if *shutdown.borrow() {
                return;
            }

            if outcome.success() {
                info!("backend exited cleanly, not restarting");
                return;
            }

            warn!(
                code = outcome.code(),
                delay_secs = self.config.restart_delay.as_secs(),
                "backend exited, scheduling restart"
            );
            if sleep_or_shutdown(self.config.restart_delay, &mut shutdown).await {
                return;
            }
        }
    }
}

/// Resolves once the shutdown flag flips to true.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            // Sender gone: stay pending forever, the child decides the exit.
            std::future::pending::<()>().await;
        }
    }
}

/// Sleeps for `delay`; returns true when shutdown was requested first.
async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown_requested(shutdown) => true,
    }
}

fn spawn_line_forwarder<R>(reader: R, tag: String)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!("[{tag}] {line}");
        }
    });
}
