use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::error::ProcessError;
use super::interrupt::{InterruptHandler, StepGuard};

#[derive(Debug, Clone)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub stdin: Option<String>,
}

impl ProcessCommand {
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Error(i32),
    Signal(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Success => Some(0),
            ExitStatus::Error(code) => Some(*code),
            ExitStatus::Signal(_) => None,
        }
    }

    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::Error(code)
        }
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError>;
}

/// Runs commands as real child processes.
///
/// Each child is placed in its own process group so a timeout (or, when
/// enabled, a Ctrl-C) can take down everything the command started.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner {
    interrupts: Option<InterruptHandler>,
}

enum WaitOutcome {
    Exited(std::io::Result<std::process::Output>),
    TimedOut(Duration),
    Interrupted,
}

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route Ctrl-C during a command to "kill this command". Interrupts
    /// outside a command are left to the handler's idle action.
    pub fn with_interrupts(mut self, interrupts: InterruptHandler) -> Self {
        self.interrupts = Some(interrupts);
        self
    }

    fn configure_command(command: &ProcessCommand) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&command.program);

        #[cfg(unix)]
        cmd.process_group(0);

        cmd.args(&command.args);
        for (key, value) in &command.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        if command.stdin.is_some() {
            cmd.stdin(std::process::Stdio::piped());
        } else {
            cmd.stdin(std::process::Stdio::null());
        }
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }

    async fn write_stdin(
        child: &mut tokio::process::Child,
        stdin_data: &str,
    ) -> Result<(), ProcessError> {
        if let Some(mut stdin) = child.stdin.take() {
            use tokio::io::AsyncWriteExt;
            stdin.write_all(stdin_data.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        Ok(())
    }

    fn map_spawn_error(error: std::io::Error, command: &ProcessCommand) -> ProcessError {
        if error.kind() == std::io::ErrorKind::NotFound {
            ProcessError::CommandNotFound(command.program.clone())
        } else {
            ProcessError::SpawnFailed {
                command: command.display(),
                source: error,
            }
        }
    }

    fn parse_exit_status(status: std::process::ExitStatus) -> ExitStatus {
        if status.success() {
            ExitStatus::Success
        } else if let Some(code) = status.code() {
            ExitStatus::Error(code)
        } else {
            Self::parse_signal_status(status)
        }
    }

    #[cfg(unix)]
    fn parse_signal_status(status: std::process::ExitStatus) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        match status.signal() {
            Some(signal) => ExitStatus::Signal(signal),
            None => ExitStatus::Error(1),
        }
    }

    #[cfg(not(unix))]
    fn parse_signal_status(_status: std::process::ExitStatus) -> ExitStatus {
        ExitStatus::Error(1)
    }

    /// Kill every process in the child's group.
    #[cfg(unix)]
    fn kill_process_group(pid: Option<u32>) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = pid {
            if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                tracing::debug!("killpg({pid}) failed: {e}");
            }
        }
    }

    #[cfg(not(unix))]
    fn kill_process_group(_pid: Option<u32>) {}

    async fn interrupt_signal(step: Option<&StepGuard>) {
        match step {
            Some(step) => step.interrupted().await,
            None => std::future::pending().await,
        }
    }

    async fn deadline(timeout: Option<Duration>) -> Duration {
        match timeout {
            Some(duration) => {
                tokio::time::sleep(duration).await;
                duration
            }
            None => std::future::pending().await,
        }
    }

    fn log_result(result: &ProcessOutput, command: &ProcessCommand) {
        match &result.status {
            ExitStatus::Success => {
                tracing::debug!(
                    "Subprocess completed successfully in {:?}: {}",
                    result.duration,
                    command.display()
                );
                tracing::trace!("Stdout length: {} bytes", result.stdout.len());
            }
            ExitStatus::Error(code) => {
                tracing::debug!(
                    "Subprocess failed with exit code {} in {:?}: {}",
                    code,
                    result.duration,
                    command.display()
                );
                if !result.stderr.is_empty() {
                    tracing::trace!("Stderr: {}", result.stderr);
                }
            }
            ExitStatus::Signal(signal) => {
                tracing::warn!(
                    "Subprocess terminated by signal {} in {:?}: {}",
                    signal,
                    result.duration,
                    command.display()
                );
            }
        }
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        tracing::debug!("Executing subprocess: {}", command.display());
        if let Some(ref dir) = command.working_dir {
            tracing::trace!("Working directory: {:?}", dir);
        }

        let step = self.interrupts.as_ref().map(InterruptHandler::begin_step);
        let start = Instant::now();
        let mut child = Self::configure_command(&command)
            .spawn()
            .map_err(|e| Self::map_spawn_error(e, &command))?;
        let pid = child.id();

        if let Some(ref stdin_data) = command.stdin {
            Self::write_stdin(&mut child, stdin_data).await?;
        }

        let outcome = {
            let wait = child.wait_with_output();
            tokio::pin!(wait);
            tokio::select! {
                result = &mut wait => WaitOutcome::Exited(result),
                duration = Self::deadline(command.timeout) => WaitOutcome::TimedOut(duration),
                _ = Self::interrupt_signal(step.as_ref()) => WaitOutcome::Interrupted,
            }
        };

        match outcome {
            WaitOutcome::Exited(result) => {
                let output = result?;
                let result = ProcessOutput {
                    status: Self::parse_exit_status(output.status),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    duration: start.elapsed(),
                };
                Self::log_result(&result, &command);
                Ok(result)
            }
            WaitOutcome::TimedOut(duration) => {
                tracing::warn!(
                    "Subprocess timed out after {:?}: {}",
                    duration,
                    command.display()
                );
                Self::kill_process_group(pid);
                Err(ProcessError::Timeout(duration))
            }
            WaitOutcome::Interrupted => {
                tracing::warn!("Subprocess interrupted: {}", command.display());
                Self::kill_process_group(pid);
                Err(ProcessError::Interrupted)
            }
        }
    }
}
