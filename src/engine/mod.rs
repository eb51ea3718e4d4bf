//! Sequential step execution with captured output.
//!
//! A run moves `Pending -> Running(i) -> Running(i + 1) | Halted(i) | Completed`.
//! Steps never overlap: step `i + 1` is only started once step `i` has exited,
//! since later steps may depend on side effects of earlier ones.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::MacroError;
use crate::subprocess::{
    ExitStatus, ProcessCommandBuilder, ProcessError, ProcessOutput, ProcessRunner,
};


/// Shell exit status for "command not found"
const EXIT_COMMAND_NOT_FOUND: i32 = 127;
/// Shell exit status for "found but not executable"
const EXIT_NOT_EXECUTABLE: i32 = 126;

/// What to do after a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failing step; later steps never start
    #[default]
    Halt,
    /// Run every step and report which ones failed
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running(usize),
    Halted(usize),
    Completed,
}

impl RunState {
    /// Next state after the current step finished. `Halted` and `Completed`
    /// are terminal.
    fn advance(self, step_succeeded: bool, total: usize, policy: FailurePolicy) -> Self {
        match self {
            RunState::Pending if total == 0 => RunState::Completed,
            RunState::Pending => RunState::Running(0),
            RunState::Running(i) if !step_succeeded && policy == FailurePolicy::Halt => {
                RunState::Halted(i)
            }
            RunState::Running(i) if i + 1 < total => RunState::Running(i + 1),
            RunState::Running(_) => RunState::Completed,
            terminal => terminal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    /// The shell or the command could not be started
    LaunchFailure(String),
    NonZeroExit(i32),
    Timeout(Duration),
    /// Killed by a user interrupt
    Interrupted,
}

impl StepFailure {
    pub fn to_error(&self, command: &str) -> MacroError {
        let command = command.to_string();
        match self {
            StepFailure::LaunchFailure(reason) => MacroError::LaunchFailure {
                command,
                reason: reason.clone(),
            },
            StepFailure::NonZeroExit(code) => MacroError::NonZeroExit {
                command,
                code: *code,
            },
            StepFailure::Timeout(timeout) => MacroError::Timeout {
                command,
                timeout: *timeout,
            },
            StepFailure::Interrupted => MacroError::Interrupted { command },
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepFailure::LaunchFailure(reason) => write!(f, "failed to launch: {reason}"),
            StepFailure::NonZeroExit(code) => write!(f, "exited with code {code}"),
            StepFailure::Timeout(timeout) => write!(f, "timed out after {}s", timeout.as_secs()),
            StepFailure::Interrupted => write!(f, "interrupted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Failed(StepFailure),
}

/// Result of one step that was started.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub index: usize,
    pub command: String,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == StepStatus::Succeeded
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        match &self.status {
            StepStatus::Failed(failure) => Some(failure),
            StepStatus::Succeeded => None,
        }
    }

    pub fn error(&self) -> Option<MacroError> {
        self.failure().map(|f| f.to_error(&self.command))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Completed,
    /// Stopped at this 0-based step index
    Halted { step_index: usize },
    CompletedWithFailures { failed: Vec<usize> },
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Completed => write!(f, "completed"),
            Verdict::Halted { step_index } => write!(f, "halted at step {}", step_index + 1),
            Verdict::CompletedWithFailures { failed } => {
                let steps: Vec<String> = failed.iter().map(|i| (i + 1).to_string()).collect();
                write!(f, "completed with failures at step(s) {}", steps.join(", "))
            }
        }
    }
}

/// Outcomes of every step that ran, in order, plus the overall verdict.
/// Steps skipped after a halt have no outcome.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub outcomes: Vec<StepOutcome>,
    pub verdict: Verdict,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.verdict == Verdict::Completed
    }

    /// The first failing step as a typed error, if any
    pub fn first_error(&self) -> Option<MacroError> {
        self.outcomes.iter().find_map(StepOutcome::error)
    }
}

/// Runs substituted command lines through the host shell.
pub struct ExecutionEngine {
    runner: Arc<dyn ProcessRunner>,
    shell: String,
    step_timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl ExecutionEngine {
    pub fn new(runner: Arc<dyn ProcessRunner>, shell: impl Into<String>, step_timeout: Duration) -> Self {
        Self {
            runner,
            shell: shell.into(),
            step_timeout,
            working_dir: None,
        }
    }

    pub fn from_config(config: &Config, runner: Arc<dyn ProcessRunner>) -> Self {
        Self::new(runner, config.shell.clone(), config.step_timeout())
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    /// Execute `steps` in order under `policy`.
    ///
    /// Step failures are reported inside the result, never as `Err`.
    pub async fn execute<S: AsRef<str>>(&self, steps: &[S], policy: FailurePolicy) -> ExecutionResult {
        let mut outcomes = Vec::with_capacity(steps.len());
        let mut state = RunState::Pending.advance(true, steps.len(), policy);

        while let RunState::Running(index) = state {
            let command = steps[index].as_ref();
            tracing::debug!("Running step {}/{}: {}", index + 1, steps.len(), command);

            let outcome = self.run_step(index, command).await;
            let succeeded = outcome.succeeded();
            let interrupted = outcome.failure() == Some(&StepFailure::Interrupted);
            if let Some(failure) = outcome.failure() {
                tracing::info!("Step {} failed: {}", index + 1, failure);
            }
            outcomes.push(outcome);

            // An interrupt stops the run under every policy.
            state = if interrupted {
                RunState::Halted(index)
            } else {
                state.advance(succeeded, steps.len(), policy)
            };
        }

        let verdict = match state {
            RunState::Halted(step_index) => {
                tracing::info!("Run halted at step {}", step_index + 1);
                Verdict::Halted { step_index }
            }
            _ => {
                let failed: Vec<usize> = outcomes
                    .iter()
                    .filter(|o| !o.succeeded())
                    .map(|o| o.index)
                    .collect();
                if failed.is_empty() {
                    Verdict::Completed
                } else {
                    Verdict::CompletedWithFailures { failed }
                }
            }
        };

        ExecutionResult { outcomes, verdict }
    }

    async fn run_step(&self, index: usize, command: &str) -> StepOutcome {
        let mut builder =
            ProcessCommandBuilder::shell(&self.shell, command).timeout(self.step_timeout);
        if let Some(dir) = &self.working_dir {
            builder = builder.current_dir(dir);
        }

        match self.runner.run(builder.build()).await {
            Ok(output) => Self::outcome_from_output(index, command, output),
            Err(error) => Self::outcome_from_error(index, command, error),
        }
    }

    fn outcome_from_output(index: usize, command: &str, output: ProcessOutput) -> StepOutcome {
        let (status, exit_code) = match output.status {
            ExitStatus::Success => (StepStatus::Succeeded, Some(0)),
            ExitStatus::Error(code @ (EXIT_COMMAND_NOT_FOUND | EXIT_NOT_EXECUTABLE)) => {
                let reason = match output.stderr.trim() {
                    "" if code == EXIT_COMMAND_NOT_FOUND => "command not found".to_string(),
                    "" => "command not executable".to_string(),
                    stderr => stderr.to_string(),
                };
                (StepStatus::Failed(StepFailure::LaunchFailure(reason)), Some(code))
            }
            ExitStatus::Error(code) => (StepStatus::Failed(StepFailure::NonZeroExit(code)), Some(code)),
            ExitStatus::Signal(signal) => {
                let code = 128 + signal;
                (StepStatus::Failed(StepFailure::NonZeroExit(code)), Some(code))
            }
        };

        StepOutcome {
            index,
            command: command.to_string(),
            status,
            exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            duration: output.duration,
        }
    }

    fn outcome_from_error(index: usize, command: &str, error: ProcessError) -> StepOutcome {
        let (failure, duration) = match error {
            ProcessError::Timeout(after) => (StepFailure::Timeout(after), after),
            ProcessError::Interrupted => (StepFailure::Interrupted, Duration::ZERO),
            ProcessError::CommandNotFound(program) => (
                StepFailure::LaunchFailure(format!("shell '{program}' not found")),
                Duration::ZERO,
            ),
            other => (StepFailure::LaunchFailure(other.to_string()), Duration::ZERO),
        };

        StepOutcome {
            index,
            command: command.to_string(),
            status: StepStatus::Failed(failure),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration,
        }
    }
}
