use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

/// Scripted stand-in for [`ProcessRunner`] that never spawns anything.
///
/// Expectations are checked in registration order; the first one whose
/// program and argument matcher fit the command answers it.
#[derive(Clone)]
pub struct MockProcessRunner {
    expectations: Arc<Mutex<Vec<MockExpectation>>>,
    call_history: Arc<Mutex<Vec<ProcessCommand>>>,
}

enum MockResponse {
    Output(ProcessOutput),
    NotFound,
    Timeout(Duration),
    Interrupted,
}

impl MockResponse {
    fn produce(&self, command: &ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        match self {
            MockResponse::Output(output) => Ok(output.clone()),
            MockResponse::NotFound => Err(ProcessError::CommandNotFound(command.program.clone())),
            MockResponse::Timeout(duration) => Err(ProcessError::Timeout(*duration)),
            MockResponse::Interrupted => Err(ProcessError::Interrupted),
        }
    }
}

struct MockExpectation {
    program: String,
    #[allow(clippy::type_complexity)]
    args_matcher: Option<Box<dyn Fn(&[String]) -> bool + Send + Sync>>,
    response: MockResponse,
    times_called: usize,
    expected_times: Option<usize>,
}

pub struct MockCommandConfig {
    runner: MockProcessRunner,
    expectation: MockExpectation,
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(Vec::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn expect_command(&mut self, program: &str) -> MockCommandConfig {
        MockCommandConfig {
            runner: self.clone(),
            expectation: MockExpectation {
                program: program.to_string(),
                args_matcher: None,
                response: MockResponse::Output(ProcessOutput {
                    status: ExitStatus::Success,
                    stdout: String::new(),
                    stderr: String::new(),
                    duration: Duration::from_millis(10),
                }),
                times_called: 0,
                expected_times: None,
            },
        }
    }

    pub fn verify_called(&self, program: &str, times: usize) -> bool {
        let history = self.call_history.lock().unwrap();
        let count = history.iter().filter(|cmd| cmd.program == program).count();
        count == times
    }

    pub fn get_call_history(&self) -> Vec<ProcessCommand> {
        self.call_history.lock().unwrap().clone()
    }

    /// Last argument of every call, which for shell invocations is the
    /// command line itself
    pub fn executed_lines(&self) -> Vec<String> {
        self.get_call_history()
            .into_iter()
            .filter_map(|cmd| cmd.args.last().cloned())
            .collect()
    }

    pub fn reset(&mut self) {
        self.expectations.lock().unwrap().clear();
        self.call_history.lock().unwrap().clear();
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        self.call_history.lock().unwrap().push(command.clone());

        let mut expectations = self.expectations.lock().unwrap();

        for expectation in expectations.iter_mut() {
            if expectation.program != command.program {
                continue;
            }

            if let Some(ref args_matcher) = expectation.args_matcher {
                if !(args_matcher)(&command.args) {
                    continue;
                }
            }

            expectation.times_called += 1;

            if let Some(expected) = expectation.expected_times {
                if expectation.times_called > expected {
                    return Err(ProcessError::MockExpectationNotMet(format!(
                        "Command '{}' called {} times, expected {}",
                        command.program, expectation.times_called, expected
                    )));
                }
            }

            return expectation.response.produce(&command);
        }

        Err(ProcessError::MockExpectationNotMet(format!(
            "No expectation found for command: {} {:?}",
            command.program, command.args
        )))
    }
}

impl MockCommandConfig {
    pub fn with_args<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.expectation.args_matcher = Some(Box::new(matcher));
        self
    }

    /// Match a shell invocation whose command line is exactly `line`
    pub fn with_line(self, line: &str) -> Self {
        let line = line.to_string();
        self.with_args(move |args| args.last() == Some(&line))
    }

    fn output_mut(&mut self) -> &mut ProcessOutput {
        if !matches!(self.expectation.response, MockResponse::Output(_)) {
            self.expectation.response = MockResponse::Output(ProcessOutput {
                status: ExitStatus::Success,
                stdout: String::new(),
                stderr: String::new(),
                duration: Duration::from_millis(10),
            });
        }
        match &mut self.expectation.response {
            MockResponse::Output(output) => output,
            _ => unreachable!("response was just set to an output"),
        }
    }

    pub fn returns_stdout(mut self, stdout: &str) -> Self {
        self.output_mut().stdout = stdout.to_string();
        self
    }

    pub fn returns_stderr(mut self, stderr: &str) -> Self {
        self.output_mut().stderr = stderr.to_string();
        self
    }

    pub fn returns_exit_code(mut self, code: i32) -> Self {
        self.output_mut().status = ExitStatus::from_code(code);
        self
    }

    pub fn returns_signal(mut self, signal: i32) -> Self {
        self.output_mut().status = ExitStatus::Signal(signal);
        self
    }

    pub fn returns_success(mut self) -> Self {
        self.output_mut().status = ExitStatus::Success;
        self
    }

    /// Behave as if the program could not be found
    pub fn fails_not_found(mut self) -> Self {
        self.expectation.response = MockResponse::NotFound;
        self
    }

    pub fn times_out(mut self, after: Duration) -> Self {
        self.expectation.response = MockResponse::Timeout(after);
        self
    }

    pub fn interrupted(mut self) -> Self {
        self.expectation.response = MockResponse::Interrupted;
        self
    }

    pub fn times(mut self, n: usize) -> Self {
        self.expectation.expected_times = Some(n);
        self
    }

    pub fn finish(self) {
        self.runner
            .expectations
            .lock()
            .unwrap()
            .push(self.expectation);
    }
}

impl Default for MockProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}
