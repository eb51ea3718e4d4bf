use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process timed out after {0:?}")]
    Timeout(Duration),

    #[error("Process interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mock expectation not met: {0}")]
    MockExpectationNotMet(String),
}

impl ProcessError {
    /// True when the process never started running
    pub fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            Self::CommandNotFound(_) | Self::SpawnFailed { .. } | Self::MockExpectationNotMet(_)
        )
    }
}
