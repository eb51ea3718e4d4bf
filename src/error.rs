use std::time::Duration;
use thiserror::Error;

use crate::repository::StorageError;

/// Every failure the macro core can report to its caller.
///
/// Parsing and resolution errors abort only the current input line; execution
/// errors abort only the current run. Nothing here is fatal to the process.
#[derive(Error, Debug)]
pub enum MacroError {
    #[error("Invalid template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Malformed definition: {0}")]
    MalformedDefinition(String),

    #[error("A macro named '{0}' already exists")]
    DuplicateName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to launch '{command}': {reason}")]
    LaunchFailure { command: String, reason: String },

    #[error("Command exited with code {code}: {command}")]
    NonZeroExit { command: String, code: i32 },

    #[error("Command timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },

    #[error("Command interrupted: {command}")]
    Interrupted { command: String },

    #[error("Input '{input}' matches several macros: {}", candidates.join(", "))]
    AmbiguousMatch {
        input: String,
        candidates: Vec<String>,
    },

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MacroError {
    pub fn invalid_template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDefinition(message.into())
    }

    /// True for errors produced while reading user text, before anything ran.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTemplate { .. }
                | Self::MalformedDefinition(_)
                | Self::AmbiguousMatch { .. }
        )
    }
}

impl From<StorageError> for MacroError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Duplicate(name) => Self::DuplicateName(name),
            StorageError::NotFound(name) => Self::NotFound(name),
            other => Self::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, MacroError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_duplicate_maps_to_duplicate_name() {
        let err: MacroError = StorageError::Duplicate("deploy".to_string()).into();
        assert!(matches!(err, MacroError::DuplicateName(ref n) if n == "deploy"));
    }

    #[test]
    fn test_storage_not_found_maps_to_not_found() {
        let err: MacroError = StorageError::not_found("deploy").into();
        assert!(matches!(err, MacroError::NotFound(_)));
    }

    #[test]
    fn test_other_storage_errors_are_wrapped() {
        let err: MacroError = StorageError::serialization("bad json").into();
        assert!(matches!(err, MacroError::Storage(_)));
        assert!(err.to_string().contains("bad json"));
    }

    #[test]
    fn test_ambiguous_match_lists_candidates() {
        let err = MacroError::AmbiguousMatch {
            input: "kill port 80".to_string(),
            candidates: vec!["kill port {p}".to_string(), "kill {what} 80".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("kill port {p}, kill {what} 80"));
        assert!(err.is_input_error());
    }
}
