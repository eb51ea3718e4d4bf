//! Error types for the macro repository

use std::fmt;
use thiserror::Error;

/// Result type for repository operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Repository error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A macro with the same normalized name is already stored
    #[error("Duplicate macro name: {0}")]
    Duplicate(String),

    /// Macro not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    /// Create a serialization error
    pub fn serialization<E: fmt::Display>(err: E) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Create a not found error
    pub fn not_found<E: fmt::Display>(item: E) -> Self {
        Self::NotFound(item.to_string())
    }

    /// Create a duplicate name error
    pub fn duplicate<E: fmt::Display>(name: E) -> Self {
        Self::Duplicate(name.to_string())
    }

    /// Create a configuration error
    pub fn configuration<E: fmt::Display>(msg: E) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Check if this is a duplicate-name error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}
