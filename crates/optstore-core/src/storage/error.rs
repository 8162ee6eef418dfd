//! Storage error handling
//!
//! Provides typed errors for adapter operations. The `Options` façade never
//! surfaces these to its callers; they exist so code talking to an adapter
//! directly can tell a rejected key from a failing database.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a storage error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself was invalid (empty key, no filter)
    Validation,
    /// The persistence layer failed
    Storage,
}

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Key is empty or blank after trimming
    #[error("Invalid option key: '{0}'")]
    InvalidKey(String),

    /// Removal requested without a key or an extension to scope it
    #[error("Refusing to remove options without a key or extension filter")]
    MissingFilter,

    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Composite value could not be JSON encoded
    #[error("Failed to encode option value: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::InvalidKey(_) | StorageError::MissingFilter => ErrorKind::Validation,
            StorageError::CreateDirectory { .. }
            | StorageError::Database(_)
            | StorageError::Encode(_) => ErrorKind::Storage,
        }
    }

    /// Check if the error was caused by the caller's input
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
