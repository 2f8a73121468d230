//! Error types and result types for repository operations.
//!
//! This module provides error handling for all repository operations.
//! Use [`RepositoryResult<T>`] as the return type for fallible operations.
//!
//! The one property the rest of the crate relies on is the transient/permanent
//! split: [`RepositoryError::is_transient`] is the default classifier consumed
//! by the retry layer, and only the connectivity class qualifies.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a repository.
///
/// This enum covers serialization errors, identity conflicts, connectivity
/// failures, and backend-specific errors.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Serialization/deserialization error when converting entities to or from documents.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A connectivity failure whose root cause is an I/O or socket-level error.
    ///
    /// This is the only error class the retry layer treats as transient.
    #[error("Connection failure: {0}")]
    Connection(String),
    /// An entity with the given identity already exists in the collection.
    /// The first argument is the identity, the second is the collection name.
    #[error("Duplicate identity {0} in collection {1}")]
    DuplicateIdentity(String, String),
    /// The document is structurally invalid (e.g. missing its identity field).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A non-transient error reported by the underlying store.
    #[error("Store error: {0}")]
    Store(String),
    /// An unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RepositoryError {
    /// Returns `true` when this failure qualifies for retry.
    ///
    /// Only connectivity-class failures are transient; validation, duplicate
    /// identity, and other store errors propagate on first occurrence.
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Connection(_))
    }
}

/// A specialized `Result` type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<BsonError> for RepositoryError {
    fn from(err: BsonError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for RepositoryError {
    fn from(err: SerdeJsonError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connection_failures_are_transient() {
        assert!(RepositoryError::Connection("reset by peer".into()).is_transient());
        assert!(!RepositoryError::Store("duplicate key".into()).is_transient());
        assert!(!RepositoryError::Serialization("bad field".into()).is_transient());
        assert!(!RepositoryError::DuplicateIdentity("a".into(), "users".into()).is_transient());
    }
}
