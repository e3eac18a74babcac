//! Error types for state tree operations.

use crate::{Path, Value};
use thiserror::Error;

/// Result type alias for state tree operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by reads, writes and dispatch.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The container a write needs does not exist.
    #[error("missing parent for write at {path}")]
    MissingParent {
        /// Path of the write that could not be performed.
        path: Path,
    },

    /// A container of the wrong kind sits on the write path.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Path of the offending value.
        path: Path,
        /// The expected type.
        expected: &'static str,
        /// The actual type found.
        found: &'static str,
    },

    /// Assign needs an object on both sides.
    #[error("assign requires object value at {path}")]
    MergeRequiresObject {
        /// Path of the assign.
        path: Path,
    },

    /// The operation makes no sense for its target.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of what went wrong.
        message: String,
    },

    /// A change subscriber panicked while a write was being delivered.
    ///
    /// The write itself has already been committed.
    #[error("subscriber at {path} panicked: {message}")]
    Subscriber {
        /// Path of the stream whose subscriber failed.
        path: Path,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// Subscribers kept writing from inside their own notifications.
    #[error("dispatch depth {depth} exceeded while writing {path}")]
    DispatchDepthExceeded {
        /// Path of the write that was refused.
        path: Path,
        /// Configured limit.
        depth: usize,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a missing parent error.
    #[inline]
    pub fn missing_parent(path: Path) -> Self {
        StoreError::MissingParent { path }
    }

    /// Create a type mismatch error.
    #[inline]
    pub fn type_mismatch(path: Path, expected: &'static str, found: &'static str) -> Self {
        StoreError::TypeMismatch {
            path,
            expected,
            found,
        }
    }

    /// Create a merge-requires-object error.
    #[inline]
    pub fn merge_requires_object(path: Path) -> Self {
        StoreError::MergeRequiresObject { path }
    }

    /// Create an invalid operation error.
    #[inline]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        StoreError::InvalidOperation {
            message: message.into(),
        }
    }

    /// True for the "required container is absent" programmer error.
    pub fn is_missing_parent(&self) -> bool {
        matches!(self, StoreError::MissingParent { .. })
    }
}

/// Get the type name of a tree value.
#[inline]
pub fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Undefined => "undefined",
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
