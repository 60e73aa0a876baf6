//! Error types and the crate-wide [`Result`] alias.

use thiserror::Error;

/// The closed set of failures the core can report.
///
/// Arithmetic domain errors (overflow, division by zero, out-of-range
/// shifts) are *not* represented here: per the value algebra they collapse
/// to N/A results, not errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not removable: {0}")]
    NotRemovable(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("type error: {0}")]
    TypeError(String),

    #[error("malformed expression: {0}")]
    MalformedExpression(String),

    #[error("duplicate key: {0}")]
    KeyDuplicate(String),

    #[error("table has no key column")]
    NoKeyColumn,

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("out of memory")]
    OutOfMemory,
}

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;
