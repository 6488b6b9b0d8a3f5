//! Common error types for showrate
//!
//! The reconciliation protocol distinguishes four semantic failures
//! (`Validation`, `ConstraintViolation`, `NotFound`, `Transient`); the
//! remaining variants are ambient. The store adapter classifies every
//! `sqlx::Error` into a semantic variant at its boundary, so `Database`
//! only surfaces from schema and initialization paths.

use thiserror::Error;

/// Common result type for showrate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the showrate crates
#[derive(Error, Debug)]
pub enum Error {
    /// Rating or input outside the allowed domain; rejected before any store call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unique-index collision on (owner, performance); recoverable once by the reconciler
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Row vanished between check and act; recoverable by the insert path
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or timeout failure; safe to retry the whole operation
    #[error("Transient error: {0}")]
    Transient(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Auth provider failure; message is opaque and surfaced verbatim
    #[error("Auth error: {0}")]
    Auth(String),

    /// Internal error; fatal, not retried
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the whole operation from the top is reasonable.
    ///
    /// Only `Transient` qualifies; `ConstraintViolation` and `NotFound` have
    /// their own single-step recoveries inside the reconciler and must not
    /// be blind-retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_the_only_retryable_class() {
        assert!(Error::Transient("timeout".into()).is_transient());
        assert!(!Error::ConstraintViolation("dup".into()).is_transient());
        assert!(!Error::NotFound("gone".into()).is_transient());
        assert!(!Error::Internal("bug".into()).is_transient());
    }
}
