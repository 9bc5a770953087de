//! Common error types for SongFlow
//!
//! The four domain variants (`Validation`, `Phase`, `Duplicate`, `SelfVote`)
//! are always recoverable by the caller and carry a user-facing message.
//! Everything else is an internal failure of the current operation.

use thiserror::Error;

/// Common result type for SongFlow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across SongFlow crates
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed, missing or out-of-range input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not legal in the current phase (or no flow exists)
    #[error("Phase error: {0}")]
    Phase(String),

    /// Uniqueness invariant violated (second submission, second ballot)
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Ballot targets the voter's own submission
    #[error("Self vote: {0}")]
    SelfVote(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (corrupt row, impossible state)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for the four caller-correctable domain errors
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Phase(_) | Error::Duplicate(_) | Error::SelfVote(_)
        )
    }

    /// Translate a storage unique-constraint violation into `Duplicate`
    ///
    /// Other database errors pass through unchanged.
    pub fn from_insert(err: sqlx::Error, duplicate_message: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Error::Duplicate(duplicate_message.to_string());
            }
        }
        Error::Database(err)
    }
}
