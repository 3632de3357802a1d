//! Store error types

use thiserror::Error;

/// Errors that can occur in the in-memory stores
#[derive(Error, Debug)]
pub enum StoreError {
    /// Record does not exist or belongs to another user
    #[error("{0} not found or access denied")]
    NotFound(String),

    /// Input failed validation
    #[error("{0}")]
    Validation(String),

    /// End time is not after start time
    #[error("End time must be after start time")]
    InvalidTimeRange,

    /// Email/password pair did not match
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Registration with an email that is already in use
    #[error("User with email {0} already exists")]
    EmailTaken(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
