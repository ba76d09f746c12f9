//! Error types for the selection core
//!
//! Everything except `Inconsistency` is recoverable at the UI layer:
//! show the message, let the operator retry. `Inconsistency` means an
//! internal invariant (e.g. a building over capacity) was violated and
//! must be logged loudly, never clamped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Candidate has already selected in {0}")]
    AlreadySelected(String),

    #[error("Unit {0} is already taken")]
    UnitTaken(String),

    #[error("Selection session is locked; reset required")]
    SessionLocked,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Consistency violation: {0}")]
    Inconsistency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
