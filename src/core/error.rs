use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridplanError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),
    #[error("Reference error: {0}")]
    ReferenceError(String),
    #[error("Feature mismatch: {0}")]
    FeatureMismatch(String),
    #[error("Temporal inconsistency: {0}")]
    TemporalInconsistency(String),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Concurrent claim: {0}")]
    ConcurrentClaim(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Entry is referenced: {0}")]
    EntryReferenced(String),
}
