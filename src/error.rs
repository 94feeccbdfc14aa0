use std::path::PathBuf;

use thiserror::Error;

/// Rejection of a creation request before it reaches the store.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("amount must be a finite number, got {0}")]
    AmountNotFinite(f64),
    #[error("amount must be greater than 0, got {0}")]
    AmountNotPositive(f64),
    #[error("amount {0} rounds to 0.00")]
    AmountTooSmall(f64),
    #[error("amount {0} exceeds the maximum of 99999999.99")]
    AmountTooLarge(f64),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("date '{0}' is not a valid YYYY-MM-DD calendar date")]
    InvalidDate(String),
    #[error("invalid request body: {0}")]
    MalformedBody(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an expense with idempotency key {0} already exists")]
    Duplicate(String),
    #[error("expense with idempotency key {0} is missing after a conflicting insert")]
    ConflictUnresolved(String),
    #[error("amount {0} has no floating point representation")]
    AmountNotRepresentable(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("cannot read migrations from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("migration file {0} does not start with a 3 digit number")]
    BadFileName(PathBuf),
    #[error("migration {path} failed: {source}")]
    Apply {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },
}
