//! The module contains the errors the engine can throw.
//!
//! The errors are:
//!
//! - [`Validation`] thrown when an input is rejected before touching storage
//!   (non-positive amounts, empty names, unscoped discounts).
//! - [`KeyNotFound`] thrown when a referenced row does not exist.
//! - [`ExistingKey`] thrown when a write would violate a uniqueness rule.
//!   Callers may retry: idempotent writes succeed cleanly the second time.
//! - [`Database`] thrown when the store fails. The surrounding transaction is
//!   always rolled back.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`Database`]: EngineError::Database
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error(transparent)]
    Database(DbErr),
}

impl EngineError {
    /// Returns `true` when the same call may succeed if issued again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExistingKey(_))
    }
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::ExistingKey(detail),
            _ => Self::Database(err),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(EngineError::ExistingKey("receipt".to_string()).is_retryable());
        assert!(!EngineError::Validation("amount".to_string()).is_retryable());
        assert!(!EngineError::KeyNotFound("student".to_string()).is_retryable());
    }

    #[test]
    fn plain_db_errors_stay_database_errors() {
        let err = EngineError::from(DbErr::Custom("disk full".to_string()));
        assert_eq!(err, EngineError::Database(DbErr::Custom("disk full".to_string())));
    }
}
