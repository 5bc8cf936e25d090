//! The module contains the errors the engine can return.
//!
//! Validation errors ([`InvalidAmount`], [`CategoryMismatch`],
//! [`SplitSumMismatch`], ...) are caller-fixable and map to 422-class
//! responses. [`KeyNotFound`] is 404-class, [`ExistingKey`] and
//! [`StateConflict`] are 409-class. Nothing here is fatal to the process.
//!
//! [`InvalidAmount`]: EngineError::InvalidAmount
//! [`CategoryMismatch`]: EngineError::CategoryMismatch
//! [`SplitSumMismatch`]: EngineError::SplitSumMismatch
//! [`KeyNotFound`]: EngineError::KeyNotFound
//! [`ExistingKey`]: EngineError::ExistingKey
//! [`StateConflict`]: EngineError::StateConflict
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" not found")]
    KeyNotFound(String),
    #[error("\"{0}\" already present")]
    ExistingKey(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    StateConflict(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("category mismatch: {0}")]
    CategoryMismatch(String),
    #[error("invalid split target: {0}")]
    InvalidSplitTarget(String),
    #[error("split shares sum to {got}, transaction amount is {expected}")]
    SplitSumMismatch { expected: i64, got: i64 },
    #[error("not a group member: {0}")]
    NotAGroupMember(String),
    #[error("invalid recurrence: {0}")]
    InvalidRecurrence(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::StateConflict(a), Self::StateConflict(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidValue(a), Self::InvalidValue(b)) => a == b,
            (Self::CategoryMismatch(a), Self::CategoryMismatch(b)) => a == b,
            (Self::InvalidSplitTarget(a), Self::InvalidSplitTarget(b)) => a == b,
            (
                Self::SplitSumMismatch { expected: a, got: b },
                Self::SplitSumMismatch { expected: c, got: d },
            ) => a == c && b == d,
            (Self::NotAGroupMember(a), Self::NotAGroupMember(b)) => a == b,
            (Self::InvalidRecurrence(a), Self::InvalidRecurrence(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
