//! The module contains the error the engine can throw.
//!
//! Every failure belongs to one [`ErrorKind`], which callers use to decide
//! whether to surface, retry or re-read:
//!
//! - validation errors ([`InvalidSplitPolicy`], [`InvalidPayment`],
//!   [`InvalidScoreRange`], ...) are never retried.
//! - conflicts ([`OverpaymentRejected`], [`ScoreAlreadyInitialized`],
//!   [`ConcurrentMutation`], [`ExistingKey`], ...) may be retried after
//!   re-reading.
//! - [`KeyNotFound`] is surfaced as-is.
//! - [`Database`] errors are transient when the connection layer failed.
//!
//!  [`InvalidSplitPolicy`]: EngineError::InvalidSplitPolicy
//!  [`InvalidPayment`]: EngineError::InvalidPayment
//!  [`InvalidScoreRange`]: EngineError::InvalidScoreRange
//!  [`OverpaymentRejected`]: EngineError::OverpaymentRejected
//!  [`ScoreAlreadyInitialized`]: EngineError::ScoreAlreadyInitialized
//!  [`ConcurrentMutation`]: EngineError::ConcurrentMutation
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid split policy: {0}")]
    InvalidSplitPolicy(String),
    #[error("Participant set must not be empty")]
    EmptyParticipantSet,
    #[error("Amount must be > 0: {0}")]
    NonPositiveAmount(String),
    #[error("Invalid payment: {0}")]
    InvalidPayment(String),
    #[error("Overpayment rejected: {0}")]
    OverpaymentRejected(String),
    #[error("Score already initialized for \"{0}\"")]
    ScoreAlreadyInitialized(String),
    #[error("Invalid score range: {0}")]
    InvalidScoreRange(String),
    #[error("Correction rejected: {0}")]
    CorrectionRejected(String),
    #[error("Concurrent mutation detected: {0}")]
    ConcurrentMutation(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Coarse classification used by the transport layer and the retry loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Forbidden,
    TransientStore,
    Store,
}

impl EngineError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSplitPolicy(_)
            | Self::EmptyParticipantSet
            | Self::NonPositiveAmount(_)
            | Self::InvalidPayment(_)
            | Self::InvalidScoreRange(_)
            | Self::InvalidAmount(_)
            | Self::InvalidId(_)
            | Self::CurrencyMismatch(_) => ErrorKind::Validation,
            Self::OverpaymentRejected(_)
            | Self::ScoreAlreadyInitialized(_)
            | Self::CorrectionRejected(_)
            | Self::ConcurrentMutation(_)
            | Self::ExistingKey(_) => ErrorKind::Conflict,
            Self::KeyNotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Database(err) => {
                if is_transient_db_error(err) {
                    ErrorKind::TransientStore
                } else {
                    ErrorKind::Store
                }
            }
        }
    }

    /// Returns `true` if the operation may succeed when retried unchanged.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::TransientStore
    }
}

fn is_transient_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        // SQLite reports lock contention as an execution error.
        DbErr::Exec(inner) | DbErr::Query(inner) => {
            let msg = inner.to_string();
            msg.contains("database is locked") || msg.contains("database is busy")
        }
        _ => false,
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidSplitPolicy(a), Self::InvalidSplitPolicy(b)) => a == b,
            (Self::EmptyParticipantSet, Self::EmptyParticipantSet) => true,
            (Self::NonPositiveAmount(a), Self::NonPositiveAmount(b)) => a == b,
            (Self::InvalidPayment(a), Self::InvalidPayment(b)) => a == b,
            (Self::OverpaymentRejected(a), Self::OverpaymentRejected(b)) => a == b,
            (Self::ScoreAlreadyInitialized(a), Self::ScoreAlreadyInitialized(b)) => a == b,
            (Self::InvalidScoreRange(a), Self::InvalidScoreRange(b)) => a == b,
            (Self::CorrectionRejected(a), Self::CorrectionRejected(b)) => a == b,
            (Self::ConcurrentMutation(a), Self::ConcurrentMutation(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::RuntimeErr;

    use super::*;

    #[test]
    fn classifies_domain_errors() {
        assert_eq!(
            EngineError::OverpaymentRejected("x".to_string()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(EngineError::EmptyParticipantSet.kind(), ErrorKind::Validation);
        assert_eq!(
            EngineError::KeyNotFound("share".to_string()).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn connection_failures_are_transient() {
        let err = EngineError::Database(DbErr::Conn(RuntimeErr::Internal("reset".to_string())));
        assert!(err.is_transient());

        let err = EngineError::Database(DbErr::RecordNotInserted);
        assert_eq!(err.kind(), ErrorKind::Store);
    }
}
