use thiserror::Error;

use crate::domain::{Field, TransactionId, ValidationError};
use crate::storage::Revision;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid identifier or password")]
    InvalidCredentials,

    #[error("Invalid {field}: {reason}")]
    ValidationFailed { field: Field, reason: String },

    #[error("Position {position} is out of range for a ledger of {size} transactions")]
    OutOfRange { position: usize, size: usize },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Ledger changed since it was loaded (revision {expected}, now {found}); reload and retry")]
    StaleLedger { expected: Revision, found: Revision },

    #[error("Storage failure during {operation}: {cause:#}")]
    StorageFailure {
        operation: &'static str,
        #[source]
        cause: anyhow::Error,
    },

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl AppError {
    /// Wrap a storage-layer error, naming the operation that failed.
    pub fn storage(operation: &'static str) -> impl FnOnce(anyhow::Error) -> AppError {
        move |cause| AppError::StorageFailure { operation, cause }
    }

    /// Validation and range errors are reported back to the user; nothing was written.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::AlreadyExists(_)
                | AppError::InvalidCredentials
                | AppError::ValidationFailed { .. }
                | AppError::OutOfRange { .. }
                | AppError::TransactionNotFound(_)
                | AppError::StaleLedger { .. }
        )
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::ValidationFailed {
            field: err.field,
            reason: err.reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_storage_failure_keeps_cause() {
        let cause = anyhow!("disk full").context("Failed to commit");
        let err = AppError::storage("save ledger")(cause);
        let message = err.to_string();

        assert!(message.contains("save ledger"));
        assert!(message.contains("disk full"));
        assert!(!err.is_recoverable());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_validation_error_names_field() {
        let err: AppError = ValidationError::new(Field::Amount, "must not be negative").into();
        assert_eq!(err.to_string(), "Invalid amount: must not be negative");
        assert!(err.is_recoverable());
    }
}
