//! Error types for Library Desk

use thiserror::Error;

/// Application error codes, reported alongside every failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    DbFailure = 3,
    NoSuchData = 4,
    BadValue = 5,
    Conflict = 6,
    ConfigFailure = 7,
    TransactionStateUnknown = 70,
}

impl ErrorCode {
    /// Process exit status used by the binary when an error reaches `main`
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The transaction could not be rolled back after a failure, so its
    /// outcome on the server is unknown.
    #[error("Rollback failed after {cause}: {rollback}")]
    RollbackFailed {
        /// Why the transaction was being rolled back
        cause: String,
        rollback: sqlx::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound(_) => ErrorCode::NoSuchData,
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::Database(_) | AppError::Migration(_) => ErrorCode::DbFailure,
            AppError::RollbackFailed { .. } => ErrorCode::TransactionStateUnknown,
            AppError::Config(_) => ErrorCode::ConfigFailure,
            AppError::Io(_) | AppError::Internal(_) => ErrorCode::Failure,
        }
    }

    /// Storage failures leave the session in a state the caller should not
    /// keep working with; the front end terminates on these.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Migration(_) | AppError::RollbackFailed { .. }
        )
    }

    /// Log the error at a level matching its severity
    pub fn trace(&self) {
        match self {
            AppError::Database(e) => tracing::error!("Database error: {:?}", e),
            AppError::RollbackFailed { cause, rollback } => {
                tracing::error!(cause = %cause, rollback = ?rollback, "Rollback failed");
            }
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            other => tracing::warn!(code = ?other.code(), "{}", other),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
