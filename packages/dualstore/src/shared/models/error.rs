//! Error types for the dualstore crate
//!
//! Unified error handling across every backend adapter.
//!
//! Features:
//! - Categorized error kinds (connectivity vs integrity vs validation)
//! - Backend-native errors translated at the adapter boundary
//! - Source error chaining
//! - Retryability hint for callers

use std::fmt;

use dualstore_grid::{ErrorKind as GridErrorKind, GridError};
use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error kind categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Backend unreachable (closed connection, cache down, busy database)
    Connectivity,
    /// Uniqueness or constraint violation
    IntegrityViolation,
    /// Business rule rejected the record
    Validation,
    /// Operation not permitted while a transaction is active (retryable)
    TransactionInProgress,
    /// begin/commit/rollback failures
    Transaction,
    /// Expected, declared failure of the caller's own logic
    Application,
    /// Configuration errors
    Config,
    /// Internal errors (bugs, unexpected backend results)
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connectivity => "connectivity",
            ErrorKind::IntegrityViolation => "integrity_violation",
            ErrorKind::Validation => "validation",
            ErrorKind::TransactionInProgress => "transaction_in_progress",
            ErrorKind::Transaction => "transaction",
            ErrorKind::Application => "application",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified error type
#[derive(Debug)]
pub struct DaoError {
    pub kind: ErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DaoError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connectivity, message)
    }

    pub fn integrity_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IntegrityViolation, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transaction, message)
    }

    pub fn application(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Application, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn is_connectivity(&self) -> bool {
        self.kind == ErrorKind::Connectivity
    }

    pub fn is_integrity_violation(&self) -> bool {
        self.kind == ErrorKind::IntegrityViolation
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }

    /// Whether the same call may succeed if issued again later.
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::TransactionInProgress | ErrorKind::Connectivity
        )
    }
}

impl fmt::Display for DaoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for DaoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DaoError>;

// SQLite Error Conversion
impl From<rusqlite::Error> for DaoError {
    fn from(err: rusqlite::Error) -> Self {
        let kind = match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => ErrorKind::IntegrityViolation,
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked,
            ) => ErrorKind::Connectivity,
            _ => ErrorKind::Internal,
        };
        DaoError::new(kind, format!("SQLite error: {}", err)).with_source(err)
    }
}

// Grid Error Conversion
impl From<GridError> for DaoError {
    fn from(err: GridError) -> Self {
        let kind = match err.kind {
            GridErrorKind::CacheClosed => ErrorKind::Connectivity,
            GridErrorKind::UnsupportedInTransaction => ErrorKind::TransactionInProgress,
            GridErrorKind::IllegalTransactionState => ErrorKind::Transaction,
            GridErrorKind::RegionExists => ErrorKind::Config,
        };
        DaoError::new(kind, format!("Grid error: {}", err.message)).with_source(err)
    }
}
