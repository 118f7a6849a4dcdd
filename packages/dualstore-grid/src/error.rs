//! Error types for dualstore-grid

use std::fmt;
use thiserror::Error;

/// Grid error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Cache has been closed (member unreachable)
    CacheClosed,
    /// Region name already registered in the cache
    RegionExists,
    /// Operation is not permitted while a transaction is active on this thread
    UnsupportedInTransaction,
    /// begin/commit/rollback issued in the wrong transaction state
    IllegalTransactionState,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::CacheClosed => "cache_closed",
            ErrorKind::RegionExists => "region_exists",
            ErrorKind::UnsupportedInTransaction => "unsupported_in_transaction",
            ErrorKind::IllegalTransactionState => "illegal_transaction_state",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Grid error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct GridError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl GridError {
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
    pub fn cache_closed(cache_name: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::CacheClosed,
            format!("Cache is closed: {}", cache_name.into()),
        )
    }

    pub fn region_exists(region_name: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::RegionExists,
            format!("Region already exists: {}", region_name.into()),
        )
    }

    pub fn unsupported_in_transaction(operation: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::UnsupportedInTransaction,
            format!(
                "{} is not supported while a transaction is in progress",
                operation.into()
            ),
        )
    }

    pub fn illegal_transaction_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalTransactionState, message)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GridError>;
