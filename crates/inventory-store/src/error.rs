use thiserror::Error;

use crate::{ItemId, OrderId};

/// Which kind of constraint a write ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    Check,
    NotNull,
}

impl ConstraintKind {
    fn from_error_kind(kind: sqlx::error::ErrorKind) -> Option<Self> {
        match kind {
            sqlx::error::ErrorKind::UniqueViolation => Some(Self::Unique),
            sqlx::error::ErrorKind::ForeignKeyViolation => Some(Self::ForeignKey),
            sqlx::error::ErrorKind::CheckViolation => Some(Self::Check),
            sqlx::error::ErrorKind::NotNullViolation => Some(Self::NotNull),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unique => "unique",
            Self::ForeignKey => "foreign key",
            Self::Check => "check",
            Self::NotNull => "not null",
        };
        f.write_str(name)
    }
}

// SQLSTATE codes of the data exception class that callers can act on.
const STRING_DATA_RIGHT_TRUNCATION: &str = "22001";
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Errors that can occur when interacting with the inventory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write violated a uniqueness, check, foreign key or not-null constraint.
    /// The transaction it ran in has been rolled back.
    #[error("Integrity violation ({kind} constraint {}): {message}", constraint.as_deref().unwrap_or("<unnamed>"))]
    IntegrityViolation {
        kind: ConstraintKind,
        constraint: Option<String>,
        message: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The item does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// The order has already been shipped.
    #[error("Order already shipped: {0}")]
    AlreadyShipped(OrderId),

    /// The input was rejected before reaching the database.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A value does not fit the column or integer type it is computed into.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// The connection to the database failed or the pool gave up.
    #[error("Connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// Any other database error.
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Builds a violation that did not come from the driver.
    pub fn violation(
        kind: ConstraintKind,
        constraint: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::IntegrityViolation {
            kind,
            constraint: Some(constraint.to_string()),
            message: message.into(),
            source: None,
        }
    }

    /// Returns the constraint name if this is an integrity violation.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            Self::IntegrityViolation { constraint, .. } => constraint.as_deref(),
            _ => None,
        }
    }

    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::IntegrityViolation { .. })
    }

    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let violation = match &err {
            sqlx::Error::Database(db_err) => ConstraintKind::from_error_kind(db_err.kind())
                .map(|kind| {
                    (
                        kind,
                        db_err.constraint().map(str::to_owned),
                        db_err.message().to_owned(),
                    )
                }),
            _ => None,
        };

        if let Some((kind, constraint, message)) = violation {
            return Self::IntegrityViolation {
                kind,
                constraint,
                message,
                source: Some(err),
            };
        }

        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(STRING_DATA_RIGHT_TRUNCATION) => {
                    return Self::Validation(db_err.message().to_owned());
                }
                Some(NUMERIC_VALUE_OUT_OF_RANGE) => {
                    return Self::OutOfRange(db_err.message().to_owned());
                }
                _ => {}
            }
        }

        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Connection(err),
            other => Self::Database(other),
        }
    }
}

/// Result type for inventory store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
