//! Error types for arclite
//!
//! Every failure the engine can report is a variant of [`Error`]. Variants are
//! grouped into the categories returned by [`Error::category`].

use thiserror::Error;

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Schema,
    Constraint,
    Statement,
    Cursor,
    Transaction,
    Resource,
    Internal,
}

/// The main error type for arclite
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ========== Schema Errors ==========
    #[error("Schema error: table '{0}' already exists")]
    DuplicateTable(String),

    #[error("Schema error: invalid schema for table '{table}': {reason}")]
    InvalidSchema { table: String, reason: String },

    #[error("Schema error: table '{0}' not found")]
    UnknownTable(String),

    #[error("Schema error: column '{column}' not found in table '{table}'")]
    UnknownColumn { column: String, table: String },

    // ========== Constraint Errors ==========
    #[error("Constraint error: duplicate primary key {key} in table '{table}'")]
    PrimaryKeyViolation { table: String, key: String },

    #[error(
        "Constraint error: {table}.{column} = {value} has no matching key in '{referenced_table}'"
    )]
    ForeignKeyViolation {
        table: String,
        column: String,
        value: String,
        referenced_table: String,
    },

    #[error("Constraint error: no row with primary key {key} in table '{table}'")]
    NotFound { table: String, key: String },

    #[error("Constraint error: null value not allowed for column '{0}'")]
    NullNotAllowed(String),

    #[error("Type error: column '{column}' expects {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Constraint error: value too long for column '{column}' (limit {limit})")]
    ValueTooLarge { column: String, limit: usize },

    #[error("Constraint error: table '{table}' has {expected} columns, row has {found}")]
    ArityMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    // ========== Statement Errors ==========
    #[error("Syntax error: {message} at position {position}")]
    Syntax { message: String, position: usize },

    #[error("Statement error: parameter {0} is not bound")]
    UnboundParameter(usize),

    #[error("Statement error: parameter index {index} out of range (statement has {count})")]
    ParameterOutOfRange { index: usize, count: usize },

    #[error("Statement error: division by zero")]
    DivisionByZero,

    #[error("Statement error: {0}")]
    InvalidOperation(String),

    // ========== Cursor Errors ==========
    #[error("Cursor error: cursor is not positioned on a row")]
    CursorNotPositioned,

    #[error("Cursor error: column index {index} out of range (row has {width})")]
    ColumnIndexOutOfRange { index: usize, width: usize },

    // ========== Transaction Errors ==========
    #[error("Transaction error: transaction {0} is already active")]
    TransactionAlreadyActive(u64),

    #[error("Transaction error: no active transaction")]
    NoActiveTransaction,

    // ========== Resource Errors ==========
    #[error("Resource error: {0} is closed")]
    ResourceClosed(&'static str),

    #[error("Connection error: {0}")]
    Connection(String),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a syntax error at a character position
    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        Error::Syntax {
            message: message.into(),
            position,
        }
    }

    /// Build an invalid-schema error for a table
    pub fn invalid_schema(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidSchema {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// The category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::DuplicateTable(_)
            | Error::InvalidSchema { .. }
            | Error::UnknownTable(_)
            | Error::UnknownColumn { .. } => ErrorCategory::Schema,
            Error::PrimaryKeyViolation { .. }
            | Error::ForeignKeyViolation { .. }
            | Error::NotFound { .. }
            | Error::NullNotAllowed(_)
            | Error::TypeMismatch { .. }
            | Error::ValueTooLarge { .. }
            | Error::ArityMismatch { .. } => ErrorCategory::Constraint,
            Error::Syntax { .. }
            | Error::UnboundParameter(_)
            | Error::ParameterOutOfRange { .. }
            | Error::DivisionByZero
            | Error::InvalidOperation(_) => ErrorCategory::Statement,
            Error::CursorNotPositioned | Error::ColumnIndexOutOfRange { .. } => {
                ErrorCategory::Cursor
            }
            Error::TransactionAlreadyActive(_) | Error::NoActiveTransaction => {
                ErrorCategory::Transaction
            }
            Error::ResourceClosed(_) | Error::Connection(_) => ErrorCategory::Resource,
            Error::Internal(_) => ErrorCategory::Internal,
        }
    }
}

/// Result type alias for arclite operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownTable("users".to_string());
        assert_eq!(err.to_string(), "Schema error: table 'users' not found");

        let err = Error::syntax("unexpected character '@'", 5);
        assert_eq!(
            err.to_string(),
            "Syntax error: unexpected character '@' at position 5"
        );
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            Error::DuplicateTable("t".into()).category(),
            ErrorCategory::Schema
        );
        assert_eq!(
            Error::NotFound {
                table: "t".into(),
                key: "1".into()
            }
            .category(),
            ErrorCategory::Constraint
        );
        assert_eq!(
            Error::UnboundParameter(1).category(),
            ErrorCategory::Statement
        );
        assert_eq!(
            Error::CursorNotPositioned.category(),
            ErrorCategory::Cursor
        );
        assert_eq!(
            Error::NoActiveTransaction.category(),
            ErrorCategory::Transaction
        );
        assert_eq!(
            Error::ResourceClosed("cursor").category(),
            ErrorCategory::Resource
        );
    }
}
