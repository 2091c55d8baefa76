//! Error type, result alias and coarse error codes for tessera.

use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for tessera operations.
///
/// Mapping-declaration defects, coercion failures and not-found conditions get
/// structured variants. Errors reported by the SQLite engine are carried
/// unchanged in [`TesseraError::Engine`].
#[derive(Error, Debug)]
pub enum TesseraError {
    // === Connection Errors ===
    /// The database could not be opened.
    #[error("unable to open database file: '{path}'")]
    CannotOpen { path: PathBuf },

    // === Value Errors ===
    /// The engine does not define this conversion for the value's storage class.
    #[error("cannot convert {from} to {to}")]
    UnsupportedCoercion { from: &'static str, to: &'static str },

    /// A value could not be read as the requested Rust type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// A value does not fit the requested Rust type.
    #[error("value out of range for {what}: {value}")]
    OutOfRange { what: String, value: String },

    /// A string or blob exceeds the engine's size limit.
    #[error("string or blob too big")]
    TooBig,

    // === Mapping Errors ===
    /// A field's declared type has no SQL storage class.
    #[error("unsupported column type for field {field}: {type_name}")]
    UnsupportedType {
        field: String,
        type_name: &'static str,
    },

    /// Columns sharing an index disagree on uniqueness.
    #[error(
        "all the columns in index {index} must have the same value for their unique property"
    )]
    IndexUniqueConflict { index: String },

    /// Two columns of one index claim the same order key.
    #[error("ordered columns in index {index} must have unique order values (duplicate {order})")]
    DuplicateIndexOrder { index: String, order: i32 },

    /// Two fields resolve to the same column name.
    #[error("duplicate column {column} in table {table}")]
    DuplicateColumn { table: String, column: String },

    /// A primary-key operation ran against a table without a primary key.
    #[error("table {table} has no primary key column")]
    MissingPrimaryKey { table: String },

    /// More than one column is marked as the primary key.
    #[error("table {table} declares more than one primary key: {columns}")]
    AmbiguousPrimaryKey { table: String, columns: String },

    // === Query Errors ===
    /// A query that must produce a row produced none.
    #[error("query returned no rows")]
    QueryReturnedNoRows,

    /// No column with this name exists in the result or mapping.
    #[error("no such column: {name}")]
    NoSuchColumn { name: String },

    /// No parameter with this name exists in the statement.
    #[error("no such parameter: {name}")]
    NoSuchParameter { name: String },

    // === Engine Errors ===
    /// Error reported by the SQLite engine.
    #[error(transparent)]
    Engine(#[from] rusqlite::Error),

    /// Internal logic error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// SQLite result codes, matching the numeric values from `sqlite3.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Generic error.
    Error = 1,
    /// Internal logic error.
    Internal = 2,
    /// Access permission denied.
    Perm = 3,
    /// Callback requested abort.
    Abort = 4,
    /// Database file is locked.
    Busy = 5,
    /// Table is locked.
    Locked = 6,
    /// Out of memory.
    NoMem = 7,
    /// Attempt to write a read-only database.
    ReadOnly = 8,
    /// Disk I/O error.
    IoErr = 10,
    /// Database disk image is malformed.
    Corrupt = 11,
    /// Not found.
    NotFound = 12,
    /// Database or disk is full.
    Full = 13,
    /// Unable to open database file.
    CantOpen = 14,
    /// Database schema has changed.
    Schema = 17,
    /// String or BLOB exceeds size limit.
    TooBig = 18,
    /// Constraint violation.
    Constraint = 19,
    /// Data type mismatch.
    Mismatch = 20,
    /// Library used incorrectly.
    Misuse = 21,
    /// Bind parameter out of range.
    Range = 25,
}

impl TesseraError {
    /// Map this error to a SQLite result code.
    #[allow(clippy::match_same_arms)]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::CannotOpen { .. } => ErrorCode::CantOpen,
            Self::UnsupportedCoercion { .. } | Self::TypeMismatch { .. } => ErrorCode::Mismatch,
            Self::OutOfRange { .. } | Self::NoSuchParameter { .. } => ErrorCode::Range,
            Self::TooBig => ErrorCode::TooBig,
            Self::UnsupportedType { .. }
            | Self::IndexUniqueConflict { .. }
            | Self::DuplicateIndexOrder { .. }
            | Self::DuplicateColumn { .. }
            | Self::MissingPrimaryKey { .. }
            | Self::AmbiguousPrimaryKey { .. } => ErrorCode::Misuse,
            Self::QueryReturnedNoRows => ErrorCode::NotFound,
            Self::NoSuchColumn { .. } => ErrorCode::Error,
            Self::Engine(err) => engine_code(err),
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Whether the error stems from a defect in a table declaration.
    pub const fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedType { .. }
                | Self::IndexUniqueConflict { .. }
                | Self::DuplicateIndexOrder { .. }
                | Self::DuplicateColumn { .. }
                | Self::MissingPrimaryKey { .. }
                | Self::AmbiguousPrimaryKey { .. }
        )
    }

    /// Whether this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self.error_code(), ErrorCode::Busy | ErrorCode::Locked)
    }

    /// Human-friendly suggestion for fixing this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedCoercion { .. } => {
                Some("Read the value as an integer or float instead")
            }
            Self::UnsupportedType { .. } => {
                Some("Store the field through a supported type or mark it ignored")
            }
            Self::MissingPrimaryKey { .. } => Some("Mark exactly one field as the primary key"),
            Self::QueryReturnedNoRows => Some("Use the optional lookup if the row may be absent"),
            _ if self.is_transient() => Some("Retry the operation after a short delay"),
            _ => None,
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an out-of-range error.
    pub fn out_of_range(what: impl Into<String>, value: impl ToString) -> Self {
        Self::OutOfRange {
            what: what.into(),
            value: value.to_string(),
        }
    }
}

#[allow(clippy::match_same_arms)]
fn engine_code(err: &rusqlite::Error) -> ErrorCode {
    use rusqlite::ErrorCode as Sqlite;

    match err.sqlite_error_code() {
        Some(Sqlite::DatabaseBusy) => ErrorCode::Busy,
        Some(Sqlite::DatabaseLocked) => ErrorCode::Locked,
        Some(Sqlite::ConstraintViolation) => ErrorCode::Constraint,
        Some(Sqlite::ReadOnly) => ErrorCode::ReadOnly,
        Some(Sqlite::CannotOpen) => ErrorCode::CantOpen,
        Some(Sqlite::TypeMismatch) => ErrorCode::Mismatch,
        Some(Sqlite::ApiMisuse) => ErrorCode::Misuse,
        Some(Sqlite::TooBig) => ErrorCode::TooBig,
        Some(Sqlite::DatabaseCorrupt) => ErrorCode::Corrupt,
        Some(Sqlite::DiskFull) => ErrorCode::Full,
        Some(Sqlite::SchemaChanged) => ErrorCode::Schema,
        Some(Sqlite::SystemIoFailure) => ErrorCode::IoErr,
        Some(Sqlite::OutOfMemory) => ErrorCode::NoMem,
        Some(Sqlite::PermissionDenied) => ErrorCode::Perm,
        Some(Sqlite::OperationAborted) => ErrorCode::Abort,
        Some(Sqlite::ParameterOutOfRange) => ErrorCode::Range,
        Some(Sqlite::InternalMalfunction) => ErrorCode::Internal,
        _ => match err {
            rusqlite::Error::QueryReturnedNoRows => ErrorCode::NotFound,
            _ => ErrorCode::Error,
        },
    }
}

/// Result type alias using `TesseraError`.
pub type Result<T> = std::result::Result<T, TesseraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TesseraError::UnsupportedCoercion {
            from: "real",
            to: "text",
        };
        assert_eq!(err.to_string(), "cannot convert real to text");
    }

    #[test]
    fn error_display_index_conflict() {
        let err = TesseraError::DuplicateIndexOrder {
            index: "people_name".to_owned(),
            order: 0,
        };
        assert_eq!(
            err.to_string(),
            "ordered columns in index people_name must have unique order values (duplicate 0)"
        );
    }

    #[test]
    fn error_code_mapping() {
        assert_eq!(
            TesseraError::QueryReturnedNoRows.error_code(),
            ErrorCode::NotFound
        );
        assert_eq!(TesseraError::TooBig.error_code(), ErrorCode::TooBig);
        assert_eq!(
            TesseraError::out_of_range("i8", 300).error_code(),
            ErrorCode::Range
        );
        assert_eq!(
            TesseraError::internal("bug").error_code(),
            ErrorCode::Internal
        );
        assert_eq!(
            TesseraError::Engine(rusqlite::Error::QueryReturnedNoRows).error_code(),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn declaration_errors() {
        assert!(
            TesseraError::MissingPrimaryKey {
                table: "t".to_owned()
            }
            .is_declaration_error()
        );
        assert!(!TesseraError::QueryReturnedNoRows.is_declaration_error());
    }

    #[test]
    fn is_transient() {
        assert!(!TesseraError::TooBig.is_transient());
        assert!(!TesseraError::QueryReturnedNoRows.is_transient());
    }

    #[test]
    fn suggestions() {
        assert!(TesseraError::QueryReturnedNoRows.suggestion().is_some());
        assert!(TesseraError::internal("x").suggestion().is_none());
    }

    #[test]
    fn error_code_values() {
        assert_eq!(ErrorCode::Busy as i32, 5);
        assert_eq!(ErrorCode::Constraint as i32, 19);
        assert_eq!(ErrorCode::Range as i32, 25);
    }
}
