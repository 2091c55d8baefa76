//! Core value types shared by the tessera crates: [`SqliteValue`], storage
//! classes, column descriptors and conversions to and from Rust types.

pub mod column;
pub mod convert;
pub mod value;

pub use column::{ColumnInfo, TableColumnMetadata};
pub use convert::{ColumnValue, ValueKind};
pub use value::SqliteValue;

use std::fmt;

/// The storage class of a value, as reported by SQLite's `typeof()`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum StorageClass {
    Null,
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageClass {
    /// The matching `typeof()` string.
    pub const fn typeof_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Blob => "blob",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.typeof_str())
    }
}
