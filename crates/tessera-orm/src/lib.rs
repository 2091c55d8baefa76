//! Declaration-driven table mapping.
//!
//! A record type implements [`Table`] by returning a [`TableDecl`]: one
//! [`FieldDecl`] per field, each pairing a getter and a setter with the
//! field's column annotations. The declaration is turned into an immutable
//! [`TableMapping`] once per type and cached for the life of the process.
//! The mapping renders the schema and CRUD statements, binds records to
//! statements and rebuilds records from rows.

pub mod crud;
pub mod decl;
pub mod expr;
pub mod flags;
pub mod mapping;
pub mod query;
pub mod registry;
pub mod schema;
pub mod sql;

pub use crud::{MappedStatement, TableConnectionExt};
pub use decl::{FieldDecl, IndexDecl, Table, TableDecl};
pub use expr::{BinaryOp, Expr, col, val};
pub use flags::CreateFlags;
pub use mapping::{ColumnMapping, IndexInfo, TableMapping};
pub use query::{Ordering, TableQuery};
pub use schema::InitTableResult;
