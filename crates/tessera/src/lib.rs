//! Public API facade for Tessera.
//!
//! Typed SQLite values with the engine's coercion rules, a thin connection
//! layer, and a declaration-driven table mapper with additive migration,
//! CRUD and a query builder.
//!
//! ```ignore
//! use tessera::{Connection, FieldDecl, Table, TableConnectionExt, TableDecl, col};
//!
//! #[derive(Default)]
//! struct Task { id: Option<i64>, title: String, done: bool }
//!
//! impl Table for Task {
//!     type Builder = Self;
//!
//!     fn declare() -> TableDecl<Self> {
//!         TableDecl::with_default()
//!             .field(
//!                 FieldDecl::new("id", |t: &Task| &t.id, |t, v| t.id = v)
//!                     .primary_key()
//!                     .auto_increment(),
//!             )
//!             .field(FieldDecl::new("title", |t: &Task| &t.title, |t, v| t.title = v))
//!             .field(FieldDecl::new("done", |t: &Task| &t.done, |t, v| t.done = v))
//!     }
//! }
//!
//! let conn = Connection::open_in_memory()?;
//! conn.init_table::<Task>()?;
//! conn.insert(&Task { title: "write docs".into(), ..Task::default() })?;
//! let open = conn.execute_query(&conn.table_query::<Task>()?.filter(col("done").eq(false)))?;
//! ```

pub use tessera_core::{
    ColumnInfo, ColumnValue, Connection, ConnectionConfig, OpenFlags, Result, Row, SqliteValue,
    Statement, TableColumnMetadata, TesseraError, Transaction, params,
};
pub use tessera_error::ErrorCode;
pub use tessera_orm::{
    BinaryOp, ColumnMapping, CreateFlags, Expr, FieldDecl, IndexDecl, IndexInfo, InitTableResult,
    MappedStatement, Ordering, Table, TableConnectionExt, TableDecl, TableMapping, TableQuery, col,
    val,
};
pub use tessera_types::{StorageClass, ValueKind};
