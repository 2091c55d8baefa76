//! Connection layer over the SQLite engine.
//!
//! Everything above this crate talks to the engine through [`Connection`],
//! [`Statement`] and [`Row`], exchanging [`SqliteValue`]s. Statements are
//! scoped to the borrow of their connection and released when dropped.

pub mod config;
pub mod connection;
pub mod params;
pub mod row;
pub mod statement;
pub mod transaction;

pub use config::{ConnectionConfig, OpenFlags};
pub use connection::Connection;
pub use row::Row;
pub use statement::Statement;
pub use transaction::Transaction;

pub use tessera_error::{Result, TesseraError};
pub use tessera_types::{ColumnInfo, ColumnValue, SqliteValue, TableColumnMetadata};
