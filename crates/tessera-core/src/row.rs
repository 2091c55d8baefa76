use std::sync::Arc;

use tessera_error::{Result, TesseraError};
use tessera_types::{ColumnInfo, ColumnValue, SqliteValue};

/// One materialized result row.
///
/// Rows from the same statement share their column descriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<SqliteValue>,
    columns: Arc<[ColumnInfo]>,
}

impl Row {
    pub fn new(values: Vec<SqliteValue>, columns: Arc<[ColumnInfo]>) -> Self {
        debug_assert_eq!(values.len(), columns.len());
        Self { values, columns }
    }

    /// Returns all values in this row.
    pub fn values(&self) -> &[SqliteValue] {
        &self.values
    }

    /// Consume the row, returning its values.
    pub fn into_values(self) -> Vec<SqliteValue> {
        self.values
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&SqliteValue> {
        self.values.get(index)
    }

    /// Returns the value of the first column named `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&SqliteValue> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .and_then(|i| self.values.get(i))
    }

    /// Iterate `(column, value)` pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&ColumnInfo, &SqliteValue)> {
        self.columns.iter().zip(&self.values)
    }

    /// Read the value at `index` as `T`.
    pub fn get_typed<T: ColumnValue>(&self, index: usize) -> Result<T> {
        let value = self.get(index).ok_or_else(|| TesseraError::NoSuchColumn {
            name: format!("#{index}"),
        })?;
        T::from_sqlite_value(value)
    }

    /// Read the column named `name` as `T`.
    pub fn get_typed_by_name<T: ColumnValue>(&self, name: &str) -> Result<T> {
        let value = self
            .get_by_name(name)
            .ok_or_else(|| TesseraError::NoSuchColumn {
                name: name.to_owned(),
            })?;
        T::from_sqlite_value(value)
    }
}
