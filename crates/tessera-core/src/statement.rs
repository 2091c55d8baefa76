use std::sync::Arc;

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use tessera_error::{Result, TesseraError};
use tessera_types::{ColumnInfo, SqliteValue};
use tracing::trace;

use crate::Row;

/// A prepared statement, borrowed from its [`Connection`](crate::Connection).
///
/// Bindings persist across executions until replaced, so one statement can be
/// re-bound and re-run for every record of a batch. The engine statement is
/// finalized when this value is dropped.
pub struct Statement<'conn> {
    inner: rusqlite::Statement<'conn>,
    columns: Arc<[ColumnInfo]>,
}

impl<'conn> Statement<'conn> {
    pub(crate) fn new(inner: rusqlite::Statement<'conn>) -> Self {
        let origins = inner.columns_with_metadata();
        let columns: Arc<[ColumnInfo]> = inner
            .columns()
            .iter()
            .zip(&origins)
            .map(|(column, origin)| {
                ColumnInfo::new(column.name(), column.decl_type().map(str::to_owned))
                    .with_origin(
                        origin.database_name().map(str::to_owned),
                        origin.table_name().map(str::to_owned),
                        origin.origin_name().map(str::to_owned),
                    )
            })
            .collect();
        Self { inner, columns }
    }

    /// Result column descriptions, empty for statements returning no rows.
    pub fn columns(&self) -> &Arc<[ColumnInfo]> {
        &self.columns
    }

    pub fn parameter_count(&self) -> usize {
        self.inner.parameter_count()
    }

    /// Bind `value` at the 1-based parameter `index`.
    pub fn bind(&mut self, index: usize, value: &SqliteValue) -> Result<()> {
        if let SqliteValue::ZeroBlob(n) = value {
            if i32::try_from(*n).is_err() {
                return Err(TesseraError::TooBig);
            }
        }
        self.inner.raw_bind_parameter(index, Bind(value))?;
        Ok(())
    }

    /// Bind positional parameters `?1..?n` from a slice.
    pub fn bind_all(&mut self, params: &[SqliteValue]) -> Result<()> {
        for (i, value) in params.iter().enumerate() {
            self.bind(i + 1, value)?;
        }
        Ok(())
    }

    /// Bind a named parameter such as `:name`.
    pub fn bind_named(&mut self, name: &str, value: &SqliteValue) -> Result<()> {
        if self.try_bind_named(name, value)? {
            Ok(())
        } else {
            Err(TesseraError::NoSuchParameter {
                name: name.to_owned(),
            })
        }
    }

    /// Bind a named parameter if the statement has it; returns whether it did.
    pub fn try_bind_named(&mut self, name: &str, value: &SqliteValue) -> Result<bool> {
        match self.inner.parameter_index(name)? {
            Some(index) => {
                trace!(parameter = name, kind = value.typeof_str(), "bind");
                self.bind(index, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reset every parameter to NULL.
    pub fn clear_bindings(&mut self) {
        self.inner.clear_bindings();
    }

    /// Run the statement with its current bindings, returning the rows changed.
    pub fn execute(&mut self) -> Result<usize> {
        Ok(self.inner.raw_execute()?)
    }

    /// Run the statement and collect every result row.
    pub fn query(&mut self) -> Result<Vec<Row>> {
        let width = self.columns.len();
        let mut rows = self.inner.raw_query();
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(from_engine(row.get_ref(i)?));
            }
            out.push(Row::new(values, Arc::clone(&self.columns)));
        }
        Ok(out)
    }

    /// Run the statement and return its first row.
    ///
    /// Zero rows is an error ([`TesseraError::QueryReturnedNoRows`]).
    pub fn query_row(&mut self) -> Result<Row> {
        self.query_optional()?
            .ok_or(TesseraError::QueryReturnedNoRows)
    }

    /// Run the statement and return its first row, if any.
    pub fn query_optional(&mut self) -> Result<Option<Row>> {
        let width = self.columns.len();
        let mut rows = self.inner.raw_query();
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(from_engine(row.get_ref(i)?));
        }
        Ok(Some(Row::new(values, Arc::clone(&self.columns))))
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// Borrowed view of a value handed to the engine without copying.
struct Bind<'a>(&'a SqliteValue);

impl ToSql for Bind<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            SqliteValue::Null => ToSqlOutput::Owned(Value::Null),
            SqliteValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqliteValue::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqliteValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqliteValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            // Length was checked in `Statement::bind`.
            SqliteValue::ZeroBlob(n) => {
                ToSqlOutput::ZeroBlob(i32::try_from(*n).unwrap_or(i32::MAX))
            }
        })
    }
}

fn from_engine(value: ValueRef<'_>) -> SqliteValue {
    match value {
        ValueRef::Null => SqliteValue::Null,
        ValueRef::Integer(i) => SqliteValue::Integer(i),
        ValueRef::Real(f) => SqliteValue::Float(f),
        ValueRef::Text(bytes) => SqliteValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => SqliteValue::Blob(bytes.to_vec()),
    }
}
