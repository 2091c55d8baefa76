//! Record-level CRUD over a [`Connection`].
//!
//! Every operation runs as one unit of work. Mutating operations prepare
//! their statements once per call, reuse them for every record of a batch,
//! and return records freshly read back from the table.

use std::sync::Arc;

use tessera_core::{Connection, Statement};
use tessera_error::{Result, TesseraError};
use tessera_types::SqliteValue;

use crate::schema::{self, InitTableResult};
use crate::sql;
use crate::{Table, TableMapping, TableQuery};

/// A prepared statement paired with the mapping of the records it reads or
/// writes.
pub struct MappedStatement<'conn, T: Table> {
    stmt: Statement<'conn>,
    mapping: Arc<TableMapping<T>>,
}

impl<'conn, T: Table> MappedStatement<'conn, T> {
    pub fn prepare(
        conn: &'conn Connection,
        mapping: Arc<TableMapping<T>>,
        sql: &str,
    ) -> Result<Self> {
        Ok(Self {
            stmt: conn.prepare(sql)?,
            mapping,
        })
    }

    /// Bind `record`'s columns and execute, returning the rows changed.
    pub fn execute(&mut self, record: &T) -> Result<usize> {
        self.mapping.bind(&mut self.stmt, record)?;
        self.stmt.execute()
    }

    /// Bind one named parameter, e.g. the key of a find.
    pub fn bind_named(&mut self, name: &str, value: &SqliteValue) -> Result<()> {
        self.stmt.bind_named(name, value)
    }

    /// Bind positional parameters `?1..?n`.
    pub fn bind_all(&mut self, params: &[SqliteValue]) -> Result<()> {
        self.stmt.bind_all(params)
    }

    /// Run the statement with its current bindings and map every row.
    pub fn query(&mut self) -> Result<Vec<T>> {
        self.stmt
            .query()?
            .iter()
            .map(|row| self.mapping.to_object(row))
            .collect()
    }

    /// Run the statement and map the first row, if any.
    pub fn query_optional(&mut self) -> Result<Option<T>> {
        self.stmt
            .query_optional()?
            .map(|row| self.mapping.to_object(&row))
            .transpose()
    }

    /// Run the statement and map the first row; zero rows is an error.
    pub fn query_first(&mut self) -> Result<T> {
        self.query_optional()?
            .ok_or(TesseraError::QueryReturnedNoRows)
    }
}

/// Lookups by key, shared by the CRUD operations.
struct Finder<'conn, T: Table> {
    by_key: MappedStatement<'conn, T>,
    key_param: String,
}

impl<'conn, T: Table> Finder<'conn, T> {
    fn prepare(conn: &'conn Connection, mapping: &Arc<TableMapping<T>>) -> Result<Self> {
        let key_param = mapping.primary_key()?.param().to_owned();
        let by_key = MappedStatement::prepare(conn, Arc::clone(mapping), mapping.find_sql()?)?;
        Ok(Self { by_key, key_param })
    }

    fn find(&mut self, key: &SqliteValue) -> Result<Option<T>> {
        self.by_key.bind_named(&self.key_param, key)?;
        self.by_key.query_optional()
    }

    fn get(&mut self, key: &SqliteValue) -> Result<T> {
        self.find(key)?.ok_or(TesseraError::QueryReturnedNoRows)
    }
}

/// Which write statement an insert-like batch runs.
#[derive(Clone, Copy)]
enum Write {
    Insert,
    InsertOrReplace,
    Update,
}

fn write_all<'r, T: Table>(
    conn: &Connection,
    kind: Write,
    records: impl IntoIterator<Item = &'r T>,
) -> Result<Vec<T>> {
    let mapping = T::table_mapping()?;
    conn.run_in_transaction(|db| {
        let sql = match kind {
            Write::Insert => mapping.insert_sql(),
            Write::InsertOrReplace => mapping.insert_or_replace_sql(),
            Write::Update => mapping.update_sql()?,
        };
        let mut write = MappedStatement::prepare(db, Arc::clone(&mapping), sql)?;

        match kind {
            Write::Insert | Write::InsertOrReplace => {
                // Read back by the rowid the engine just assigned, so
                // generated keys are reflected whatever the key's type.
                let mut by_rowid = MappedStatement::prepare(
                    db,
                    Arc::clone(&mapping),
                    mapping.find_by_rowid_sql(),
                )?;
                let mut out = Vec::new();
                for record in records {
                    write.execute(record)?;
                    by_rowid.bind_named(":rowid", &SqliteValue::Integer(db.last_insert_rowid()))?;
                    out.push(by_rowid.query_first()?);
                }
                Ok(out)
            }
            Write::Update => {
                let mut finder = Finder::prepare(db, &mapping)?;
                let mut out = Vec::new();
                for record in records {
                    write.execute(record)?;
                    out.push(finder.get(&mapping.primary_key_value(record)?)?);
                }
                Ok(out)
            }
        }
    })
}

fn delete_keys<T: Table>(
    conn: &Connection,
    keys: impl IntoIterator<Item = SqliteValue>,
) -> Result<Vec<T>> {
    let mapping = T::table_mapping()?;
    conn.run_in_transaction(|db| {
        let mut finder = Finder::prepare(db, &mapping)?;
        let mut delete = db.prepare(mapping.delete_sql()?)?;
        let key_param = mapping.primary_key()?.param();

        let mut out = Vec::new();
        for key in keys {
            let existing = finder.get(&key)?;
            delete.bind_named(key_param, &key)?;
            delete.execute()?;
            out.push(existing);
        }
        Ok(out)
    })
}

fn single<T>(mut records: Vec<T>) -> Result<T> {
    records
        .pop()
        .ok_or_else(|| TesseraError::internal("write returned no record"))
}

/// Record-level operations on a connection.
pub trait TableConnectionExt {
    /// Create or migrate `T`'s table and its indexes.
    fn init_table<T: Table>(&self) -> Result<InitTableResult>;

    /// The record with primary key `key`; zero rows is an error.
    fn find<T: Table>(&self, key: impl Into<SqliteValue>) -> Result<T>;

    fn try_find<T: Table>(&self, key: impl Into<SqliteValue>) -> Result<Option<T>>;

    /// Insert `record` and return it as stored.
    fn insert<T: Table>(&self, record: &T) -> Result<T>;

    fn insert_all<'r, T: Table>(&self, records: impl IntoIterator<Item = &'r T>) -> Result<Vec<T>>;

    fn insert_or_replace<T: Table>(&self, record: &T) -> Result<T>;

    fn insert_or_replace_all<'r, T: Table>(
        &self,
        records: impl IntoIterator<Item = &'r T>,
    ) -> Result<Vec<T>>;

    /// Update the row with `record`'s key and return it as stored.
    fn update<T: Table>(&self, record: &T) -> Result<T>;

    fn update_all<'r, T: Table>(&self, records: impl IntoIterator<Item = &'r T>) -> Result<Vec<T>>;

    /// Delete the row with primary key `key`, returning it as it was.
    fn delete<T: Table>(&self, key: impl Into<SqliteValue>) -> Result<T>;

    fn delete_all<T: Table, K: Into<SqliteValue>>(
        &self,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<Vec<T>>;

    /// Delete the row with `record`'s key.
    fn delete_object<T: Table>(&self, record: &T) -> Result<T>;

    fn delete_all_objects<'r, T: Table>(
        &self,
        records: impl IntoIterator<Item = &'r T>,
    ) -> Result<Vec<T>>;

    /// Run arbitrary SQL and map each row onto `T`.
    fn query_as<T: Table>(&self, sql: &str, params: &[SqliteValue]) -> Result<Vec<T>>;

    /// Like [`TableConnectionExt::query_as`], returning the first row.
    fn query_first_as<T: Table>(&self, sql: &str, params: &[SqliteValue]) -> Result<T>;

    /// Number of rows in `T`'s table.
    fn count<T: Table>(&self) -> Result<i64>;

    /// A query over `T`'s whole table.
    fn table_query<T: Table>(&self) -> Result<TableQuery<T>>;

    /// Execute a built query.
    fn execute_query<T: Table>(&self, query: &TableQuery<T>) -> Result<Vec<T>>;
}

impl TableConnectionExt for Connection {
    fn init_table<T: Table>(&self) -> Result<InitTableResult> {
        schema::init_table::<T>(self)
    }

    fn find<T: Table>(&self, key: impl Into<SqliteValue>) -> Result<T> {
        self.try_find(key)?.ok_or(TesseraError::QueryReturnedNoRows)
    }

    fn try_find<T: Table>(&self, key: impl Into<SqliteValue>) -> Result<Option<T>> {
        let mapping = T::table_mapping()?;
        Finder::prepare(self, &mapping)?.find(&key.into())
    }

    fn insert<T: Table>(&self, record: &T) -> Result<T> {
        single(write_all(self, Write::Insert, [record])?)
    }

    fn insert_all<'r, T: Table>(&self, records: impl IntoIterator<Item = &'r T>) -> Result<Vec<T>> {
        write_all(self, Write::Insert, records)
    }

    fn insert_or_replace<T: Table>(&self, record: &T) -> Result<T> {
        single(write_all(self, Write::InsertOrReplace, [record])?)
    }

    fn insert_or_replace_all<'r, T: Table>(
        &self,
        records: impl IntoIterator<Item = &'r T>,
    ) -> Result<Vec<T>> {
        write_all(self, Write::InsertOrReplace, records)
    }

    fn update<T: Table>(&self, record: &T) -> Result<T> {
        single(write_all(self, Write::Update, [record])?)
    }

    fn update_all<'r, T: Table>(&self, records: impl IntoIterator<Item = &'r T>) -> Result<Vec<T>> {
        write_all(self, Write::Update, records)
    }

    fn delete<T: Table>(&self, key: impl Into<SqliteValue>) -> Result<T> {
        single(delete_keys::<T>(self, [key.into()])?)
    }

    fn delete_all<T: Table, K: Into<SqliteValue>>(
        &self,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<Vec<T>> {
        delete_keys::<T>(self, keys.into_iter().map(Into::into))
    }

    fn delete_object<T: Table>(&self, record: &T) -> Result<T> {
        let key = T::table_mapping()?.primary_key_value(record)?;
        single(delete_keys::<T>(self, [key])?)
    }

    fn delete_all_objects<'r, T: Table>(
        &self,
        records: impl IntoIterator<Item = &'r T>,
    ) -> Result<Vec<T>> {
        let mapping = T::table_mapping()?;
        let keys = records
            .into_iter()
            .map(|record| mapping.primary_key_value(record))
            .collect::<Result<Vec<_>>>()?;
        delete_keys::<T>(self, keys)
    }

    fn query_as<T: Table>(&self, sql: &str, params: &[SqliteValue]) -> Result<Vec<T>> {
        let mut stmt = MappedStatement::prepare(self, T::table_mapping()?, sql)?;
        stmt.bind_all(params)?;
        stmt.query()
    }

    fn query_first_as<T: Table>(&self, sql: &str, params: &[SqliteValue]) -> Result<T> {
        let mut stmt = MappedStatement::prepare(self, T::table_mapping()?, sql)?;
        stmt.bind_all(params)?;
        stmt.query_first()
    }

    fn count<T: Table>(&self) -> Result<i64> {
        let mapping = T::table_mapping()?;
        self.query_row(&sql::count(mapping.table_name()))?
            .get_typed(0)
    }

    fn table_query<T: Table>(&self) -> Result<TableQuery<T>> {
        Ok(TableQuery::new(T::table_mapping()?))
    }

    fn execute_query<T: Table>(&self, query: &TableQuery<T>) -> Result<Vec<T>> {
        let (sql, params) = query.render();
        let mut stmt = MappedStatement::prepare(self, Arc::clone(query.mapping()), &sql)?;
        stmt.bind_all(&params)?;
        stmt.query()
    }
}
