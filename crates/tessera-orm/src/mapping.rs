//! Building a [`TableMapping`] from a [`TableDecl`].

use std::collections::HashMap;
use std::sync::OnceLock;

use tessera_core::{Row, Statement};
use tessera_error::{Result, TesseraError};
use tessera_types::{SqliteValue, TableColumnMetadata, ValueKind};
use tracing::debug;

use crate::decl::{Getter, Setter};
use crate::flags::IMPLICIT_KEY;
use crate::sql;
use crate::{CreateFlags, FieldDecl, IndexDecl, Table, TableDecl};

/// One mapped column: its schema facts plus the field accessors.
pub struct ColumnMapping<T: Table> {
    name: String,
    param: String,
    field_name: &'static str,
    kind: ValueKind,
    metadata: TableColumnMetadata,
    get: Getter<T>,
    set: Setter<T::Builder>,
}

impl<T: Table> ColumnMapping<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The named parameter this column binds to, `:name`.
    pub fn param(&self) -> &str {
        &self.param
    }

    pub fn field_name(&self) -> &'static str {
        self.field_name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn metadata(&self) -> &TableColumnMetadata {
        &self.metadata
    }

    /// Read this column's value from `record`.
    pub fn value_of(&self, record: &T) -> SqliteValue {
        (self.get)(record)
    }
}

/// An index over one or more columns, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

#[derive(Debug)]
enum PrimaryKey {
    Column(usize),
    Missing,
    Ambiguous(Vec<String>),
}

#[derive(Default)]
struct SqlCache {
    create_table: OnceLock<String>,
    insert: OnceLock<String>,
    insert_or_replace: OnceLock<String>,
    update: OnceLock<String>,
    delete: OnceLock<String>,
    find: OnceLock<String>,
    find_by_rowid: OnceLock<String>,
}

/// Immutable schema and accessor description of one record type.
pub struct TableMapping<T: Table> {
    table_name: String,
    flags: CreateFlags,
    columns: Vec<ColumnMapping<T>>,
    by_name: HashMap<String, usize>,
    indexes: Vec<IndexInfo>,
    primary_key: PrimaryKey,
    new_builder: fn() -> T::Builder,
    build: fn(T::Builder) -> Result<T>,
    sql: SqlCache,
}

impl<T: Table> TableMapping<T> {
    /// Resolve a declaration into a mapping.
    ///
    /// Fails on declaration defects: an unsupported field type, two fields
    /// with one column name, or index annotations that disagree on
    /// uniqueness or repeat an order key. A missing or repeated primary key
    /// is only reported once an operation needs the key.
    pub fn build(decl: TableDecl<T>) -> Result<Self> {
        let table_name = decl.name.unwrap_or_else(default_table_name::<T>);
        let flags = decl.flags;

        let mut columns = Vec::new();
        let mut by_name = HashMap::new();
        let mut annotations: Vec<(String, IndexDecl)> = Vec::new();

        for field in decl.fields.into_iter().filter(|f| !f.ignored) {
            let (column, indexes) = resolve_column(&table_name, flags, field)?;
            if by_name.insert(column.name.clone(), columns.len()).is_some() {
                return Err(TesseraError::DuplicateColumn {
                    table: table_name,
                    column: column.name,
                });
            }
            annotations.extend(indexes.into_iter().map(|i| (column.name.clone(), i)));
            columns.push(column);
        }

        let indexes = group_indexes(&table_name, annotations)?;
        let primary_key = find_primary_key(&columns);

        debug!(
            table = %table_name,
            columns = columns.len(),
            indexes = indexes.len(),
            "table mapping built"
        );

        Ok(Self {
            table_name,
            flags,
            columns,
            by_name,
            indexes,
            primary_key,
            new_builder: decl.new_builder,
            build: decl.build,
            sql: SqlCache::default(),
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn create_flags(&self) -> CreateFlags {
        self.flags
    }

    /// Mapped columns in declaration order.
    pub fn columns(&self) -> &[ColumnMapping<T>] {
        &self.columns
    }

    pub fn indexes(&self) -> &[IndexInfo] {
        &self.indexes
    }

    /// Look up a column by exact name, then ignoring ASCII case.
    pub fn column(&self, name: &str) -> Option<&ColumnMapping<T>> {
        self.by_name
            .get(name)
            .map(|&i| &self.columns[i])
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
    }

    /// The primary-key column.
    pub fn primary_key(&self) -> Result<&ColumnMapping<T>> {
        match &self.primary_key {
            PrimaryKey::Column(i) => Ok(&self.columns[*i]),
            PrimaryKey::Missing => Err(TesseraError::MissingPrimaryKey {
                table: self.table_name.clone(),
            }),
            PrimaryKey::Ambiguous(names) => Err(TesseraError::AmbiguousPrimaryKey {
                table: self.table_name.clone(),
                columns: names.join(", "),
            }),
        }
    }

    /// The record's primary-key value.
    pub fn primary_key_value(&self, record: &T) -> Result<SqliteValue> {
        Ok(self.primary_key()?.value_of(record))
    }

    /// Bind every mapped column of `record` to its `:name` parameter.
    ///
    /// Columns the statement has no parameter for are skipped.
    pub fn bind(&self, stmt: &mut Statement<'_>, record: &T) -> Result<()> {
        for column in &self.columns {
            stmt.try_bind_named(&column.param, &column.value_of(record))?;
        }
        Ok(())
    }

    /// Build a record from a result row.
    ///
    /// Result columns without a matching mapped column are ignored; mapped
    /// columns missing from the row keep the builder's initial value.
    pub fn to_object(&self, row: &Row) -> Result<T> {
        let mut builder = (self.new_builder)();
        for (info, value) in row.iter() {
            if let Some(column) = self.column(&info.name) {
                (column.set)(&mut builder, value)?;
            }
        }
        (self.build)(builder)
    }

    fn column_pairs(&self) -> Vec<(&str, &TableColumnMetadata)> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), &c.metadata))
            .collect()
    }

    fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn create_table_sql(&self) -> &str {
        self.sql
            .create_table
            .get_or_init(|| sql::create_table(&self.table_name, &self.column_pairs()))
    }

    pub fn insert_sql(&self) -> &str {
        self.sql
            .insert
            .get_or_init(|| sql::insert(&self.table_name, &self.column_names()))
    }

    pub fn insert_or_replace_sql(&self) -> &str {
        self.sql
            .insert_or_replace
            .get_or_init(|| sql::insert_or_replace(&self.table_name, &self.column_names()))
    }

    pub fn update_sql(&self) -> Result<&str> {
        let pk = self.primary_key()?;
        Ok(self
            .sql
            .update
            .get_or_init(|| sql::update(&self.table_name, &self.column_names(), &pk.name)))
    }

    pub fn delete_sql(&self) -> Result<&str> {
        let pk = self.primary_key()?;
        Ok(self
            .sql
            .delete
            .get_or_init(|| sql::delete_using_primary_key(&self.table_name, &pk.name)))
    }

    pub fn find_sql(&self) -> Result<&str> {
        let pk = self.primary_key()?;
        Ok(self
            .sql
            .find
            .get_or_init(|| sql::select_where_column_equals(&self.table_name, &pk.name)))
    }

    /// Select one row by its rowid, bound as `:rowid`.
    pub fn find_by_rowid_sql(&self) -> &str {
        self.sql
            .find_by_rowid
            .get_or_init(|| sql::select_where_rowid(&self.table_name))
    }
}

impl<T: Table> std::fmt::Debug for TableMapping<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableMapping")
            .field("table_name", &self.table_name)
            .field("flags", &self.flags)
            .field("columns", &self.column_names())
            .field("indexes", &self.indexes)
            .field("primary_key", &self.primary_key)
            .finish_non_exhaustive()
    }
}

/// SQL column type for a value kind; `None` for kinds with no storage class.
pub fn sql_type(kind: ValueKind, max_length: Option<u32>) -> Option<String> {
    let ty = match kind {
        ValueKind::Bool
        | ValueKind::I8
        | ValueKind::U8
        | ValueKind::I16
        | ValueKind::U16
        | ValueKind::I32
        | ValueKind::U32
        | ValueKind::I64
        | ValueKind::Enum => "integer",
        ValueKind::F32 | ValueKind::F64 => "float",
        ValueKind::Text => {
            return Some(
                max_length.map_or_else(|| "varchar".to_owned(), |n| format!("varchar({n})")),
            );
        }
        ValueKind::Duration | ValueKind::SystemTime => "bigint",
        ValueKind::Blob => "blob",
        ValueKind::Uuid => "varchar(36)",
        ValueKind::U64 | ValueKind::Char => return None,
    };
    Some(ty.to_owned())
}

fn default_table_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_owned()
}

fn ends_with_ignore_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

fn resolve_column<T: Table>(
    table: &str,
    flags: CreateFlags,
    field: FieldDecl<T>,
) -> Result<(ColumnMapping<T>, Vec<IndexDecl>)> {
    let name = field
        .column
        .clone()
        .unwrap_or_else(|| field.field_name.to_owned());

    let declared_type =
        sql_type(field.kind, field.max_length).ok_or_else(|| TesseraError::UnsupportedType {
            field: format!("{table}.{}", field.field_name),
            type_name: field.kind.type_name(),
        })?;

    let is_primary_key = field.primary_key
        || (flags.contains(CreateFlags::IMPLICIT_PK)
            && field.field_name.eq_ignore_ascii_case(IMPLICIT_KEY));
    let is_auto = field.auto_increment
        || (is_primary_key && flags.contains(CreateFlags::AUTO_INC_PK));
    // UUID keys are generated by the client, never by the engine.
    let is_auto_increment = is_auto && field.kind != ValueKind::Uuid;
    let is_nullable = !(is_primary_key || field.not_null);

    let mut indexes = field.indexes;
    if indexes.is_empty()
        && !is_primary_key
        && flags.contains(CreateFlags::IMPLICIT_INDEX)
        && ends_with_ignore_case(&name, IMPLICIT_KEY)
    {
        indexes.push(IndexDecl::single(false));
    }

    let metadata = TableColumnMetadata::new(
        declared_type,
        field.collation.unwrap_or_default(),
        is_nullable,
        is_primary_key,
        is_auto_increment,
    );

    let column = ColumnMapping {
        param: format!(":{name}"),
        name,
        field_name: field.field_name,
        kind: field.kind,
        metadata,
        get: field.get,
        set: field.set,
    };
    Ok((column, indexes))
}

/// Group `(column, annotation)` pairs into indexes, in first-seen order.
fn group_indexes(table: &str, annotations: Vec<(String, IndexDecl)>) -> Result<Vec<IndexInfo>> {
    let mut groups: Vec<(String, bool, Vec<(i32, String)>)> = Vec::new();

    for (column, decl) in annotations {
        let index_name = decl
            .name
            .unwrap_or_else(|| sql::name_index(table, &column));

        let position = groups.iter().position(|(name, _, _)| *name == index_name);
        let (_, unique, members) = match position {
            Some(i) => &mut groups[i],
            None => {
                groups.push((index_name.clone(), decl.unique, Vec::new()));
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };

        if *unique != decl.unique {
            return Err(TesseraError::IndexUniqueConflict { index: index_name });
        }
        if members.iter().any(|(order, _)| *order == decl.order) {
            return Err(TesseraError::DuplicateIndexOrder {
                index: index_name,
                order: decl.order,
            });
        }
        members.push((decl.order, column));
    }

    Ok(groups
        .into_iter()
        .map(|(name, unique, mut members)| {
            members.sort_by_key(|(order, _)| *order);
            IndexInfo {
                name,
                unique,
                columns: members.into_iter().map(|(_, column)| column).collect(),
            }
        })
        .collect())
}

fn find_primary_key<T: Table>(columns: &[ColumnMapping<T>]) -> PrimaryKey {
    let keys: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.metadata.is_primary_key)
        .map(|(i, _)| i)
        .collect();
    match keys.as_slice() {
        [] => PrimaryKey::Missing,
        [only] => PrimaryKey::Column(*only),
        many => PrimaryKey::Ambiguous(many.iter().map(|&i| columns[i].name.clone()).collect()),
    }
}
