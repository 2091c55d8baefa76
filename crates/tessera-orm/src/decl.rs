//! Static field-descriptor tables for mapped record types.

use std::sync::Arc;

use tessera_error::Result;
use tessera_types::{ColumnValue, SqliteValue, ValueKind};

use crate::CreateFlags;
use crate::mapping::TableMapping;
use crate::registry;

pub(crate) type Getter<T> = Box<dyn Fn(&T) -> SqliteValue + Send + Sync>;
pub(crate) type Setter<B> = Box<dyn Fn(&mut B, &SqliteValue) -> Result<()> + Send + Sync>;

/// A record type stored as rows of one table.
///
/// Rows are materialized into a fresh [`Table::Builder`], which is then
/// finalized into the record. Mutable records usually use `Self` as the
/// builder (see [`TableDecl::with_default`]).
///
/// ```ignore
/// #[derive(Default)]
/// struct Person { id: Option<i64>, name: String }
///
/// impl Table for Person {
///     type Builder = Self;
///
///     fn declare() -> TableDecl<Self> {
///         TableDecl::with_default()
///             .named("people")
///             .field(
///                 FieldDecl::new("id", |p: &Person| &p.id, |p, v| p.id = v)
///                     .primary_key()
///                     .auto_increment(),
///             )
///             .field(
///                 FieldDecl::new("name", |p: &Person| &p.name, |p, v| p.name = v).max_length(64),
///             )
///     }
/// }
/// ```
pub trait Table: Sized + 'static {
    type Builder: 'static;

    /// The field declarations. Called once per process when the mapping is
    /// first needed; must not itself look up table mappings.
    fn declare() -> TableDecl<Self>;

    /// The cached mapping for this type.
    fn table_mapping() -> Result<Arc<TableMapping<Self>>> {
        registry::table_mapping::<Self>()
    }
}

/// Type-level declaration: table name, schema flags, fields and the
/// builder/finalizer pair.
pub struct TableDecl<T: Table> {
    pub(crate) name: Option<String>,
    pub(crate) flags: CreateFlags,
    pub(crate) fields: Vec<FieldDecl<T>>,
    pub(crate) new_builder: fn() -> T::Builder,
    pub(crate) build: fn(T::Builder) -> Result<T>,
}

impl<T: Table> TableDecl<T> {
    pub fn new(new_builder: fn() -> T::Builder, build: fn(T::Builder) -> Result<T>) -> Self {
        Self {
            name: None,
            flags: CreateFlags::empty(),
            fields: Vec::new(),
            new_builder,
            build,
        }
    }

    /// Override the table name, which otherwise is the type's name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: CreateFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDecl<T>) -> Self {
        self.fields.push(field);
        self
    }
}

impl<T> TableDecl<T>
where
    T: Table<Builder = T> + Default,
{
    /// Declaration for a record that is its own builder.
    pub fn with_default() -> Self {
        Self::new(T::default, Ok)
    }
}

/// One per-column index annotation.
///
/// Annotations sharing a name form one index; unnamed annotations get a name
/// derived from the table and column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDecl {
    pub name: Option<String>,
    pub order: i32,
    pub unique: bool,
}

impl IndexDecl {
    pub const fn single(unique: bool) -> Self {
        Self {
            name: None,
            order: 0,
            unique,
        }
    }

    pub fn named(name: impl Into<String>, order: i32, unique: bool) -> Self {
        Self {
            name: Some(name.into()),
            order,
            unique,
        }
    }
}

/// Declaration of one record field and its column annotations.
pub struct FieldDecl<T: Table> {
    pub(crate) field_name: &'static str,
    pub(crate) kind: ValueKind,
    pub(crate) column: Option<String>,
    pub(crate) primary_key: bool,
    pub(crate) auto_increment: bool,
    pub(crate) not_null: bool,
    pub(crate) max_length: Option<u32>,
    pub(crate) collation: Option<String>,
    pub(crate) indexes: Vec<IndexDecl>,
    pub(crate) ignored: bool,
    pub(crate) get: Getter<T>,
    pub(crate) set: Setter<T::Builder>,
}

impl<T: Table> FieldDecl<T> {
    /// Declare field `field_name` read through `get` and written through `set`.
    ///
    /// The field's SQL type follows from `F`; `Option<F>` has the same type
    /// as `F` and stores `None` as NULL.
    pub fn new<F>(
        field_name: &'static str,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        set: impl Fn(&mut T::Builder, F) + Send + Sync + 'static,
    ) -> Self
    where
        F: ColumnValue + 'static,
    {
        Self {
            field_name,
            kind: F::KIND,
            column: None,
            primary_key: false,
            auto_increment: false,
            not_null: false,
            max_length: None,
            collation: None,
            indexes: Vec::new(),
            ignored: false,
            get: Box::new(move |record: &T| get(record).to_sqlite_value()),
            set: Box::new(move |builder: &mut T::Builder, value: &SqliteValue| {
                set(builder, F::from_sqlite_value(value)?);
                Ok(())
            }),
        }
    }

    /// Store the field under a column name other than the field name.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.column = Some(name.into());
        self
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Declare text columns as `varchar(n)`.
    #[must_use]
    pub fn max_length(mut self, n: u32) -> Self {
        self.max_length = Some(n);
        self
    }

    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Single-column, non-unique index with a derived name.
    #[must_use]
    pub fn indexed(self) -> Self {
        self.index(IndexDecl::single(false))
    }

    /// Member of the named non-unique index at position `order`.
    #[must_use]
    pub fn indexed_as(self, name: impl Into<String>, order: i32) -> Self {
        self.index(IndexDecl::named(name, order, false))
    }

    /// Single-column unique index with a derived name.
    #[must_use]
    pub fn unique(self) -> Self {
        self.index(IndexDecl::single(true))
    }

    /// Member of the named unique index at position `order`.
    #[must_use]
    pub fn unique_as(self, name: impl Into<String>, order: i32) -> Self {
        self.index(IndexDecl::named(name, order, true))
    }

    #[must_use]
    pub fn index(mut self, index: IndexDecl) -> Self {
        self.indexes.push(index);
        self
    }

    /// Leave the field out of the table entirely.
    #[must_use]
    pub fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }
}

impl<T: Table> std::fmt::Debug for FieldDecl<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDecl")
            .field("field_name", &self.field_name)
            .field("kind", &self.kind)
            .field("column", &self.column)
            .field("indexes", &self.indexes)
            .field("ignored", &self.ignored)
            .finish_non_exhaustive()
    }
}
