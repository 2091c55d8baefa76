//! Descriptors for result columns and table columns.

/// Identity of one result column of a prepared statement.
///
/// The origin fields are set only when the column reads a table column
/// directly; expressions and literals have none. Ordering is lexicographic
/// over the fields in declaration order, name first.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ColumnInfo {
    /// The column's display name (`AS` alias or source column name).
    pub name: String,
    /// Schema the source table lives in, e.g. `main`.
    pub database_name: Option<String>,
    /// Table the column is read from.
    pub table_name: Option<String>,
    /// Name of the source column in its table, ignoring any alias.
    pub origin_name: Option<String>,
    /// Declared type of the source column, if the column is a table column.
    pub declared_type: Option<String>,
}

impl ColumnInfo {
    /// A column with no known origin.
    pub fn new(name: impl Into<String>, declared_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            database_name: None,
            table_name: None,
            origin_name: None,
            declared_type,
        }
    }

    #[must_use]
    pub fn with_origin(
        mut self,
        database_name: Option<String>,
        table_name: Option<String>,
        origin_name: Option<String>,
    ) -> Self {
        self.database_name = database_name;
        self.table_name = table_name;
        self.origin_name = origin_name;
        self
    }
}

/// Schema facts for one table column.
///
/// Equality and ordering are lexicographic over the fields in declaration
/// order, which migration uses when diffing declared and live schemas.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct TableColumnMetadata {
    pub declared_type: String,
    pub collation: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
}

impl TableColumnMetadata {
    pub fn new(
        declared_type: impl Into<String>,
        collation: impl Into<String>,
        is_nullable: bool,
        is_primary_key: bool,
        is_auto_increment: bool,
    ) -> Self {
        Self {
            declared_type: declared_type.into(),
            collation: collation.into(),
            is_nullable,
            is_primary_key,
            is_auto_increment,
        }
    }
}
