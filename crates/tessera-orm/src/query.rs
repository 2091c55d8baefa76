//! Chainable, immutable SELECT builder over one mapped table.

use std::fmt;
use std::sync::Arc;

use tessera_types::SqliteValue;

use crate::expr::Expr;
use crate::sql::quote;
use crate::{Table, TableMapping};

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub column: String,
    pub descending: bool,
}

/// A query over `T`'s table.
///
/// Every builder method returns a new query and leaves `self` untouched, so
/// a partially built query can serve as the base of several others. Nothing
/// is rendered until [`TableQuery::to_sql`] or execution.
pub struct TableQuery<T: Table> {
    mapping: Arc<TableMapping<T>>,
    selection: Option<Vec<String>>,
    filter: Option<Expr>,
    ordering: Vec<Ordering>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl<T: Table> Clone for TableQuery<T> {
    fn clone(&self) -> Self {
        Self {
            mapping: Arc::clone(&self.mapping),
            selection: self.selection.clone(),
            filter: self.filter.clone(),
            ordering: self.ordering.clone(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

impl<T: Table> TableQuery<T> {
    /// Every row of the mapped table, unordered.
    pub fn new(mapping: Arc<TableMapping<T>>) -> Self {
        Self {
            mapping,
            selection: None,
            filter: None,
            ordering: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn mapping(&self) -> &Arc<TableMapping<T>> {
        &self.mapping
    }

    /// Restrict the selected columns. Unselected fields keep the record
    /// builder's initial value when materialized.
    #[must_use]
    pub fn select<S: Into<String>>(&self, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            selection: Some(columns.into_iter().map(Into::into).collect()),
            ..self.clone()
        }
    }

    /// Add a predicate, AND-combined with any existing filter.
    #[must_use]
    pub fn filter(&self, predicate: Expr) -> Self {
        let filter = match &self.filter {
            Some(existing) => existing.clone().and(predicate),
            None => predicate,
        };
        Self {
            filter: Some(filter),
            ..self.clone()
        }
    }

    /// Sort ascending by `column`, discarding any earlier ordering.
    #[must_use]
    pub fn order_by(&self, column: impl Into<String>) -> Self {
        self.restart_ordering(column.into(), false)
    }

    #[must_use]
    pub fn order_by_descending(&self, column: impl Into<String>) -> Self {
        self.restart_ordering(column.into(), true)
    }

    /// Add a secondary ascending sort key.
    #[must_use]
    pub fn then_by(&self, column: impl Into<String>) -> Self {
        self.append_ordering(column.into(), false)
    }

    #[must_use]
    pub fn then_by_descending(&self, column: impl Into<String>) -> Self {
        self.append_ordering(column.into(), true)
    }

    /// Return at most `n` rows. A later call replaces an earlier one.
    #[must_use]
    pub fn take(&self, n: i64) -> Self {
        Self {
            limit: Some(n),
            ..self.clone()
        }
    }

    /// Skip the first `n` rows. A later call replaces an earlier one.
    #[must_use]
    pub fn skip(&self, n: i64) -> Self {
        Self {
            offset: Some(n),
            ..self.clone()
        }
    }

    /// Only the row at zero-based position `index`.
    #[must_use]
    pub fn element_at(&self, index: i64) -> Self {
        self.skip(index).take(1)
    }

    pub fn ordering(&self) -> &[Ordering] {
        &self.ordering
    }

    /// The SELECT text, with `?` placeholders for filter values.
    pub fn to_sql(&self) -> String {
        self.render().0
    }

    /// Values bound to the placeholders of [`TableQuery::to_sql`], in order.
    pub fn params(&self) -> Vec<SqliteValue> {
        self.render().1
    }

    pub(crate) fn render(&self) -> (String, Vec<SqliteValue>) {
        let columns = self.selection.as_ref().map_or_else(
            || "*".to_owned(),
            |names| names.iter().map(|n| quote(n)).collect::<Vec<_>>().join(", "),
        );
        let mut sql = format!("SELECT {columns} FROM {}", quote(self.mapping.table_name()));
        let mut params = Vec::new();

        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            filter.render_into(&mut sql, &mut params);
        }

        if !self.ordering.is_empty() {
            let keys: Vec<String> = self
                .ordering
                .iter()
                .map(|o| {
                    let dir = if o.descending { "DESC" } else { "ASC" };
                    format!("{} {dir}", quote(&o.column))
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        // The engine only accepts OFFSET after a LIMIT; -1 means unbounded.
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        (sql, params)
    }

    fn restart_ordering(&self, column: String, descending: bool) -> Self {
        Self {
            ordering: vec![Ordering { column, descending }],
            ..self.clone()
        }
    }

    fn append_ordering(&self, column: String, descending: bool) -> Self {
        let mut ordering = self.ordering.clone();
        ordering.push(Ordering { column, descending });
        Self {
            ordering,
            ..self.clone()
        }
    }
}

impl<T: Table> fmt::Display for TableQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

impl<T: Table> fmt::Debug for TableQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableQuery")
            .field("table", &self.mapping.table_name())
            .field("selection", &self.selection)
            .field("filter", &self.filter)
            .field("ordering", &self.ordering)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}
