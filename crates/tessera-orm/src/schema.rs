//! Table creation and additive migration.

use tessera_core::Connection;
use tessera_error::Result;
use tessera_types::TableColumnMetadata;
use tracing::debug;

use crate::sql;
use crate::{Table, TableMapping};

/// Outcome of [`init_table`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitTableResult {
    /// The table did not exist and was created.
    pub was_created: bool,
    /// Columns added to an existing table, in declaration order.
    pub added_columns: Vec<String>,
}

/// Create `T`'s table, or add any declared columns it lacks, then create its
/// indexes. Runs as one unit of work.
///
/// Migration only ever adds columns. Existing columns are matched ignoring
/// ASCII case and are never retyped or dropped.
pub fn init_table<T: Table>(conn: &Connection) -> Result<InitTableResult> {
    let mapping = T::table_mapping()?;
    conn.run_in_transaction(|db| {
        let live = db.table_info(mapping.table_name())?;
        let result = if live.is_empty() {
            db.execute(mapping.create_table_sql())?;
            InitTableResult {
                was_created: true,
                added_columns: Vec::new(),
            }
        } else {
            migrate_table(db, &mapping, &live)?
        };

        for index in mapping.indexes() {
            db.execute(&sql::create_index(
                &index.name,
                mapping.table_name(),
                &index.columns,
                index.unique,
            ))?;
            debug!(index = %index.name, unique = index.unique, "index ensured");
        }

        debug!(
            table = mapping.table_name(),
            created = result.was_created,
            added = ?result.added_columns,
            "table initialized"
        );
        Ok(result)
    })
}

fn migrate_table<T: Table>(
    db: &Connection,
    mapping: &TableMapping<T>,
    live: &[(String, TableColumnMetadata)],
) -> Result<InitTableResult> {
    let missing: Vec<_> = mapping
        .columns()
        .iter()
        .filter(|column| {
            !live
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case(column.name()))
        })
        .collect();

    let mut added_columns = Vec::with_capacity(missing.len());
    for column in missing {
        db.execute(&sql::alter_table_add_column(
            mapping.table_name(),
            column.name(),
            column.metadata(),
        ))?;
        added_columns.push(column.name().to_owned());
    }

    Ok(InitTableResult {
        was_created: false,
        added_columns,
    })
}
