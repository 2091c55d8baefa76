//! SQL text for schema and CRUD statements.
//!
//! Identifiers are always double-quoted. Record values are never inlined:
//! every statement binds named parameters `:column`.

use std::fmt::Write;

use tessera_types::TableColumnMetadata;

/// Quote an identifier, doubling embedded quotes.
pub fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Column definition as used by CREATE TABLE and ALTER TABLE.
pub fn column_definition(name: &str, metadata: &TableColumnMetadata) -> String {
    let mut def = format!("{} {}", quote(name), metadata.declared_type);
    if metadata.is_primary_key {
        def.push_str(" primary key");
    }
    if metadata.is_auto_increment {
        def.push_str(" autoincrement");
    }
    if !metadata.is_nullable {
        def.push_str(" not null");
    }
    if !metadata.collation.is_empty() {
        let _ = write!(def, " collate {}", metadata.collation);
    }
    def
}

pub fn create_table(table: &str, columns: &[(&str, &TableColumnMetadata)]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .map(|(name, metadata)| column_definition(name, metadata))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {}({})",
        quote(table),
        defs.join(", ")
    )
}

pub fn alter_table_add_column(table: &str, name: &str, metadata: &TableColumnMetadata) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote(table),
        column_definition(name, metadata)
    )
}

fn insert_with(verb: &str, table: &str, columns: &[&str]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote(c)).collect();
    let params: Vec<String> = columns.iter().map(|c| format!(":{c}")).collect();
    format!(
        "{verb} INTO {} ({}) VALUES ({})",
        quote(table),
        names.join(", "),
        params.join(", ")
    )
}

pub fn insert(table: &str, columns: &[&str]) -> String {
    insert_with("INSERT", table, columns)
}

pub fn insert_or_replace(table: &str, columns: &[&str]) -> String {
    insert_with("INSERT OR REPLACE", table, columns)
}

/// UPDATE every non-key column of the row whose key equals `:primary_key`.
pub fn update(table: &str, columns: &[&str], primary_key: &str) -> String {
    let mut assigned: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|c| *c != primary_key)
        .collect();
    if assigned.is_empty() {
        assigned.push(primary_key);
    }
    let sets: Vec<String> = assigned
        .iter()
        .map(|c| format!("{} = :{c}", quote(c)))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {} = :{primary_key}",
        quote(table),
        sets.join(", "),
        quote(primary_key)
    )
}

pub fn delete_using_primary_key(table: &str, primary_key: &str) -> String {
    format!(
        "DELETE FROM {} WHERE {} = :{primary_key}",
        quote(table),
        quote(primary_key)
    )
}

pub fn select_where_column_equals(table: &str, column: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE {} = :{column}",
        quote(table),
        quote(column)
    )
}

pub fn select_where_rowid(table: &str) -> String {
    format!("SELECT * FROM {} WHERE rowid = :rowid", quote(table))
}

pub fn count(table: &str) -> String {
    format!("SELECT count(*) FROM {}", quote(table))
}

pub fn create_index(name: &str, table: &str, columns: &[String], unique: bool) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote(c)).collect();
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
        if unique { "UNIQUE " } else { "" },
        quote(name),
        quote(table),
        cols.join(", ")
    )
}

/// Deterministic name for an unnamed index on one column.
pub fn name_index(table: &str, column: &str) -> String {
    format!("{table}_{column}")
}
