use std::cell::Cell;
use std::path::{Path, PathBuf};

use tessera_error::{Result, TesseraError};
use tessera_types::{SqliteValue, TableColumnMetadata};
use tracing::debug;

use crate::{ConnectionConfig, Row, Statement, Transaction};

/// A database connection.
///
/// Not shareable across threads; callers serialize access to one connection.
pub struct Connection {
    inner: rusqlite::Connection,
    path: PathBuf,
    savepoint_depth: Cell<u32>,
}

impl Connection {
    /// Open (creating if needed) the database at `path` with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &ConnectionConfig::default())
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let inner = rusqlite::Connection::open_in_memory()?;
        Self::configure(inner, PathBuf::from(":memory:"), &ConnectionConfig::default())
    }

    /// Open the database at `path` with explicit flags and settings.
    pub fn open_with_config(path: impl AsRef<Path>, config: &ConnectionConfig) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(TesseraError::CannotOpen {
                path: path.to_path_buf(),
            });
        }
        let inner = rusqlite::Connection::open_with_flags(path, config.flags.to_engine())?;
        Self::configure(inner, path.to_path_buf(), config)
    }

    fn configure(
        inner: rusqlite::Connection,
        path: PathBuf,
        config: &ConnectionConfig,
    ) -> Result<Self> {
        if let Some(timeout) = config.busy_timeout {
            inner.busy_timeout(timeout)?;
        }
        if config.foreign_keys {
            inner.execute_batch("PRAGMA foreign_keys = ON")?;
        }
        debug!(path = %path.display(), flags = ?config.flags, "connection opened");
        Ok(Self {
            inner,
            path,
            savepoint_depth: Cell::new(0),
        })
    }

    /// Returns the database path this connection was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prepare a single SQL statement.
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        debug!(sql, "prepare");
        Ok(Statement::new(self.inner.prepare(sql)?))
    }

    /// Execute one statement without parameters, returning the rows changed.
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.prepare(sql)?.execute()
    }

    /// Execute one statement with positional parameters.
    pub fn execute_with_params(&self, sql: &str, params: &[SqliteValue]) -> Result<usize> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind_all(params)?;
        stmt.execute()
    }

    /// Execute a semicolon-separated script. Results are discarded.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        Ok(self.inner.execute_batch(sql)?)
    }

    /// Run a query and collect all rows.
    pub fn query(&self, sql: &str) -> Result<Vec<Row>> {
        self.prepare(sql)?.query()
    }

    /// Run a query with positional parameters and collect all rows.
    pub fn query_with_params(&self, sql: &str, params: &[SqliteValue]) -> Result<Vec<Row>> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind_all(params)?;
        stmt.query()
    }

    /// Run a query that must return at least one row; returns the first.
    pub fn query_row(&self, sql: &str) -> Result<Row> {
        self.prepare(sql)?.query_row()
    }

    /// Like [`Connection::query_row`] with positional parameters.
    pub fn query_row_with_params(&self, sql: &str, params: &[SqliteValue]) -> Result<Row> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind_all(params)?;
        stmt.query_row()
    }

    /// Rowid of the most recent successful insert on this connection.
    pub fn last_insert_rowid(&self) -> i64 {
        self.inner.last_insert_rowid()
    }

    /// Rows changed by the most recent INSERT, UPDATE or DELETE.
    pub fn changes(&self) -> Result<i64> {
        self.query_row("SELECT changes()")?.get_typed(0)
    }

    /// Whether no transaction is open.
    pub fn is_autocommit(&self) -> bool {
        self.inner.is_autocommit()
    }

    /// Returns true if a table named `table` exists.
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let rows = self.query_with_params(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            &[SqliteValue::from(table)],
        )?;
        Ok(!rows.is_empty())
    }

    /// Live columns of `table` in declaration order.
    ///
    /// Empty when the table does not exist. The engine's table info does not
    /// report collations, so `collation` is always empty; auto-increment is
    /// read from the key column's clause in the table's stored definition.
    pub fn table_info(&self, table: &str) -> Result<Vec<(String, TableColumnMetadata)>> {
        let pragma = format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\""));
        let rows = self.query(&pragma)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let definition = self
            .query_with_params(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
                &[SqliteValue::from(table)],
            )?
            .first()
            .and_then(|row| row.get(0).and_then(SqliteValue::as_text).map(str::to_owned))
            .unwrap_or_default();

        rows.iter()
            .map(|row| {
                let name: String = row.get_typed_by_name("name")?;
                let declared_type: String = row.get_typed_by_name("type")?;
                let not_null: bool = row.get_typed_by_name("notnull")?;
                let is_primary_key = row.get_typed_by_name::<i64>("pk")? > 0;
                let is_auto_increment =
                    is_primary_key && declares_autoincrement(&definition, &name);
                let meta = TableColumnMetadata::new(
                    declared_type,
                    String::new(),
                    !not_null,
                    is_primary_key,
                    is_auto_increment,
                );
                Ok((name, meta))
            })
            .collect()
    }

    /// Begin a transaction that rolls back when dropped uncommitted.
    ///
    /// Transactions are savepoints, so one may be opened while another is
    /// active; an inner rollback only undoes the inner unit of work.
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        Transaction::begin(self)
    }

    /// Run `f` as one unit of work: commit on `Ok`, roll back on `Err`.
    pub fn run_in_transaction<R>(&self, f: impl FnOnce(&Self) -> Result<R>) -> Result<R> {
        let tx = self.transaction()?;
        let result = f(self)?;
        tx.commit()?;
        Ok(result)
    }

    /// The underlying engine connection.
    pub fn as_engine(&self) -> &rusqlite::Connection {
        &self.inner
    }

    pub(crate) fn push_savepoint(&self) -> u32 {
        let depth = self.savepoint_depth.get() + 1;
        self.savepoint_depth.set(depth);
        depth
    }

    pub(crate) fn pop_savepoint(&self) {
        self.savepoint_depth
            .set(self.savepoint_depth.get().saturating_sub(1));
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.path)
            .field("savepoint_depth", &self.savepoint_depth.get())
            .finish_non_exhaustive()
    }
}

/// Lexical pieces of a stored `CREATE TABLE` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// Keyword or unquoted identifier.
    Word(&'a str),
    /// Quoted identifier, quotes stripped.
    Quoted(&'a str),
    Open,
    Close,
    Comma,
    Other,
}

fn tokenize(sql: &str) -> Vec<Token<'_>> {
    let bytes = sql.as_bytes();
    let is_word_byte = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80;
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'(' => tokens.push(Token::Open),
            b')' => tokens.push(Token::Close),
            b',' => tokens.push(Token::Comma),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = sql[i..].find('\n').map_or(bytes.len(), |n| i + n);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = sql[i + 2..].find("*/").map_or(bytes.len(), |n| i + n + 3);
            }
            b'\'' | b'"' | b'`' | b'[' => {
                let close = if b == b'[' { b']' } else { b };
                let start = i + 1;
                let mut end = start;
                loop {
                    let Some(n) = bytes[end..].iter().position(|&c| c == close) else {
                        end = bytes.len();
                        break;
                    };
                    end += n;
                    // A doubled quote stands for itself.
                    if close != b']' && bytes.get(end + 1) == Some(&close) {
                        end += 2;
                        continue;
                    }
                    break;
                }
                tokens.push(if b == b'\'' {
                    Token::Other
                } else {
                    Token::Quoted(&sql[start..end])
                });
                i = end;
            }
            _ if is_word_byte(b) => {
                let start = i;
                while i + 1 < bytes.len() && is_word_byte(bytes[i + 1]) {
                    i += 1;
                }
                tokens.push(Token::Word(&sql[start..=i]));
            }
            _ if b.is_ascii_whitespace() => {}
            _ => tokens.push(Token::Other),
        }
        i += 1;
    }
    tokens
}

/// Returns true if `definition` declares `column` AUTOINCREMENT, either in the
/// column's own clause or in a `PRIMARY KEY (...)` table constraint.
fn declares_autoincrement(definition: &str, column: &str) -> bool {
    let tokens = tokenize(definition);
    let Some(body) = tokens.iter().position(|t| *t == Token::Open) else {
        return false;
    };

    let mut clauses = vec![Vec::new()];
    let mut depth = 0_u32;
    for &token in &tokens[body + 1..] {
        match token {
            Token::Close if depth == 0 => break,
            Token::Comma if depth == 0 => {
                clauses.push(Vec::new());
                continue;
            }
            Token::Open => depth += 1,
            Token::Close => depth -= 1,
            _ => {}
        }
        if let Some(clause) = clauses.last_mut() {
            clause.push(token);
        }
    }

    let keyword = |token: &Token<'_>, kw: &str| {
        matches!(token, Token::Word(w) if w.eq_ignore_ascii_case(kw))
    };
    let names = |token: &Token<'_>| {
        matches!(token, Token::Word(w) | Token::Quoted(w) if w.eq_ignore_ascii_case(column))
    };
    clauses.iter().any(|clause| {
        if !clause.iter().any(|t| keyword(t, "autoincrement")) {
            return false;
        }
        match clause.first() {
            Some(first) if names(first) => true,
            Some(first) if keyword(first, "primary") || keyword(first, "constraint") => {
                clause.iter().skip(1).any(&names)
            }
            _ => false,
        }
    })
}
