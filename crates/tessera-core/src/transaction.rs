//! RAII transactions: auto-rollback on drop unless explicitly committed.

use std::ops::Deref;

use tessera_error::Result;
use tracing::debug;

use crate::Connection;

/// One unit of work on a connection, backed by a named savepoint.
///
/// ```ignore
/// let tx = conn.transaction()?;
/// tx.execute("INSERT INTO users (name) VALUES ('alice')")?;
/// tx.commit()?; // Without this, the insert is rolled back on drop.
/// ```
pub struct Transaction<'a> {
    conn: &'a Connection,
    name: String,
    finished: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(conn: &'a Connection) -> Result<Self> {
        let depth = conn.push_savepoint();
        let name = format!("tessera_sp_{depth}");
        if let Err(err) = conn.execute_batch(&format!("SAVEPOINT {name}")) {
            conn.pop_savepoint();
            return Err(err);
        }
        debug!(savepoint = %name, "transaction begin");
        Ok(Self {
            conn,
            name,
            finished: false,
        })
    }

    /// Commit the unit of work.
    ///
    /// If the engine refuses the release, for example on a deferred
    /// constraint, the guard is dropped unfinished and rolls the work back.
    pub fn commit(mut self) -> Result<()> {
        self.conn.execute_batch(&format!("RELEASE {}", self.name))?;
        self.finished = true;
        self.conn.pop_savepoint();
        debug!(savepoint = %self.name, "transaction commit");
        Ok(())
    }

    /// Roll back the unit of work explicitly.
    pub fn rollback(mut self) -> Result<()> {
        self.conn.execute_batch(&self.rollback_sql())?;
        self.finished = true;
        self.conn.pop_savepoint();
        debug!(savepoint = %self.name, "transaction rollback");
        Ok(())
    }

    fn rollback_sql(&self) -> String {
        format!("ROLLBACK TO {0}; RELEASE {0}", self.name)
    }
}

impl Deref for Transaction<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.conn.pop_savepoint();
            // Best-effort rollback; errors cannot be reported from drop.
            let _ = self.conn.execute_batch(&self.rollback_sql());
            debug!(savepoint = %self.name, "transaction rolled back on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use tessera_error::TesseraError;

    use super::*;

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT count(*) FROM t")
            .unwrap()
            .get_typed(0)
            .unwrap()
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (a integer)").unwrap();
        conn
    }

    #[test]
    fn commit_persists() {
        let conn = setup();
        let tx = conn.transaction().unwrap();
        tx.execute("INSERT INTO t VALUES (1)").unwrap();
        tx.commit().unwrap();
        assert_eq!(count(&conn), 1);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn drop_rolls_back() {
        let conn = setup();
        {
            let tx = conn.transaction().unwrap();
            tx.execute("INSERT INTO t VALUES (1)").unwrap();
        }
        assert_eq!(count(&conn), 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn explicit_rollback() {
        let conn = setup();
        let tx = conn.transaction().unwrap();
        tx.execute("INSERT INTO t VALUES (1)").unwrap();
        tx.rollback().unwrap();
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn nested_inner_rollback_keeps_outer_work() {
        let conn = setup();
        let outer = conn.transaction().unwrap();
        outer.execute("INSERT INTO t VALUES (1)").unwrap();
        {
            let inner = conn.transaction().unwrap();
            inner.execute("INSERT INTO t VALUES (2)").unwrap();
        }
        outer.commit().unwrap();
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn run_in_transaction_rolls_back_on_error() {
        let conn = setup();
        let result: Result<()> = conn.run_in_transaction(|c| {
            c.execute("INSERT INTO t VALUES (1)")?;
            Err(TesseraError::internal("abort"))
        });
        assert!(result.is_err());
        assert_eq!(count(&conn), 0);

        let value = conn
            .run_in_transaction(|c| {
                c.execute("INSERT INTO t VALUES (5)")?;
                Ok(42)
            })
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(count(&conn), 1);
    }

    fn setup_deferred_fk(conn: &Connection) {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id integer primary key);
             CREATE TABLE child (
                 id integer primary key,
                 parent_id integer REFERENCES parent(id) DEFERRABLE INITIALLY DEFERRED
             );",
        )
        .unwrap();
    }

    fn rows(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT count(*) FROM {table}"))
            .unwrap()
            .get_typed(0)
            .unwrap()
    }

    #[test]
    fn failed_commit_rolls_back_and_resets_depth() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fk.db");
        {
            let conn = Connection::open(&path).unwrap();
            setup_deferred_fk(&conn);

            let orphan = conn.run_in_transaction(|c| {
                c.execute("INSERT INTO child (parent_id) VALUES (99)")?;
                Ok(())
            });
            let err = orphan.unwrap_err();
            assert_eq!(err.error_code(), tessera_error::ErrorCode::Constraint);
            assert!(conn.is_autocommit());
            assert_eq!(rows(&conn, "child"), 0);

            conn.run_in_transaction(|c| {
                c.execute("INSERT INTO parent (id) VALUES (1)")?;
                Ok(())
            })
            .unwrap();
            assert!(conn.is_autocommit());
        }

        let reopened = Connection::open(&path).unwrap();
        assert_eq!(rows(&reopened, "parent"), 1);
        assert_eq!(rows(&reopened, "child"), 0);
    }

    #[test]
    fn failed_inner_commit_keeps_outer_usable() {
        let conn = Connection::open_in_memory().unwrap();
        setup_deferred_fk(&conn);

        let outer = conn.transaction().unwrap();
        outer.execute("INSERT INTO parent (id) VALUES (1)").unwrap();
        let inner = conn.transaction().unwrap();
        inner
            .execute("INSERT INTO child (parent_id) VALUES (2)")
            .unwrap();
        // Deferred checks only run when the outermost savepoint is released.
        inner.commit().unwrap();
        assert!(outer.commit().is_err());

        assert!(conn.is_autocommit());
        assert_eq!(rows(&conn, "parent"), 0);
        assert_eq!(rows(&conn, "child"), 0);
    }
}
