use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::{Connection, Transaction};
use tracing::{info, warn};

use super::schema;
use crate::error::Result;

/// How long a statement waits on a locked database file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// The process-wide store handle: one SQLite connection behind a mutex.
///
/// Every repository call goes through [`Database::read`] or
/// [`Database::write`], so at most one operation touches the connection at a
/// time. `init` and `recreate` hold the lock for their whole run, which keeps
/// a destructive reset from interleaving with any other writer.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (creating if needed) the database file at `path`. The schema is
    /// not touched; call [`Database::init`] afterwards.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        info!("Opened songbook database at {}", path.display());
        Self::from_connection(conn)
    }

    /// In-memory store, used by tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create every table and update trigger that does not exist yet, in a
    /// single transaction.
    pub fn init(&self) -> Result<()> {
        let mut conn = self.lock()?;
        conn.pragma_update(None, "foreign_keys", true)?;

        let tx = conn.transaction()?;
        schema::create_all(&tx)?;
        tx.commit()?;

        info!("Songbook schema is ready");
        Ok(())
    }

    /// Drop all tables and triggers and create them again. Every row is lost.
    pub fn recreate(&self) -> Result<()> {
        let mut conn = self.lock()?;

        let tx = conn.transaction()?;
        schema::drop_all(&tx)?;
        schema::create_all(&tx)?;
        tx.commit()?;

        info!("Songbook schema recreated, all data removed");
        Ok(())
    }

    /// Run read-only work against the connection.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&*conn)
    }

    /// Run `f` inside one transaction. It commits when `f` returns `Ok` and
    /// rolls back when `f` fails or panics.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// A closure that panicked left no open transaction behind (it rolled
    /// back on drop), so a poisoned lock is safe to take over.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("Recovering database connection after a panicked operation");
            self.conn.clear_poison();
            PoisonError::into_inner(poisoned)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use tempfile::TempDir;

    #[test]
    fn open_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("songbook.sqlite");

        let db = Database::open(&path).unwrap();
        db.init().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn write_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();

        let result: Result<()> = db.write(|tx| {
            tx.execute(
                "INSERT INTO song (name, unaccented_name) VALUES ('a', 'a')",
                [],
            )?;
            Err(Error::EmptyName("song"))
        });
        assert!(result.is_err());

        let count: i64 = db
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM song", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();

        let result = db.write(|tx| {
            Ok(tx.execute(
                "INSERT INTO sheet (song_id, title, content) VALUES (42, 't', 'c')",
                [],
            )?)
        });
        assert!(matches!(result, Err(Error::Db(_))));
    }

    #[test]
    fn panic_inside_write_rolls_back_and_keeps_handle_usable() {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            db.write(|tx| -> Result<()> {
                tx.execute(
                    "INSERT INTO song (name, unaccented_name) VALUES ('a', 'a')",
                    [],
                )?;
                panic!("boom");
            })
        }));
        assert!(outcome.is_err());

        let count: i64 = db
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM song", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
        db.write(|tx| {
            tx.execute(
                "INSERT INTO song (name, unaccented_name) VALUES ('b', 'b')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
    }
}
