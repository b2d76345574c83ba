//! The universe file: creation, exclusive opening and the connection handle.
//!
//! A universe is a single `SQLite` file owned by exactly one writer. Both
//! [`UniverseDb::create`] and [`UniverseDb::open`] switch the connection
//! to `locking_mode = EXCLUSIVE` and immediately take the write lock, so
//! a second handle on the same file fails fast with [`DbError::Locked`]
//! instead of interleaving writes.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, ErrorCode, OpenFlags, Transaction, TransactionBehavior};

use crate::error::DbError;
use crate::schema::{APPLICATION_ID, FORMAT_VERSION, SCHEMA};

/// Options applied when creating or opening a universe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseConfig {
    /// How long to wait for a competing lock before giving up.
    pub busy_timeout: Duration,
    /// Run `pragma quick_check` when opening an existing universe.
    pub quick_check: bool,
}

impl UniverseConfig {
    /// Default options: fail immediately on contention, check on open.
    pub const fn new() -> Self {
        Self {
            busy_timeout: Duration::ZERO,
            quick_check: true,
        }
    }

    /// Set the busy timeout.
    #[must_use]
    pub const fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enable or disable the integrity check on open.
    #[must_use]
    pub const fn with_quick_check(mut self, quick_check: bool) -> Self {
        self.quick_check = quick_check;
        self
    }
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive connection handle to a universe file.
///
/// The connection lives behind a mutex so that the handle can be shared
/// (`Arc`) with the objects that write through it. [`UniverseDb::close`]
/// drops the connection; every later operation fails with
/// [`DbError::Closed`].
#[derive(Debug)]
pub struct UniverseDb {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl UniverseDb {
    /// Create a new, empty universe. Fails if `path` already exists.
    pub fn create(path: &Path, config: &UniverseConfig) -> Result<Self, DbError> {
        if path.exists() {
            return Err(DbError::AlreadyExists {
                path: path.to_owned(),
            });
        }

        let mut conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        acquire_exclusive(&conn, path, config)?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.pragma_update(None, "application_id", APPLICATION_ID)?;
        tx.pragma_update(None, "user_version", FORMAT_VERSION)?;
        tx.execute_batch(SCHEMA)?;
        tx.commit()?;

        tracing::info!(path = %path.display(), "Created universe");

        Ok(Self {
            path: path.to_owned(),
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Open an existing universe, verifying its header.
    pub fn open(path: &Path, config: &UniverseConfig) -> Result<Self, DbError> {
        if !path.exists() {
            return Err(DbError::Missing {
                path: path.to_owned(),
            });
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        acquire_exclusive(&conn, path, config)?;

        let invalid = |reason: String| DbError::InvalidUniverse {
            path: path.to_owned(),
            reason,
        };

        let application_id: i64 =
            conn.pragma_query_value(None, "application_id", |row| row.get(0))?;
        if application_id != APPLICATION_ID {
            return Err(invalid(format!("unexpected application id {application_id:#x}")));
        }

        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version != FORMAT_VERSION {
            return Err(invalid(format!("unsupported format version {version}")));
        }

        if config.quick_check {
            let status: String = conn.pragma_query_value(None, "quick_check", |row| row.get(0))?;
            if status != "ok" {
                return Err(invalid(format!("integrity check failed: {status}")));
            }
        }

        tracing::info!(path = %path.display(), "Opened universe");

        Ok(Self {
            path: path.to_owned(),
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Path of the universe file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`UniverseDb::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Release the connection and its lock. Returns `false` if the handle
    /// was already closed.
    pub fn close(&self) -> bool {
        let Some(conn) = self.lock().take() else {
            return false;
        };
        if let Err((_conn, err)) = conn.close() {
            tracing::warn!(path = %self.path.display(), error = %err, "Universe closed uncleanly");
        }
        tracing::info!(path = %self.path.display(), "Closed universe");
        true
    }

    /// Run `f` on the open connection.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(DbError::Closed)?;
        f(conn)
    }

    /// Run `f` inside an immediate transaction, committing on success.
    pub(crate) fn immediate<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let mut guard = self.lock();
        let conn = guard.as_mut().ok_or(DbError::Closed)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(path = %self.path.display(), "Recovered poisoned universe lock");
            poisoned.into_inner()
        })
    }
}

impl Drop for UniverseDb {
    fn drop(&mut self) {
        self.close();
    }
}

fn acquire_exclusive(conn: &Connection, path: &Path, config: &UniverseConfig) -> Result<(), DbError> {
    conn.busy_timeout(config.busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    let _mode: String =
        conn.pragma_update_and_check(None, "locking_mode", "EXCLUSIVE", |row| row.get(0))?;
    conn.execute_batch("begin exclusive; commit;").map_err(|err| {
        if err.sqlite_error_code() == Some(ErrorCode::DatabaseBusy) {
            DbError::Locked {
                path: path.to_owned(),
            }
        } else {
            DbError::Sqlite(err)
        }
    })
}

/// Current time as Unix seconds.
pub(crate) fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn create_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.darwin");
        let db = UniverseDb::create(&path, &UniverseConfig::new()).unwrap();
        assert!(db.close());
        assert!(!db.close());
        assert!(db.is_closed());

        let reopened = UniverseDb::open(&path, &UniverseConfig::new()).unwrap();
        assert_eq!(reopened.path(), path);
    }

    #[test]
    fn create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.darwin");
        drop(UniverseDb::create(&path, &UniverseConfig::new()).unwrap());
        assert!(matches!(
            UniverseDb::create(&path, &UniverseConfig::new()),
            Err(DbError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn open_refuses_missing_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.darwin");
        assert!(matches!(
            UniverseDb::open(&missing, &UniverseConfig::new()),
            Err(DbError::Missing { .. })
        ));

        let foreign = dir.path().join("foreign.db");
        Connection::open(&foreign)
            .unwrap()
            .execute_batch("create table t(x int);")
            .unwrap();
        assert!(matches!(
            UniverseDb::open(&foreign, &UniverseConfig::new()),
            Err(DbError::InvalidUniverse { .. })
        ));
    }

    #[test]
    fn second_writer_is_locked_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.darwin");
        let first = UniverseDb::create(&path, &UniverseConfig::new()).unwrap();
        assert!(matches!(
            UniverseDb::open(&path, &UniverseConfig::new()),
            Err(DbError::Locked { .. })
        ));
        first.close();
        assert!(UniverseDb::open(&path, &UniverseConfig::new()).is_ok());
    }

    #[test]
    fn closed_handle_rejects_work() {
        let dir = tempfile::tempdir().unwrap();
        let db = UniverseDb::create(&dir.path().join("u.darwin"), &UniverseConfig::new()).unwrap();
        db.close();
        assert!(matches!(db.with_conn(|_| Ok(())), Err(DbError::Closed)));
    }
}
