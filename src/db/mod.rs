//! Database layer for the Task Manager API.

pub mod tasks;

use crate::validation::ValidationErrors;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Errors raised by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task not found")]
    NotFound,
    /// The unique index on `title_hash` rejected the write.
    #[error("duplicate key on title hash")]
    DuplicateKey,
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("migration error: {0}")]
    Migration(#[from] refinery::Error),
    #[error("database connection lock poisoned")]
    Poisoned,
    #[error("invalid database url: {0}")]
    InvalidUrl(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationErrors> for StoreError {
    fn from(errors: ValidationErrors) -> Self {
        StoreError::Validation(errors)
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Where a database URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

impl DatabaseLocation {
    /// Parse `sqlite::memory:`, `:memory:`, `sqlite://<path>`, `sqlite:<path>`
    /// or a bare path.
    pub fn parse(url: &str) -> StoreResult<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(StoreError::InvalidUrl("empty database url".to_string()));
        }
        if url == ":memory:" || url == "sqlite::memory:" || url == "sqlite://:memory:" {
            return Ok(Self::Memory);
        }

        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        // Drop connection options such as `?mode=rwc`.
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() {
            return Err(StoreError::InvalidUrl(url.to_string()));
        }
        if url.contains("://") && !url.starts_with("sqlite://") {
            return Err(StoreError::InvalidUrl(format!(
                "unsupported scheme in '{}'",
                url
            )));
        }
        Ok(Self::File(PathBuf::from(path)))
    }
}

/// Database handle wrapping a SQLite connection.
///
/// Constructed once at startup and shared through the HTTP state; call
/// [`Database::close`] on shutdown.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Connect using a database URL (see [`DatabaseLocation::parse`]).
    pub fn connect(url: &str) -> StoreResult<Self> {
        match DatabaseLocation::parse(url)? {
            DatabaseLocation::Memory => Self::open_in_memory(),
            DatabaseLocation::File(path) => Self::open(path),
        }
    }

    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent access
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;",
        )?;

        let db = Self::from_connection(conn)?;
        info!(path = %path.display(), "Database opened");
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self::from_connection(conn)?;
        debug!("In-memory database opened");
        Ok(db)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        db.ping()?;
        Ok(db)
    }

    /// Run database migrations.
    fn run_migrations(&self) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let report = embedded::migrations::runner().run(&mut *conn)?;
        for migration in report.applied_migrations() {
            debug!(name = migration.name(), "Applied migration");
        }
        Ok(())
    }

    /// Round-trip a trivial query to confirm the connection works.
    pub fn ping(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }

    /// Close the connection. If other handles are still alive the
    /// connection stays open until the last one is dropped.
    pub fn close(self) -> StoreResult<()> {
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => {
                let conn = mutex.into_inner().map_err(|_| StoreError::Poisoned)?;
                conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
                info!("Database closed");
                Ok(())
            }
            Err(_) => {
                debug!("Database still shared; deferring close to last handle");
                Ok(())
            }
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Execute a function with mutable access to the connection (for transactions).
    pub fn with_conn_mut<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }
}

/// Get the current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// True when a SQLite error came from a UNIQUE constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_urls() {
        for url in [":memory:", "sqlite::memory:", "sqlite://:memory:"] {
            assert_eq!(DatabaseLocation::parse(url).unwrap(), DatabaseLocation::Memory);
        }
    }

    #[test]
    fn test_parse_file_urls() {
        assert_eq!(
            DatabaseLocation::parse("sqlite://data/tasks.db?mode=rwc").unwrap(),
            DatabaseLocation::File(PathBuf::from("data/tasks.db"))
        );
        assert_eq!(
            DatabaseLocation::parse("sqlite:tasks.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("tasks.db"))
        );
        assert_eq!(
            DatabaseLocation::parse("/var/lib/tasks.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("/var/lib/tasks.db"))
        );
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(DatabaseLocation::parse("").is_err());
        assert!(DatabaseLocation::parse("mongodb://localhost:27017/tasks").is_err());
        assert!(DatabaseLocation::parse("sqlite://").is_err());
    }

    #[test]
    fn test_open_in_memory_and_close() {
        let db = Database::open_in_memory().unwrap();
        db.ping().unwrap();
        db.close().unwrap();
    }
}
