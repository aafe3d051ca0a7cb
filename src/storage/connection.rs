//! Database Connection
//!
//! SQLite connection shared by the local repositories.

use crate::error::Result;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

/// Database connection wrapper
#[derive(Clone)]
pub struct DatabaseConnection {
    conn: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open (or create) the store file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let db = Self::wrap(Connection::open(path)?);
        db.init_schema()?;
        tracing::info!("Opened local store at {}", path.display());
        Ok(db)
    }

    /// Create a new in-memory database connection
    pub fn open_in_memory() -> Result<Self> {
        let db = Self::wrap(Connection::open_in_memory()?);
        db.init_schema()?;
        Ok(db)
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Initialize database schema
    pub fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS ca_certificates (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                certificate TEXT NOT NULL,
                encryption TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS client_certificates (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                certificate TEXT NOT NULL,
                key TEXT NOT NULL,
                encryption TEXT
            )",
            [],
        )?;

        // certificate rows are shared; removing one only detaches it
        conn.execute(
            "CREATE TABLE IF NOT EXISTS databases (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                host TEXT NOT NULL,
                port INTEGER NOT NULL,
                db INTEGER,
                connection_type TEXT NOT NULL,
                username TEXT,
                password TEXT,
                nodes TEXT NOT NULL DEFAULT '[]',
                sentinel_master_name TEXT,
                sentinel_master_username TEXT,
                sentinel_master_password TEXT,
                tls INTEGER NOT NULL DEFAULT 0,
                verify_server_cert INTEGER NOT NULL DEFAULT 0,
                tls_servername TEXT,
                ca_cert_id TEXT REFERENCES ca_certificates(id) ON DELETE SET NULL,
                client_cert_id TEXT REFERENCES client_certificates(id) ON DELETE SET NULL,
                modules TEXT NOT NULL DEFAULT '[]',
                encryption TEXT,
                last_connection TEXT
            )",
            [],
        )?;

        tracing::debug!("Local store schema initialized");
        Ok(())
    }

    /// Run `f` with the locked connection on the current thread
    pub fn with<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        db.init_schema().unwrap();

        let tables: i64 = db
            .with(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_open_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        DatabaseConnection::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = DatabaseConnection::open_in_memory().unwrap();
        let enabled: i64 = db
            .with(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
