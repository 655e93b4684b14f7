use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::medium::KeyValueMedium;
use super::StoreError;

/// SQLite-backed key-value medium.
pub struct SqliteMedium {
    conn: Mutex<Connection>,
}

impl SqliteMedium {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::IoError(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        ).map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        tracing::info!("Record store initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KeyValueMedium for SqliteMedium {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.query_row(
            "SELECT value FROM kv WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        ).map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        tracing::debug!("Stored key: {}", key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        tracing::debug!("Removed key: {}", key);
        Ok(())
    }
}
