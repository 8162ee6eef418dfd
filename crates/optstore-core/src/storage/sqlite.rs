//! SQLite options adapter
//!
//! Implements `OptionsAdapter` against the `options` table created by
//! `schema::init_schema`.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Params};
use tracing::debug;

use crate::config::Config;
use crate::models::{normalize_key, OptionRecord, Snapshot, StoredValue};
use crate::storage::schema::{init_schema, needs_init};
use crate::storage::{OptionsAdapter, StorageError, StorageResult};

/// `OptionsAdapter` backed by a SQLite database
pub struct SqliteAdapter {
    conn: Connection,
}

impl SqliteAdapter {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened options database");
        Self::from_connection(conn)
    }

    /// Open the database configured in `config`
    pub fn open_with_config(config: &Config) -> StorageResult<Self> {
        Self::open(&config.sqlite_path())
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn query_snapshot<P: Params>(&self, sql: &str, params: P) -> StorageResult<Snapshot> {
        let mut stmt = self.conn.prepare(sql)?;
        let snapshot = stmt
            .query_map(params, |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Snapshot>>()?;
        Ok(snapshot)
    }
}

impl OptionsAdapter for SqliteAdapter {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM options WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn record(&self, key: &str) -> StorageResult<Option<OptionRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT key, value, auto_load, extension FROM options WHERE key = ?",
                params![key],
                |row| {
                    Ok(OptionRecord {
                        key: row.get(0)?,
                        value: row.get(1)?,
                        auto_load: row.get(2)?,
                        extension: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn has_option(&self, key: &str) -> StorageResult<bool> {
        let exists = self
            .conn
            .prepare("SELECT 1 FROM options WHERE key = ?")?
            .exists(params![key])?;
        Ok(exists)
    }

    fn save_option(
        &mut self,
        key: &str,
        value: &StoredValue,
        auto_load: Option<bool>,
        extension: Option<&str>,
    ) -> StorageResult<()> {
        let key = normalize_key(key)?;
        let value = value.to_storage_text()?;
        let extension = extension.map(str::trim).filter(|e| !e.is_empty());

        self.conn.execute(
            r#"
            INSERT INTO options (key, value, auto_load, extension)
            VALUES (?1, ?2, COALESCE(?3, 0), ?4)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                auto_load = COALESCE(?3, options.auto_load),
                extension = COALESCE(?4, options.extension)
            "#,
            params![key, value, auto_load, extension],
        )?;

        debug!(key = %key, "saved option");
        Ok(())
    }

    fn load_options(&self) -> StorageResult<Snapshot> {
        self.query_snapshot(
            "SELECT key, value FROM options WHERE auto_load = 1 ORDER BY key",
            [],
        )
    }

    fn find_by_prefix(&self, prefix: &str) -> StorageResult<Snapshot> {
        // substr keeps the match case-sensitive and free of LIKE wildcards
        self.query_snapshot(
            "SELECT key, value FROM options WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
            params![prefix],
        )
    }

    fn get_extension_options(&self, extension: &str) -> StorageResult<Snapshot> {
        self.query_snapshot(
            "SELECT key, value FROM options WHERE extension = ? ORDER BY key",
            params![extension],
        )
    }

    fn remove(&mut self, key: Option<&str>, extension: Option<&str>) -> StorageResult<usize> {
        let key = key.and_then(|k| normalize_key(k).ok());
        let extension = extension.map(str::trim).filter(|e| !e.is_empty());

        let deleted = match (key.as_deref(), extension) {
            (Some(key), Some(extension)) => self.conn.execute(
                "DELETE FROM options WHERE key = ? AND extension = ?",
                params![key, extension],
            )?,
            (Some(key), None) => self
                .conn
                .execute("DELETE FROM options WHERE key = ?", params![key])?,
            (None, Some(extension)) => self
                .conn
                .execute("DELETE FROM options WHERE extension = ?", params![extension])?,
            (None, None) => return Err(StorageError::MissingFilter),
        };

        debug!(deleted, "removed options");
        Ok(deleted)
    }

    fn count(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM options", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
