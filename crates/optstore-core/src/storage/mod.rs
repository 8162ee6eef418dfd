//! Storage layer
//!
//! `OptionsAdapter` is the port the `Options` façade talks to. Every
//! operation returns a `StorageResult` so a missing key (`Ok(None)`), a
//! rejected key and a failing database stay distinguishable; the façade
//! decides to collapse them into defaults.
//!
//! `SqliteAdapter` implements the port against a single `options` table.

pub mod error;
pub mod schema;
pub mod sqlite;

use serde_json::Value;

use crate::models::{expand_keys, normalize_key, OptionRecord, Snapshot, StoredValue};

pub use error::{ErrorKind, StorageError, StorageResult};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteAdapter;

/// Persistence operations behind the `Options` façade
pub trait OptionsAdapter {
    /// Raw stored value for an exact key
    fn read(&self, key: &str) -> StorageResult<Option<String>>;

    /// Full row for an exact key
    fn record(&self, key: &str) -> StorageResult<Option<OptionRecord>>;

    /// Check if a row with this exact key exists
    fn has_option(&self, key: &str) -> StorageResult<bool>;

    /// Insert or update an option
    ///
    /// The key is normalized before it is written. `auto_load` and
    /// `extension` left as `None` keep the existing row's values on update
    /// and default to `false` / no extension on insert.
    fn save_option(
        &mut self,
        key: &str,
        value: &StoredValue,
        auto_load: Option<bool>,
        extension: Option<&str>,
    ) -> StorageResult<()>;

    /// All options flagged for auto-load
    fn load_options(&self) -> StorageResult<Snapshot>;

    /// Flat map of every option whose key starts with `prefix`
    fn find_by_prefix(&self, prefix: &str) -> StorageResult<Snapshot>;

    /// Options owned by an extension
    fn get_extension_options(&self, extension: &str) -> StorageResult<Snapshot>;

    /// Delete options by key, by extension, or by both
    ///
    /// Returns the number of deleted rows.
    fn remove(&mut self, key: Option<&str>, extension: Option<&str>) -> StorageResult<usize>;

    /// Total number of stored options
    fn count(&self) -> StorageResult<usize>;

    /// Create an option, returning `false` if the key is already taken
    fn create_option(
        &mut self,
        key: &str,
        value: &StoredValue,
        auto_load: bool,
        extension: Option<&str>,
    ) -> StorageResult<bool> {
        let key = normalize_key(key)?;
        if self.has_option(&key)? {
            return Ok(false);
        }
        self.save_option(&key, value, Some(auto_load), extension)?;
        Ok(true)
    }

    /// Prefix search expanded into a nested object by dot segments
    fn search_options(&self, search_key: &str) -> StorageResult<Value> {
        Ok(expand_keys(&self.find_by_prefix(search_key)?))
    }
}
