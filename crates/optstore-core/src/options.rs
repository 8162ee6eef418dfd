//! Options façade
//!
//! `Options` is what application code talks to. It keeps an in-memory map of
//! options it has already seen, fills it lazily from the cached auto-load
//! snapshot (or the adapter on a cache miss), and runs every value it hands
//! out through type resolution.
//!
//! ## States
//!
//! - **Stale** (initial, and after any removal): the next `get` or
//!   `to_array` calls `load()` first.
//! - **Fresh**: the map holds the auto-load snapshot plus whatever was read
//!   or written since.
//!
//! Adapter failures never reach the caller. They are logged and turned into
//! the default value, `false`, or an empty result.
//!
//! ## Usage
//!
//! ```ignore
//! let mut options = Options::open()?;
//!
//! options.create_option("site.name", "Demo", true, None);
//! let name = options.get("site.name", "Untitled");
//! ```

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::cache::{MemoryCache, OptionsCache};
use crate::config::{Config, DEFAULT_CACHE_TTL_SECS};
use crate::models::{normalize_key, OptionRecord, Snapshot, StoredValue};
use crate::resolve::{resolve, resolve_text, resolve_value};
use crate::storage::{OptionsAdapter, SqliteAdapter};

/// Cache entry name of the auto-load snapshot
pub const OPTIONS_CACHE_KEY: &str = "options";

/// Cached, type-resolving view over an `OptionsAdapter`
pub struct Options {
    adapter: Box<dyn OptionsAdapter>,
    cache: Option<Arc<dyn OptionsCache>>,
    cache_ttl: Duration,
    data: BTreeMap<String, StoredValue>,
    needs_reload: bool,
}

impl Options {
    /// Create a store over `adapter` with no cache
    pub fn new(adapter: impl OptionsAdapter + 'static) -> Self {
        Self {
            adapter: Box::new(adapter),
            cache: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            data: BTreeMap::new(),
            needs_reload: true,
        }
    }

    /// Memoize the auto-load snapshot in `cache`
    pub fn with_cache(mut self, cache: Arc<dyn OptionsCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Lifetime of the cached auto-load snapshot
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Open the configured SQLite database with an in-process cache
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(&config)
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: &Config) -> Result<Self> {
        let adapter = SqliteAdapter::open_with_config(config)
            .context("Failed to open options database")?;

        Ok(Self::new(adapter)
            .with_cache(Arc::new(MemoryCache::new()))
            .with_cache_ttl(config.cache_ttl()))
    }

    /// Get the underlying adapter
    pub fn adapter(&self) -> &dyn OptionsAdapter {
        self.adapter.as_ref()
    }

    /// Check if the next read will reload the auto-load snapshot
    pub fn needs_reload(&self) -> bool {
        self.needs_reload
    }

    /// Replace the in-memory map with the auto-load snapshot
    ///
    /// The snapshot comes from the cache when present; otherwise it is read
    /// from the adapter and cached for the configured TTL. An empty cached
    /// snapshot counts as a miss.
    pub fn load(&mut self) {
        let cached = self
            .cache
            .as_ref()
            .and_then(|cache| cache.fetch(OPTIONS_CACHE_KEY))
            .filter(|snapshot| !snapshot.is_empty());

        let snapshot = match cached {
            Some(snapshot) => {
                debug!(count = snapshot.len(), "auto-load snapshot served from cache");
                snapshot
            }
            None => self.load_from_adapter(),
        };

        self.data = snapshot
            .into_iter()
            .map(|(key, value)| (key, StoredValue::Text(value)))
            .collect();
        self.needs_reload = false;
    }

    fn load_from_adapter(&self) -> Snapshot {
        match self.adapter.load_options() {
            Ok(snapshot) => {
                debug!(count = snapshot.len(), "auto-load snapshot read from storage");
                if let Some(cache) = &self.cache {
                    cache.save(OPTIONS_CACHE_KEY, &snapshot, self.cache_ttl);
                }
                snapshot
            }
            Err(e) => {
                warn!(error = %e, "failed to load auto-load options");
                Snapshot::new()
            }
        }
    }

    /// Get an option, resolved to its native type
    ///
    /// Keys missing from memory are read from the adapter once and memoized,
    /// the default included, so a later call with a different default still
    /// sees the first one.
    pub fn get(&mut self, key: &str, default: impl Into<StoredValue>) -> Value {
        if self.needs_reload {
            self.load();
        }

        let default = default.into();
        let Ok(key) = normalize_key(key) else {
            return resolve(&default);
        };

        let value = match self.data.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let value = read_or_default(self.adapter.as_ref(), entry.key(), default);
                entry.insert(value)
            }
        };
        resolve(value)
    }

    /// Read an option straight from the adapter
    ///
    /// Skips the in-memory map as a source but still memoizes the result.
    /// The value is returned raw, without type resolution.
    pub fn read(&mut self, key: &str, default: impl Into<StoredValue>) -> StoredValue {
        let default = default.into();
        let Ok(key) = normalize_key(key) else {
            return default;
        };

        let value = read_or_default(self.adapter.as_ref(), &key, default);
        self.data.insert(key, value.clone());
        value
    }

    /// Check if an option exists in storage
    pub fn has(&self, key: &str) -> bool {
        let Ok(key) = normalize_key(key) else {
            return false;
        };

        self.adapter.has_option(&key).unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "failed to check option");
            false
        })
    }

    /// Get the stored row for an option
    pub fn describe(&self, key: &str) -> Option<OptionRecord> {
        let key = normalize_key(key).ok()?;

        self.adapter.record(&key).unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "failed to read option record");
            None
        })
    }

    /// Create an option, returning `false` if it already exists
    pub fn create_option(
        &mut self,
        key: &str,
        value: impl Into<StoredValue>,
        auto_load: bool,
        extension: Option<&str>,
    ) -> bool {
        let value = value.into();
        let created = self
            .adapter
            .create_option(key, &value, auto_load, extension)
            .unwrap_or_else(|e| {
                warn!(key, error = %e, "failed to create option");
                false
            });

        if created {
            self.remember(key, value);
        }
        created
    }

    /// Save an option, keeping its auto-load flag
    pub fn set(
        &mut self,
        key: &str,
        value: impl Into<StoredValue>,
        extension: Option<&str>,
    ) -> bool {
        self.write(key, value.into(), None, extension)
    }

    /// Save an option with an explicit auto-load flag
    pub fn save(
        &mut self,
        key: &str,
        value: impl Into<StoredValue>,
        auto_load: bool,
        extension: Option<&str>,
    ) -> bool {
        self.write(key, value.into(), Some(auto_load), extension)
    }

    fn write(
        &mut self,
        key: &str,
        value: StoredValue,
        auto_load: Option<bool>,
        extension: Option<&str>,
    ) -> bool {
        if let Err(e) = self.adapter.save_option(key, &value, auto_load, extension) {
            warn!(key, error = %e, "failed to save option");
            return false;
        }

        self.remember(key, value);
        true
    }

    /// Memoize a written value and drop the cached snapshot
    fn remember(&mut self, key: &str, value: StoredValue) {
        self.invalidate_cache();
        if let Ok(key) = normalize_key(key) {
            self.data.insert(key, value);
        }
    }

    /// Remove options by key, by extension, or by both
    ///
    /// Whatever the outcome, the store goes stale so the next read reloads
    /// from storage. Returns `true` when at least one option was deleted.
    pub fn remove_options(&mut self, key: Option<&str>, extension: Option<&str>) -> bool {
        let result = self.adapter.remove(key, extension);

        self.invalidate_cache();
        self.needs_reload = true;

        match result {
            Ok(deleted) => deleted > 0,
            Err(e) => {
                warn!(?key, ?extension, error = %e, "failed to remove options");
                false
            }
        }
    }

    /// Search options by key prefix
    ///
    /// Returns a nested object keyed by dot segments, or with `compact_keys`
    /// a flat object keyed by the full option keys. Values are resolved.
    pub fn search_options(&self, search_key: &str, compact_keys: bool) -> Value {
        let result = if compact_keys {
            self.adapter.find_by_prefix(search_key).map(|found| {
                Value::Object(
                    found
                        .iter()
                        .map(|(key, value)| (key.clone(), resolve_text(value)))
                        .collect(),
                )
            })
        } else {
            self.adapter
                .search_options(search_key)
                .map(|nested| resolve_value(&nested))
        };

        result.unwrap_or_else(|e| {
            warn!(search_key, error = %e, "failed to search options");
            Value::Object(Map::new())
        })
    }

    /// Options owned by an extension, resolved
    pub fn get_extension_options(&self, extension: &str) -> BTreeMap<String, Value> {
        match self.adapter.get_extension_options(extension) {
            Ok(found) => found
                .iter()
                .map(|(key, value)| (key.clone(), resolve_text(value)))
                .collect(),
            Err(e) => {
                warn!(extension, error = %e, "failed to read extension options");
                BTreeMap::new()
            }
        }
    }

    /// Every option currently in memory, resolved
    pub fn to_array(&mut self) -> BTreeMap<String, Value> {
        if self.needs_reload {
            self.load();
        }

        self.data
            .iter()
            .map(|(key, value)| (key.clone(), resolve(value)))
            .collect()
    }

    /// Total number of stored options
    pub fn count(&self) -> usize {
        self.adapter.count().unwrap_or_else(|e| {
            warn!(error = %e, "failed to count options");
            0
        })
    }

    fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.delete(OPTIONS_CACHE_KEY);
        }
    }
}

fn read_or_default(adapter: &dyn OptionsAdapter, key: &str, default: StoredValue) -> StoredValue {
    match adapter.read(key) {
        Ok(Some(value)) => StoredValue::Text(value),
        Ok(None) => default,
        Err(e) => {
            warn!(key, error = %e, "failed to read option");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{StorageError, StorageResult};
    use serde_json::json;

    fn store() -> (Options, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        let options = Options::new(SqliteAdapter::open_in_memory().unwrap())
            .with_cache(cache.clone())
            .with_cache_ttl(Duration::from_secs(60));
        (options, cache)
    }

    /// Adapter whose every call fails
    struct BrokenAdapter;

    fn broken<T>() -> StorageResult<T> {
        Err(StorageError::Database(rusqlite::Error::QueryReturnedNoRows))
    }

    impl OptionsAdapter for BrokenAdapter {
        fn read(&self, _key: &str) -> StorageResult<Option<String>> {
            broken()
        }
        fn record(&self, _key: &str) -> StorageResult<Option<OptionRecord>> {
            broken()
        }
        fn has_option(&self, _key: &str) -> StorageResult<bool> {
            broken()
        }
        fn save_option(
            &mut self,
            _key: &str,
            _value: &StoredValue,
            _auto_load: Option<bool>,
            _extension: Option<&str>,
        ) -> StorageResult<()> {
            broken()
        }
        fn load_options(&self) -> StorageResult<Snapshot> {
            broken()
        }
        fn find_by_prefix(&self, _prefix: &str) -> StorageResult<Snapshot> {
            broken()
        }
        fn get_extension_options(&self, _extension: &str) -> StorageResult<Snapshot> {
            broken()
        }
        fn remove(&mut self, _key: Option<&str>, _extension: Option<&str>) -> StorageResult<usize> {
            broken()
        }
        fn count(&self) -> StorageResult<usize> {
            broken()
        }
    }

    #[test]
    fn test_starts_stale() {
        let (mut options, _) = store();
        assert!(options.needs_reload());

        options.load();
        assert!(!options.needs_reload());
    }

    #[test]
    fn test_get_unknown_key_returns_default() {
        let (mut options, _) = store();

        assert_eq!(options.get("missing", "fallback"), json!("fallback"));
        assert_eq!(options.get("other", 5i64), json!(5));
        assert_eq!(options.get("none", Value::Null), Value::Null);
    }

    #[test]
    fn test_get_memoizes_default() {
        let (mut options, _) = store();

        assert_eq!(options.get("missing", "first"), json!("first"));
        assert_eq!(options.get("missing", "second"), json!("first"));
    }

    #[test]
    fn test_blank_key() {
        let (mut options, _) = store();

        assert_eq!(options.get("  ", "fallback"), json!("fallback"));
        assert!(!options.set("  ", "value", None));
        assert!(!options.create_option("", "value", false, None));
        assert!(!options.has(""));
        assert!(options.to_array().is_empty());
    }

    #[test]
    fn test_set_then_get_resolves() {
        let (mut options, _) = store();

        assert!(options.set("site.name", "Demo", None));
        assert!(options.set("site.flag", "true", None));
        assert!(options.set("site.count", "42", None));
        assert!(options.set("site.list", vec![1, 2, 3], None));

        assert_eq!(options.get("site.name", Value::Null), json!("Demo"));
        assert_eq!(options.get("site.flag", Value::Null), json!(true));
        assert_eq!(options.get("site.count", Value::Null), json!(42));
        assert_eq!(options.get("site.list", Value::Null), json!([1, 2, 3]));
    }

    #[test]
    fn test_numeric_text_keeps_its_exact_form() {
        let (mut options, _) = store();
        options.save("zip", "02134", true, None);
        options.save("big", "12345678901234567890123", true, None);
        options.save("ver", "1.10", true, None);

        options.load();

        assert_eq!(options.get("zip", Value::Null), json!("02134"));
        assert_eq!(
            options.get("big", Value::Null),
            json!("12345678901234567890123")
        );
        assert_eq!(options.get("ver", Value::Null), json!("1.10"));
    }

    #[test]
    fn test_values_resolve_after_round_trip_through_storage() {
        let (mut options, _) = store();
        options.set("site.list", vec![1, 2, 3], None);
        options.set("site.flag", "yes", None);

        let raw = options.read("site.list", Value::Null);
        assert_eq!(raw, StoredValue::Text("[1,2,3]".to_string()));
        assert_eq!(options.get("site.list", Value::Null), json!([1, 2, 3]));
        assert_eq!(options.read("site.flag", Value::Null), StoredValue::from("yes"));
        assert_eq!(options.get("site.flag", Value::Null), json!(true));
    }

    #[test]
    fn test_underscore_keys_address_the_same_option() {
        let (mut options, _) = store();

        assert!(options.set("site_name", "Demo", None));
        assert!(options.has("site.name"));
        assert_eq!(options.get("site.name", Value::Null), json!("Demo"));
        assert_eq!(options.get("site_name", Value::Null), json!("Demo"));
    }

    #[test]
    fn test_create_twice_keeps_first_value() {
        let (mut options, _) = store();

        assert!(options.create_option("site.name", "Demo", true, None));
        assert!(!options.create_option("site.name", "Other", true, None));
        assert_eq!(options.get("site.name", Value::Null), json!("Demo"));
    }

    #[test]
    fn test_site_name_scenario() {
        let (mut options, cache) = store();

        assert!(options.create_option("site.name", "Demo", true, None));
        assert_eq!(options.get("site.name", Value::Null), json!("Demo"));
        assert!(cache.contains(OPTIONS_CACHE_KEY));

        assert!(options.set("site.name", "Demo2", None));
        assert!(!cache.contains(OPTIONS_CACHE_KEY));
        assert_eq!(options.get("site.name", Value::Null), json!("Demo2"));

        // set keeps the auto-load flag, so a reload still sees the option
        options.load();
        assert_eq!(options.to_array().get("site.name"), Some(&json!("Demo2")));
    }

    #[test]
    fn test_load_prefers_cache() {
        let (mut options, cache) = store();
        let mut cached = Snapshot::new();
        cached.insert("ghost".to_string(), "1".to_string());
        cache.save(OPTIONS_CACHE_KEY, &cached, Duration::from_secs(60));

        options.load();

        assert_eq!(options.get("ghost", Value::Null), json!(1));
    }

    #[test]
    fn test_empty_cached_snapshot_reads_storage() {
        let (mut options, cache) = store();
        options.save("site.name", "Demo", true, None);
        cache.save(OPTIONS_CACHE_KEY, &Snapshot::new(), Duration::from_secs(60));

        options.load();

        assert_eq!(options.to_array().get("site.name"), Some(&json!("Demo")));
        let cached = cache.fetch(OPTIONS_CACHE_KEY).unwrap();
        assert_eq!(cached.get("site.name").map(String::as_str), Some("Demo"));
    }

    #[test]
    fn test_load_populates_cache() {
        let (mut options, cache) = store();
        options.save("site.name", "Demo", true, None);
        options.save("mail.host", "localhost", false, None);

        options.load();

        let cached = cache.fetch(OPTIONS_CACHE_KEY).unwrap();
        assert_eq!(cached.get("site.name").map(String::as_str), Some("Demo"));
        assert!(!cached.contains_key("mail.host"));
    }

    #[test]
    fn test_remove_marks_stale_and_clears_cache() {
        let (mut options, cache) = store();
        options.create_option("site.name", "Demo", true, None);
        options.load();
        assert!(cache.contains(OPTIONS_CACHE_KEY));

        assert!(options.remove_options(Some("site.name"), None));

        assert!(options.needs_reload());
        assert!(!cache.contains(OPTIONS_CACHE_KEY));
        assert!(!options.has("site.name"));

        options.load();
        assert!(!options.to_array().contains_key("site.name"));
        assert_eq!(options.get("site.name", "gone"), json!("gone"));
    }

    #[test]
    fn test_remove_missing_returns_false_but_still_stale() {
        let (mut options, _) = store();
        options.load();

        assert!(!options.remove_options(Some("missing"), None));
        assert!(options.needs_reload());
        assert!(!options.remove_options(None, None));
    }

    #[test]
    fn test_remove_by_extension() {
        let (mut options, _) = store();
        options.create_option("blog.per.page", "10", false, Some("blog"));
        options.create_option("blog.title", "News", false, Some("blog"));
        options.create_option("site.name", "Demo", false, None);

        assert!(options.remove_options(None, Some("blog")));
        assert!(!options.has("blog.title"));
        assert!(options.has("site.name"));
    }

    #[test]
    fn test_search_options() {
        let (mut options, _) = store();
        options.set("a.b", "1", None);
        options.set("a.c", "true", None);
        options.set("x.y", "3", None);

        assert_eq!(
            options.search_options("a.", false),
            json!({"a": {"b": 1, "c": true}})
        );
        assert_eq!(
            options.search_options("a.", true),
            json!({"a.b": 1, "a.c": true})
        );
        assert_eq!(options.search_options("none", false), json!({}));
    }

    #[test]
    fn test_extension_options_resolved() {
        let (mut options, _) = store();
        options.create_option("blog.per.page", "10", false, Some("blog"));
        options.create_option("blog.comments", "off", false, Some("blog"));

        let blog = options.get_extension_options("blog");
        assert_eq!(blog.get("blog.per.page"), Some(&json!(10)));
        assert_eq!(blog.get("blog.comments"), Some(&json!(false)));
    }

    #[test]
    fn test_to_array_loads_auto_load_set() {
        let (mut options, _) = store();
        options.save("site.name", "Demo", true, None);
        options.save("mail.port", "25", false, None);
        assert!(options.needs_reload());

        // The first load replaces the memoized writes with the auto-load set
        let all = options.to_array();
        assert_eq!(all.get("site.name"), Some(&json!("Demo")));
        assert!(!all.contains_key("mail.port"));

        // Individually read keys join the map afterwards
        assert_eq!(options.get("mail.port", Value::Null), json!(25));
        assert_eq!(options.to_array().get("mail.port"), Some(&json!(25)));
    }

    #[test]
    fn test_ttl_expiry_forces_storage_read() {
        let cache = Arc::new(MemoryCache::new());
        let mut options = Options::new(SqliteAdapter::open_in_memory().unwrap())
            .with_cache(cache.clone())
            .with_cache_ttl(Duration::ZERO);
        options.save("site.name", "Demo", true, None);

        options.load();
        assert!(!cache.contains(OPTIONS_CACHE_KEY));
        assert_eq!(options.to_array().get("site.name"), Some(&json!("Demo")));
    }

    #[test]
    fn test_without_cache() {
        let mut options = Options::new(SqliteAdapter::open_in_memory().unwrap());

        assert!(options.create_option("site.name", "Demo", true, None));
        options.load();
        assert_eq!(options.get("site.name", Value::Null), json!("Demo"));
    }

    #[test]
    fn test_describe() {
        let (mut options, _) = store();
        options.create_option("site_name", "Demo", true, Some("core"));

        let record = options.describe("site.name").unwrap();
        assert_eq!(record.key, "site.name");
        assert_eq!(record.value, "Demo");
        assert!(record.auto_load);
        assert_eq!(record.extension.as_deref(), Some("core"));
        assert!(options.describe("missing").is_none());
    }

    #[test]
    fn test_storage_failures_are_swallowed() {
        let mut options = Options::new(BrokenAdapter);

        assert_eq!(options.get("site.name", "fallback"), json!("fallback"));
        assert!(!options.needs_reload());
        assert_eq!(options.read("site.name", "raw"), StoredValue::from("raw"));
        assert!(!options.has("site.name"));
        assert!(!options.create_option("site.name", "Demo", true, None));
        assert!(!options.set("site.name", "Demo", None));
        assert!(!options.remove_options(Some("site.name"), None));
        assert_eq!(options.search_options("site", false), json!({}));
        assert!(options.get_extension_options("blog").is_empty());
        assert!(options.describe("site.name").is_none());
        assert_eq!(options.count(), 0);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache = Arc::new(MemoryCache::new());
        let mut options = Options::new(BrokenAdapter).with_cache(cache.clone());

        options.load();

        assert!(cache.is_empty());
        assert!(options.to_array().is_empty());
    }
}
