//! Snapshot cache
//!
//! The `Options` façade memoizes the auto-load snapshot through the
//! `OptionsCache` port. `MemoryCache` is the in-process implementation: a
//! map of named entries, each with its own expiry.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::models::Snapshot;

/// Fetch/save/delete-by-name cache with a time-to-live
///
/// Implementations take `&self` so a single cache can be shared between
/// several `Options` instances.
pub trait OptionsCache: Send + Sync {
    /// Fetch a live entry, `None` when missing or expired
    fn fetch(&self, name: &str) -> Option<Snapshot>;

    /// Store an entry for `ttl`
    fn save(&self, name: &str, snapshot: &Snapshot, ttl: Duration);

    /// Drop an entry
    fn delete(&self, name: &str);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: Snapshot,
    /// None = never expires
    expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn new(snapshot: Snapshot, ttl: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        Self {
            snapshot,
            expires_at,
        }
    }

    /// Expired once the current time reaches the expiry timestamp
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => Utc::now() >= expires,
            None => false,
        }
    }
}

/// In-process `OptionsCache`
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a live entry exists under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.fetch(name).is_some()
    }

    /// Number of stored entries, expired ones included until next fetch
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        // Entries are replaced whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl OptionsCache for MemoryCache {
    fn fetch(&self, name: &str) -> Option<Snapshot> {
        let mut entries = self.lock();
        if entries.get(name)?.is_expired() {
            trace!(name, "cache entry expired");
            entries.remove(name);
            return None;
        }
        entries.get(name).map(|entry| entry.snapshot.clone())
    }

    fn save(&self, name: &str, snapshot: &Snapshot, ttl: Duration) {
        self.lock()
            .insert(name.to_string(), CacheEntry::new(snapshot.clone(), ttl));
    }

    fn delete(&self, name: &str) {
        self.lock().remove(name);
    }
}
