//! optstore Core Library
//!
//! A cached key-value options store. Application code reads and writes named
//! settings through the `Options` façade; values live in a SQLite table and
//! the auto-load subset is memoized in a short-lived cache.
//!
//! # Architecture
//!
//! - **Adapter** (`OptionsAdapter`): persistence port, implemented by
//!   `SqliteAdapter`
//! - **Cache** (`OptionsCache`): fetch/save/delete port for the auto-load
//!   snapshot, implemented by `MemoryCache`
//! - **Options**: façade with lazy loading, write invalidation, and type
//!   resolution of stored text into numbers, JSON, and booleans
//!
//! # Quick Start
//!
//! ```text
//! let mut options = Options::open()?;
//!
//! options.create_option("site.name", "Demo", true, None);
//! options.set("site.tags", vec!["rust", "sqlite"], None);
//!
//! let name = options.get("site.name", "Untitled");
//! let tags = options.get("site.tags", serde_json::Value::Null);
//! ```
//!
//! # Modules
//!
//! - `options`: the `Options` façade (main entry point)
//! - `models`: option rows, stored values, key rules
//! - `resolve`: type resolution of stored values
//! - `cache`: snapshot cache port and in-process implementation
//! - `storage`: adapter port, SQLite adapter, schema, errors
//! - `config`: application configuration

pub mod cache;
pub mod config;
pub mod models;
pub mod options;
pub mod resolve;
pub mod storage;

pub use cache::{MemoryCache, OptionsCache};
pub use config::Config;
pub use models::{OptionRecord, Snapshot, StoredValue};
pub use options::{Options, OPTIONS_CACHE_KEY};
pub use storage::{ErrorKind, OptionsAdapter, SqliteAdapter, StorageError, StorageResult};
