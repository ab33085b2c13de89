pub mod sqlite;

pub use sqlite::SqliteStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("JSON encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("State store lock poisoned")]
    LockPoisoned,
}

/// The string-keyed JSON-value state store the service runs against.
///
/// Values are raw JSON strings; interpreting them is the caller's business.
/// `ensure_exists` provisions an address idempotently before its first
/// write (an ensured-but-unset address reads back as an empty string).
pub trait StateStore: Send + Sync {
    fn get(&self, address: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, address: &str, value: &str) -> Result<(), StoreError>;
    fn ensure_exists(&self, address: &str, name: &str) -> Result<(), StoreError>;
    fn delete(&self, address: &str) -> Result<(), StoreError>;
}
