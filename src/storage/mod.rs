// Connection profile and query history storage
pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::models::{ConnectionPatch, ConnectionProfile, NewConnection, NewQueryRecord, QueryRecord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode stored value: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Registry of connection profiles and executed-query history.
///
/// Identifiers start at 1, increase strictly with every insert and are never
/// reused, deletes included. Implementations must assign them atomically.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn list_connections(&self) -> StoreResult<Vec<ConnectionProfile>>;

    async fn get_connection(&self, id: i64) -> StoreResult<Option<ConnectionProfile>>;

    async fn create_connection(&self, new: NewConnection) -> StoreResult<ConnectionProfile>;

    /// `Ok(None)` when no profile has this id
    async fn update_connection(
        &self,
        id: i64,
        patch: ConnectionPatch,
    ) -> StoreResult<Option<ConnectionProfile>>;

    /// Whether a profile existed. History records keep their back-reference.
    async fn delete_connection(&self, id: i64) -> StoreResult<bool>;

    /// All records in insertion order, optionally only those for one connection
    async fn list_queries(&self, connection_id: Option<i64>) -> StoreResult<Vec<QueryRecord>>;

    async fn get_query(&self, id: i64) -> StoreResult<Option<QueryRecord>>;

    async fn create_query(&self, new: NewQueryRecord) -> StoreResult<QueryRecord>;
}
