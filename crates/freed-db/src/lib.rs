pub mod feeds;
pub mod memory;
pub mod redis_store;
pub mod schema;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

pub use feeds::FeedStore;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("corrupt record at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Hash-per-key plus set-per-index storage.
///
/// Every method that touches both a record hash and its index set does so
/// atomically, so readers never observe one without the other unless a
/// previous process died between two separate writes.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// All fields of hash `key` (empty if absent) and whether `member` is in `set`,
    /// read as one snapshot.
    async fn read_record(
        &self,
        key: &str,
        set: &str,
        member: &str,
    ) -> Result<(HashMap<String, Vec<u8>>, bool)>;

    async fn members(&self, set: &str) -> Result<Vec<String>>;

    /// Replace hash `key` with `fields` and add `member` to `set`.
    async fn write_record(
        &self,
        key: &str,
        fields: Vec<(String, Vec<u8>)>,
        set: &str,
        member: &str,
    ) -> Result<()>;

    /// Delete hash `key` and remove `member` from `set`.
    async fn delete_record(&self, key: &str, set: &str, member: &str) -> Result<()>;

    /// Remove `member` from `set` only if hash `key` does not exist.
    /// Returns true if an entry was removed.
    async fn unindex_if_missing(&self, key: &str, set: &str, member: &str) -> Result<bool>;

    /// Delete hash `key` only if `member` is not in `set`.
    /// Returns true if a hash was deleted.
    async fn drop_if_unindexed(&self, key: &str, set: &str, member: &str) -> Result<bool>;
}
