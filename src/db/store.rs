use async_trait::async_trait;
use thiserror::Error;

/// Failure talking to the ephemeral store backend. Key absence is not an
/// error; lookups report it through `Option`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection unavailable: {0}")]
    Pool(String),
    #[error("store command failed: {0}")]
    Command(String),
}

/// TTL-aware key-value store backing all ephemeral auth state: sessions,
/// refresh tokens, CSRF seeds, OTP codes, verification records and rate
/// markers. Backed by Redis in production and by `MemoryStore` when no
/// Redis URL is configured.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Write `value` at `key`, expiring after `ttl_seconds`.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError>;

    /// Write only if `key` is absent. Returns whether the write happened.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl_seconds: u64)
        -> Result<bool, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Atomically read and remove `key`. Single-use consumption: two
    /// concurrent callers cannot both observe the value.
    async fn get_del(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove `key` if present. Idempotent.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Remove `key` only if it currently holds `expected`; returns whether
    /// it was removed. Compare and removal are one atomic step.
    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}
