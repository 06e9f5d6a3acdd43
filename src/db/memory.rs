use crate::db::store::{KeyValueStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// In-process store backend. Used when `REDIS_URL` is unset (single-instance
/// development) and throughout the test suite. Expiry is lazy: dead entries
/// are dropped when touched.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn set_nx_ex(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Ok(false),
            _ => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: value.to_string(),
                        expires_at: now + Duration::from_secs(ttl_seconds),
                    },
                );
                Ok(true)
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn get_del(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        let now = Instant::now();
        match entries.remove(key) {
            Some(entry) if entry.is_expired(now) => Ok(None),
            Some(entry) => Ok(Some(entry.value)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        entries.remove(key);
        Ok(())
    }

    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(false)
            }
            Some(entry) if entry.value == expected => {
                entries.remove(key);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Ok(false),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert!(store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn zero_ttl_entries_are_already_expired() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 0).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn get_del_consumes_exactly_once() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 60).await.unwrap();
        assert_eq!(store.get_del("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(store.get_del("k").await.unwrap(), None);
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_nx_respects_existing_live_entries() {
        let store = MemoryStore::new();
        assert!(store.set_nx_ex("k", "first", 60).await.unwrap());
        assert!(!store.set_nx_ex("k", "second", 60).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some("first".to_string()));
    }

    #[tokio::test]
    async fn set_nx_succeeds_over_expired_entry() {
        let store = MemoryStore::new();
        store.set_ex("k", "stale", 0).await.unwrap();
        assert!(store.set_nx_ex("k", "fresh", 60).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some("fresh".to_string()));
    }

    #[tokio::test]
    async fn delete_if_eq_only_removes_matching_value() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 60).await.unwrap();
        assert!(!store.delete_if_eq("k", "other").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert!(store.delete_if_eq("k", "v").await.unwrap());
        assert!(!store.delete_if_eq("k", "v").await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 60).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
