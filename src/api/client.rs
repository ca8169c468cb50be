//! Purpose: Typed, serialization-aware key-value operations over the raw store.
//! Exports: `KvClient`, `Ttl`.
//! Role: Convert store outcomes into soft sentinels; own the default TTL.
//! Invariants: Nothing escapes this boundary as an error; failures become `None`/`false`.
//! Invariants: Stored data that fails to parse reads as absent, never as an error.

use serde_json::Value;
use tracing::warn;

use crate::core::store::{Store, TtlSpec};

/// TTL selection for a write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Ttl {
    /// Fall back to the process-wide default TTL.
    Default,
    /// Explicit expiry in whole seconds.
    Seconds(u64),
    /// Preserve the key's current expiry; a key that no longer has one
    /// falls back to the default TTL.
    Keep,
}

#[derive(Clone)]
pub struct KvClient {
    store: Store,
    default_ttl_secs: u64,
}

impl KvClient {
    pub fn new(store: Store, default_ttl_secs: u64) -> Self {
        Self {
            store,
            default_ttl_secs,
        }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_available()
    }

    pub async fn ping(&self) -> bool {
        self.store.ping().await
    }

    /// Returns the deserialized value, or `None` if the key does not exist,
    /// the connection is disabled, or the stored data is not valid JSON.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let raw = match self.store.get_raw(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, %err, "store get degraded to absent");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, %err, "stored value is not valid JSON; treating as absent");
                None
            }
        }
    }

    /// Writes `value` under `key` with the requested expiry. Structured data
    /// is JSON-encoded; a top-level string is stored verbatim.
    pub async fn set(&self, key: &str, value: &Value, ttl: Ttl) -> bool {
        let raw = match value {
            Value::String(text) => text.clone(),
            other => match serde_json::to_string(other) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(key, %err, "value failed to serialize; nothing written");
                    return false;
                }
            },
        };
        let expiry = match ttl {
            Ttl::Default => TtlSpec::Ex(self.default_ttl_secs),
            Ttl::Seconds(seconds) => TtlSpec::Ex(seconds),
            Ttl::Keep => TtlSpec::Keep {
                fallback_secs: self.default_ttl_secs,
            },
        };
        match self.store.set_raw(key, &raw, expiry).await {
            Ok(()) => true,
            Err(err) => {
                warn!(key, %err, "store set failed");
                false
            }
        }
    }

    pub async fn exists(&self, key: &str) -> bool {
        match self.store.exists_raw(key).await {
            Ok(exists) => exists,
            Err(err) => {
                warn!(key, %err, "store exists degraded to false");
                false
            }
        }
    }

    /// Removes `key`; true iff a key was actually removed.
    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete_raw(key).await {
            Ok(removed) => removed,
            Err(err) => {
                warn!(key, %err, "store delete degraded to false");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{KvClient, Ttl};
    use crate::core::conn::StoreConn;
    use crate::core::memory::MemoryStore;
    use crate::core::store::{Store, TtlSpec};
    use serde_json::json;

    fn memory_client() -> (KvClient, MemoryStore) {
        let memory = MemoryStore::new();
        let client = KvClient::new(Store::Memory(memory.clone()), 60);
        (client, memory)
    }

    #[tokio::test]
    async fn set_then_get_round_trips_structured_values() {
        let (client, _) = memory_client();
        let record = json!({"phone": "89001234567", "address": "Tverskaya 1"});
        assert!(client.set("89001234567", &record, Ttl::Default).await);
        assert_eq!(client.get("89001234567").await, Some(record));
    }

    #[tokio::test]
    async fn get_of_missing_key_is_absent() {
        let (client, _) = memory_client();
        assert_eq!(client.get("89001234567").await, None);
    }

    #[tokio::test]
    async fn top_level_strings_are_stored_verbatim() {
        let (client, memory) = memory_client();
        assert!(
            client
                .set("89001234567", &json!("Tverskaya 1"), Ttl::Default)
                .await
        );
        assert_eq!(
            memory.get_raw("89001234567").as_deref(),
            Some("Tverskaya 1")
        );
    }

    #[tokio::test]
    async fn unparseable_stored_data_reads_as_absent() {
        let (client, memory) = memory_client();
        memory.set_raw("89001234567", "not json {", TtlSpec::Ex(60));
        assert_eq!(client.get("89001234567").await, None);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_key_was_removed() {
        let (client, _) = memory_client();
        assert!(
            client
                .set("89001234567", &json!({"a": 1}), Ttl::Default)
                .await
        );
        assert!(client.delete("89001234567").await);
        assert!(!client.delete("89001234567").await);
        assert!(!client.exists("89001234567").await);
    }

    #[tokio::test]
    async fn explicit_ttl_overrides_the_default() {
        let (client, memory) = memory_client();
        assert!(
            client
                .set("89001234567", &json!({"a": 1}), Ttl::Seconds(60))
                .await
        );
        assert!(memory.expires_at("89001234567").is_some());
        memory.expire_now("89001234567");
        assert_eq!(client.get("89001234567").await, None);
    }

    #[tokio::test]
    async fn keep_ttl_write_to_a_vanished_key_still_expires() {
        let (client, memory) = memory_client();
        assert!(
            client
                .set("89001234567", &json!({"a": 1}), Ttl::Seconds(60))
                .await
        );
        memory.expire_now("89001234567");
        assert!(
            client
                .set("89001234567", &json!({"a": 2}), Ttl::Keep)
                .await
        );
        assert!(memory.expires_at("89001234567").is_some());
        memory.expire_now("89001234567");
        assert_eq!(client.get("89001234567").await, None);
    }

    #[tokio::test]
    async fn disabled_connection_degrades_every_operation() {
        let client = KvClient::new(Store::Redis(StoreConn::disabled()), 60);
        assert!(!client.is_available());
        assert!(!client.ping().await);
        assert_eq!(client.get("89001234567").await, None);
        assert!(!client.set("89001234567", &json!({"a": 1}), Ttl::Default).await);
        assert!(!client.exists("89001234567").await);
        assert!(!client.delete("89001234567").await);
    }
}
