//! Purpose: Domain-level record operations with merge-update semantics.
//! Exports: `RecordDao`.
//! Role: Layer phone-record operations over the key-value client.
//! Invariants: `update` never creates a record; it merges into an existing object.
//! Invariants: The read-modify-write in `update` is not atomic; last writer wins.

use serde_json::{Map, Value};
use tracing::warn;

use super::client::{KvClient, Ttl};

#[derive(Clone)]
pub struct RecordDao {
    client: KvClient,
    refresh_ttl_on_update: bool,
}

impl RecordDao {
    pub fn new(client: KvClient, refresh_ttl_on_update: bool) -> Self {
        Self {
            client,
            refresh_ttl_on_update,
        }
    }

    pub fn client(&self) -> &KvClient {
        &self.client
    }

    /// Writes a new record. Existence preconditions belong to the caller;
    /// this overwrites whatever is stored under `key`.
    pub async fn create(&self, key: &str, record: &Value, ttl: Option<u64>) -> bool {
        self.client.set(key, record, explicit_or_default(ttl)).await
    }

    pub async fn fetch(&self, key: &str) -> Option<Value> {
        self.client.get(key).await
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.client.exists(key).await
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.client.delete(key).await
    }

    /// Shallow-merges `patch` into the record stored under `key`: each field
    /// in `patch` overwrites the same-named field, all other fields are
    /// preserved. Fails without writing when no record exists or the stored
    /// value is not an object. Two concurrent updates of the same key race;
    /// the read and the write-back are separate store commands and the last
    /// writer wins.
    pub async fn update(&self, key: &str, patch: &Map<String, Value>, ttl: Option<u64>) -> bool {
        let Some(current) = self.client.get(key).await else {
            return false;
        };
        let Value::Object(mut fields) = current else {
            warn!(key, "stored value is not an object; refusing to merge");
            return false;
        };
        for (name, value) in patch {
            fields.insert(name.clone(), value.clone());
        }
        let ttl = match ttl {
            Some(seconds) => Ttl::Seconds(seconds),
            None if self.refresh_ttl_on_update => Ttl::Default,
            None => Ttl::Keep,
        };
        self.client.set(key, &Value::Object(fields), ttl).await
    }
}

fn explicit_or_default(ttl: Option<u64>) -> Ttl {
    match ttl {
        Some(seconds) => Ttl::Seconds(seconds),
        None => Ttl::Default,
    }
}
