//! Purpose: Dispatch raw key-value operations to the configured backend.
//! Exports: `Store`, `TtlSpec`.
//! Role: Enum dispatch between the external store connection and the memory backend.
//! Invariants: Memory operations are infallible; connection failures map to `Unavailable`.
//! Invariants: Every write carries an expiry mode; there are no non-expiring records.

use crate::core::conn::StoreConn;
use crate::core::error::Error;
use crate::core::memory::MemoryStore;

/// Expiry mode for a single write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TtlSpec {
    /// Set the key's expiry to the given number of whole seconds.
    Ex(u64),
    /// Keep the key's current expiry. A key that has none by write time
    /// (it expired since it was read) gets `fallback_secs` instead, so no
    /// write can produce a record without an expiration.
    Keep { fallback_secs: u64 },
}

#[derive(Clone)]
pub enum Store {
    Redis(StoreConn),
    Memory(MemoryStore),
}

impl Store {
    pub async fn get_raw(&self, key: &str) -> Result<Option<String>, Error> {
        match self {
            Store::Redis(conn) => conn.get_raw(key).await,
            Store::Memory(store) => Ok(store.get_raw(key)),
        }
    }

    pub async fn set_raw(&self, key: &str, value: &str, ttl: TtlSpec) -> Result<(), Error> {
        match self {
            Store::Redis(conn) => conn.set_raw(key, value, ttl).await,
            Store::Memory(store) => {
                store.set_raw(key, value, ttl);
                Ok(())
            }
        }
    }

    /// Removes `key`; reports whether a key was actually removed.
    pub async fn delete_raw(&self, key: &str) -> Result<bool, Error> {
        match self {
            Store::Redis(conn) => conn.delete_raw(key).await,
            Store::Memory(store) => Ok(store.delete_raw(key)),
        }
    }

    pub async fn exists_raw(&self, key: &str) -> Result<bool, Error> {
        match self {
            Store::Redis(conn) => conn.exists_raw(key).await,
            Store::Memory(store) => Ok(store.exists_raw(key)),
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            Store::Redis(conn) => conn.is_available(),
            Store::Memory(_) => true,
        }
    }

    pub async fn ping(&self) -> bool {
        match self {
            Store::Redis(conn) => conn.ping().await,
            Store::Memory(_) => true,
        }
    }
}
