//! Purpose: In-process TTL key-value backend for development and tests.
//! Exports: `MemoryStore`.
//! Role: Deadline-based stand-in for the external store; always succeeds.
//! Invariants: Expired entries are purged lazily on access.
//! Invariants: Clones share one map; expiry semantics mirror the real store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::core::store::TtlSpec;

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<String, Entry>>,
    ops: AtomicU64,
}

struct Entry {
    raw: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total raw operations performed against this store. Lets callers
    /// observe that validation short-circuited before any store access.
    pub fn op_count(&self) -> u64 {
        self.inner.ops.load(Ordering::Relaxed)
    }

    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.inner.ops.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.lock();
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.raw.clone()),
            None => None,
        }
    }

    pub fn set_raw(&self, key: &str, value: &str, ttl: TtlSpec) {
        self.inner.ops.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.lock();
        let now = Instant::now();
        let expires_at = match ttl {
            TtlSpec::Ex(seconds) => Some(now + Duration::from_secs(seconds)),
            // A key that expired since it was read must not come back
            // without a deadline.
            TtlSpec::Keep { fallback_secs } => entries
                .get(key)
                .filter(|entry| !entry.expired(now))
                .and_then(|entry| entry.expires_at)
                .or(Some(now + Duration::from_secs(fallback_secs))),
        };
        entries.insert(
            key.to_string(),
            Entry {
                raw: value.to_string(),
                expires_at,
            },
        );
    }

    pub fn delete_raw(&self, key: &str) -> bool {
        self.inner.ops.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.lock();
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expired(now) => {
                entries.remove(key);
                false
            }
            Some(_) => {
                entries.remove(key);
                true
            }
            None => false,
        }
    }

    pub fn exists_raw(&self, key: &str) -> bool {
        self.inner.ops.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.lock();
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expired(now) => {
                entries.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

#[cfg(test)]
impl MemoryStore {
    pub(crate) fn expires_at(&self, key: &str) -> Option<Instant> {
        self.lock().get(key).and_then(|entry| entry.expires_at)
    }

    pub(crate) fn expire_now(&self, key: &str) {
        if let Some(entry) = self.lock().get_mut(key) {
            entry.expires_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryStore, TtlSpec};

    #[test]
    fn set_then_get_round_trips() {
        let store = MemoryStore::new();
        store.set_raw("89001234567", "{\"a\":1}", TtlSpec::Ex(60));
        assert_eq!(store.get_raw("89001234567").as_deref(), Some("{\"a\":1}"));
        assert!(store.exists_raw("89001234567"));
    }

    #[test]
    fn expired_entry_reads_as_absent() {
        let store = MemoryStore::new();
        store.set_raw("89001234567", "value", TtlSpec::Ex(60));
        assert!(store.exists_raw("89001234567"));
        store.expire_now("89001234567");
        assert_eq!(store.get_raw("89001234567"), None);
        assert!(!store.exists_raw("89001234567"));
    }

    #[test]
    fn delete_reports_whether_a_key_was_removed() {
        let store = MemoryStore::new();
        store.set_raw("89001234567", "value", TtlSpec::Ex(60));
        assert!(store.delete_raw("89001234567"));
        assert!(!store.delete_raw("89001234567"));
    }

    #[test]
    fn delete_of_expired_entry_reports_nothing_removed() {
        let store = MemoryStore::new();
        store.set_raw("89001234567", "value", TtlSpec::Ex(60));
        store.expire_now("89001234567");
        assert!(!store.delete_raw("89001234567"));
    }

    #[test]
    fn keep_ttl_preserves_the_existing_deadline() {
        let store = MemoryStore::new();
        store.set_raw("89001234567", "old", TtlSpec::Ex(60));
        let before = store.expires_at("89001234567");
        store.set_raw("89001234567", "new", TtlSpec::Keep { fallback_secs: 600 });
        assert_eq!(store.expires_at("89001234567"), before);
        assert_eq!(store.get_raw("89001234567").as_deref(), Some("new"));
    }

    #[test]
    fn keep_ttl_on_a_fresh_key_applies_the_fallback_deadline() {
        let store = MemoryStore::new();
        store.set_raw("89001234567", "value", TtlSpec::Keep { fallback_secs: 60 });
        assert!(store.expires_at("89001234567").is_some());
        assert!(store.exists_raw("89001234567"));
    }

    #[test]
    fn keep_ttl_on_an_expired_key_applies_the_fallback_deadline() {
        let store = MemoryStore::new();
        store.set_raw("89001234567", "old", TtlSpec::Ex(60));
        store.expire_now("89001234567");
        store.set_raw("89001234567", "new", TtlSpec::Keep { fallback_secs: 60 });
        let deadline = store.expires_at("89001234567").expect("deadline set");
        assert!(deadline > std::time::Instant::now());
        store.expire_now("89001234567");
        assert_eq!(store.get_raw("89001234567"), None);
    }

    #[test]
    fn clones_share_the_same_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set_raw("89001234567", "value", TtlSpec::Ex(60));
        assert!(other.exists_raw("89001234567"));
    }

    #[test]
    fn op_count_tracks_raw_operations() {
        let store = MemoryStore::new();
        assert_eq!(store.op_count(), 0);
        store.set_raw("89001234567", "value", TtlSpec::Ex(60));
        store.get_raw("89001234567");
        assert_eq!(store.op_count(), 2);
    }
}
