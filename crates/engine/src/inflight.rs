//! In-memory claim registries.
//!
//! Two of these guard the engine: one keyed by schedule id (a schedule
//! mid-cycle is skipped by overlapping ticks) and one keyed by target id
//! (a manual check and a scheduled check never run concurrently against
//! the same target). Claims are RAII guards so membership is released on
//! every exit path, panics included.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Concurrency-safe set of in-flight keys.
#[derive(Debug)]
pub struct InflightRegistry<K> {
    inner: Arc<Mutex<HashSet<K>>>,
}

impl<K> Clone for InflightRegistry<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> Default for InflightRegistry<K>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> InflightRegistry<K>
where
    K: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Claim a key. Returns `None` when the key is already in flight.
    pub fn try_claim(&self, key: K) -> Option<InflightGuard<K>> {
        let mut set = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if set.insert(key) {
            Some(InflightGuard {
                key,
                inner: Arc::clone(&self.inner),
            })
        } else {
            None
        }
    }

    /// Whether a key is currently claimed.
    pub fn contains(&self, key: K) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&key)
    }
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct InflightGuard<K: Copy + Eq + Hash> {
    key: K,
    inner: Arc<Mutex<HashSet<K>>>,
}

impl<K: Copy + Eq + Hash> Drop for InflightGuard<K> {
    fn drop(&mut self) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_core::TargetId;

    #[test]
    fn second_claim_fails_until_guard_drops() {
        let registry = InflightRegistry::new();
        let key = TargetId::new();

        let guard = registry.try_claim(key);
        assert!(guard.is_some());
        assert!(registry.try_claim(key).is_none());
        assert!(registry.contains(key));

        drop(guard);
        assert!(!registry.contains(key));
        assert!(registry.try_claim(key).is_some());
    }

    #[test]
    fn distinct_keys_claim_independently() {
        let registry = InflightRegistry::new();
        let _a = registry.try_claim(TargetId::new()).unwrap();
        let _b = registry.try_claim(TargetId::new()).unwrap();
    }

    #[test]
    fn clones_share_the_same_set() {
        let registry = InflightRegistry::new();
        let clone = registry.clone();
        let key = TargetId::new();

        let _guard = registry.try_claim(key).unwrap();
        assert!(clone.try_claim(key).is_none());
    }
}
