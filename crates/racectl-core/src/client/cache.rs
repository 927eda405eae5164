//! Per-race local record caches
//!
//! Mirrors of authoritative record sets, keyed by race, updated
//! optimistically for offline mutations and merged by the reconciler once
//! authoritative rows come back.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::models::{AuthoritativeId, FinishResult, Runner};
use crate::storage::KvStore;

/// A typed, race-scoped record list persisted in the `KvStore`
pub struct RecordCache<S, T> {
    store: Arc<S>,
    prefix: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<S, T> Clone for RecordCache<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            prefix: self.prefix,
            _marker: PhantomData,
        }
    }
}

impl<S: KvStore, T: Serialize + DeserializeOwned> RecordCache<S, T> {
    const fn new(store: Arc<S>, prefix: &'static str) -> Self {
        Self {
            store,
            prefix,
            _marker: PhantomData,
        }
    }

    /// Load the cached records for a race (empty when never cached)
    pub fn load(&self, race_id: AuthoritativeId) -> Result<Vec<T>> {
        match self.store.get(&self.key(race_id))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Replace the cached records for a race
    pub fn save(&self, race_id: AuthoritativeId, records: &[T]) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        self.store.set(&self.key(race_id), &raw)
    }

    fn key(&self, race_id: AuthoritativeId) -> String {
        format!("{}_{race_id}", self.prefix)
    }
}

/// Runner cache for a device
pub fn runner_cache<S: KvStore>(store: Arc<S>) -> RecordCache<S, Runner> {
    RecordCache::new(store, "runners")
}

/// Finish result cache for a device
pub fn result_cache<S: KvStore>(store: Arc<S>) -> RecordCache<S, FinishResult> {
    RecordCache::new(store, "results")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_empty_when_never_cached() {
        let cache = runner_cache(Arc::new(MemoryKvStore::new()));
        assert!(cache.load(AuthoritativeId(1)).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_scoped_by_race() {
        let store = Arc::new(MemoryKvStore::new());
        let cache = runner_cache(Arc::clone(&store));

        let runner = Runner::provisional(AuthoritativeId(1), 7, None);
        cache.save(AuthoritativeId(1), &[runner.clone()]).unwrap();

        assert_eq!(cache.load(AuthoritativeId(1)).unwrap(), vec![runner]);
        assert!(cache.load(AuthoritativeId(2)).unwrap().is_empty());
    }

    #[test]
    fn test_runner_and_result_caches_do_not_collide() {
        let store = Arc::new(MemoryKvStore::new());
        let runners = runner_cache(Arc::clone(&store));
        let results = result_cache(store);

        runners
            .save(
                AuthoritativeId(1),
                &[Runner::provisional(AuthoritativeId(1), 7, None)],
            )
            .unwrap();
        assert!(results.load(AuthoritativeId(1)).unwrap().is_empty());
    }
}
