use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::model::Collection;

/// Session scoped store of loaded collections, keyed by collection id.
///
/// Entries are never evicted; the cache grows with the number of distinct
/// collections opened during a session. Values are swapped in as whole `Arc`s,
/// so a reader sees either the previous collection or the new one.
#[derive(Debug, Default)]
pub struct CollectionCache {
    entries: RwLock<HashMap<String, Arc<Collection>>>,
}

impl CollectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Collection>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Stores `collection` under `id`, replacing any previous entry.
    pub fn put(&self, id: &str, collection: Collection) -> Arc<Collection> {
        let collection = Arc::new(collection);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), collection.clone());
        collection
    }

    pub fn invalidate(&self, id: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{collection, track};

    #[test]
    fn test_get_missing() {
        let cache = CollectionCache::new();
        assert!(cache.get("1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_then_get_returns_same_tracks() {
        let cache = CollectionCache::new();
        cache.put("1", collection("1", vec![track("a"), track("b")]));

        let cached = cache.get("1").unwrap();
        let ids: Vec<_> = cached.tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_put_overwrites_same_key() {
        let cache = CollectionCache::new();
        cache.put("1", collection("1", vec![track("a")]));
        cache.put("1", collection("1", vec![track("b"), track("c")]));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("1").unwrap().len(), 2);
    }

    #[test]
    fn test_invalidate() {
        let cache = CollectionCache::new();
        cache.put("1", collection("1", vec![track("a")]));
        cache.put("2", collection("2", vec![track("b")]));

        assert!(cache.invalidate("1"));
        assert!(!cache.invalidate("1"));
        assert!(cache.get("1").is_none());
        assert!(cache.get("2").is_some());
    }

    #[test]
    fn test_reader_keeps_old_entry_after_overwrite() {
        let cache = CollectionCache::new();
        cache.put("1", collection("1", vec![track("a")]));
        let before = cache.get("1").unwrap();

        cache.put("1", collection("1", vec![track("b")]));

        assert_eq!(before.tracks[0].id, "a");
        assert_eq!(cache.get("1").unwrap().tracks[0].id, "b");
    }

    #[test]
    fn test_concurrent_puts_on_distinct_keys() {
        let cache = Arc::new(CollectionCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    let id = i.to_string();
                    cache.put(&id, collection(&id, vec![track(&id)]));
                    cache.get(&id).is_some()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(cache.len(), 8);
    }
}
