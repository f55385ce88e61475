//! Bounded LRU caches for header processing.
//!
//! Tokens minted by one issuer reuse the same header bytes, so the
//! reader caches parsed headers keyed by the exact encoded segment, and
//! the writer caches encoded headers keyed by their JSON. Capacity is
//! small (16 by default), which makes a linear-scan vector the right
//! structure; entries move to the back on hit and evict from the front.

use parking_lot::Mutex;

pub(crate) const DEFAULT_CAPACITY: usize = 16;

pub(crate) struct LruCache<K, V> {
    entries: Mutex<Vec<(K, V)>>,
    capacity: usize,
}

impl<K: PartialEq, V: Clone> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        let mut entries = self.entries.lock();
        let index = entries
            .iter()
            .position(|(existing, _)| existing.borrow() == key)?;
        let entry = entries.remove(index);
        let value = entry.1.clone();
        entries.push(entry);
        Some(value)
    }

    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock();
        if let Some(index) = entries.iter().position(|(existing, _)| *existing == key) {
            entries.remove(index);
        } else if entries.len() == self.capacity {
            entries.remove(0);
        }
        entries.push((key, value));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_and_miss() {
        let cache: LruCache<String, u32> = LruCache::new(4);
        cache.insert("a".into(), 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache: LruCache<String, u32> = LruCache::new(2);
        cache.insert("a".into(), 1);
        cache.insert("b".into(), 2);
        // Touch "a" so "b" becomes the eviction candidate.
        assert_eq!(cache.get("a"), Some(1));
        cache.insert("c".into(), 3);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn reinsert_updates_value_without_growth() {
        let cache: LruCache<String, u32> = LruCache::new(2);
        cache.insert("a".into(), 1);
        cache.insert("a".into(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(2));
    }

    #[test]
    fn capacity_is_bounded() {
        let cache: LruCache<u32, u32> = LruCache::new(4);
        for i in 0..100 {
            cache.insert(i, i);
        }
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get(&99), Some(99));
        assert_eq!(cache.get(&0), None);
    }

    #[test]
    fn byte_key_lookup() {
        let cache: LruCache<Vec<u8>, u32> = LruCache::new(4);
        cache.insert(b"header".to_vec(), 7);
        assert_eq!(cache.get(b"header".as_slice()), Some(7));
    }
}
