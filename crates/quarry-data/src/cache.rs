// Copyright 2025 the quarry developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use quarry_core::{CacheLedger, LoadError, Resource};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A single LRU store with a byte budget, holding resources of one category.
///
/// The key map holds the cache's one strong reference per entry; the LRU
/// list orders canonical keys with the most recently used at the front.
/// Eviction only ever touches entries the cache solely owns — a resource
/// with an outstanding external handle is never removed by the budget
/// sweep, so a pointer a caller holds stays valid for as long as they hold
/// it. The flip side: a cache full of externally held resources cannot be
/// shrunk.
///
/// The cache is single-writer by design. It is owned and mutated by the
/// main context only; background workers never touch it.
pub struct ResourceCache {
    lru: VecDeque<String>,
    entries: HashMap<String, Arc<Resource>>,
    ledger: Arc<CacheLedger>,
    max_bytes: usize,
    allow_oversized: bool,
}

impl ResourceCache {
    /// Creates a cache with the given byte budget. When `allow_oversized`
    /// is set, a single resource larger than the whole budget may be
    /// admitted as the sole resident.
    pub fn new(max_bytes: usize, allow_oversized: bool) -> Self {
        Self {
            lru: VecDeque::new(),
            entries: HashMap::new(),
            ledger: Arc::new(CacheLedger::new()),
            max_bytes,
            allow_oversized,
        }
    }

    /// Looks up `key`, marking the entry most recently used on a hit.
    pub fn get(&mut self, key: &str) -> Option<Arc<Resource>> {
        let resource = self.entries.get(key)?.clone();
        self.touch(key);
        Some(resource)
    }

    /// Admits a resource under `key`, charging `size` bytes to the budget.
    ///
    /// Duplicate keys are rejected, never overwritten. On success the entry
    /// is most recently used and the resource's ledger back-reference points
    /// at this cache. `size` must match the resource's own size estimate so
    /// the bytes reported back on destruction balance the charge.
    pub fn add(&mut self, key: &str, size: usize, resource: Arc<Resource>) -> Result<(), LoadError> {
        if self.entries.contains_key(key) {
            log::warn!("'{key}' already exists, add to cache failed");
            return Err(LoadError::DuplicateKey {
                key: key.to_string(),
            });
        }
        if !self.make_room(size) {
            return Err(LoadError::CacheBudgetExceeded {
                key: key.to_string(),
                size,
            });
        }
        resource.attach_ledger(&self.ledger);
        self.ledger.charge(size);
        self.lru.push_front(key.to_string());
        self.entries.insert(key.to_string(), resource);
        Ok(())
    }

    /// Forces `key` out of the cache regardless of LRU position.
    ///
    /// Only the cache's own strong reference is dropped; final destruction
    /// (and the freed-bytes report) still waits for external holders.
    pub fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_none() {
            return false;
        }
        if let Some(pos) = self.lru.iter().position(|k| k == key) {
            self.lru.remove(pos);
        }
        log::debug!("'{key}' removed from cache, {} entries remain", self.lru.len());
        true
    }

    /// Drops every entry. Externally held resources survive until their
    /// holders release them.
    pub fn clear(&mut self) {
        self.lru.clear();
        self.entries.clear();
    }

    /// Whether `size` additional bytes fit without eviction.
    pub fn has_room(&self, size: usize) -> bool {
        self.used_bytes().saturating_add(size) <= self.max_bytes
    }

    /// Bytes currently charged to the budget.
    pub fn used_bytes(&self) -> usize {
        self.ledger.used()
    }

    /// The configured byte budget.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evicts least-recently-used, solely-owned entries until `size` bytes
    /// fit. Returns `false` when the sweep cannot free enough room; an
    /// oversized request is admitted only into an emptied cache and only
    /// when the cache was configured for it.
    fn make_room(&mut self, size: usize) -> bool {
        if self.has_room(size) {
            return true;
        }
        // Scan from the least recently used end. An entry is evictable iff
        // the map holds the only remaining strong reference; evicting an
        // externally held resource would let a later request stream a second
        // copy while the first is still alive.
        let mut idx = self.lru.len();
        while idx > 0 {
            idx -= 1;
            let evictable = self
                .lru
                .get(idx)
                .and_then(|key| self.entries.get(key))
                .is_some_and(|res| Arc::strong_count(res) == 1);
            if !evictable {
                continue;
            }
            if let Some(key) = self.lru.remove(idx) {
                // Final drop: the resource reports its bytes to the ledger.
                self.entries.remove(&key);
                log::debug!("Evicted '{key}'");
            }
            if self.has_room(size) {
                return true;
            }
        }
        if self.lru.is_empty() && self.allow_oversized {
            log::debug!(
                "Admitting oversized resident: {size} bytes against a {} byte budget",
                self.max_bytes
            );
            return true;
        }
        log::warn!(
            "Out of room: {size} bytes requested, {} used of {}",
            self.used_bytes(),
            self.max_bytes
        );
        false
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.lru.iter().position(|k| k == key) {
            if pos != 0 {
                if let Some(k) = self.lru.remove(pos) {
                    self.lru.push_front(k);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::{HookError, ResourcePayload};
    use std::any::Any;

    struct Blob;

    impl ResourcePayload for Blob {
        fn on_load(&self, _bytes: &[u8], _background: bool) -> Result<(), HookError> {
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn resource(key: &str, size: usize) -> Arc<Resource> {
        Arc::new(Resource::with_size(key, size, Box::new(Blob)))
    }

    fn add(cache: &mut ResourceCache, key: &str, size: usize) -> Result<(), LoadError> {
        cache.add(key, size, resource(key, size))
    }

    #[test]
    fn add_then_get_returns_same_instance() {
        let mut cache = ResourceCache::new(10, false);
        let res = resource("s/a", 4);
        cache.add("s/a", 4, res.clone()).unwrap();
        let used = cache.used_bytes();
        let hit = cache.get("s/a").unwrap();
        assert!(Arc::ptr_eq(&res, &hit));
        // A get never changes the budget arithmetic.
        assert_eq!(cache.used_bytes(), used);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut cache = ResourceCache::new(10, false);
        add(&mut cache, "s/a", 4).unwrap();
        assert!(matches!(
            add(&mut cache, "s/a", 4),
            Err(LoadError::DuplicateKey { .. })
        ));
        assert_eq!(cache.used_bytes(), 4);
    }

    #[test]
    fn lru_eviction_frees_the_least_recently_used() {
        // Scenario: budget 10; A(4), B(4) fit; C(4) evicts A.
        let mut cache = ResourceCache::new(10, false);
        add(&mut cache, "s/a", 4).unwrap();
        add(&mut cache, "s/b", 4).unwrap();
        assert_eq!(cache.used_bytes(), 8);

        add(&mut cache, "s/c", 4).unwrap();
        assert_eq!(cache.used_bytes(), 8);
        assert!(cache.get("s/a").is_none());
        assert!(cache.get("s/b").is_some());
        assert!(cache.get("s/c").is_some());
    }

    #[test]
    fn get_refreshes_recency() {
        let mut cache = ResourceCache::new(10, false);
        add(&mut cache, "s/a", 4).unwrap();
        add(&mut cache, "s/b", 4).unwrap();
        // Touch A so B becomes the eviction candidate.
        assert!(cache.get("s/a").is_some());

        add(&mut cache, "s/c", 4).unwrap();
        assert!(cache.get("s/a").is_some());
        assert!(cache.get("s/b").is_none());
    }

    #[test]
    fn externally_held_resources_are_never_evicted() {
        // Scenario: budget 10; hold A externally; C cannot fit.
        let mut cache = ResourceCache::new(10, false);
        let a = resource("s/a", 4);
        cache.add("s/a", 4, a.clone()).unwrap();
        add(&mut cache, "s/b", 4).unwrap();
        // With both entries held the sweep can free nothing.
        let b_held = cache.get("s/b").unwrap();
        assert!(matches!(
            add(&mut cache, "s/c", 4),
            Err(LoadError::CacheBudgetExceeded { .. })
        ));
        assert!(cache.get("s/a").is_some());
        assert!(cache.get("s/b").is_some());
        drop(b_held);
        drop(a);
    }

    #[test]
    fn oversized_resident_allowed_when_configured() {
        // Scenario: empty cache, budget 10, oversized allowed.
        let mut cache = ResourceCache::new(10, true);
        let d = resource("s/d", 20);
        cache.add("s/d", 20, d.clone()).unwrap();
        assert_eq!(cache.used_bytes(), 20);

        // While D is held, nothing else fits.
        assert!(matches!(
            add(&mut cache, "s/e", 1),
            Err(LoadError::CacheBudgetExceeded { .. })
        ));

        // Releasing and removing D makes room again.
        drop(d);
        assert!(cache.remove("s/d"));
        assert_eq!(cache.used_bytes(), 0);
        add(&mut cache, "s/e", 1).unwrap();
    }

    #[test]
    fn oversized_resident_rejected_when_not_configured() {
        let mut cache = ResourceCache::new(10, false);
        assert!(matches!(
            add(&mut cache, "s/d", 20),
            Err(LoadError::CacheBudgetExceeded { .. })
        ));
        assert!(cache.is_empty());
        assert_eq!(cache.used_bytes(), 0);
    }

    #[test]
    fn forced_remove_defers_freed_bytes_to_the_last_holder() {
        let mut cache = ResourceCache::new(10, false);
        let a = resource("s/a", 4);
        cache.add("s/a", 4, a.clone()).unwrap();
        assert!(cache.remove("s/a"));
        assert!(cache.get("s/a").is_none());
        // The external handle keeps the bytes charged.
        assert_eq!(cache.used_bytes(), 4);
        drop(a);
        assert_eq!(cache.used_bytes(), 0);
    }

    #[test]
    fn used_bytes_tracks_resident_sum() {
        let mut cache = ResourceCache::new(100, false);
        add(&mut cache, "s/a", 10).unwrap();
        add(&mut cache, "s/b", 20).unwrap();
        add(&mut cache, "s/c", 30).unwrap();
        assert_eq!(cache.used_bytes(), 60);
        assert!(cache.remove("s/b"));
        assert_eq!(cache.used_bytes(), 40);
        cache.clear();
        assert_eq!(cache.used_bytes(), 0);
        assert!(cache.is_empty());
    }
}
