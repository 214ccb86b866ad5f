use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::ManagedTexture;

struct CacheEntry {
    texture: Arc<ManagedTexture>,
    ref_count: usize,
}

/// Keyed store of managed textures with a live-reference count per key.
///
/// Lookup, insertion, count changes and eviction all happen under one lock.
/// An entry exists exactly as long as its count is non-zero; the release that
/// takes the count to zero evicts it.
#[derive(Default)]
pub struct TextureCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    evictions: AtomicUsize,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a reference to the entry for `key`, inserting `make()` with a
    /// count of one if there is none. Returns the texture and whether it was
    /// inserted by this call.
    pub(crate) fn acquire(
        &self,
        key: &str,
        make: impl FnOnce() -> ManagedTexture,
    ) -> (Arc<ManagedTexture>, bool) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.ref_count += 1;
            return (entry.texture.clone(), false);
        }

        let texture = Arc::new(make());
        entries.insert(
            key.to_owned(),
            CacheEntry {
                texture: texture.clone(),
                ref_count: 1,
            },
        );
        (texture, true)
    }

    /// Add a reference to the entry holding `texture`.
    pub(crate) fn retain(&self, texture: &Arc<ManagedTexture>) {
        if let Some(entry) = self.entries.lock().get_mut(texture.key())
            && Arc::ptr_eq(&entry.texture, texture)
        {
            entry.ref_count += 1;
        }
    }

    /// Drop a reference to the entry holding `texture`, evicting it when the
    /// count reaches zero. Returns whether the entry was evicted.
    pub(crate) fn release(&self, texture: &Arc<ManagedTexture>) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(texture.key()) else {
            return false;
        };
        // The key may have been removed and reloaded since this reference was taken.
        if !Arc::ptr_eq(&entry.texture, texture) {
            return false;
        }

        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return false;
        }
        self.evict(&mut entries, texture.key())
    }

    /// Remove `key` if nothing references it.
    ///
    /// Returns `false` when the key is absent or still referenced; live
    /// entries are only ever evicted by their last release.
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(key).map(|entry| entry.ref_count) {
            Some(ref_count) if ref_count > 0 => {
                log::warn!("refusing to destroy texture '{key}' with {ref_count} live references");
                false
            }
            Some(_) => self.evict(&mut entries, key),
            None => false,
        }
    }

    fn evict(&self, entries: &mut HashMap<String, CacheEntry>, key: &str) -> bool {
        if entries.remove(key).is_none() {
            return false;
        }
        self.evictions.fetch_add(1, Ordering::AcqRel);
        log::debug!("evicted texture '{}'", key);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Live references to `key`, `None` if it is not cached.
    pub fn ref_count(&self, key: &str) -> Option<usize> {
        self.entries.lock().get(key).map(|entry| entry.ref_count)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of entries evicted so far.
    pub fn eviction_count(&self) -> usize {
        self.evictions.load(Ordering::Acquire)
    }

    /// Forget every entry. Outstanding references become detached.
    pub fn clear(&self) {
        let drained: Vec<_> = self.entries.lock().drain().collect();
        if !drained.is_empty() {
            log::debug!("clearing {} cached textures", drained.len());
        }
    }
}

static_assertions::assert_impl_all!(TextureCache: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_inserts_once() {
        let cache = TextureCache::new();
        let (a, inserted_a) = cache.acquire("a.png", || ManagedTexture::new("a.png"));
        let (b, inserted_b) = cache.acquire("a.png", || unreachable!());
        assert!(inserted_a && !inserted_b);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.ref_count("a.png"), Some(2));
    }

    #[test]
    fn last_release_evicts() {
        let cache = TextureCache::new();
        let (texture, _) = cache.acquire("a.png", || ManagedTexture::new("a.png"));
        cache.retain(&texture);

        assert!(!cache.release(&texture));
        assert!(cache.contains("a.png"));
        assert!(cache.release(&texture));
        assert!(!cache.contains("a.png"));
        assert_eq!(cache.eviction_count(), 1);
    }

    #[test]
    fn referenced_entries_cannot_be_removed() {
        let cache = TextureCache::new();
        let (texture, _) = cache.acquire("a.png", || ManagedTexture::new("a.png"));

        assert!(!cache.remove("a.png"));
        assert!(!cache.remove("missing.png"));
        assert_eq!(cache.ref_count("a.png"), Some(1));
        assert_eq!(cache.eviction_count(), 0);

        assert!(cache.release(&texture));
        assert!(!cache.remove("a.png"));
        assert_eq!(cache.eviction_count(), 1);
    }

    #[test]
    fn stale_release_leaves_a_reloaded_entry_alone() {
        let cache = TextureCache::new();
        let (old, _) = cache.acquire("a.png", || ManagedTexture::new("a.png"));
        cache.clear();
        let (new, inserted) = cache.acquire("a.png", || ManagedTexture::new("a.png"));
        assert!(inserted);

        assert!(!cache.release(&old));
        assert_eq!(cache.ref_count("a.png"), Some(1));
        assert!(cache.release(&new));
    }
}
