use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;

/// Entries kept before the least recently used one is evicted.
pub const DEFAULT_CACHE_ENTRIES: usize = 512;

/// Rendered responses, tagged with the site page they belong to.
///
/// Revalidating a page evicts every entry carrying its tag. The cache holds at
/// most `max_entries` responses; beyond that the least recently used goes.
#[derive(Debug)]
pub struct PageCache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
    tick: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct CachedPage {
    pub page: String,
    pub content_type: &'static str,
    pub body: Bytes,
}

#[derive(Debug)]
struct CacheEntry {
    page: CachedPage,
    last_used_tick: u64,
}

impl Default for PageCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_ENTRIES)
    }
}

impl PageCache {
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            tick: AtomicU64::new(0),
        }
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed)
    }

    pub fn get(&self, key: &str) -> Option<CachedPage> {
        let tick = self.next_tick();
        let mut entry = self.entries.get_mut(key)?;
        entry.last_used_tick = tick;
        Some(entry.page.clone())
    }

    pub fn insert(&self, key: impl Into<String>, page: CachedPage) {
        let key = key.into();
        if !self.entries.contains_key(&key) {
            while self.entries.len() >= self.max_entries {
                if !self.evict_least_recent() {
                    break;
                }
            }
        }
        let last_used_tick = self.next_tick();
        self.entries.insert(
            key,
            CacheEntry {
                page,
                last_used_tick,
            },
        );
    }

    fn evict_least_recent(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by(|a, b| {
                a.last_used_tick
                    .cmp(&b.last_used_tick)
                    .then_with(|| a.key().cmp(b.key()))
            })
            .map(|e| e.key().clone());
        match oldest {
            Some(key) => self.entries.remove(&key).is_some(),
            None => false,
        }
    }

    /// Evicts all entries of `page`; returns how many were dropped.
    pub fn invalidate_page(&self, page: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.page.page != page);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{CachedPage, PageCache};

    fn page(tag: &str) -> CachedPage {
        CachedPage {
            page: tag.to_string(),
            content_type: "text/plain",
            body: Bytes::from_static(b"x"),
        }
    }

    #[test]
    fn invalidates_by_page_tag() {
        let cache = PageCache::default();
        cache.insert("/globe.svg?visited=usa", page("/"));
        cache.insert("/globe.svg?visited=fr", page("/"));
        cache.insert("/posts/lisbon", page("/posts/lisbon"));

        assert_eq!(cache.invalidate_page("/"), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("/posts/lisbon").is_some());
        assert_eq!(cache.invalidate_page("/posts/porto"), 0);
    }

    #[test]
    fn evicts_least_recently_used_at_capacity() {
        let cache = PageCache::with_capacity(2);
        cache.insert("a", page("/"));
        cache.insert("b", page("/"));
        assert!(cache.get("a").is_some());

        cache.insert("c", page("/"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());

        // Replacing an existing key never evicts.
        cache.insert("c", page("/posts/x"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
    }

    #[test]
    fn many_distinct_keys_stay_bounded() {
        let cache = PageCache::with_capacity(8);
        for i in 0..100 {
            cache.insert(format!("/globe.svg?k={i}"), page("/"));
        }
        assert_eq!(cache.len(), 8);
        assert!(cache.get("/globe.svg?k=99").is_some());
    }
}
