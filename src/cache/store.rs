//! Time-bounded store of rendered pages.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use metrics::{counter, histogram};
use tokio::time::Instant;
use tracing::debug;

use crate::infra::telemetry::{
    PAGE_CACHE_EVICT_TOTAL, PAGE_CACHE_HIT_TOTAL, PAGE_CACHE_MISS_TOTAL, PAGE_RENDER_MS,
};

use super::lock::{rw_read, rw_write};

/// A rendered response as stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPage {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

struct Entry {
    page: CachedPage,
    stored_at: Instant,
}

/// LRU of rendered pages with per-lookup freshness.
///
/// Entries are never invalidated by writes; they simply age out. No lock is
/// held while a page renders, so concurrent misses on one key may render
/// twice and the last store wins.
pub struct PageCache {
    entries: RwLock<LruCache<String, Entry>>,
}

impl PageCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Fresh entry for `key`, dropping it when older than `ttl`.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<CachedPage> {
        let mut entries = rw_write(&self.entries, "get");
        let fresh = entries
            .get(key)
            .map(|entry| entry.stored_at.elapsed() < ttl)?;
        if fresh {
            entries.get(key).map(|entry| entry.page.clone())
        } else {
            entries.pop(key);
            None
        }
    }

    pub fn insert(&self, key: String, page: CachedPage) {
        let evicted = rw_write(&self.entries, "insert").push(
            key.clone(),
            Entry {
                page,
                stored_at: Instant::now(),
            },
        );
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!(PAGE_CACHE_EVICT_TOTAL).increment(1);
        }
    }

    /// Return the cached page for `key` if younger than `ttl`, otherwise
    /// render, store and return it. A failed render stores nothing.
    pub async fn get_or_render<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        render: F,
    ) -> Result<CachedPage, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedPage, E>>,
    {
        if let Some(page) = self.get(key, ttl) {
            counter!(PAGE_CACHE_HIT_TOTAL).increment(1);
            debug!(target = "yatube::cache", key, outcome = "hit", "page cache");
            return Ok(page);
        }

        counter!(PAGE_CACHE_MISS_TOTAL).increment(1);
        debug!(target = "yatube::cache", key, outcome = "miss", "page cache");

        let started = Instant::now();
        let page = render().await?;
        histogram!(PAGE_RENDER_MS).record(started.elapsed().as_secs_f64() * 1000.0);

        self.insert(key.to_string(), page.clone());
        Ok(page)
    }

    pub fn clear(&self) {
        rw_write(&self.entries, "clear").clear();
        debug!(target = "yatube::cache", "page cache cleared");
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const TTL: Duration = Duration::from_secs(20);

    fn page(body: &'static str) -> CachedPage {
        CachedPage {
            status: 200,
            headers: vec![("content-type".into(), "text/html".into())],
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    fn cache(capacity: usize) -> PageCache {
        PageCache::new(NonZeroUsize::new(capacity).expect("non-zero capacity"))
    }

    #[tokio::test(start_paused = true)]
    async fn serves_stored_page_until_ttl_elapses() {
        let cache = cache(8);
        let renders = AtomicUsize::new(0);
        let render = |body: &'static str| {
            renders.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ()>(page(body)) }
        };

        let first = cache.get_or_render("/", TTL, || render("v1")).await;
        tokio::time::advance(Duration::from_secs(19)).await;
        let second = cache.get_or_render("/", TTL, || render("v2")).await;
        assert_eq!(first, second);
        assert_eq!(renders.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        let third = cache
            .get_or_render("/", TTL, || render("v3"))
            .await
            .expect("rendered");
        assert_eq!(third.body, Bytes::from_static(b"v3"));
        assert_eq!(renders.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_render_is_not_stored() {
        let cache = cache(8);
        let result = cache
            .get_or_render("/", TTL, || async { Err::<CachedPage, _>("boom") })
            .await;
        assert_eq!(result, Err("boom"));
        assert!(cache.is_empty());

        let page = cache
            .get_or_render("/", TTL, || async { Ok::<_, &str>(page("ok")) })
            .await
            .expect("rendered");
        assert_eq!(page.body, Bytes::from_static(b"ok"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn clear_forces_rerender() {
        let cache = cache(8);
        cache.insert("/".into(), page("old"));
        cache.clear();

        let fresh = cache
            .get_or_render("/", TTL, || async { Ok::<_, ()>(page("new")) })
            .await
            .expect("rendered");
        assert_eq!(fresh.body, Bytes::from_static(b"new"));
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = cache(2);
        cache.insert("a".into(), page("a"));
        cache.insert("b".into(), page("b"));
        assert!(cache.get("a", TTL).is_some());
        cache.insert("c".into(), page("c"));

        assert!(cache.get("a", TTL).is_some());
        assert!(cache.get("b", TTL).is_none());
        assert!(cache.get("c", TTL).is_some());
    }

    #[test]
    fn recovers_from_poisoned_lock() {
        let cache = cache(2);
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache.entries.write().expect("lock");
            panic!("poison page cache lock");
        }));

        cache.insert("/".into(), page("after"));
        assert!(cache.get("/", TTL).is_some());
    }
}
