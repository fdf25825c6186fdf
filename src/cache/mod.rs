//! Page cache for the all-posts listing.
//!
//! Rendered responses are memoised for a short TTL (`cache.ttl_seconds`)
//! in a bounded LRU (`cache.max_entries`). Writes do not invalidate the
//! cache; a new post appears once the entry ages out or the cache is
//! cleared.

mod keys;
mod lock;
mod middleware;
mod store;

pub use keys::{hash_value, page_key};
pub use middleware::{PageCacheState, page_cache_layer};
pub use store::{CachedPage, PageCache};
