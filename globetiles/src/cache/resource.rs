//! Key → resource store with TTL expiration and LRU capacity eviction.
//!
//! Backed by `moka::sync::Cache` configured for plain LRU eviction, with a
//! per-entry [`Expiry`] derived from each entry's [`CachePolicy`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use moka::Expiry;
use tracing::trace;

use super::key::CacheKey;
use super::policy::CachePolicy;
use super::CacheStats;

/// Default maximum number of live entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

#[derive(Clone)]
struct Cached<V> {
    value: V,
    policy: CachePolicy,
}

/// Expiration read from the entry's own policy.
///
/// Create, update and read all restart the TTL, so an entry expires once it
/// has gone unused for its TTL.
struct PolicyExpiry;

impl<V> Expiry<CacheKey, Cached<V>> for PolicyExpiry {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &Cached<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.policy.ttl()
    }

    fn expire_after_read(
        &self,
        _key: &CacheKey,
        value: &Cached<V>,
        _read_at: Instant,
        _duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        value.policy.ttl()
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &Cached<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.policy.ttl()
    }
}

/// Statistics, using atomics for lock-free updates.
#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

/// Thread-safe resource cache.
///
/// Each entry carries a [`CachePolicy`]. TTL entries expire once they have
/// not been accessed for their TTL; [`ResourceCache::get`] refreshes that
/// clock. Independently of TTL, the number of entries never exceeds
/// `capacity`: inserting past it evicts the least recently used entries.
///
/// # Example
///
/// ```
/// use globetiles::cache::{CacheKey, CachePolicy, ResourceCache};
///
/// let cache = ResourceCache::new(CachePolicy::TEXTURE);
/// cache.set("pixels".to_string(), CacheKey::from(("foo", "toto")));
/// assert_eq!(cache.get(&CacheKey::from(("foo", "toto"))), Some("pixels".to_string()));
/// ```
pub struct ResourceCache<V> {
    store: Cache<CacheKey, Cached<V>>,
    default_policy: CachePolicy,
    capacity: usize,
    counters: Arc<Counters>,
}

fn build_store<V>(capacity: usize, counters: Arc<Counters>) -> Cache<CacheKey, Cached<V>>
where
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .max_capacity(capacity as u64)
        // Strict recency order, no frequency-based admission.
        .eviction_policy(EvictionPolicy::lru())
        .expire_after(PolicyExpiry)
        .eviction_listener(move |key: Arc<CacheKey>, _value, cause| match cause {
            RemovalCause::Size => {
                counters.evictions.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "Cache entry evicted");
            }
            RemovalCause::Expired => {
                counters.expirations.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "Cache entry expired");
            }
            _ => {}
        })
        .build()
}

impl<V> ResourceCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache with the default capacity.
    ///
    /// # Arguments
    ///
    /// * `default_policy` - Policy applied by [`ResourceCache::set`]
    pub fn new(default_policy: CachePolicy) -> Self {
        let counters = Arc::new(Counters::default());
        Self {
            store: build_store(DEFAULT_CACHE_CAPACITY, Arc::clone(&counters)),
            default_policy,
            capacity: DEFAULT_CACHE_CAPACITY,
            counters,
        }
    }

    /// Set the maximum number of live entries.
    ///
    /// Rebuilds the underlying store, so call it before inserting.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.store = build_store(capacity, Arc::clone(&self.counters));
        self.capacity = capacity;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_policy(&self) -> CachePolicy {
        self.default_policy
    }

    /// Look up `key`, refreshing its recency and TTL clock.
    ///
    /// Expired entries are reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        match self.store.get(key) {
            Some(cached) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(cached.value)
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or overwrite `key` with the default policy.
    ///
    /// # Returns
    ///
    /// The stored value.
    pub fn set(&self, value: V, key: CacheKey) -> V {
        self.set_with_policy(value, key, self.default_policy)
    }

    /// Insert or overwrite `key` with an explicit policy.
    pub fn set_with_policy(&self, value: V, key: CacheKey, policy: CachePolicy) -> V {
        self.store.insert(
            key,
            Cached {
                value: value.clone(),
                policy,
            },
        );
        // Apply capacity eviction before returning.
        self.store.run_pending_tasks();
        value
    }

    /// Remove `key`. Returns whether an entry was removed.
    pub fn delete(&self, key: &CacheKey) -> bool {
        self.store.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.store.invalidate_all();
        self.store.run_pending_tasks();
    }

    /// Whether a live entry exists, without refreshing it.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.store.contains_key(key)
    }

    /// Number of stored entries as of the last maintenance run.
    pub fn len(&self) -> usize {
        self.store.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let before = self.counters.expirations.load(Ordering::Relaxed);
        self.store.run_pending_tasks();
        let after = self.counters.expirations.load(Ordering::Relaxed);
        after.saturating_sub(before) as usize
    }

    /// Live keys, in no particular order.
    pub fn live_keys(&self) -> Vec<CacheKey> {
        self.store.iter().map(|(key, _)| (*key).clone()).collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl<V> std::fmt::Debug for ResourceCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("capacity", &self.capacity)
            .field("default_policy", &self.default_policy)
            .finish_non_exhaustive()
    }
}
