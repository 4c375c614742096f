//! Resource caching.
//!
//! [`ResourceCache`] stores decoded tile resources under composite keys with
//! per-entry expiration ([`CachePolicy`]) and a global LRU capacity.
//! [`InFlightRequests`] makes sure at most one request per key is
//! outstanding at any time.

mod inflight;
mod key;
mod policy;
mod resource;

use std::fmt;

pub use inflight::{InFlightGuard, InFlightRequests};
pub use key::{CacheKey, CacheKeyError, KeyPart, MAX_KEY_PARTS};
pub use policy::CachePolicy;
pub use resource::{ResourceCache, DEFAULT_CACHE_CAPACITY};

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries removed to stay within capacity.
    pub evictions: u64,
    /// Entries removed because their TTL elapsed.
    pub expirations: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Hits over lookups, `0.0` before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} hits, {} misses ({:.1}%), {} evicted, {} expired",
            self.entries,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.evictions,
            self.expirations
        )
    }
}
