//! Expiration policies.

use std::time::Duration;

/// How long an entry may stay unused before it expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CachePolicy {
    /// Never expires; only capacity eviction removes it.
    #[default]
    Infinite,
    /// Expires this long after its last access.
    Ttl(Duration),
}

impl CachePolicy {
    pub const INFINITE: CachePolicy = CachePolicy::Infinite;

    /// Decoded imagery tiles (15 minutes).
    pub const TEXTURE: CachePolicy = CachePolicy::Ttl(Duration::from_millis(900_000));

    /// Decoded elevation/geometry tiles (15 minutes).
    pub const GEOMETRY: CachePolicy = CachePolicy::Ttl(Duration::from_millis(900_000));

    /// Policy from an optional lifetime in milliseconds; `None` is infinite.
    pub fn from_millis(lifetime_ms: Option<u64>) -> Self {
        match lifetime_ms {
            Some(ms) => CachePolicy::Ttl(Duration::from_millis(ms)),
            None => CachePolicy::Infinite,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        match self {
            CachePolicy::Infinite => None,
            CachePolicy::Ttl(ttl) => Some(*ttl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        assert_eq!(CachePolicy::INFINITE.ttl(), None);
        assert_eq!(CachePolicy::TEXTURE.ttl(), Some(Duration::from_millis(900_000)));
        assert_eq!(CachePolicy::GEOMETRY.ttl(), Some(Duration::from_millis(900_000)));
    }

    #[test]
    fn test_from_millis() {
        assert_eq!(CachePolicy::from_millis(None), CachePolicy::Infinite);
        assert_eq!(
            CachePolicy::from_millis(Some(5)),
            CachePolicy::Ttl(Duration::from_millis(5))
        );
    }
}
