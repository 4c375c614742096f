//! Deduplication of concurrent requests for the same key.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use super::key::CacheKey;

#[derive(Debug)]
struct Registration {
    id: u64,
    token: CancellationToken,
}

/// Keys with an outstanding request, each with its cancellation token.
///
/// [`InFlightRequests::try_register`] hands out an [`InFlightGuard`] that
/// unregisters the key when dropped, whether the task finished, failed,
/// was cancelled or panicked.
#[derive(Debug, Clone, Default)]
pub struct InFlightRequests {
    requests: Arc<DashMap<CacheKey, Registration>>,
    next_id: Arc<AtomicU64>,
}

impl InFlightRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` unless a request for it is already outstanding.
    ///
    /// # Returns
    ///
    /// `None` when the key is already in flight.
    pub fn try_register(&self, key: CacheKey) -> Option<InFlightGuard> {
        match self.requests.entry(key.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let token = CancellationToken::new();
                vacant.insert(Registration {
                    id,
                    token: token.clone(),
                });
                Some(InFlightGuard {
                    key,
                    id,
                    token,
                    requests: Arc::clone(&self.requests),
                })
            }
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.requests.contains_key(key)
    }

    /// Signal cancellation for `key`. Returns whether it was in flight.
    ///
    /// The entry stays registered until its guard is dropped.
    pub fn cancel(&self, key: &CacheKey) -> bool {
        match self.requests.get(key) {
            Some(registration) => {
                registration.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for registration in self.requests.iter() {
            registration.token.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        self.requests.iter().map(|r| r.key().clone()).collect()
    }
}

/// Registration of one in-flight request; unregisters on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    key: CacheKey,
    id: u64,
    token: CancellationToken,
    requests: Arc<DashMap<CacheKey, Registration>>,
}

impl InFlightGuard {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Token cancelled by [`InFlightRequests::cancel`].
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // Only remove our own registration.
        self.requests.remove_if(&self.key, |_, r| r.id == self.id);
    }
}
