//! Deduplicated, cancellable tile loading on a tokio runtime.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use super::{FetchError, FetchRequest, ResourceKind, TileFetcher};
use crate::cache::{CacheStats, InFlightRequests, ResourceCache};
use crate::lod::ReadinessGate;
use crate::tile::TileId;

/// Poll interval of [`TileLoader::wait_idle`].
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Lifecycle of one tile resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Unloaded,
    Loading,
    Ready,
    /// Terminal until [`TileLoader::forget_failure`].
    Failed,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceState::Unloaded => write!(f, "unloaded"),
            ResourceState::Loading => write!(f, "loading"),
            ResourceState::Ready => write!(f, "ready"),
            ResourceState::Failed => write!(f, "failed"),
        }
    }
}

/// Result of [`TileLoader::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The resource is already cached; nothing was fetched.
    Cached,
    /// A fetch for the tile is already outstanding.
    AlreadyInFlight,
    /// A new fetch task was started.
    Spawned,
    /// An earlier fetch failed; the tile is not retried.
    PreviouslyFailed,
}

/// Readiness of every known tile, captured at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessSnapshot {
    pub ready: HashSet<TileId>,
    pub loading: HashSet<TileId>,
    pub failed: HashSet<TileId>,
}

impl ReadinessGate for ReadinessSnapshot {
    fn is_ready(&self, tile: TileId) -> bool {
        self.ready.contains(&tile)
    }

    fn is_loading(&self, tile: TileId) -> bool {
        self.loading.contains(&tile)
    }

    fn is_failed(&self, tile: TileId) -> bool {
        self.failed.contains(&tile)
    }
}

/// Loads one kind of tile resource into a cache.
///
/// At most one fetch per tile is outstanding. Successful fetches land in
/// the cache with the kind's [`CachePolicy`](crate::cache::CachePolicy).
/// Failures are remembered and the tile is not requested again until
/// [`TileLoader::forget_failure`] is called.
pub struct TileLoader<R> {
    fetcher: Arc<dyn TileFetcher<Resource = R>>,
    kind: ResourceKind,
    cache: Arc<ResourceCache<R>>,
    in_flight: InFlightRequests,
    failed: Arc<DashMap<TileId, FetchError>>,
    handle: Handle,
}

impl<R: Clone + Send + Sync + 'static> TileLoader<R> {
    /// Create a loader spawning its fetches on `handle`.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Retrieves and decodes resources
    /// * `kind` - Kind of resource loaded; selects the cache policy
    /// * `cache` - Destination of loaded resources
    /// * `handle` - Runtime the fetch tasks run on
    pub fn new(
        fetcher: Arc<dyn TileFetcher<Resource = R>>,
        kind: ResourceKind,
        cache: Arc<ResourceCache<R>>,
        handle: Handle,
    ) -> Self {
        Self {
            fetcher,
            kind,
            cache,
            in_flight: InFlightRequests::new(),
            failed: Arc::new(DashMap::new()),
            handle,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn cache(&self) -> &Arc<ResourceCache<R>> {
        &self.cache
    }

    /// Start fetching `request.tile` unless it is cached, in flight or
    /// failed.
    pub fn request(&self, request: FetchRequest) -> RequestOutcome {
        let tile = request.tile;
        if self.failed.contains_key(&tile) {
            return RequestOutcome::PreviouslyFailed;
        }

        let key = tile.cache_key();
        if self.cache.contains(&key) {
            return RequestOutcome::Cached;
        }

        let Some(guard) = self.in_flight.try_register(key.clone()) else {
            return RequestOutcome::AlreadyInFlight;
        };

        let fetcher = Arc::clone(&self.fetcher);
        let cache = Arc::clone(&self.cache);
        let failed = Arc::clone(&self.failed);
        let policy = self.kind.policy();
        let kind = self.kind;

        trace!(tile = %tile, kind = %kind, url = %request.url, "Spawning tile fetch");
        self.handle.spawn(async move {
            // Unregisters the key however this task ends.
            let guard = guard;
            let token = guard.token().clone();

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(tile = %tile, kind = %kind, "Tile fetch cancelled");
                }
                result = fetcher.fetch(&request) => match result {
                    Ok(resource) => {
                        cache.set_with_policy(resource, key, policy);
                        debug!(tile = %tile, kind = %kind, "Tile resource loaded");
                    }
                    Err(e) => {
                        warn!(tile = %tile, kind = %kind, error = %e, "Tile fetch failed");
                        failed.insert(tile, e);
                    }
                }
            }
            drop(guard);
        });

        RequestOutcome::Spawned
    }

    /// Current state of a tile's resource.
    pub fn state(&self, tile: TileId) -> ResourceState {
        let key = tile.cache_key();
        if self.cache.contains(&key) {
            ResourceState::Ready
        } else if self.in_flight.contains(&key) {
            ResourceState::Loading
        } else if self.failed.contains_key(&tile) {
            ResourceState::Failed
        } else {
            ResourceState::Unloaded
        }
    }

    /// Cached resource of `tile`, refreshing its recency and TTL.
    pub fn get(&self, tile: TileId) -> Option<R> {
        self.cache.get(&tile.cache_key())
    }

    /// Error of the failed fetch of `tile`, if any.
    pub fn failure(&self, tile: TileId) -> Option<FetchError> {
        self.failed.get(&tile).map(|e| e.value().clone())
    }

    /// Allow a failed tile to be requested again.
    pub fn forget_failure(&self, tile: TileId) -> bool {
        self.failed.remove(&tile).is_some()
    }

    /// Cancel the outstanding fetch of `tile`.
    ///
    /// # Returns
    ///
    /// `true` if a fetch was in flight.
    pub fn cancel(&self, tile: TileId) -> bool {
        let cancelled = self.in_flight.cancel(&tile.cache_key());
        if cancelled {
            debug!(tile = %tile, kind = %self.kind, "Cancelling tile fetch");
        }
        cancelled
    }

    pub fn cancel_all(&self) {
        self.in_flight.cancel_all();
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Copy of the ready, loading and failed sets.
    pub fn snapshot(&self) -> ReadinessSnapshot {
        let ready = self
            .cache
            .live_keys()
            .iter()
            .filter_map(TileId::from_cache_key)
            .collect();
        let loading = self
            .in_flight
            .keys()
            .iter()
            .filter_map(TileId::from_cache_key)
            .collect();
        let failed = self.failed.iter().map(|entry| *entry.key()).collect();
        ReadinessSnapshot {
            ready,
            loading,
            failed,
        }
    }

    /// Wait until no fetch is outstanding.
    pub async fn wait_idle(&self) {
        while !self.in_flight.is_empty() {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }
}

impl<R> fmt::Debug for TileLoader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileLoader")
            .field("kind", &self.kind)
            .field("in_flight", &self.in_flight.len())
            .field("failed", &self.failed.len())
            .finish()
    }
}
