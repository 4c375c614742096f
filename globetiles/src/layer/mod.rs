//! Tiled layers.
//!
//! A [`TiledLayer`] ties a data source to a tile hierarchy: every frame it
//! runs the subdivision controller against the loader's readiness, cancels
//! fetches for tiles that went away and requests resources for the tiles
//! that are now displayed.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::crs::CrsRegistry;
use crate::fetch::{FetchRequest, ReadinessSnapshot, RequestOutcome, TileLoader};
use crate::lod::{FrameUpdate, ReadinessGate, SubdivisionConfig, SubdivisionController, ViewState};
use crate::source::{SourceCapability, SourceError};
use crate::tile::{HierarchyError, SchemeTile, TileHierarchy, TileId};

/// Lifecycle of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerState {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for LayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerState::Unloaded => write!(f, "unloaded"),
            LayerState::Loading => write!(f, "loading"),
            LayerState::Ready => write!(f, "ready"),
            LayerState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LayerError {
    #[error("Layer '{layer}' is {state}, not ready")]
    NotReady { layer: String, state: LayerState },

    #[error("Unknown tile {0}")]
    UnknownTile(TileId),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

/// Readiness seen by the controller: loaded resources plus tiles the
/// source has no data for.
struct LayerReadiness<'a> {
    snapshot: &'a ReadinessSnapshot,
    no_data: &'a HashSet<TileId>,
}

impl ReadinessGate for LayerReadiness<'_> {
    fn is_ready(&self, tile: TileId) -> bool {
        self.snapshot.is_ready(tile) || self.no_data.contains(&tile)
    }

    fn is_loading(&self, tile: TileId) -> bool {
        self.snapshot.is_loading(tile)
    }

    fn is_failed(&self, tile: TileId) -> bool {
        self.snapshot.is_failed(tile)
    }
}

/// A quadtree of tiles fed by one source.
pub struct TiledLayer<R> {
    id: String,
    source: Arc<dyn SourceCapability>,
    registry: Arc<CrsRegistry>,
    hierarchy: TileHierarchy,
    controller: SubdivisionController,
    loader: TileLoader<R>,
    state: LayerState,
    /// Tiles outside the source's extent or zoom range.
    no_data: HashSet<TileId>,
}

impl<R: Clone + Send + Sync + 'static> TiledLayer<R> {
    pub fn new(
        id: impl Into<String>,
        source: Arc<dyn SourceCapability>,
        scheme: &SchemeTile,
        registry: Arc<CrsRegistry>,
        config: SubdivisionConfig,
        loader: TileLoader<R>,
    ) -> Result<Self, LayerError> {
        let hierarchy = TileHierarchy::new(scheme, &registry)?;
        Ok(Self {
            id: id.into(),
            source,
            registry,
            hierarchy,
            controller: SubdivisionController::new(config),
            loader,
            state: LayerState::Unloaded,
            no_data: HashSet::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> LayerState {
        self.state
    }

    pub fn source(&self) -> &Arc<dyn SourceCapability> {
        &self.source
    }

    pub fn hierarchy(&self) -> &TileHierarchy {
        &self.hierarchy
    }

    pub fn controller(&self) -> &SubdivisionController {
        &self.controller
    }

    pub fn loader(&self) -> &TileLoader<R> {
        &self.loader
    }

    /// Bring the source up. A failed layer may be initialized again.
    pub async fn initialize(&mut self) -> Result<(), LayerError> {
        if self.state == LayerState::Ready {
            return Ok(());
        }

        self.state = LayerState::Loading;
        debug!(layer = %self.id, source = %self.source.kind(), "Initializing layer");

        match self.source.initialize().await {
            Ok(()) => {
                self.state = LayerState::Ready;
                info!(
                    layer = %self.id,
                    source = %self.source.kind(),
                    crs = %self.source.crs(),
                    "Layer ready"
                );
                Ok(())
            }
            Err(e) => {
                self.state = LayerState::Failed;
                warn!(layer = %self.id, error = %e, "Layer initialization failed");
                Err(e.into())
            }
        }
    }

    /// Run one frame for `view`.
    pub fn update(&mut self, view: &ViewState) -> Result<FrameUpdate, LayerError> {
        if self.state != LayerState::Ready {
            return Err(LayerError::NotReady {
                layer: self.id.clone(),
                state: self.state,
            });
        }

        let snapshot = self.loader.snapshot();
        let readiness = LayerReadiness {
            snapshot: &snapshot,
            no_data: &self.no_data,
        };
        let update = self
            .controller
            .update(view, &mut self.hierarchy, &readiness);

        for &tile in update.merged.iter().chain(&update.culled) {
            self.loader.cancel(tile);
            self.no_data.remove(&tile);
        }
        // Failure records only cover tiles still in the tree.
        for &tile in &update.merged {
            self.loader.forget_failure(tile);
        }

        for display in &update.display {
            if let Some(fallback) = display.fallback {
                // Keeps displayed resources from expiring.
                let _ = self.loader.get(fallback);
            }
        }

        let mut spawned = 0usize;
        for &tile in &update.requests {
            match self.request(tile) {
                Ok(RequestOutcome::Spawned) => spawned += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!(layer = %self.id, tile = %tile, error = %e, "Failed to request tile");
                }
            }
        }

        debug!(
            layer = %self.id,
            frame = update.frame,
            displayed = update.display.len(),
            spawned,
            in_flight = self.loader.in_flight_count(),
            "Layer updated"
        );
        Ok(update)
    }

    /// Record the elevation range decoded for `tile`.
    pub fn set_tile_elevation(
        &mut self,
        tile: TileId,
        min_height: f64,
        max_height: f64,
    ) -> Result<(), LayerError> {
        let index = self
            .hierarchy
            .find(tile)
            .ok_or(LayerError::UnknownTile(tile))?;
        self.hierarchy.set_elevation(index, min_height, max_height)?;
        Ok(())
    }

    fn request(&mut self, tile: TileId) -> Result<RequestOutcome, LayerError> {
        let index = self
            .hierarchy
            .find(tile)
            .ok_or(LayerError::UnknownTile(tile))?;
        let extent = self.hierarchy.node(index)?.extent().clone();

        if !self
            .source
            .extent_inside_limit(&extent, tile.level, &self.registry)?
        {
            debug!(layer = %self.id, tile = %tile, "Tile outside source limits");
            self.no_data.insert(tile);
            return Ok(RequestOutcome::Cached);
        }

        let url = self.source.url_for(tile, &extent, &self.registry)?;
        Ok(self.loader.request(FetchRequest {
            tile,
            kind: self.loader.kind(),
            extent,
            url,
        }))
    }
}

impl<R> fmt::Debug for TiledLayer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiledLayer")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("source", &self.source)
            .field("tiles", &self.hierarchy.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachePolicy, ResourceCache};
    use crate::crs::{CrsId, EPSG_4326};
    use crate::extent::Extent;
    use crate::fetch::{BoxFuture, FetchError, ResourceKind, TileFetcher};
    use crate::source::{SourceKind, WmtsSource};
    use std::ops::RangeInclusive;
    use tokio::runtime::Handle;

    struct Echo;

    impl TileFetcher for Echo {
        type Resource = String;

        fn fetch<'a>(
            &'a self,
            request: &'a FetchRequest,
        ) -> BoxFuture<'a, Result<String, FetchError>> {
            Box::pin(async move { Ok(request.url.clone()) })
        }
    }

    #[derive(Debug)]
    struct Offline {
        crs: CrsId,
        extent: Extent,
    }

    impl Offline {
        fn new() -> Self {
            Self {
                crs: CrsId::new(EPSG_4326),
                extent: Extent::new(EPSG_4326, -180.0, 180.0, -90.0, 90.0),
            }
        }
    }

    impl SourceCapability for Offline {
        fn kind(&self) -> SourceKind {
            SourceKind::Wmts
        }

        fn crs(&self) -> &CrsId {
            &self.crs
        }

        fn extent(&self) -> &Extent {
            &self.extent
        }

        fn zoom_range(&self) -> RangeInclusive<u8> {
            0..=0
        }

        fn url_for(
            &self,
            _tile: TileId,
            _extent: &Extent,
            _registry: &CrsRegistry,
        ) -> Result<String, SourceError> {
            Err(SourceError::Unavailable("offline".to_string()))
        }

        fn initialize(&self) -> BoxFuture<'_, Result<(), SourceError>> {
            Box::pin(async { Err(SourceError::Unavailable("capabilities".to_string())) })
        }
    }

    fn wmts(zoom: RangeInclusive<u8>) -> Arc<dyn SourceCapability> {
        Arc::new(
            WmtsSource::new(
                "https://t.example/{z}/{x}/{y}.png",
                EPSG_4326,
                Extent::new(EPSG_4326, -180.0, 180.0, -90.0, 90.0),
            )
            .unwrap()
            .with_zoom_range(zoom),
        )
    }

    fn layer(source: Arc<dyn SourceCapability>) -> TiledLayer<String> {
        let loader = TileLoader::new(
            Arc::new(Echo),
            ResourceKind::Texture,
            Arc::new(ResourceCache::new(CachePolicy::TEXTURE)),
            Handle::current(),
        );
        TiledLayer::new(
            "ortho",
            source,
            &SchemeTile::global_geographic(),
            Arc::new(CrsRegistry::new()),
            SubdivisionConfig::default(),
            loader,
        )
        .unwrap()
    }

    fn view() -> ViewState {
        ViewState::from_geographic(&CrsRegistry::new(), 2.33, 48.24, 1.0e7, (800.0, 600.0), 1.0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_update_requires_initialization() {
        let mut layer = layer(wmts(0..=20));
        assert_eq!(layer.state(), LayerState::Unloaded);
        assert!(matches!(
            layer.update(&view()),
            Err(LayerError::NotReady {
                state: LayerState::Unloaded,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_failed_initialization() {
        let mut layer = layer(Arc::new(Offline::new()));
        assert!(layer.initialize().await.is_err());
        assert_eq!(layer.state(), LayerState::Failed);
    }

    #[tokio::test]
    async fn test_first_frames_load_then_subdivide() {
        let mut layer = layer(wmts(0..=20));
        layer.initialize().await.unwrap();
        assert_eq!(layer.state(), LayerState::Ready);

        // Nothing loaded yet: roots are requested, not split.
        let first = layer.update(&view()).unwrap();
        assert!(first.subdivided.is_empty());
        assert_eq!(first.requests.len(), 2);
        layer.loader().wait_idle().await;

        let root = TileId::new(0, 0, 0);
        assert_eq!(
            layer.loader().get(root).as_deref(),
            Some("https://t.example/0/0/0.png")
        );

        let second = layer.update(&view()).unwrap();
        assert_eq!(second.subdivided.len(), 2);
        assert_eq!(layer.hierarchy().len(), 10);
    }

    #[tokio::test]
    async fn test_tiles_outside_zoom_range_do_not_block_subdivision() {
        let mut layer = layer(wmts(5..=20));
        layer.initialize().await.unwrap();

        layer.update(&view()).unwrap();
        assert_eq!(layer.loader().in_flight_count(), 0);

        let second = layer.update(&view()).unwrap();
        assert_eq!(second.subdivided.len(), 2);
    }

    #[tokio::test]
    async fn test_set_tile_elevation() {
        let mut layer = layer(wmts(0..=20));
        let root = TileId::new(0, 0, 1);
        layer.set_tile_elevation(root, -100.0, 4_000.0).unwrap();

        let index = layer.hierarchy().find(root).unwrap();
        assert_eq!(layer.hierarchy().get(index).unwrap().height_range(), (-100.0, 4_000.0));
        assert!(matches!(
            layer.set_tile_elevation(TileId::new(9, 0, 0), 0.0, 1.0),
            Err(LayerError::UnknownTile(_))
        ));
    }
}
