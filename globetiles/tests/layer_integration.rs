//! Integration tests for a tiled layer streaming from a mock fetcher.
//!
//! These tests run the full loop: controller decisions, loader requests,
//! cache population and readiness feeding back into the next frame.
//!
//! Run with: `cargo test --test layer_integration`

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use globetiles::cache::{CachePolicy, ResourceCache};
use globetiles::crs::{CrsRegistry, EPSG_3857, EPSG_4326};
use globetiles::extent::Extent;
use globetiles::fetch::{
    BoxFuture, FetchError, FetchRequest, ResourceKind, ResourceState, TileFetcher, TileLoader,
};
use globetiles::layer::{LayerState, TiledLayer};
use globetiles::lod::{SubdivisionConfig, ViewState};
use globetiles::source::{SourceCapability, WmsSource};
use globetiles::tile::{SchemeTile, TileId};

// ============================================================================
// Helper Functions
// ============================================================================

const MAX_FRAMES: usize = 64;

/// Records every request and fails the tiles it is told to.
#[derive(Default)]
struct RecordingFetcher {
    calls: Mutex<HashMap<TileId, usize>>,
    urls: Mutex<Vec<String>>,
    failing: Vec<TileId>,
}

impl RecordingFetcher {
    fn failing(tiles: Vec<TileId>) -> Self {
        Self {
            failing: tiles,
            ..Self::default()
        }
    }

    fn calls_for(&self, tile: TileId) -> usize {
        self.calls.lock().get(&tile).copied().unwrap_or(0)
    }
}

impl TileFetcher for RecordingFetcher {
    type Resource = Arc<Vec<u8>>;

    fn fetch<'a>(
        &'a self,
        request: &'a FetchRequest,
    ) -> BoxFuture<'a, Result<Arc<Vec<u8>>, FetchError>> {
        Box::pin(async move {
            *self.calls.lock().entry(request.tile).or_insert(0) += 1;
            self.urls.lock().push(request.url.clone());
            if self.failing.contains(&request.tile) {
                return Err(FetchError::Status {
                    url: request.url.clone(),
                    status: 503,
                });
            }
            Ok(Arc::new(vec![request.tile.level; 4]))
        })
    }
}

fn wms_source(projection: &str) -> Arc<dyn SourceCapability> {
    let extent = if projection == EPSG_4326 {
        Extent::new(EPSG_4326, -180.0, 180.0, -90.0, 90.0)
    } else {
        Extent::new(projection, -20_037_508.34, 20_037_508.34, -20_037_508.34, 20_037_508.34)
    };
    Arc::new(
        WmsSource::builder("https://wms.example/ows")
            .name("ortho")
            .projection(projection)
            .extent(extent)
            .build()
            .unwrap(),
    )
}

fn build_layer(
    fetcher: Arc<RecordingFetcher>,
    source: Arc<dyn SourceCapability>,
    config: SubdivisionConfig,
) -> TiledLayer<Arc<Vec<u8>>> {
    let loader = TileLoader::new(
        fetcher,
        ResourceKind::Texture,
        Arc::new(ResourceCache::new(CachePolicy::TEXTURE).with_capacity(10_000)),
        Handle::current(),
    );
    TiledLayer::new(
        "ortho",
        source,
        &SchemeTile::global_geographic(),
        Arc::new(CrsRegistry::new()),
        config,
        loader,
    )
    .unwrap()
}

fn paris(altitude: f64) -> ViewState {
    ViewState::from_geographic(&CrsRegistry::new(), 2.33, 48.24, altitude, (800.0, 600.0), 1.0)
        .unwrap()
}

/// Run frames, letting fetches finish in between, until a frame neither
/// subdivides nor requests anything.
async fn stream_until_stable(layer: &mut TiledLayer<Arc<Vec<u8>>>, view: &ViewState) -> usize {
    for frame in 1..=MAX_FRAMES {
        let update = layer.update(view).unwrap();
        layer.loader().wait_idle().await;
        if update.subdivided.is_empty() && update.requests.is_empty() {
            return frame;
        }
    }
    panic!("layer did not settle within {} frames", MAX_FRAMES);
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test]
async fn test_streaming_settles_with_every_displayed_tile_loaded() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut layer = build_layer(
        Arc::clone(&fetcher),
        wms_source(EPSG_4326),
        SubdivisionConfig::default(),
    );
    layer.initialize().await.unwrap();
    assert_eq!(layer.state(), LayerState::Ready);

    let view = paris(100_000.0);
    stream_until_stable(&mut layer, &view).await;

    let update = layer.update(&view).unwrap();
    assert!(update.display.iter().all(|tile| tile.ready));
    for tile in &update.display {
        assert_eq!(layer.loader().state(tile.id), ResourceState::Ready);
    }

    // Each tile was fetched exactly once.
    assert!(fetcher.calls.lock().values().all(|&n| n == 1));
    assert!(layer.hierarchy().max_level() > 6);
}

#[tokio::test]
async fn test_failed_tile_is_never_refetched_nor_subdivided() {
    let broken = TileId::new(1, 0, 2);
    let fetcher = Arc::new(RecordingFetcher::failing(vec![broken]));
    let mut layer = build_layer(
        Arc::clone(&fetcher),
        wms_source(EPSG_4326),
        SubdivisionConfig::default(),
    );
    layer.initialize().await.unwrap();

    let view = paris(100_000.0);
    stream_until_stable(&mut layer, &view).await;

    assert_eq!(fetcher.calls_for(broken), 1);
    assert_eq!(layer.loader().state(broken), ResourceState::Failed);

    let index = layer.hierarchy().find(broken).unwrap();
    assert!(layer.hierarchy().get(index).unwrap().is_leaf());

    // Displayed with its root's texture.
    let update = layer.update(&view).unwrap();
    let shown = update.display.iter().find(|t| t.id == broken).unwrap();
    assert!(!shown.ready);
    assert_eq!(shown.fallback, broken.parent());
    assert!(!update.requests.contains(&broken));
}

#[tokio::test]
async fn test_requests_use_the_source_projection() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut layer = build_layer(
        Arc::clone(&fetcher),
        wms_source(EPSG_3857),
        SubdivisionConfig::default().with_max_subdivision_level(3),
    );
    layer.initialize().await.unwrap();

    stream_until_stable(&mut layer, &paris(1_000_000.0)).await;

    let urls = fetcher.urls.lock();
    assert!(!urls.is_empty());
    assert!(urls.iter().all(|url| url.contains("&CRS=EPSG:3857&")));
    // Root 0/0/1 spans [0, 180] degrees east.
    assert!(urls
        .iter()
        .any(|url| url.contains("BBOX=0.00,") && url.contains(",20037508.34,")));
}

#[tokio::test]
async fn test_moving_away_merges_loaded_detail() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut layer = build_layer(
        Arc::clone(&fetcher),
        wms_source(EPSG_4326),
        SubdivisionConfig::default(),
    );
    layer.initialize().await.unwrap();

    let close = paris(50_000.0);
    stream_until_stable(&mut layer, &close).await;
    let close_len = layer.hierarchy().len();

    let far = paris(30_000_000.0);
    let update = layer.update(&far).unwrap();
    assert!(!update.merged.is_empty());
    for tile in &update.merged {
        assert!(layer.hierarchy().find(*tile).is_none());
    }

    stream_until_stable(&mut layer, &far).await;
    assert!(layer.hierarchy().len() < close_len);
    assert_eq!(layer.loader().in_flight_count(), 0);

    // Nothing is fetched twice.
    assert!(fetcher.calls.lock().values().all(|&n| n == 1));
}

#[tokio::test]
async fn test_merged_tiles_drop_their_failures() {
    // Level-5 tile under the Paris camera.
    let broken = TileId::new(5, 7, 32);
    let fetcher = Arc::new(RecordingFetcher::failing(vec![broken]));
    let mut layer = build_layer(
        Arc::clone(&fetcher),
        wms_source(EPSG_4326),
        SubdivisionConfig::default(),
    );
    layer.initialize().await.unwrap();

    stream_until_stable(&mut layer, &paris(50_000.0)).await;
    assert_eq!(layer.loader().state(broken), ResourceState::Failed);
    assert_eq!(layer.loader().failed_count(), 1);

    let update = layer.update(&paris(30_000_000.0)).unwrap();
    assert!(update.merged.contains(&broken));
    assert!(layer.loader().failure(broken).is_none());
    assert_eq!(layer.loader().failed_count(), 0);
    assert_eq!(layer.loader().state(broken), ResourceState::Unloaded);
}
