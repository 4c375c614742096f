//! Simulate command - stream tiles for a fixed camera.
//!
//! Runs the tiled layer against a synthetic fetcher that answers every
//! request after a configurable delay, printing one line per frame.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use globetiles::cache::ResourceCache;
use globetiles::config::ConfigFile;
use globetiles::crs::{Coordinates, CrsRegistry, EPSG_3857, EPSG_4326};
use globetiles::fetch::{
    BoxFuture, FetchError, FetchRequest, ResourceKind, TileFetcher, TileLoader,
};
use globetiles::layer::TiledLayer;
use globetiles::lod::{FrameUpdate, ViewState};
use globetiles::source::WmtsSource;
use globetiles::tile::SchemeTile;

use crate::error::CliError;
use crate::runner::CliRunner;

const VIEWPORT: (f64, f64) = (1280.0, 720.0);
const FOV_Y: f64 = 1.0;
const SYNTHETIC_URL: &str = "synthetic://{z}/{x}/{y}";

/// Arguments for the simulate command.
pub struct SimulateArgs {
    pub lon: f64,
    pub lat: f64,
    pub altitude: f64,
    pub frames: u32,
    pub max_level: Option<u8>,
    pub sse_threshold: Option<f64>,
    pub latency_ms: u64,
    pub json: bool,
}

/// Answers every request with the tile's URL after a fixed delay.
struct SyntheticFetcher {
    latency: Duration,
}

impl TileFetcher for SyntheticFetcher {
    type Resource = Arc<str>;

    fn fetch<'a>(
        &'a self,
        request: &'a FetchRequest,
    ) -> BoxFuture<'a, Result<Arc<str>, FetchError>> {
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            Ok(Arc::from(request.url.as_str()))
        })
    }
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    let mut runner = CliRunner::new()?;
    runner.log_startup("simulate");

    let subdivision = &mut runner.config_mut().subdivision;
    if let Some(level) = args.max_level {
        subdivision.max_subdivision_level = level;
    }
    if let Some(threshold) = args.sse_threshold {
        subdivision.sse_threshold = threshold;
    }
    runner.config().validate(runner.registry())?;

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    runtime.block_on(simulate(&runner, &args))
}

async fn simulate(runner: &CliRunner, args: &SimulateArgs) -> Result<(), CliError> {
    let config = runner.config();
    let registry = runner.registry();

    let scheme = scheme_for(config)?;
    let source_extent = scheme.extent().as_crs(registry, &config.crs.source_crs)?;
    let source = WmtsSource::new(SYNTHETIC_URL, config.crs.source_crs.as_str(), source_extent)?;

    let kind = ResourceKind::Texture;
    let cache = ResourceCache::new(config.cache.texture_policy())
        .with_capacity(config.cache.capacity);
    let loader = TileLoader::new(
        Arc::new(SyntheticFetcher {
            latency: Duration::from_millis(args.latency_ms),
        }),
        kind,
        Arc::new(cache),
        tokio::runtime::Handle::current(),
    );

    let mut layer = TiledLayer::new(
        "simulation",
        Arc::new(source),
        &scheme,
        Arc::clone(registry),
        config.subdivision.clone(),
        loader,
    )?;
    layer.initialize().await?;

    let view = view_for(registry, layer.hierarchy().surface().is_globe(), args)?;

    for _ in 0..args.frames {
        let update = layer.update(&view)?;
        report(&update, args.json);
        // One frame's worth of fetch time.
        tokio::time::sleep(Duration::from_millis(args.latency_ms.max(1))).await;
    }
    layer.loader().wait_idle().await;

    let stats = layer.loader().cache_stats();
    info!(
        tiles = layer.hierarchy().len(),
        max_level = layer.hierarchy().max_level(),
        cache = %stats,
        "Simulation finished"
    );
    println!();
    println!("Tiles in hierarchy: {}", layer.hierarchy().len());
    println!("Deepest level:      {}", layer.hierarchy().max_level());
    println!("Cache:              {}", stats);
    Ok(())
}

fn scheme_for(config: &ConfigFile) -> Result<SchemeTile, CliError> {
    match config.crs.tile_crs.as_str() {
        EPSG_4326 => Ok(SchemeTile::global_geographic()),
        EPSG_3857 => Ok(SchemeTile::global_mercator()),
        other => Err(CliError::Config(format!(
            "No global tile scheme for crs.tile_crs = {}. Use {} or {}.",
            other, EPSG_4326, EPSG_3857
        ))),
    }
}

fn view_for(registry: &CrsRegistry, globe: bool, args: &SimulateArgs) -> Result<ViewState, CliError> {
    if globe {
        return Ok(ViewState::from_geographic(
            registry,
            args.lon,
            args.lat,
            args.altitude,
            VIEWPORT,
            FOV_Y,
        )?);
    }
    let projected = Coordinates::geographic(args.lon, args.lat, 0.0).as_crs(registry, EPSG_3857)?;
    Ok(ViewState::from_projected(
        projected.x()?,
        projected.y()?,
        args.altitude,
        VIEWPORT,
        FOV_Y,
    ))
}

fn report(update: &FrameUpdate, json: bool) {
    if json {
        println!("{}", update.summary_json());
        return;
    }
    let stats = &update.stats;
    println!(
        "frame {:>3}  displayed {:>4}  pending {:>4}  +{:<3} -{:<3} culled {:>3}  requests {:>3}  max level {:>2}",
        update.frame,
        stats.displayed,
        stats.pending,
        stats.subdivided,
        stats.merged,
        stats.culled,
        stats.requests,
        stats.max_level,
    );
}
