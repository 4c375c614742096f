//! GlobeTiles - level-of-detail tile streaming for geospatial globes
//!
//! This library decides, frame by frame, which tiles of a very large
//! geospatial dataset should be shown at which resolution, fetches only
//! those tiles, and evicts resources that are no longer needed.
//!
//! # Modules
//!
//! - [`crs`]: geographic ⇄ geocentric ⇄ projected coordinate conversion
//! - [`extent`]: CRS-tagged axis-aligned regions
//! - [`cache`]: resource cache with TTL and LRU capacity eviction
//! - [`tile`]: arena-backed quadtree of tiles
//! - [`lod`]: culling, screen-space error and subdivision decisions
//! - [`source`]: data source capabilities (WMS, WMTS)
//! - [`fetch`]: asynchronous, deduplicated tile loading
//! - [`layer`]: the tiled layer tying everything together
//! - [`config`]: INI configuration file
//! - [`logging`]: tracing subscriber setup

pub mod cache;
pub mod config;
pub mod crs;
pub mod extent;
pub mod fetch;
pub mod layer;
pub mod lod;
pub mod logging;
pub mod source;
pub mod tile;
