//! Asynchronous tile loading.
//!
//! The [`TileFetcher`] trait is the seam to whatever actually retrieves and
//! decodes tile data. [`TileLoader`] wraps a fetcher with deduplication,
//! cancellation, caching and failure bookkeeping.

mod loader;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::cache::CachePolicy;
use crate::extent::Extent;
use crate::source::SourceError;
use crate::tile::TileId;

pub use loader::{ReadinessSnapshot, RequestOutcome, ResourceState, TileLoader};

/// Boxed future used by dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a tile resource holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Imagery draped on the tile.
    Texture,
    /// Heights used to bound and shape the tile.
    Elevation,
}

impl ResourceKind {
    /// Cache policy for resources of this kind.
    pub fn policy(&self) -> CachePolicy {
        match self {
            ResourceKind::Texture => CachePolicy::TEXTURE,
            ResourceKind::Elevation => CachePolicy::GEOMETRY,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Texture => write!(f, "texture"),
            ResourceKind::Elevation => write!(f, "elevation"),
        }
    }
}

/// One tile resource to retrieve.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub tile: TileId,
    pub kind: ResourceKind,
    /// Extent of the tile in the hierarchy's CRS.
    pub extent: Extent,
    /// Request URL built by the layer's source.
    pub url: String,
}

/// Errors from fetching a tile resource.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Server returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode {kind} for tile {tile}: {reason}")]
    Decode {
        tile: TileId,
        kind: ResourceKind,
        reason: String,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Retrieves and decodes tile resources.
///
/// Implementations are shared across tasks and must be cheap to call
/// concurrently.
pub trait TileFetcher: Send + Sync + 'static {
    /// Decoded resource stored in the cache.
    type Resource: Clone + Send + Sync + 'static;

    fn fetch<'a>(
        &'a self,
        request: &'a FetchRequest,
    ) -> BoxFuture<'a, Result<Self::Resource, FetchError>>;
}
