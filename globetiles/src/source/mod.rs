//! Tile data sources.
//!
//! A source describes where tiles come from: its CRS, coverage, zoom range
//! and how to build a request URL for one tile. The wire protocol itself is
//! left to the [`TileFetcher`](crate::fetch::TileFetcher).

mod wms;
mod wmts;

use std::fmt;
use std::ops::RangeInclusive;

use thiserror::Error;

use crate::crs::{CrsError, CrsId, CrsRegistry};
use crate::extent::Extent;
use crate::fetch::BoxFuture;
use crate::tile::TileId;

pub use wms::{AxisOrder, WmsSource, WmsSourceBuilder};
pub use wmts::WmtsSource;

/// Errors raised while configuring or querying a source.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    /// A required builder field was not set.
    #[error("source.{0} is required")]
    MissingField(&'static str),

    /// The URL template lacks a required placeholder.
    #[error("Invalid URL template '{template}': missing {placeholder}")]
    InvalidTemplate {
        template: String,
        placeholder: &'static str,
    },

    /// The source could not be brought up.
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Crs(#[from] CrsError),
}

/// Closed set of supported source protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Wms,
    Wmts,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Wms => write!(f, "WMS"),
            SourceKind::Wmts => write!(f, "WMTS"),
        }
    }
}

/// What a tiled layer needs to know about its data source.
///
/// Dyn-compatible so layers can hold `Arc<dyn SourceCapability>`.
pub trait SourceCapability: Send + Sync + fmt::Debug {
    fn kind(&self) -> SourceKind;

    /// CRS the source serves data in.
    fn crs(&self) -> &CrsId;

    /// Coverage of the source, in [`SourceCapability::crs`].
    fn extent(&self) -> &Extent;

    /// Levels the source can serve.
    fn zoom_range(&self) -> RangeInclusive<u8>;

    /// Request URL for `tile`, whose extent is `extent` (any CRS).
    fn url_for(
        &self,
        tile: TileId,
        extent: &Extent,
        registry: &CrsRegistry,
    ) -> Result<String, SourceError>;

    /// Whether the source has data for a tile at `level` covering `extent`.
    ///
    /// The level must be in the zoom range and the tile extent, converted
    /// to the source CRS, must overlap the source extent.
    fn extent_inside_limit(
        &self,
        extent: &Extent,
        level: u8,
        registry: &CrsRegistry,
    ) -> Result<bool, SourceError> {
        if !self.zoom_range().contains(&level) {
            return Ok(false);
        }
        self.extent()
            .intersects_extent(registry, extent)
            .map_err(Into::into)
    }

    /// Bring the source up before first use.
    fn initialize(&self) -> BoxFuture<'_, Result<(), SourceError>> {
        Box::pin(async { Ok(()) })
    }
}

/// Replace `%bbox` in `template` with the extent's bounds in `order`.
///
/// Geographic bounds keep 9 decimals, metric bounds 2.
pub(crate) fn substitute_bbox(
    template: &str,
    extent: &Extent,
    order: AxisOrder,
    geographic: bool,
) -> String {
    let precision = if geographic { 9 } else { 2 };
    let values = match order {
        AxisOrder::Wsen => [extent.west, extent.south, extent.east, extent.north],
        AxisOrder::Swne => [extent.south, extent.west, extent.north, extent.east],
    };
    let bbox = values
        .iter()
        .map(|v| format!("{:.*}", precision, v))
        .collect::<Vec<_>>()
        .join(",");
    template.replace("%bbox", &bbox)
}
