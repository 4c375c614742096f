//! Pre-tiled sources addressed by level, column and row.

use std::ops::RangeInclusive;

use super::{SourceCapability, SourceError, SourceKind};
use crate::crs::{CrsId, CrsRegistry};
use crate::extent::Extent;
use crate::tile::TileId;

pub const DEFAULT_WMTS_ZOOM: RangeInclusive<u8> = 0..=20;

/// Placeholder pairs accepted in URL templates: `{z}/{x}/{y}` (XYZ style)
/// and `%TILEMATRIX/%COL/%ROW` (WMTS KVP style).
const LEVEL_PLACEHOLDERS: [&str; 2] = ["{z}", "%TILEMATRIX"];
const COL_PLACEHOLDERS: [&str; 2] = ["{x}", "%COL"];
const ROW_PLACEHOLDERS: [&str; 2] = ["{y}", "%ROW"];

/// A tiled source whose tiles line up with the hierarchy's tile ids.
#[derive(Debug, Clone)]
pub struct WmtsSource {
    url_template: String,
    crs: CrsId,
    extent: Extent,
    zoom: RangeInclusive<u8>,
}

impl WmtsSource {
    /// Fails when the template lacks a level, column or row placeholder.
    pub fn new(
        url_template: impl Into<String>,
        crs: impl Into<CrsId>,
        extent: Extent,
    ) -> Result<Self, SourceError> {
        let url_template = url_template.into();
        for (placeholders, name) in [
            (LEVEL_PLACEHOLDERS, "level"),
            (COL_PLACEHOLDERS, "column"),
            (ROW_PLACEHOLDERS, "row"),
        ] {
            if !placeholders.iter().any(|p| url_template.contains(p)) {
                return Err(SourceError::InvalidTemplate {
                    template: url_template,
                    placeholder: name,
                });
            }
        }

        Ok(Self {
            url_template,
            crs: crs.into(),
            extent,
            zoom: DEFAULT_WMTS_ZOOM,
        })
    }

    pub fn with_zoom_range(mut self, zoom: RangeInclusive<u8>) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }
}

impl SourceCapability for WmtsSource {
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
        self.zoom.clone()
    }

    fn url_for(
        &self,
        tile: TileId,
        _extent: &Extent,
        _registry: &CrsRegistry,
    ) -> Result<String, SourceError> {
        let level = tile.level.to_string();
        let col = tile.col.to_string();
        let row = tile.row.to_string();

        let mut url = self.url_template.clone();
        for (placeholders, value) in [
            (LEVEL_PLACEHOLDERS, &level),
            (COL_PLACEHOLDERS, &col),
            (ROW_PLACEHOLDERS, &row),
        ] {
            for placeholder in placeholders {
                url = url.replace(placeholder, value);
            }
        }
        Ok(url)
    }
}
