//! OGC Web Map Service source.

use std::fmt;
use std::ops::RangeInclusive;

use super::{substitute_bbox, SourceCapability, SourceError, SourceKind};
use crate::crs::{CrsId, CrsRegistry, EPSG_4326};
use crate::extent::Extent;
use crate::tile::TileId;

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_WMS_VERSION: &str = "1.3.0";
pub const DEFAULT_WMS_FORMAT: &str = "image/png";
pub const DEFAULT_WMS_WIDTH: u32 = 256;
pub const DEFAULT_WMS_ZOOM: RangeInclusive<u8> = 0..=21;

/// Order in which the four bounds are written into `BBOX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// west, south, east, north
    Wsen,
    /// south, west, north, east
    Swne,
}

impl AxisOrder {
    /// Axis order a server expects for `projection` at `version`.
    ///
    /// WMS 1.3.0 follows the EPSG definition of EPSG:4326 (latitude first).
    pub fn for_crs(projection: &str, version: &str) -> Self {
        if projection == EPSG_4326 && version != "1.1.0" && version != "1.1.1" {
            AxisOrder::Swne
        } else {
            AxisOrder::Wsen
        }
    }
}

impl fmt::Display for AxisOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisOrder::Wsen => write!(f, "wsen"),
            AxisOrder::Swne => write!(f, "swne"),
        }
    }
}

/// A WMS layer served as tiles through `GetMap` requests.
#[derive(Debug, Clone)]
pub struct WmsSource {
    name: String,
    crs: CrsId,
    extent: Extent,
    zoom: RangeInclusive<u8>,
    version: String,
    format: String,
    style: String,
    width: u32,
    transparent: bool,
    axis_order: AxisOrder,
    url_template: String,
}

impl WmsSource {
    pub fn builder(url: impl Into<String>) -> WmsSourceBuilder {
        WmsSourceBuilder::new(url)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn transparent(&self) -> bool {
        self.transparent
    }

    pub fn axis_order(&self) -> AxisOrder {
        self.axis_order
    }

    /// `GetMap` URL with a `%bbox` placeholder.
    pub fn url_template(&self) -> &str {
        &self.url_template
    }
}

impl SourceCapability for WmsSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Wms
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
        _tile: TileId,
        extent: &Extent,
        registry: &CrsRegistry,
    ) -> Result<String, SourceError> {
        let local = extent.as_crs(registry, self.crs.as_str())?;
        let geographic = registry.is_geographic(self.crs.as_str())?;
        Ok(substitute_bbox(
            &self.url_template,
            &local,
            self.axis_order,
            geographic,
        ))
    }
}

/// Builder for [`WmsSource`]. `name`, `projection` and `extent` are required.
#[derive(Debug, Clone)]
pub struct WmsSourceBuilder {
    url: String,
    name: Option<String>,
    projection: Option<CrsId>,
    extent: Option<Extent>,
    zoom: RangeInclusive<u8>,
    version: String,
    format: String,
    style: String,
    width: u32,
    transparent: bool,
    axis_order: Option<AxisOrder>,
}

impl WmsSourceBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
            projection: None,
            extent: None,
            zoom: DEFAULT_WMS_ZOOM,
            version: DEFAULT_WMS_VERSION.to_string(),
            format: DEFAULT_WMS_FORMAT.to_string(),
            style: String::new(),
            width: DEFAULT_WMS_WIDTH,
            transparent: false,
            axis_order: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn projection(mut self, projection: impl Into<CrsId>) -> Self {
        self.projection = Some(projection.into());
        self
    }

    pub fn extent(mut self, extent: Extent) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn zoom(mut self, zoom: RangeInclusive<u8>) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    /// Override the axis order derived from projection and version.
    pub fn axis_order(mut self, order: AxisOrder) -> Self {
        self.axis_order = Some(order);
        self
    }

    pub fn build(self) -> Result<WmsSource, SourceError> {
        let name = self.name.ok_or(SourceError::MissingField("name"))?;
        let crs = self
            .projection
            .ok_or(SourceError::MissingField("projection"))?;
        let extent = self.extent.ok_or(SourceError::MissingField("extent"))?;

        let axis_order = self
            .axis_order
            .unwrap_or_else(|| AxisOrder::for_crs(crs.as_str(), &self.version));
        let crs_param = if self.version == "1.3.0" { "CRS" } else { "SRS" };

        let url_template = format!(
            "{}?SERVICE=WMS&REQUEST=GetMap&LAYERS={}&VERSION={}&STYLES={}&FORMAT={}\
             &TRANSPARENT={}&BBOX=%bbox&{}={}&WIDTH={}&HEIGHT={}",
            self.url,
            name,
            self.version,
            self.style,
            self.format,
            self.transparent,
            crs_param,
            crs,
            self.width,
            self.width,
        );

        Ok(WmsSource {
            name,
            crs,
            extent,
            zoom: self.zoom,
            version: self.version,
            format: self.format,
            style: self.style,
            width: self.width,
            transparent: self.transparent,
            axis_order,
            url_template,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::EPSG_3857;

    fn world() -> Extent {
        Extent::new(EPSG_4326, -180.0, 180.0, -90.0, 90.0)
    }

    #[test]
    fn test_builder_requires_fields() {
        let err = WmsSource::builder("https://wms.example/ows")
            .projection(EPSG_4326)
            .extent(world())
            .build()
            .unwrap_err();
        assert_eq!(err, SourceError::MissingField("name"));

        let err = WmsSource::builder("https://wms.example/ows")
            .name("ortho")
            .extent(world())
            .build()
            .unwrap_err();
        assert_eq!(err, SourceError::MissingField("projection"));

        let err = WmsSource::builder("https://wms.example/ows")
            .name("ortho")
            .projection(EPSG_4326)
            .build()
            .unwrap_err();
        assert_eq!(err, SourceError::MissingField("extent"));
    }

    #[test]
    fn test_defaults() {
        let source = WmsSource::builder("https://wms.example/ows")
            .name("ortho")
            .projection(EPSG_4326)
            .extent(world())
            .build()
            .unwrap();

        assert_eq!(source.version(), "1.3.0");
        assert_eq!(source.format(), "image/png");
        assert_eq!(source.style(), "");
        assert_eq!(source.width(), 256);
        assert!(!source.transparent());
        assert_eq!(source.zoom_range(), 0..=21);
        assert_eq!(source.axis_order(), AxisOrder::Swne);
        assert_eq!(source.kind(), SourceKind::Wms);
        assert_eq!(
            source.url_template(),
            "https://wms.example/ows?SERVICE=WMS&REQUEST=GetMap&LAYERS=ortho&VERSION=1.3.0\
             &STYLES=&FORMAT=image/png&TRANSPARENT=false&BBOX=%bbox&CRS=EPSG:4326\
             &WIDTH=256&HEIGHT=256"
        );
    }

    #[test]
    fn test_axis_order_rules() {
        assert_eq!(AxisOrder::for_crs(EPSG_4326, "1.3.0"), AxisOrder::Swne);
        assert_eq!(AxisOrder::for_crs(EPSG_4326, "1.1.0"), AxisOrder::Wsen);
        assert_eq!(AxisOrder::for_crs(EPSG_3857, "1.3.0"), AxisOrder::Wsen);
    }

    #[test]
    fn test_legacy_version_uses_srs() {
        let source = WmsSource::builder("https://wms.example/ows")
            .name("ortho")
            .projection(EPSG_3857)
            .extent(Extent::new(EPSG_3857, -1.0, 1.0, -1.0, 1.0))
            .version("1.1.0")
            .build()
            .unwrap();
        assert!(source.url_template().contains("&SRS=EPSG:3857&"));
        assert!(!source.url_template().contains("&CRS="));
    }

    #[test]
    fn test_url_for_geographic_tile() {
        let registry = CrsRegistry::new();
        let source = WmsSource::builder("https://wms.example/ows")
            .name("ortho")
            .projection(EPSG_4326)
            .extent(world())
            .build()
            .unwrap();

        let extent = Extent::new(EPSG_4326, 0.0, 90.0, 0.0, 45.0);
        let url = source
            .url_for(TileId::new(1, 0, 2), &extent, &registry)
            .unwrap();
        assert!(url.contains(
            "BBOX=0.000000000,0.000000000,45.000000000,90.000000000&"
        ));
    }

    #[test]
    fn test_url_for_reprojects_to_source_crs() {
        let registry = CrsRegistry::new();
        let source = WmsSource::builder("https://wms.example/ows")
            .name("ortho")
            .projection(EPSG_3857)
            .extent(Extent::new(EPSG_3857, -2.0e7, 2.0e7, -2.0e7, 2.0e7))
            .build()
            .unwrap();

        let extent = Extent::new(EPSG_4326, 0.0, 180.0, 0.0, 10.0);
        let url = source
            .url_for(TileId::new(1, 0, 1), &extent, &registry)
            .unwrap();
        assert!(url.contains("BBOX=0.00,0.00,20037508.34,"));
    }
}
