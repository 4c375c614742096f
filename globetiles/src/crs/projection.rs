//! Planar projections registered with the [`CrsRegistry`](super::CrsRegistry).
//!
//! A projection maps the horizontal components of a coordinate from one CRS
//! to another. Heights pass through untouched, so the trait only sees `(x, y)`.
//! Geographic inputs and outputs are expressed in degrees.

use std::f64::consts::PI;
use std::sync::Arc;

use super::ellipsoid::WGS84_SEMI_MAJOR_AXIS;

/// Maximum latitude representable in Web Mercator (degrees).
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Minimum latitude representable in Web Mercator (degrees).
pub const MIN_MERCATOR_LAT: f64 = -85.051_128_78;

/// Forward transform between two horizontal coordinate spaces.
pub trait Projection: Send + Sync {
    /// Transform `(x, y)` from the source to the destination CRS.
    fn forward(&self, x: f64, y: f64) -> (f64, f64);
}

/// Constructs a projection for a registered CRS pair.
///
/// Factories are only called on a cache miss; the resulting instance is
/// memoized by the registry for the lifetime of the process.
pub type ProjectionFactory = Arc<dyn Fn() -> Arc<dyn Projection> + Send + Sync>;

/// WGS84 degrees → spherical Web Mercator meters.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercatorForward;

impl Projection for WebMercatorForward {
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let lat = lat.clamp(MIN_MERCATOR_LAT, MAX_MERCATOR_LAT);
        let x = WGS84_SEMI_MAJOR_AXIS * lon.to_radians();
        let y = WGS84_SEMI_MAJOR_AXIS * lat.to_radians().tan().asinh();
        (x, y)
    }
}

/// Spherical Web Mercator meters → WGS84 degrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercatorInverse;

impl Projection for WebMercatorInverse {
    fn forward(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = (x / WGS84_SEMI_MAJOR_AXIS).to_degrees();
        let lat = (y / WGS84_SEMI_MAJOR_AXIS).sinh().atan().to_degrees();
        (lon, lat)
    }
}

/// Half the Web Mercator world width in meters.
pub fn mercator_half_extent() -> f64 {
    PI * WGS84_SEMI_MAJOR_AXIS
}
