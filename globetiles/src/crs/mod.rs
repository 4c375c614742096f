//! Coordinate reference systems.
//!
//! Converts positions between WGS84 geographic coordinates (`EPSG:4326`),
//! WGS84 geocentric coordinates (`EPSG:4978`) and any projected system whose
//! projections have been registered with a [`CrsRegistry`].
//!
//! # Example
//!
//! ```
//! use globetiles::crs::{Coordinates, CrsRegistry, EPSG_4326, EPSG_4978};
//!
//! let registry = CrsRegistry::new();
//! let ecef = Coordinates::geographic(2.33, 48.24, 24_999_549.0)
//!     .as_crs(&registry, EPSG_4978)
//!     .unwrap();
//! let back = ecef.as_crs(&registry, EPSG_4326).unwrap();
//! assert!((back.longitude().unwrap() - 2.33).abs() < 1e-9);
//! ```

mod coordinates;
mod ellipsoid;
mod projection;
mod registry;
mod types;

pub use coordinates::Coordinates;
pub use ellipsoid::{Cartographic, Ellipsoid, WGS84_SEMI_MAJOR_AXIS, WGS84_SEMI_MINOR_AXIS};
pub use projection::{
    mercator_half_extent, Projection, ProjectionFactory, WebMercatorForward, WebMercatorInverse,
    MAX_MERCATOR_LAT, MIN_MERCATOR_LAT,
};
pub use registry::CrsRegistry;
pub use types::{CrsError, CrsId, Unit, EPSG_3857, EPSG_4326, EPSG_4978};

/// Convert a scalar between units.
///
/// Identity when the units match; radian ⇄ degree is linear. Every other
/// pair fails with [`CrsError::UnsupportedUnitConversion`].
pub fn convert_value(from: Unit, to: Unit, value: f64) -> Result<f64, CrsError> {
    match (from, to) {
        _ if from == to => Ok(value),
        (Unit::Degree, Unit::Radian) => Ok(value.to_radians()),
        (Unit::Radian, Unit::Degree) => Ok(value.to_degrees()),
        _ => Err(CrsError::UnsupportedUnitConversion { from, to }),
    }
}

/// Tolerance for comparing two values stored in `unit`.
pub fn reasonable_epsilon(unit: Unit) -> f64 {
    match unit {
        Unit::Radian => 1e-5,
        Unit::Degree => 1e-2,
        Unit::Meter => 1e-3,
    }
}
