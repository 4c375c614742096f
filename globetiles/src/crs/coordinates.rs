//! CRS-tagged coordinate values.

use std::fmt;

use glam::DVec3;

use super::types::{CrsError, CrsId, Unit, EPSG_4326, EPSG_4978};
use super::{convert_value, CrsRegistry};

/// A position in a named coordinate reference system.
///
/// Geographic values expose `longitude`/`latitude`/`altitude`, geocentric and
/// projected values expose `x`/`y`/`z`. Using the wrong family of accessors
/// returns [`CrsError::InvalidAxisAccess`].
///
/// Values are immutable apart from [`Coordinates::set_altitude`]; conversions
/// always return a new value.
///
/// # Example
///
/// ```
/// use globetiles::crs::{Coordinates, CrsRegistry, EPSG_4978};
///
/// let registry = CrsRegistry::new();
/// let paris = Coordinates::geographic(2.33, 48.24, 0.0);
/// let ecef = paris.as_crs(&registry, EPSG_4978).unwrap();
/// assert!(ecef.x().unwrap() > 4.2e6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    crs: CrsId,
    values: [f64; 3],
    unit: Unit,
}

impl Coordinates {
    /// Create coordinates in any CRS known to `registry`.
    ///
    /// The storage unit is the CRS's reference unit.
    pub fn new(
        registry: &CrsRegistry,
        crs: &str,
        x: f64,
        y: f64,
        z: f64,
    ) -> Result<Self, CrsError> {
        let unit = registry.unit_of(crs)?;
        Ok(Self {
            crs: CrsId::new(crs),
            values: [x, y, z],
            unit,
        })
    }

    /// WGS84 geographic coordinates in degrees (`EPSG:4326`).
    pub fn geographic(longitude: f64, latitude: f64, altitude: f64) -> Self {
        Self {
            crs: CrsId::new(EPSG_4326),
            values: [longitude, latitude, altitude],
            unit: Unit::Degree,
        }
    }

    /// WGS84 geographic coordinates stored in radians (`EPSG:4326`).
    pub fn geographic_radians(longitude: f64, latitude: f64, altitude: f64) -> Self {
        Self {
            crs: CrsId::new(EPSG_4326),
            values: [longitude, latitude, altitude],
            unit: Unit::Radian,
        }
    }

    /// WGS84 geocentric coordinates in meters (`EPSG:4978`).
    pub fn geocentric(x: f64, y: f64, z: f64) -> Self {
        Self {
            crs: CrsId::new(EPSG_4978),
            values: [x, y, z],
            unit: Unit::Meter,
        }
    }

    pub(crate) fn from_parts(crs: CrsId, values: [f64; 3], unit: Unit) -> Self {
        Self { crs, values, unit }
    }

    pub fn crs(&self) -> &CrsId {
        &self.crs
    }

    /// Unit the components are stored in.
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Raw components, in storage order and unit.
    pub fn values(&self) -> [f64; 3] {
        self.values
    }

    /// Whether the geographic accessors are valid for this value.
    pub fn is_geographic(&self) -> bool {
        self.unit.is_angular()
    }

    /// Longitude in the storage unit.
    pub fn longitude(&self) -> Result<f64, CrsError> {
        self.angular(0, "longitude")
    }

    /// Latitude in the storage unit.
    pub fn latitude(&self) -> Result<f64, CrsError> {
        self.angular(1, "latitude")
    }

    /// Longitude converted to `unit`.
    pub fn longitude_in(&self, unit: Unit) -> Result<f64, CrsError> {
        convert_value(self.unit, unit, self.longitude()?)
    }

    /// Latitude converted to `unit`.
    pub fn latitude_in(&self, unit: Unit) -> Result<f64, CrsError> {
        convert_value(self.unit, unit, self.latitude()?)
    }

    /// Altitude in meters above the ellipsoid.
    pub fn altitude(&self) -> Result<f64, CrsError> {
        self.angular(2, "altitude")
    }

    /// Replace the altitude of a geographic value.
    pub fn set_altitude(&mut self, altitude: f64) -> Result<(), CrsError> {
        self.require_geographic("altitude")?;
        self.values[2] = altitude;
        Ok(())
    }

    pub fn x(&self) -> Result<f64, CrsError> {
        self.metric(0, "x")
    }

    pub fn y(&self) -> Result<f64, CrsError> {
        self.metric(1, "y")
    }

    pub fn z(&self) -> Result<f64, CrsError> {
        self.metric(2, "z")
    }

    /// Geocentric/projected components as a vector.
    pub fn xyz(&self) -> Result<DVec3, CrsError> {
        self.require_metric("xyz")?;
        Ok(DVec3::from_array(self.values))
    }

    /// Convert to another CRS. See [`CrsRegistry::convert`].
    pub fn as_crs(&self, registry: &CrsRegistry, target: &str) -> Result<Coordinates, CrsError> {
        registry.convert(self, target)
    }

    fn angular(&self, index: usize, axis: &'static str) -> Result<f64, CrsError> {
        self.require_geographic(axis)?;
        Ok(self.values[index])
    }

    fn metric(&self, index: usize, axis: &'static str) -> Result<f64, CrsError> {
        self.require_metric(axis)?;
        Ok(self.values[index])
    }

    fn require_geographic(&self, axis: &'static str) -> Result<(), CrsError> {
        if self.is_geographic() {
            Ok(())
        } else {
            Err(CrsError::InvalidAxisAccess {
                crs: self.crs.to_string(),
                axis,
            })
        }
    }

    fn require_metric(&self, axis: &'static str) -> Result<(), CrsError> {
        if self.is_geographic() {
            Err(CrsError::InvalidAxisAccess {
                crs: self.crs.to_string(),
                axis,
            })
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {}, {}) [{}]",
            self.crs, self.values[0], self.values[1], self.values[2], self.unit
        )
    }
}
