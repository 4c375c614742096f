//! Core CRS types: identifiers, units and errors.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Reference geographic CRS (WGS84 longitude/latitude in degrees).
pub const EPSG_4326: &str = "EPSG:4326";

/// Reference geocentric CRS (WGS84 Earth-centered Earth-fixed, meters).
pub const EPSG_4978: &str = "EPSG:4978";

/// Web Mercator projected CRS (meters).
pub const EPSG_3857: &str = "EPSG:3857";

/// Storage unit of a coordinate component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Angular unit, radians.
    Radian,
    /// Angular unit, degrees.
    Degree,
    /// Linear unit, meters.
    Meter,
}

impl Unit {
    /// Whether this unit measures angles (geographic CRS family).
    pub fn is_angular(&self) -> bool {
        matches!(self, Unit::Radian | Unit::Degree)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Radian => write!(f, "radian"),
            Unit::Degree => write!(f, "degree"),
            Unit::Meter => write!(f, "meter"),
        }
    }
}

/// Cheaply clonable CRS identifier, e.g. `"EPSG:4326"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrsId(Arc<str>);

impl CrsId {
    /// Create an identifier from any string.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CrsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CrsId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CrsId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CrsId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl PartialEq<str> for CrsId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for CrsId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// Errors raised by the CRS layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CrsError {
    /// The identifier is neither built in nor registered.
    #[error("Invalid crs parameter value '{0}'")]
    InvalidCrs(String),

    /// A geographic accessor was used on a metric value or vice versa.
    #[error("Can't query {axis} on crs {crs}")]
    InvalidAxisAccess { crs: String, axis: &'static str },

    /// Only radian <-> degree conversions are linear.
    #[error("Cannot convert from unit {from} to {to}")]
    UnsupportedUnitConversion { from: Unit, to: Unit },

    /// No conversion path is known between the two systems.
    #[error("Cannot convert from crs {from} to {to}")]
    UnsupportedCrsConversion { from: String, to: String },
}
