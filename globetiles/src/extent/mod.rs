//! Axis-aligned 2D regions tagged with a CRS.
//!
//! Operations that take two extents convert the second one into the first
//! one's CRS, so they need the registry and can fail like any conversion.

use std::borrow::Cow;
use std::fmt;

use crate::crs::{Coordinates, CrsError, CrsId, CrsRegistry};

/// A west/east/south/north rectangle in a CRS.
///
/// Geographic extents are in degrees, projected extents in the CRS's linear
/// unit. The constructor normalizes bounds so `west <= east` and
/// `south <= north`.
#[derive(Debug, Clone, PartialEq)]
pub struct Extent {
    crs: CrsId,
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl Extent {
    pub fn new(crs: impl Into<CrsId>, west: f64, east: f64, south: f64, north: f64) -> Self {
        Self {
            crs: crs.into(),
            west: west.min(east),
            east: west.max(east),
            south: south.min(north),
            north: south.max(north),
        }
    }

    pub fn crs(&self) -> &CrsId {
        &self.crs
    }

    /// Center `(x, y)`.
    pub fn center(&self) -> (f64, f64) {
        (
            self.west + (self.east - self.west) * 0.5,
            self.south + (self.north - self.south) * 0.5,
        )
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (f64, f64) {
        (self.east - self.west, self.north - self.south)
    }

    pub fn area(&self) -> f64 {
        let (w, h) = self.dimensions();
        w * h
    }

    /// `other` in this extent's CRS, borrowed when no conversion is needed.
    fn aligned<'a>(
        &self,
        registry: &CrsRegistry,
        other: &'a Extent,
    ) -> Result<Cow<'a, Extent>, CrsError> {
        if other.crs == self.crs {
            Ok(Cow::Borrowed(other))
        } else {
            Ok(Cow::Owned(other.as_crs(registry, self.crs.as_str())?))
        }
    }

    /// Smallest extent covering both, in this extent's CRS.
    pub fn union(&self, registry: &CrsRegistry, other: &Extent) -> Result<Extent, CrsError> {
        let other = self.aligned(registry, other)?;
        Ok(self.cover(&other))
    }

    /// Whether the two extents overlap with a positive area.
    ///
    /// Extents that only share an edge do not intersect.
    pub fn intersects_extent(
        &self,
        registry: &CrsRegistry,
        other: &Extent,
    ) -> Result<bool, CrsError> {
        let other = self.aligned(registry, other)?;
        Ok(self.overlaps(&other))
    }

    /// The overlapping region in this extent's CRS, if any.
    pub fn intersection(
        &self,
        registry: &CrsRegistry,
        other: &Extent,
    ) -> Result<Option<Extent>, CrsError> {
        let other = self.aligned(registry, other)?;
        if !self.overlaps(&other) {
            return Ok(None);
        }
        Ok(Some(Extent {
            crs: self.crs.clone(),
            west: self.west.max(other.west),
            east: self.east.min(other.east),
            south: self.south.max(other.south),
            north: self.north.min(other.north),
        }))
    }

    /// Whether `(x, y)` lies inside or on the boundary.
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        x >= self.west && x <= self.east && y >= self.south && y <= self.north
    }

    /// Whether `point` lies inside or on the boundary.
    ///
    /// The point is converted to this extent's CRS first.
    pub fn contains_point(
        &self,
        registry: &CrsRegistry,
        point: &Coordinates,
    ) -> Result<bool, CrsError> {
        let point = point.as_crs(registry, self.crs.as_str())?;
        let [x, y, _] = point.values();
        Ok(self.contains_xy(x, y))
    }

    /// Whether `other` lies entirely within this extent.
    pub fn contains_extent(
        &self,
        registry: &CrsRegistry,
        other: &Extent,
    ) -> Result<bool, CrsError> {
        let other = self.aligned(registry, other)?;
        Ok(other.west >= self.west
            && other.east <= self.east
            && other.south >= self.south
            && other.north <= self.north)
    }

    /// Bounding box of both. The extents must share a CRS.
    pub(crate) fn cover(&self, other: &Extent) -> Extent {
        Extent {
            crs: self.crs.clone(),
            west: self.west.min(other.west),
            east: self.east.max(other.east),
            south: self.south.min(other.south),
            north: self.north.max(other.north),
        }
    }

    fn overlaps(&self, other: &Extent) -> bool {
        !(other.west >= self.east
            || other.east <= self.west
            || other.south >= self.north
            || other.north <= self.south)
    }

    /// The same region expressed in `target`.
    ///
    /// Corners are converted individually and the result is their bounding
    /// box. Converting to the geocentric system is not supported.
    pub fn as_crs(&self, registry: &CrsRegistry, target: &str) -> Result<Extent, CrsError> {
        if self.crs == target {
            return Ok(self.clone());
        }
        if registry.is_geocentric(target)? {
            return Err(CrsError::UnsupportedCrsConversion {
                from: self.crs.to_string(),
                to: target.to_string(),
            });
        }

        let corners = [
            (self.west, self.south),
            (self.west, self.north),
            (self.east, self.south),
            (self.east, self.north),
        ];

        let mut result: Option<Extent> = None;
        for (x, y) in corners {
            let corner = Coordinates::new(registry, self.crs.as_str(), x, y, 0.0)?;
            let [px, py, _] = corner.as_crs(registry, target)?.values();
            let point = Extent::new(target, px, px, py, py);
            result = Some(match result {
                Some(acc) => acc.cover(&point),
                None => point,
            });
        }

        Ok(result.unwrap_or_else(|| Extent::new(target, 0.0, 0.0, 0.0, 0.0)))
    }

    /// Split at the exact center into NW, NE, SW, SE quarters.
    ///
    /// All four quarters share the same center value, so they partition the
    /// extent without gaps or overlap.
    pub fn quarters(&self) -> [Extent; 4] {
        let (cx, cy) = self.center();
        let make = |west, east, south, north| Extent {
            crs: self.crs.clone(),
            west,
            east,
            south,
            north,
        };
        [
            make(self.west, cx, cy, self.north),
            make(cx, self.east, cy, self.north),
            make(self.west, cx, self.south, cy),
            make(cx, self.east, self.south, cy),
        ]
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[w={}, e={}, s={}, n={}]",
            self.crs, self.west, self.east, self.south, self.north
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{mercator_half_extent, Projection, Unit, EPSG_3857, EPSG_4326, EPSG_4978};
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_new_normalizes_bounds() {
        let e = Extent::new(EPSG_4326, 10.0, -10.0, 5.0, -5.0);
        assert_eq!((e.west, e.east, e.south, e.north), (-10.0, 10.0, -5.0, 5.0));
    }

    #[test]
    fn test_center_and_dimensions() {
        let e = Extent::new(EPSG_4326, -180.0, 0.0, -90.0, 90.0);
        assert_eq!(e.center(), (-90.0, 0.0));
        assert_eq!(e.dimensions(), (180.0, 180.0));
    }

    #[test]
    fn test_shared_edge_does_not_intersect() {
        let registry = CrsRegistry::new();
        let west = Extent::new(EPSG_4326, -180.0, 0.0, -90.0, 90.0);
        let east = Extent::new(EPSG_4326, 0.0, 180.0, -90.0, 90.0);
        assert!(!west.intersects_extent(&registry, &east).unwrap());
        assert!(west.intersection(&registry, &east).unwrap().is_none());
        assert_eq!(
            west.union(&registry, &east).unwrap(),
            Extent::new(EPSG_4326, -180.0, 180.0, -90.0, 90.0)
        );
    }

    #[test]
    fn test_intersection() {
        let registry = CrsRegistry::new();
        let a = Extent::new(EPSG_4326, 0.0, 10.0, 0.0, 10.0);
        let b = Extent::new(EPSG_4326, 5.0, 15.0, -5.0, 5.0);
        assert!(a.intersects_extent(&registry, &b).unwrap());
        assert_eq!(
            a.intersection(&registry, &b).unwrap().unwrap(),
            Extent::new(EPSG_4326, 5.0, 10.0, 0.0, 5.0)
        );
    }

    #[test]
    fn test_contains() {
        let registry = CrsRegistry::new();
        let e = Extent::new(EPSG_4326, 0.0, 10.0, 0.0, 10.0);
        assert!(e
            .contains_extent(&registry, &Extent::new(EPSG_4326, 1.0, 2.0, 1.0, 2.0))
            .unwrap());
        assert!(!e
            .contains_extent(&registry, &Extent::new(EPSG_4326, -1.0, 2.0, 1.0, 2.0))
            .unwrap());
        assert!(e
            .contains_point(&registry, &Coordinates::geographic(10.0, 0.0, 0.0))
            .unwrap());

        let ecef = Coordinates::geographic(5.0, 5.0, 100.0)
            .as_crs(&registry, EPSG_4978)
            .unwrap();
        assert!(e.contains_point(&registry, &ecef).unwrap());
    }

    #[test]
    fn test_mixed_crs_operations_convert_other() {
        let registry = CrsRegistry::new();
        let geographic = Extent::new(EPSG_4326, 0.0, 10.0, 0.0, 10.0);
        let mercator = geographic.as_crs(&registry, EPSG_3857).unwrap();

        assert!(geographic.intersects_extent(&registry, &mercator).unwrap());
        assert!(mercator.intersects_extent(&registry, &geographic).unwrap());

        let overlap = geographic.intersection(&registry, &mercator).unwrap().unwrap();
        assert_eq!(overlap.crs(), EPSG_4326);
        assert!((overlap.east - 10.0).abs() < 1e-9);
        assert!((overlap.north - 10.0).abs() < 1e-9);

        let inner = Extent::new(EPSG_4326, 2.0, 3.0, 2.0, 3.0)
            .as_crs(&registry, EPSG_3857)
            .unwrap();
        assert!(geographic.contains_extent(&registry, &inner).unwrap());

        let far = Extent::new(EPSG_4326, 20.0, 30.0, 20.0, 30.0)
            .as_crs(&registry, EPSG_3857)
            .unwrap();
        assert!(!geographic.intersects_extent(&registry, &far).unwrap());
        let covering = geographic.union(&registry, &far).unwrap();
        assert_eq!(covering.crs(), EPSG_4326);
        assert!((covering.north - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_mixed_crs_to_geocentric_is_an_error() {
        let registry = CrsRegistry::new();
        let geographic = Extent::new(EPSG_4326, 0.0, 10.0, 0.0, 10.0);
        let odd = Extent::new(EPSG_4978, 0.0, 1.0, 0.0, 1.0);
        assert!(odd.intersects_extent(&registry, &geographic).is_err());
    }

    #[test]
    fn test_as_crs_mercator() {
        let registry = CrsRegistry::new();
        let e = Extent::new(EPSG_4326, -180.0, 180.0, -45.0, 45.0);
        let m = e.as_crs(&registry, EPSG_3857).unwrap();
        assert!((m.east - mercator_half_extent()).abs() < 1e-6);
        assert!((m.west + mercator_half_extent()).abs() < 1e-6);
        assert!((m.north + m.south).abs() < 1e-6);

        let back = m.as_crs(&registry, EPSG_4326).unwrap();
        assert!((back.north - 45.0).abs() < 1e-9);
    }

    struct Scale;

    impl Projection for Scale {
        fn forward(&self, x: f64, y: f64) -> (f64, f64) {
            (x * 1000.0, y * 1000.0)
        }
    }

    #[test]
    fn test_as_crs_uses_registered_degree_crs() {
        let mut registry = CrsRegistry::new();
        registry.register_definition("EPSG:4269", Unit::Degree);
        registry.register_projection(
            "EPSG:4269",
            EPSG_3857,
            Arc::new(|| Arc::new(Scale) as Arc<dyn Projection>),
        );

        let e = Extent::new("EPSG:4269", 0.0, 1.0, 0.0, 2.0);
        let m = e.as_crs(&registry, EPSG_3857).unwrap();
        assert_eq!(m, Extent::new(EPSG_3857, 0.0, 1000.0, 0.0, 2000.0));
    }

    #[test]
    fn test_as_crs_geocentric_is_unsupported() {
        let registry = CrsRegistry::new();
        let e = Extent::new(EPSG_4326, 0.0, 1.0, 0.0, 1.0);
        assert!(matches!(
            e.as_crs(&registry, EPSG_4978),
            Err(CrsError::UnsupportedCrsConversion { .. })
        ));
    }

    #[test]
    fn test_quarters_order() {
        let [nw, ne, sw, se] = Extent::new(EPSG_4326, 0.0, 180.0, -90.0, 90.0).quarters();
        assert_eq!(nw, Extent::new(EPSG_4326, 0.0, 90.0, 0.0, 90.0));
        assert_eq!(ne, Extent::new(EPSG_4326, 90.0, 180.0, 0.0, 90.0));
        assert_eq!(sw, Extent::new(EPSG_4326, 0.0, 90.0, -90.0, 0.0));
        assert_eq!(se, Extent::new(EPSG_4326, 90.0, 180.0, -90.0, 0.0));
    }

    proptest! {
        #[test]
        fn prop_quarters_partition_parent(
            west in -180.0f64..180.0,
            width in 1e-6f64..360.0,
            south in -90.0f64..90.0,
            height in 1e-6f64..180.0,
        ) {
            let parent = Extent::new(EPSG_4326, west, west + width, south, south + height);
            let quarters = parent.quarters();

            let registry = CrsRegistry::new();
            let union = quarters[1..]
                .iter()
                .fold(quarters[0].clone(), |acc, q| acc.cover(q));
            prop_assert_eq!(&union, &parent);

            for (i, a) in quarters.iter().enumerate() {
                prop_assert!(parent.contains_extent(&registry, a).unwrap());
                for b in &quarters[i + 1..] {
                    let overlap = a
                        .intersection(&registry, b)
                        .unwrap()
                        .map(|e| e.area())
                        .unwrap_or(0.0);
                    prop_assert_eq!(overlap, 0.0);
                }
            }
        }
    }
}
