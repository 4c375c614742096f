//! Bounding volumes of tiles in world space.

use glam::DVec3;

use crate::crs::{Cartographic, Ellipsoid};
use crate::extent::Extent;

/// Samples per axis when bounding an ellipsoidal tile.
const SAMPLES_PER_AXIS: usize = 3;

/// World-space surface the tiles of a hierarchy lie on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    /// Geographic extents (degrees) draped on an ellipsoid, in ECEF meters.
    Ellipsoid(Ellipsoid),
    /// Projected extents used as-is, heights on the z axis.
    Planar,
}

impl Surface {
    pub fn is_globe(&self) -> bool {
        matches!(self, Surface::Ellipsoid(_))
    }
}

/// Axis-aligned box plus enclosing sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub min: DVec3,
    pub max: DVec3,
    pub center: DVec3,
    pub radius: f64,
}

impl TileBounds {
    /// Bounds of `extent` between `min_height` and `max_height` on `surface`.
    pub fn compute(surface: &Surface, extent: &Extent, min_height: f64, max_height: f64) -> Self {
        match surface {
            Surface::Ellipsoid(ellipsoid) => {
                Self::ellipsoidal(ellipsoid, extent, min_height, max_height)
            }
            Surface::Planar => Self::planar(extent, min_height, max_height),
        }
    }

    /// Bounds of a geographic extent (degrees) on an ellipsoid.
    ///
    /// Samples a 3×3 grid at both heights and pads the box by the sagitta
    /// between samples so curved edges stay inside.
    pub fn ellipsoidal(
        ellipsoid: &Ellipsoid,
        extent: &Extent,
        min_height: f64,
        max_height: f64,
    ) -> Self {
        let mut min = DVec3::splat(f64::INFINITY);
        let mut max = DVec3::splat(f64::NEG_INFINITY);

        let (width, height) = extent.dimensions();
        let steps = (SAMPLES_PER_AXIS - 1) as f64;
        for i in 0..SAMPLES_PER_AXIS {
            let lon = extent.west + width * i as f64 / steps;
            for j in 0..SAMPLES_PER_AXIS {
                let lat = extent.south + height * j as f64 / steps;
                for h in [min_height, max_height] {
                    let p = ellipsoid.cartographic_to_cartesian(&Cartographic::new(
                        lon.to_radians(),
                        lat.to_radians(),
                        h,
                    ));
                    min = min.min(p);
                    max = max.max(p);
                }
            }
        }

        let spacing = (width.max(height) / steps).to_radians();
        let outer_radius = ellipsoid.semi_major_axis + max_height.max(0.0);
        let sagitta = outer_radius * (1.0 - (spacing * 0.5).cos());
        Self::from_box(min - DVec3::splat(sagitta), max + DVec3::splat(sagitta))
    }

    /// Bounds of a projected extent, heights on z.
    pub fn planar(extent: &Extent, min_height: f64, max_height: f64) -> Self {
        Self::from_box(
            DVec3::new(extent.west, extent.south, min_height.min(max_height)),
            DVec3::new(extent.east, extent.north, min_height.max(max_height)),
        )
    }

    pub fn from_box(min: DVec3, max: DVec3) -> Self {
        let center = (min + max) * 0.5;
        Self {
            min,
            max,
            center,
            radius: (max - center).length(),
        }
    }

    /// Distance from `point` to the bounding sphere, zero inside.
    pub fn distance_to(&self, point: DVec3) -> f64 {
        ((point - self.center).length() - self.radius).max(0.0)
    }

    /// World-space error of showing this tile at `tile_pixel_size` pixels.
    pub fn geometric_error(&self, tile_pixel_size: f64) -> f64 {
        2.0 * self.radius / tile_pixel_size.max(1.0)
    }

    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}
