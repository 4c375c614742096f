//! Conservative visibility tests.
//!
//! Both tests may keep a tile that is actually invisible but never reject
//! a visible one.

use glam::{DMat4, DVec3, DVec4};

use crate::tile::TileBounds;

const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// View frustum as six inward-facing planes.
#[derive(Debug, Clone)]
pub struct Frustum {
    planes: [DVec4; 6],
}

impl Frustum {
    /// Extract the planes of a view-projection matrix with `[0, 1]` clip
    /// depth (Gribb–Hartmann).
    pub fn from_view_projection(vp: &DMat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [DVec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        planes[NEAR] = rows[2];
        planes[FAR] = rows[3] - rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Whether the box `[min, max]` is at least partially inside.
    ///
    /// p-vertex test: a box is rejected only when its corner furthest
    /// along some plane normal is behind that plane.
    pub fn intersects_box(&self, min: DVec3, max: DVec3) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            let p = DVec3::select(normal.cmpge(DVec3::ZERO), max, min);
            normal.dot(p) + plane.w >= 0.0
        })
    }

    pub fn intersects_bounds(&self, bounds: &TileBounds) -> bool {
        self.intersects_box(bounds.min, bounds.max)
    }
}

/// Occlusion by an opaque sphere centered at the origin.
///
/// Globe tiles use a sphere of the ellipsoid's polar radius, which lies
/// entirely inside the ellipsoid.
#[derive(Debug, Clone)]
pub struct HorizonCuller {
    camera_position: DVec3,
    /// Unit vector from the camera towards the sphere center.
    axis: DVec3,
    camera_distance: f64,
    /// Distance along `axis` of the plane through the horizon circle.
    horizon_plane_distance: f64,
    /// Half-angle of the cone tangent to the sphere.
    cone_half_angle: f64,
    inside: bool,
}

impl HorizonCuller {
    pub fn new(camera_position: DVec3, radius: f64) -> Self {
        let camera_distance = camera_position.length();
        let inside = camera_distance <= radius;
        let axis = if inside {
            DVec3::ZERO
        } else {
            -camera_position / camera_distance
        };
        let (horizon_plane_distance, cone_half_angle) = if inside {
            (0.0, 0.0)
        } else {
            (
                (camera_distance * camera_distance - radius * radius) / camera_distance,
                (radius / camera_distance).asin(),
            )
        };

        Self {
            camera_position,
            axis,
            camera_distance,
            horizon_plane_distance,
            cone_half_angle,
            inside,
        }
    }

    pub fn camera_distance(&self) -> f64 {
        self.camera_distance
    }

    /// Whether a sphere is entirely hidden behind the occluder.
    ///
    /// Hidden means fully beyond the horizon plane and fully inside the
    /// tangent cone; every ray to such a point crosses the visible cap
    /// first.
    pub fn is_occluded(&self, center: DVec3, radius: f64) -> bool {
        if self.inside {
            return false;
        }

        let to_center = center - self.camera_position;
        let distance = to_center.length();
        if distance <= radius {
            return false;
        }

        let along_axis = to_center.dot(self.axis);
        if along_axis - radius <= self.horizon_plane_distance {
            return false;
        }

        let angle = (along_axis / distance).clamp(-1.0, 1.0).acos();
        let margin = (radius / distance).asin();
        angle + margin < self.cone_half_angle
    }

    pub fn is_bounds_occluded(&self, bounds: &TileBounds) -> bool {
        self.is_occluded(bounds.center, bounds.radius)
    }
}
