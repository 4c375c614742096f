//! Per-frame camera state.

use glam::{DMat4, DVec3};

use crate::crs::{Coordinates, CrsError, CrsRegistry, EPSG_4978};

/// Closest near plane used by [`ViewState::from_geographic`], in meters.
const MIN_NEAR_PLANE: f64 = 1.0;

/// Immutable camera description for one frame.
///
/// Positions are in the world space of the hierarchy being viewed: ECEF
/// meters for globe schemes, projected meters for planar ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub camera_position: DVec3,
    /// Projection × view, mapping world space to clip space with depth in
    /// `[0, 1]`.
    pub view_projection: DMat4,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Vertical field of view in radians.
    pub fov_y: f64,
}

impl ViewState {
    pub fn new(
        camera_position: DVec3,
        view_projection: DMat4,
        viewport: (f64, f64),
        fov_y: f64,
    ) -> Self {
        Self {
            camera_position,
            view_projection,
            viewport_width: viewport.0,
            viewport_height: viewport.1,
            fov_y,
        }
    }

    /// Perspective camera at `eye` looking at `target`.
    pub fn look_at(
        eye: DVec3,
        target: DVec3,
        up: DVec3,
        fov_y: f64,
        viewport: (f64, f64),
        near: f64,
        far: f64,
    ) -> Self {
        let aspect = viewport.0 / viewport.1.max(1.0);
        let view = DMat4::look_at_rh(eye, target, up);
        let projection = DMat4::perspective_rh(fov_y, aspect, near, far);
        Self::new(eye, projection * view, viewport, fov_y)
    }

    /// Camera at a geographic position looking straight down at the globe.
    ///
    /// # Arguments
    ///
    /// * `longitude`, `latitude` - Camera position in degrees
    /// * `altitude` - Meters above the ellipsoid
    pub fn from_geographic(
        registry: &CrsRegistry,
        longitude: f64,
        latitude: f64,
        altitude: f64,
        viewport: (f64, f64),
        fov_y: f64,
    ) -> Result<Self, CrsError> {
        let eye = Coordinates::geographic(longitude, latitude, altitude)
            .as_crs(registry, EPSG_4978)?
            .xyz()?;
        let ground = Coordinates::geographic(longitude, latitude, 0.0)
            .as_crs(registry, EPSG_4978)?
            .xyz()?;

        let forward = (ground - eye).normalize_or_zero();
        let up = if forward.cross(DVec3::Z).length_squared() < 1e-12 {
            DVec3::X
        } else {
            DVec3::Z
        };

        let near = (altitude * 1e-3).max(MIN_NEAR_PLANE);
        let far = eye.length() + registry.ellipsoid().semi_major_axis;
        Ok(Self::look_at(eye, ground, up, fov_y, viewport, near, far))
    }

    /// Camera above a projected plane looking straight down.
    ///
    /// Matches the world space of planar hierarchies: projected `x`, `y`
    /// with heights on z.
    pub fn from_projected(x: f64, y: f64, altitude: f64, viewport: (f64, f64), fov_y: f64) -> Self {
        let eye = DVec3::new(x, y, altitude);
        let target = DVec3::new(x, y, 0.0);
        let near = (altitude * 1e-3).max(MIN_NEAR_PLANE);
        let far = altitude.abs() * 2.0 + near;
        Self::look_at(eye, target, DVec3::Y, fov_y, viewport, near, far)
    }

    /// Pixels per unit of geometric error at unit distance:
    /// `viewport_height / (2·tan(fov_y / 2))`.
    pub fn pre_sse(&self) -> f64 {
        self.viewport_height / (2.0 * (self.fov_y * 0.5).tan())
    }
}
