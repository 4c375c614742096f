//! Screen-space error.

use crate::tile::TileBounds;

use super::view::ViewState;

/// Smallest camera-to-tile distance used in the error formula, in meters.
pub const MIN_SSE_DISTANCE: f64 = 1e-3;

/// Projected size in pixels of `geometric_error` seen from `distance`.
pub fn screen_space_error(pre_sse: f64, geometric_error: f64, distance: f64) -> f64 {
    pre_sse * geometric_error / distance.max(MIN_SSE_DISTANCE)
}

/// Screen-space error of a tile for the current view.
///
/// The distance is measured to the tile's bounding sphere, so a camera
/// inside the sphere yields the maximum error.
pub fn tile_sse(view: &ViewState, bounds: &TileBounds, tile_pixel_size: f64) -> f64 {
    let distance = (view.camera_position - bounds.center).length() - bounds.radius;
    screen_space_error(
        view.pre_sse(),
        bounds.geometric_error(tile_pixel_size),
        distance,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DMat4, DVec3};

    #[test]
    fn test_error_shrinks_with_distance() {
        let near = screen_space_error(1000.0, 10.0, 100.0);
        let far = screen_space_error(1000.0, 10.0, 1000.0);
        assert_eq!(near, 100.0);
        assert_eq!(far, 10.0);
    }

    #[test]
    fn test_distance_is_clamped() {
        assert_eq!(
            screen_space_error(1.0, 1.0, -5.0),
            1.0 / MIN_SSE_DISTANCE
        );
    }

    #[test]
    fn test_tile_sse() {
        let view = ViewState::new(
            DVec3::new(0.0, 0.0, 1_000.0),
            DMat4::IDENTITY,
            (1000.0, 1000.0),
            std::f64::consts::FRAC_PI_2,
        );
        let bounds = TileBounds::from_box(DVec3::new(-128.0, -128.0, -1.0), DVec3::new(128.0, 128.0, 1.0));
        let sse = tile_sse(&view, &bounds, 256.0);
        let expected = 500.0 * (2.0 * bounds.radius / 256.0) / (1_000.0 - bounds.radius);
        assert!((sse - expected).abs() < 1e-9);
    }
}
