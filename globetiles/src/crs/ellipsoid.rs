//! Reference ellipsoid and the geodetic ⇄ geocentric transforms.
//!
//! Angles are in radians, lengths in meters.

use glam::DVec3;

/// WGS84 semi-major axis in meters.
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS84 semi-minor axis in meters.
pub const WGS84_SEMI_MINOR_AXIS: f64 = 6_356_752.314_245_179_3;

/// Upper bound on fixed-point refinements of the geodetic latitude.
const MAX_LATITUDE_ITERATIONS: usize = 10;

/// Latitude update (radians) below which refinement stops.
const LATITUDE_TOLERANCE: f64 = 1e-14;

/// Geodetic position: longitude and latitude in radians, height in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cartographic {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

impl Cartographic {
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }
}

/// Ellipsoid of revolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Equatorial radius `a`.
    pub semi_major_axis: f64,
    /// Polar radius `b`.
    pub semi_minor_axis: f64,
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

impl Ellipsoid {
    /// The WGS84 reference ellipsoid.
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major_axis: WGS84_SEMI_MAJOR_AXIS,
        semi_minor_axis: WGS84_SEMI_MINOR_AXIS,
    };

    pub fn new(semi_major_axis: f64, semi_minor_axis: f64) -> Self {
        Self {
            semi_major_axis,
            semi_minor_axis,
        }
    }

    /// First eccentricity squared, `1 - b²/a²`.
    pub fn eccentricity_squared(&self) -> f64 {
        let a = self.semi_major_axis;
        let b = self.semi_minor_axis;
        1.0 - (b * b) / (a * a)
    }

    /// Prime-vertical radius of curvature `N(φ) = a² / sqrt(a²cos²φ + b²sin²φ)`.
    pub fn prime_vertical_radius(&self, latitude: f64) -> f64 {
        let a = self.semi_major_axis;
        let b = self.semi_minor_axis;
        let (sin_lat, cos_lat) = latitude.sin_cos();
        (a * a) / (a * a * cos_lat * cos_lat + b * b * sin_lat * sin_lat).sqrt()
    }

    /// Outward unit normal of the ellipsoid at a geodetic position.
    pub fn geodetic_surface_normal(&self, longitude: f64, latitude: f64) -> DVec3 {
        let (sin_lat, cos_lat) = latitude.sin_cos();
        let (sin_lon, cos_lon) = longitude.sin_cos();
        DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
    }

    /// Geodetic → geocentric (ECEF).
    pub fn cartographic_to_cartesian(&self, position: &Cartographic) -> DVec3 {
        let a = self.semi_major_axis;
        let b = self.semi_minor_axis;
        let n = self.prime_vertical_radius(position.latitude);
        let h = position.height;
        let (sin_lat, cos_lat) = position.latitude.sin_cos();
        let (sin_lon, cos_lon) = position.longitude.sin_cos();

        DVec3::new(
            (n + h) * cos_lat * cos_lon,
            (n + h) * cos_lat * sin_lon,
            (n * (b * b) / (a * a) + h) * sin_lat,
        )
    }

    /// Geocentric (ECEF) → geodetic.
    ///
    /// Longitude is exact. Latitude starts from Bowring's parametric guess and
    /// is refined by fixed-point iteration; height uses the closed form
    /// `p·cosφ + z·sinφ − a·sqrt(1 − e²sin²φ)`, which stays stable at the poles.
    pub fn cartesian_to_cartographic(&self, position: DVec3) -> Cartographic {
        let a = self.semi_major_axis;
        let b = self.semi_minor_axis;
        let e2 = self.eccentricity_squared();
        let ep2 = (a * a) / (b * b) - 1.0;

        let (x, y, z) = (position.x, position.y, position.z);
        let p = (x * x + y * y).sqrt();
        let longitude = y.atan2(x);

        // Bowring's initial estimate
        let theta = (z * a).atan2(p * b);
        let (sin_theta, cos_theta) = theta.sin_cos();
        let mut latitude = (z + ep2 * b * sin_theta.powi(3)).atan2(p - e2 * a * cos_theta.powi(3));

        for _ in 0..MAX_LATITUDE_ITERATIONS {
            let n = a / (1.0 - e2 * latitude.sin().powi(2)).sqrt();
            let next = (z + e2 * n * latitude.sin()).atan2(p);
            let delta = (next - latitude).abs();
            latitude = next;
            if delta < LATITUDE_TOLERANCE {
                break;
            }
        }

        let (sin_lat, cos_lat) = latitude.sin_cos();
        let height = p * cos_lat + z * sin_lat - a * (1.0 - e2 * sin_lat * sin_lat).sqrt();

        Cartographic {
            longitude,
            latitude,
            height,
        }
    }
}
