//! Subdivision controller configuration.

// ==================== Subdivision Defaults ====================

/// Default deepest level a tile may reach.
pub const DEFAULT_MAX_SUBDIVISION_LEVEL: u8 = 18;

/// Deepest level any configuration may request.
///
/// Two-root geographic schemes address `2^(level + 1)` columns, which
/// stay within `u32` through level 31.
pub const MAX_SUBDIVISION_LEVEL: u8 = 30;

/// Default screen-space error threshold in pixels.
///
/// Leaves whose error exceeds it are subdivided.
pub const DEFAULT_SSE_THRESHOLD: f64 = 1.0;

/// Default maximum gap between a tile's level and the level of the
/// elevation data its bounds were computed from.
pub const DEFAULT_MAX_DELTA_ELEVATION_LEVEL: u8 = 4;

/// Default level below which tiles always subdivide.
pub const DEFAULT_MIN_SUBDIVISION_LEVEL: u8 = 2;

/// Default level below which tiles are never culled.
pub const DEFAULT_MIN_CULLING_LEVEL: u8 = 2;

/// Default fraction of the threshold under which a subdivided tile merges.
pub const DEFAULT_MERGE_HYSTERESIS: f64 = 0.5;

/// Default on-screen size of one tile in pixels.
pub const DEFAULT_TILE_PIXEL_SIZE: f64 = 256.0;

/// Tuning of the per-frame subdivision decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct SubdivisionConfig {
    // ==================== Depth ====================
    /// Tiles at this level never subdivide. Default: 18.
    pub max_subdivision_level: u8,

    /// Tiles below this level subdivide regardless of error. Default: 2.
    pub min_subdivision_level: u8,

    /// Maximum `level - elevation_level` at which a tile may still
    /// subdivide. Default: 4.
    pub max_delta_elevation_level: u8,

    // ==================== Error ====================
    /// Screen-space error threshold in pixels. Default: 1.0.
    pub sse_threshold: f64,

    /// A subdivided tile merges when its error drops below
    /// `merge_hysteresis × sse_threshold`. Default: 0.5.
    pub merge_hysteresis: f64,

    /// On-screen size of one tile in pixels. Default: 256.
    pub tile_pixel_size: f64,

    // ==================== Culling & Readiness ====================
    /// Tiles below this level are never culled. Default: 2.
    pub min_culling_level: u8,

    /// Test globe tiles against the ellipsoid horizon. Default: true.
    pub horizon_culling: bool,

    /// Require every ancestor's resource, not only the tile's own, before
    /// subdividing. Default: false.
    pub require_ancestor_resources: bool,
}

impl Default for SubdivisionConfig {
    fn default() -> Self {
        Self {
            max_subdivision_level: DEFAULT_MAX_SUBDIVISION_LEVEL,
            min_subdivision_level: DEFAULT_MIN_SUBDIVISION_LEVEL,
            max_delta_elevation_level: DEFAULT_MAX_DELTA_ELEVATION_LEVEL,
            sse_threshold: DEFAULT_SSE_THRESHOLD,
            merge_hysteresis: DEFAULT_MERGE_HYSTERESIS,
            tile_pixel_size: DEFAULT_TILE_PIXEL_SIZE,
            min_culling_level: DEFAULT_MIN_CULLING_LEVEL,
            horizon_culling: true,
            require_ancestor_resources: false,
        }
    }
}

impl SubdivisionConfig {
    /// Clamped to [`MAX_SUBDIVISION_LEVEL`].
    pub fn with_max_subdivision_level(mut self, level: u8) -> Self {
        self.max_subdivision_level = level.min(MAX_SUBDIVISION_LEVEL);
        self
    }

    pub fn with_min_subdivision_level(mut self, level: u8) -> Self {
        self.min_subdivision_level = level;
        self
    }

    pub fn with_max_delta_elevation_level(mut self, delta: u8) -> Self {
        self.max_delta_elevation_level = delta;
        self
    }

    pub fn with_sse_threshold(mut self, threshold: f64) -> Self {
        self.sse_threshold = threshold;
        self
    }

    pub fn with_merge_hysteresis(mut self, hysteresis: f64) -> Self {
        self.merge_hysteresis = hysteresis;
        self
    }

    pub fn with_tile_pixel_size(mut self, pixels: f64) -> Self {
        self.tile_pixel_size = pixels;
        self
    }

    pub fn with_min_culling_level(mut self, level: u8) -> Self {
        self.min_culling_level = level;
        self
    }

    pub fn with_horizon_culling(mut self, enabled: bool) -> Self {
        self.horizon_culling = enabled;
        self
    }

    pub fn with_require_ancestor_resources(mut self, required: bool) -> Self {
        self.require_ancestor_resources = required;
        self
    }

    /// Error below which a subdivided tile merges.
    pub fn merge_threshold(&self) -> f64 {
        self.sse_threshold * self.merge_hysteresis
    }
}
