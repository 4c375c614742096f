//! Resource readiness as seen by the controller.

use std::collections::HashSet;

use crate::tile::TileId;

/// Frame-consistent view of which tile resources are available.
pub trait ReadinessGate {
    /// Whether the tile's base resource is loaded.
    fn is_ready(&self, tile: TileId) -> bool;

    /// Whether a fetch for the tile is outstanding.
    fn is_loading(&self, _tile: TileId) -> bool {
        false
    }

    /// Whether the tile's fetch failed for good.
    fn is_failed(&self, _tile: TileId) -> bool {
        false
    }
}

/// Gate for hierarchies without resources: everything is ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

impl ReadinessGate for AlwaysReady {
    fn is_ready(&self, _tile: TileId) -> bool {
        true
    }
}

impl ReadinessGate for HashSet<TileId> {
    fn is_ready(&self, tile: TileId) -> bool {
        self.contains(&tile)
    }
}
