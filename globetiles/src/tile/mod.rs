//! Tile quadtree.
//!
//! A [`SchemeTile`] fixes the root tiles covering a dataset. A
//! [`TileHierarchy`] grows a quadtree below those roots, one subdivision at
//! a time, with each node carrying a [`TileBounds`] used for culling and
//! screen-space error.

mod bounds;
mod hierarchy;
mod scheme;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cache::CacheKey;

pub use bounds::{Surface, TileBounds};
pub use hierarchy::{HierarchyError, TileHierarchy, TileIndex, TileNode, Visit};
pub use scheme::SchemeTile;

/// Position of a tile in its scheme: level, row (southward) and column
/// (eastward).
///
/// # Example
///
/// ```
/// use globetiles::tile::{Quadrant, TileId};
///
/// let tile = TileId::new(3, 4, 5);
/// let child = tile.child(Quadrant::SE).unwrap();
/// assert_eq!(child, TileId::new(4, 9, 11));
/// assert_eq!(child.parent(), Some(tile));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileId {
    pub level: u8,
    pub row: u32,
    pub col: u32,
}

impl TileId {
    pub fn new(level: u8, row: u32, col: u32) -> Self {
        Self { level, row, col }
    }

    /// Id of the child in `quadrant`, `None` when its level, row or column
    /// does not fit.
    pub fn child(&self, quadrant: Quadrant) -> Option<TileId> {
        let (dx, dy) = quadrant.offset();
        Some(TileId {
            level: self.level.checked_add(1)?,
            row: self.row.checked_mul(2)?.checked_add(dy)?,
            col: self.col.checked_mul(2)?.checked_add(dx)?,
        })
    }

    /// Whether all four children are addressable.
    pub fn can_subdivide(&self) -> bool {
        self.child(Quadrant::SE).is_some()
    }

    /// Id of the parent tile, `None` at level 0.
    pub fn parent(&self) -> Option<TileId> {
        if self.level == 0 {
            return None;
        }
        Some(TileId {
            level: self.level - 1,
            row: self.row / 2,
            col: self.col / 2,
        })
    }

    /// Cache key `level_row_col`.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::tile(self.level, self.row, self.col)
    }

    /// Inverse of [`TileId::cache_key`]; `None` for keys of other shapes.
    pub fn from_cache_key(key: &CacheKey) -> Option<TileId> {
        let mut parts = key.as_str().split('_');
        let level = parts.next()?.parse().ok()?;
        let row = parts.next()?.parse().ok()?;
        let col = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(TileId { level, row, col })
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.row, self.col)
    }
}

/// Child position within a subdivided parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NW,
    NE,
    SW,
    SE,
}

impl Quadrant {
    /// Children order used everywhere in the hierarchy.
    pub const ALL: [Quadrant; 4] = [Quadrant::NW, Quadrant::NE, Quadrant::SW, Quadrant::SE];

    /// `(column, row)` offset inside the parent.
    pub fn offset(&self) -> (u32, u32) {
        match self {
            Quadrant::NW => (0, 0),
            Quadrant::NE => (1, 0),
            Quadrant::SW => (0, 1),
            Quadrant::SE => (1, 1),
        }
    }
}

/// Lifecycle state of a quadtree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileState {
    /// Created, base resource not available yet.
    Pending,
    /// Base resource available, not currently shown.
    Ready,
    /// Has exactly four children; never displayed itself.
    Subdivided,
    /// Outside the view in the last frame.
    Culled,
    /// Part of the last frame's display set.
    Displayed,
}

impl fmt::Display for TileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TileState::Pending => "pending",
            TileState::Ready => "ready",
            TileState::Subdivided => "subdivided",
            TileState::Culled => "culled",
            TileState::Displayed => "displayed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_ids() {
        let parent = TileId::new(0, 0, 1);
        let ids: Vec<TileId> = Quadrant::ALL
            .iter()
            .map(|q| parent.child(*q).unwrap())
            .collect();
        assert_eq!(
            ids,
            vec![
                TileId::new(1, 0, 2),
                TileId::new(1, 0, 3),
                TileId::new(1, 1, 2),
                TileId::new(1, 1, 3),
            ]
        );
        assert!(ids.iter().all(|id| id.parent() == Some(parent)));
    }

    #[test]
    fn test_child_past_addressable_range() {
        let deep = TileId::new(31, 0, u32::MAX / 2);
        assert_eq!(deep.child(Quadrant::NW), Some(TileId::new(32, 0, u32::MAX - 1)));
        assert_eq!(deep.child(Quadrant::NE), Some(TileId::new(32, 0, u32::MAX)));
        assert!(deep.can_subdivide());

        let edge = TileId::new(32, 0, u32::MAX / 2 + 1);
        assert_eq!(edge.child(Quadrant::NW), None);
        assert!(!edge.can_subdivide());

        assert!(!TileId::new(u8::MAX, 0, 0).can_subdivide());
    }

    #[test]
    fn test_root_has_no_parent() {
        assert_eq!(TileId::new(0, 0, 0).parent(), None);
    }

    #[test]
    fn test_display_and_key() {
        let id = TileId::new(12, 34, 56);
        assert_eq!(id.to_string(), "12/34/56");
        assert_eq!(id.cache_key().as_str(), "12_34_56");
        assert_eq!(TileId::from_cache_key(&id.cache_key()), Some(id));
        assert_eq!(TileId::from_cache_key(&CacheKey::from(("a", 1))), None);
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&TileState::Subdivided).unwrap();
        assert_eq!(json, "\"subdivided\"");
    }
}
