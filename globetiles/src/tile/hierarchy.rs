//! Arena-backed quadtree.
//!
//! Nodes live in a `Vec` slot arena and refer to each other by
//! [`TileIndex`]. Freed slots are recycled, so an index is only meaningful
//! while its node is alive.

use std::collections::HashMap;

use thiserror::Error;
use tracing::trace;

use crate::crs::{CrsError, CrsRegistry, EPSG_4326};
use crate::extent::Extent;

use super::bounds::{Surface, TileBounds};
use super::scheme::SchemeTile;
use super::{Quadrant, TileId, TileState};

/// Handle to a node in a [`TileHierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex(usize);

impl TileIndex {
    pub fn slot(&self) -> usize {
        self.0
    }
}

/// Errors from structural changes to the hierarchy.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HierarchyError {
    #[error("Tile {0} is already subdivided")]
    AlreadySubdivided(TileId),

    #[error("No tile at index {0}")]
    InvalidIndex(usize),

    #[error("Tile {tile} cannot be {state}")]
    InvalidState { tile: TileId, state: TileState },

    #[error("Children of tile {0} are not addressable")]
    LevelOverflow(TileId),

    #[error("Tile scheme has no roots")]
    EmptyScheme,

    #[error("Globe schemes must use EPSG:4326, got {0}")]
    UnsupportedSchemeCrs(String),

    #[error(transparent)]
    Crs(#[from] CrsError),
}

/// Visitor verdict for [`TileHierarchy::visit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Descend into the node's children.
    Continue,
    /// Skip the node's descendants.
    Prune,
}

/// One quadtree node.
#[derive(Debug, Clone)]
pub struct TileNode {
    id: TileId,
    extent: Extent,
    bounds: TileBounds,
    state: TileState,
    parent: Option<TileIndex>,
    children: Option<[TileIndex; 4]>,
    height_range: (f64, f64),
    elevation_level: Option<u8>,
}

impl TileNode {
    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn level(&self) -> u8 {
        self.id.level
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub fn bounds(&self) -> &TileBounds {
        &self.bounds
    }

    pub fn state(&self) -> TileState {
        self.state
    }

    pub fn parent(&self) -> Option<TileIndex> {
        self.parent
    }

    pub fn children(&self) -> Option<[TileIndex; 4]> {
        self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// `(min, max)` height used for the bounds.
    pub fn height_range(&self) -> (f64, f64) {
        self.height_range
    }

    /// Level whose elevation data the height range came from.
    pub fn elevation_level(&self) -> Option<u8> {
        self.elevation_level
    }
}

/// The quadtree below a [`SchemeTile`].
#[derive(Debug)]
pub struct TileHierarchy {
    nodes: Vec<Option<TileNode>>,
    free: Vec<usize>,
    lookup: HashMap<TileId, TileIndex>,
    roots: Vec<TileIndex>,
    surface: Surface,
}

impl TileHierarchy {
    /// Build the root level of `scheme`.
    ///
    /// Geographic schemes are bounded on the registry's ellipsoid and must be
    /// in `EPSG:4326`; projected schemes get planar bounds.
    pub fn new(scheme: &SchemeTile, registry: &CrsRegistry) -> Result<Self, HierarchyError> {
        if scheme.roots().is_empty() {
            return Err(HierarchyError::EmptyScheme);
        }

        let crs = scheme.crs().as_str();
        let surface = if registry.is_geographic(crs)? {
            if crs != EPSG_4326 {
                return Err(HierarchyError::UnsupportedSchemeCrs(crs.to_string()));
            }
            Surface::Ellipsoid(*registry.ellipsoid())
        } else {
            Surface::Planar
        };

        let mut hierarchy = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            lookup: HashMap::new(),
            roots: Vec::new(),
            surface,
        };
        for (id, extent) in scheme.roots() {
            let index = hierarchy.insert(*id, extent.clone(), None, (0.0, 0.0), None);
            hierarchy.roots.push(index);
        }
        Ok(hierarchy)
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Root nodes in scheme order.
    pub fn roots(&self) -> &[TileIndex] {
        &self.roots
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn get(&self, index: TileIndex) -> Option<&TileNode> {
        self.nodes.get(index.0).and_then(Option::as_ref)
    }

    /// Like [`TileHierarchy::get`] but with an error for dead indices.
    pub fn node(&self, index: TileIndex) -> Result<&TileNode, HierarchyError> {
        self.get(index).ok_or(HierarchyError::InvalidIndex(index.0))
    }

    fn node_mut(&mut self, index: TileIndex) -> Result<&mut TileNode, HierarchyError> {
        self.nodes
            .get_mut(index.0)
            .and_then(Option::as_mut)
            .ok_or(HierarchyError::InvalidIndex(index.0))
    }

    pub fn find(&self, id: TileId) -> Option<TileIndex> {
        self.lookup.get(&id).copied()
    }

    pub fn parent(&self, index: TileIndex) -> Option<TileIndex> {
        self.get(index).and_then(TileNode::parent)
    }

    pub fn children(&self, index: TileIndex) -> Option<[TileIndex; 4]> {
        self.get(index).and_then(TileNode::children)
    }

    /// Ancestors of `index`, nearest first.
    pub fn ancestors(&self, index: TileIndex) -> Vec<TileIndex> {
        let mut result = Vec::new();
        let mut current = self.parent(index);
        while let Some(ancestor) = current {
            result.push(ancestor);
            current = self.parent(ancestor);
        }
        result
    }

    /// Every leaf node, in depth-first order from the roots.
    pub fn leaves(&self) -> Vec<TileIndex> {
        let mut leaves = Vec::new();
        for &root in &self.roots {
            self.visit(root, |index, node| {
                if node.is_leaf() {
                    leaves.push(index);
                }
                Visit::Continue
            });
        }
        leaves
    }

    /// Deepest level currently in the tree.
    pub fn max_level(&self) -> u8 {
        self.lookup.keys().map(|id| id.level).max().unwrap_or(0)
    }

    /// Live nodes in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (TileIndex, &TileNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(slot, node)| node.as_ref().map(|n| (TileIndex(slot), n)))
    }

    /// Change the state of a node.
    ///
    /// `Subdivided` is reserved for nodes with children, and a node with
    /// children can only be `Subdivided`.
    pub fn set_state(&mut self, index: TileIndex, state: TileState) -> Result<(), HierarchyError> {
        let node = self.node_mut(index)?;
        if node.is_leaf() == (state == TileState::Subdivided) {
            return Err(HierarchyError::InvalidState {
                tile: node.id,
                state,
            });
        }
        node.state = state;
        Ok(())
    }

    /// Split a leaf into NW, NE, SW, SE children.
    ///
    /// Children start `Pending` and inherit the parent's height range and
    /// elevation level. Nothing is fetched.
    ///
    /// # Errors
    ///
    /// [`HierarchyError::AlreadySubdivided`] if the node has children,
    /// [`HierarchyError::LevelOverflow`] if a child id would not fit.
    pub fn subdivide(&mut self, index: TileIndex) -> Result<[TileIndex; 4], HierarchyError> {
        let node = self.node(index)?;
        if !node.is_leaf() {
            return Err(HierarchyError::AlreadySubdivided(node.id));
        }

        let id = node.id;
        let height_range = node.height_range;
        let elevation_level = node.elevation_level;
        let quarters = node.extent.quarters();

        let mut ids = [id; 4];
        for (slot, quadrant) in ids.iter_mut().zip(Quadrant::ALL) {
            *slot = id.child(quadrant).ok_or(HierarchyError::LevelOverflow(id))?;
        }

        let mut children = [index; 4];
        for ((slot, child), extent) in children.iter_mut().zip(ids).zip(quarters) {
            *slot = self.insert(
                child,
                extent,
                Some(index),
                height_range,
                elevation_level,
            );
        }

        let node = self.node_mut(index)?;
        node.children = Some(children);
        node.state = TileState::Subdivided;
        trace!(tile = %id, "Subdivided tile");
        Ok(children)
    }

    /// Remove every descendant of `index` and mark it `Ready`.
    ///
    /// # Returns
    ///
    /// Ids of the removed descendants in pre-order. A leaf is left untouched
    /// and yields an empty list.
    pub fn merge(&mut self, index: TileIndex) -> Result<Vec<TileId>, HierarchyError> {
        let Some(children) = self.node(index)?.children else {
            return Ok(Vec::new());
        };

        let mut removed = Vec::new();
        let mut stack: Vec<TileIndex> = children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                if let Some(grandchildren) = node.children {
                    stack.extend(grandchildren.iter().rev());
                }
                self.lookup.remove(&node.id);
                self.free.push(current.0);
                removed.push(node.id);
            }
        }

        let node = self.node_mut(index)?;
        node.children = None;
        node.state = TileState::Ready;
        trace!(tile = %node.id, removed = removed.len(), "Merged tile");
        Ok(removed)
    }

    /// Depth-first pre-order traversal starting at `start`.
    ///
    /// Children are visited in NW, NE, SW, SE order; returning
    /// [`Visit::Prune`] skips a node's descendants.
    pub fn visit<F>(&self, start: TileIndex, mut visitor: F)
    where
        F: FnMut(TileIndex, &TileNode) -> Visit,
    {
        let mut stack = vec![start];
        while let Some(index) = stack.pop() {
            let Some(node) = self.get(index) else {
                continue;
            };
            if visitor(index, node) == Visit::Continue {
                if let Some(children) = node.children {
                    stack.extend(children.iter().rev());
                }
            }
        }
    }

    /// Record the elevation range decoded for a node.
    ///
    /// Recomputes the node's bounds. Descendants whose heights came from a
    /// coarser level inherit the new range.
    pub fn set_elevation(
        &mut self,
        index: TileIndex,
        min_height: f64,
        max_height: f64,
    ) -> Result<(), HierarchyError> {
        let level = self.node(index)?.level();
        let range = (min_height.min(max_height), min_height.max(max_height));

        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            let surface = self.surface;
            let Some(node) = self.nodes.get_mut(current.0).and_then(Option::as_mut) else {
                continue;
            };
            if current != index && node.elevation_level.is_some_and(|l| l > level) {
                continue;
            }
            node.height_range = range;
            node.elevation_level = Some(level);
            node.bounds = TileBounds::compute(&surface, &node.extent, range.0, range.1);
            if let Some(children) = node.children {
                stack.extend(children);
            }
        }
        Ok(())
    }

    fn insert(
        &mut self,
        id: TileId,
        extent: Extent,
        parent: Option<TileIndex>,
        height_range: (f64, f64),
        elevation_level: Option<u8>,
    ) -> TileIndex {
        let bounds = TileBounds::compute(&self.surface, &extent, height_range.0, height_range.1);
        let node = TileNode {
            id,
            extent,
            bounds,
            state: TileState::Pending,
            parent,
            children: None,
            height_range,
            elevation_level,
        };

        let index = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                TileIndex(slot)
            }
            None => {
                self.nodes.push(Some(node));
                TileIndex(self.nodes.len() - 1)
            }
        };
        self.lookup.insert(id, index);
        index
    }
}
