//! Per-frame subdivision, merge and culling of a tile hierarchy.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, error};

use crate::tile::{HierarchyError, Surface, TileHierarchy, TileId, TileIndex, TileNode, TileState, Visit};

use super::config::SubdivisionConfig;
use super::culling::{Frustum, HorizonCuller};
use super::decision::Decision;
use super::readiness::ReadinessGate;
use super::sse::tile_sse;
use super::view::ViewState;

/// A tile of the display set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayTile {
    pub id: TileId,
    /// Whether the tile's own resource is loaded.
    pub ready: bool,
    /// Nearest ancestor-or-self whose resource is loaded.
    pub fallback: Option<TileId>,
}

/// Counters for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub visited: usize,
    pub displayed: usize,
    pub pending: usize,
    pub culled: usize,
    pub subdivided: usize,
    pub merged: usize,
    pub requests: usize,
    pub max_level: u8,
}

/// Everything the rendering side needs to know about one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameUpdate {
    pub frame: u64,
    pub display: Vec<DisplayTile>,
    /// Tiles that were split this frame.
    pub subdivided: Vec<TileId>,
    /// Descendants removed by merges this frame.
    pub merged: Vec<TileId>,
    /// Tiles found outside the view this frame.
    pub culled: Vec<TileId>,
    /// Displayed tiles whose resource should be fetched.
    pub requests: Vec<TileId>,
    pub stats: FrameStats,
}

impl FrameUpdate {
    /// Compact JSON summary for logs and tooling.
    pub fn summary_json(&self) -> serde_json::Value {
        serde_json::json!({
            "frame": self.frame,
            "stats": self.stats,
            "subdivided": self.subdivided,
            "requests": self.requests.len(),
        })
    }
}

/// Visibility state shared by every decision of one frame.
struct FrameContext<'a> {
    view: &'a ViewState,
    frustum: Frustum,
    horizon: Option<HorizonCuller>,
}

/// Decides and applies subdivision for one hierarchy.
///
/// Each [`update`](SubdivisionController::update) first evaluates every
/// reachable node against one readiness snapshot without touching the
/// hierarchy, then applies the decisions. Children created in a frame are
/// evaluated from the next frame on, so the tree grows at most one level
/// per frame.
#[derive(Debug, Clone)]
pub struct SubdivisionController {
    config: SubdivisionConfig,
    frame: u64,
}

impl SubdivisionController {
    pub fn new(config: SubdivisionConfig) -> Self {
        Self { config, frame: 0 }
    }

    pub fn config(&self) -> &SubdivisionConfig {
        &self.config
    }

    /// Number of frames processed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Decision for a single node.
    ///
    /// Pure: the hierarchy is not modified.
    pub fn decide(
        &self,
        view: &ViewState,
        hierarchy: &TileHierarchy,
        index: TileIndex,
        readiness: &dyn ReadinessGate,
    ) -> Decision {
        let ctx = self.context(view, hierarchy);
        match hierarchy.get(index) {
            Some(node) => self.decide_node(&ctx, hierarchy, index, node, readiness),
            None => Decision::Keep,
        }
    }

    /// Run one frame: decide, apply, and report the display set.
    pub fn update(
        &mut self,
        view: &ViewState,
        hierarchy: &mut TileHierarchy,
        readiness: &dyn ReadinessGate,
    ) -> FrameUpdate {
        self.frame += 1;
        let mut update = FrameUpdate {
            frame: self.frame,
            ..FrameUpdate::default()
        };

        // Decide against an unchanging tree.
        let decisions = {
            let ctx = self.context(view, hierarchy);
            let mut decisions = Vec::new();
            for &root in hierarchy.roots() {
                hierarchy.visit(root, |index, node| {
                    update.stats.visited += 1;
                    let decision = self.decide_node(&ctx, hierarchy, index, node, readiness);
                    match decision {
                        Decision::Cull | Decision::Merge => {
                            decisions.push((index, decision));
                            Visit::Prune
                        }
                        Decision::Subdivide => {
                            decisions.push((index, decision));
                            Visit::Continue
                        }
                        Decision::Keep => Visit::Continue,
                    }
                });
            }
            decisions
        };

        let mut culled = HashSet::new();
        for (index, decision) in decisions {
            if let Err(e) = self.apply(hierarchy, index, decision, readiness, &mut update) {
                error!(error = %e, decision = %decision, "Failed to apply tile decision");
                debug_assert!(
                    !matches!(e, HierarchyError::AlreadySubdivided(_)),
                    "subdivide reached a subdivided tile"
                );
            }
            if decision == Decision::Cull {
                culled.insert(index);
            }
        }

        self.collect_display_set(hierarchy, &culled, readiness, &mut update);

        update.stats.subdivided = update.subdivided.len();
        update.stats.merged = update.merged.len();
        update.stats.culled = update.culled.len();
        update.stats.requests = update.requests.len();
        update.stats.max_level = hierarchy.max_level();

        debug!(
            frame = update.frame,
            visited = update.stats.visited,
            displayed = update.stats.displayed,
            pending = update.stats.pending,
            subdivided = update.stats.subdivided,
            merged = update.stats.merged,
            culled = update.stats.culled,
            max_level = update.stats.max_level,
            "Frame updated"
        );
        update
    }

    fn context<'a>(&self, view: &'a ViewState, hierarchy: &TileHierarchy) -> FrameContext<'a> {
        let horizon = match hierarchy.surface() {
            Surface::Ellipsoid(ellipsoid) if self.config.horizon_culling => Some(
                HorizonCuller::new(view.camera_position, ellipsoid.semi_minor_axis),
            ),
            _ => None,
        };
        FrameContext {
            view,
            frustum: Frustum::from_view_projection(&view.view_projection),
            horizon,
        }
    }

    fn decide_node(
        &self,
        ctx: &FrameContext<'_>,
        hierarchy: &TileHierarchy,
        index: TileIndex,
        node: &TileNode,
        readiness: &dyn ReadinessGate,
    ) -> Decision {
        let level = node.level();

        if level >= self.config.min_culling_level && self.is_culled(ctx, node) {
            return Decision::Cull;
        }

        let sse = tile_sse(ctx.view, node.bounds(), self.config.tile_pixel_size);

        if !node.is_leaf() {
            let mergeable = level >= self.config.min_subdivision_level
                && sse < self.config.merge_threshold()
                && !subtree_loading(hierarchy, index, readiness);
            return if mergeable {
                Decision::Merge
            } else {
                Decision::Keep
            };
        }

        if level >= self.config.max_subdivision_level || !node.id().can_subdivide() {
            return Decision::Keep;
        }
        if !self.resources_ready(hierarchy, index, node, readiness) {
            return Decision::Keep;
        }
        if let Some(elevation_level) = node.elevation_level() {
            if level.saturating_sub(elevation_level) >= self.config.max_delta_elevation_level {
                return Decision::Keep;
            }
        }

        if level < self.config.min_subdivision_level || sse > self.config.sse_threshold {
            Decision::Subdivide
        } else {
            Decision::Keep
        }
    }

    fn is_culled(&self, ctx: &FrameContext<'_>, node: &TileNode) -> bool {
        let bounds = node.bounds();
        if !ctx.frustum.intersects_bounds(bounds) {
            return true;
        }
        ctx.horizon
            .as_ref()
            .is_some_and(|horizon| horizon.is_bounds_occluded(bounds))
    }

    fn resources_ready(
        &self,
        hierarchy: &TileHierarchy,
        index: TileIndex,
        node: &TileNode,
        readiness: &dyn ReadinessGate,
    ) -> bool {
        if !readiness.is_ready(node.id()) {
            return false;
        }
        if !self.config.require_ancestor_resources {
            return true;
        }
        hierarchy
            .ancestors(index)
            .into_iter()
            .filter_map(|a| hierarchy.get(a))
            .all(|ancestor| readiness.is_ready(ancestor.id()))
    }

    fn apply(
        &self,
        hierarchy: &mut TileHierarchy,
        index: TileIndex,
        decision: Decision,
        readiness: &dyn ReadinessGate,
        update: &mut FrameUpdate,
    ) -> Result<(), HierarchyError> {
        let id = hierarchy.node(index)?.id();
        match decision {
            Decision::Subdivide => {
                hierarchy.subdivide(index)?;
                update.subdivided.push(id);
            }
            Decision::Merge => {
                update.merged.extend(hierarchy.merge(index)?);
            }
            Decision::Cull => {
                update.culled.push(id);
                // A culled subtree with fetches in flight stays subdivided.
                if !subtree_loading(hierarchy, index, readiness) {
                    update.merged.extend(hierarchy.merge(index)?);
                    hierarchy.set_state(index, TileState::Culled)?;
                }
            }
            Decision::Keep => {}
        }
        Ok(())
    }

    fn collect_display_set(
        &self,
        hierarchy: &mut TileHierarchy,
        culled: &HashSet<TileIndex>,
        readiness: &dyn ReadinessGate,
        update: &mut FrameUpdate,
    ) {
        let mut leaves = Vec::new();
        for &root in hierarchy.roots() {
            hierarchy.visit(root, |index, node| {
                if culled.contains(&index) {
                    return Visit::Prune;
                }
                if node.is_leaf() {
                    leaves.push((index, node.id()));
                }
                Visit::Continue
            });
        }

        for (index, id) in leaves {
            let ready = readiness.is_ready(id);
            let fallback = if ready {
                Some(id)
            } else {
                hierarchy
                    .ancestors(index)
                    .into_iter()
                    .filter_map(|a| hierarchy.get(a).map(TileNode::id))
                    .find(|ancestor| readiness.is_ready(*ancestor))
            };

            let state = if ready {
                TileState::Displayed
            } else {
                update.stats.pending += 1;
                TileState::Pending
            };
            if let Err(e) = hierarchy.set_state(index, state) {
                error!(error = %e, tile = %id, "Failed to update tile state");
            }

            if !ready && !readiness.is_loading(id) && !readiness.is_failed(id) {
                update.requests.push(id);
            }
            update.display.push(DisplayTile { id, ready, fallback });
        }
        update.stats.displayed = update.display.len();
    }
}

/// Whether any strict descendant of `index` has a fetch in flight.
fn subtree_loading(
    hierarchy: &TileHierarchy,
    index: TileIndex,
    readiness: &dyn ReadinessGate,
) -> bool {
    let mut loading = false;
    hierarchy.visit(index, |current, node| {
        if loading {
            return Visit::Prune;
        }
        if current != index && readiness.is_loading(node.id()) {
            loading = true;
            return Visit::Prune;
        }
        Visit::Continue
    });
    loading
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::CrsRegistry;
    use crate::lod::AlwaysReady;
    use crate::tile::SchemeTile;

    struct Loading(HashSet<TileId>);

    impl ReadinessGate for Loading {
        fn is_ready(&self, tile: TileId) -> bool {
            !self.0.contains(&tile)
        }

        fn is_loading(&self, tile: TileId) -> bool {
            self.0.contains(&tile)
        }
    }

    fn globe() -> (CrsRegistry, TileHierarchy) {
        let registry = CrsRegistry::new();
        let hierarchy = TileHierarchy::new(&SchemeTile::global_geographic(), &registry).unwrap();
        (registry, hierarchy)
    }

    fn view_from(registry: &CrsRegistry, lon: f64, lat: f64, alt: f64) -> ViewState {
        ViewState::from_geographic(registry, lon, lat, alt, (1024.0, 768.0), 60f64.to_radians())
            .unwrap()
    }

    #[test]
    fn test_roots_subdivide_below_min_level() {
        let (registry, hierarchy) = globe();
        let controller = SubdivisionController::new(SubdivisionConfig::default());
        let view = view_from(&registry, 0.0, 0.0, 1e9);
        let root = hierarchy.roots()[0];
        assert_eq!(
            controller.decide(&view, &hierarchy, root, &AlwaysReady),
            Decision::Subdivide
        );
    }

    #[test]
    fn test_readiness_gates_subdivision() {
        let (registry, hierarchy) = globe();
        let controller = SubdivisionController::new(SubdivisionConfig::default());
        let view = view_from(&registry, 0.0, 0.0, 1e7);
        let root = hierarchy.roots()[0];
        let nothing_ready: HashSet<TileId> = HashSet::new();
        assert_eq!(
            controller.decide(&view, &hierarchy, root, &nothing_ready),
            Decision::Keep
        );
    }

    #[test]
    fn test_max_level_caps_subdivision() {
        let (registry, mut hierarchy) = globe();
        let controller =
            SubdivisionController::new(SubdivisionConfig::default().with_max_subdivision_level(1));
        let view = view_from(&registry, 10.0, 10.0, 1_000.0);
        let children = hierarchy.subdivide(hierarchy.roots()[1]).unwrap();
        for child in children {
            assert_ne!(
                controller.decide(&view, &hierarchy, child, &AlwaysReady),
                Decision::Subdivide
            );
        }
    }

    #[test]
    fn test_unaddressable_leaf_is_kept() {
        let (registry, mut hierarchy) = globe();
        let mut config = SubdivisionConfig::default().with_sse_threshold(1e-9);
        // Past the builder clamp, as a hand-edited config could be.
        config.max_subdivision_level = 40;
        let mut controller = SubdivisionController::new(config);

        let mut deep = hierarchy.subdivide(hierarchy.roots()[1]).unwrap()[3];
        for _ in 0..30 {
            deep = hierarchy.subdivide(deep).unwrap()[1];
        }
        let id = hierarchy.get(deep).unwrap().id();
        assert_eq!((id.level, id.col), (31, u32::MAX));

        // Straight above the level-31 tile.
        let view = view_from(&registry, 180.0 - 4e-8, -4e-8, 20.0);
        assert_ne!(
            controller.decide(&view, &hierarchy, deep, &AlwaysReady),
            Decision::Subdivide
        );

        let update = controller.update(&view, &mut hierarchy, &AlwaysReady);
        assert!(!update.subdivided.contains(&id));
        assert!(hierarchy.get(deep).unwrap().is_leaf());
        assert!(hierarchy.max_level() <= 31);
    }

    #[test]
    fn test_elevation_delta_caps_subdivision() {
        let (registry, mut hierarchy) = globe();
        let controller = SubdivisionController::new(
            SubdivisionConfig::default().with_max_delta_elevation_level(1),
        );
        let view = view_from(&registry, 45.0, 45.0, 1_000.0);
        let root = hierarchy.roots()[1];
        hierarchy.set_elevation(root, 0.0, 100.0).unwrap();
        let children = hierarchy.subdivide(root).unwrap();
        assert_eq!(
            controller.decide(&view, &hierarchy, children[0], &AlwaysReady),
            Decision::Keep
        );
    }

    #[test]
    fn test_depth_grows_one_level_per_frame() {
        let (registry, mut hierarchy) = globe();
        let mut controller = SubdivisionController::new(SubdivisionConfig::default());
        let view = view_from(&registry, 2.33, 48.24, 100_000.0);

        let mut previous = hierarchy.max_level();
        for _ in 0..6 {
            let update = controller.update(&view, &mut hierarchy, &AlwaysReady);
            assert!(update.stats.max_level <= previous + 1);
            previous = update.stats.max_level;
        }
        assert_eq!(previous, 6);
    }

    #[test]
    fn test_far_camera_merges() {
        let (registry, mut hierarchy) = globe();
        let mut controller = SubdivisionController::new(SubdivisionConfig::default());
        let near = view_from(&registry, 2.33, 48.24, 100_000.0);
        for _ in 0..5 {
            controller.update(&near, &mut hierarchy, &AlwaysReady);
        }
        let deep = hierarchy.len();

        let far = view_from(&registry, 2.33, 48.24, 1e9);
        let update = controller.update(&far, &mut hierarchy, &AlwaysReady);
        assert!(!update.merged.is_empty());
        assert!(hierarchy.len() < deep);
        assert!(hierarchy.max_level() <= 3);
    }

    #[test]
    fn test_loading_descendant_blocks_merge() {
        let (registry, mut hierarchy) = globe();
        let mut controller = SubdivisionController::new(SubdivisionConfig::default());
        let near = view_from(&registry, 2.33, 48.24, 100_000.0);
        for _ in 0..4 {
            controller.update(&near, &mut hierarchy, &AlwaysReady);
        }

        let loading: HashSet<TileId> = hierarchy
            .iter()
            .filter(|(_, n)| n.level() == 4)
            .map(|(_, n)| n.id())
            .collect();
        assert!(!loading.is_empty());

        let far = view_from(&registry, 2.33, 48.24, 1e9);
        let update = controller.update(&far, &mut hierarchy, &Loading(loading));
        assert!(update.merged.iter().all(|id| id.level != 4));
        assert_eq!(hierarchy.max_level(), 4);
    }

    #[test]
    fn test_display_set_has_fallbacks_and_requests() {
        let (registry, mut hierarchy) = globe();
        let mut controller = SubdivisionController::new(SubdivisionConfig::default());
        let view = view_from(&registry, 0.0, 0.0, 1e8);

        let roots_ready: HashSet<TileId> = [TileId::new(0, 0, 0), TileId::new(0, 0, 1)].into();
        let update = controller.update(&view, &mut hierarchy, &roots_ready);

        assert_eq!(update.subdivided.len(), 2);
        assert_eq!(update.display.len(), 8);
        for tile in &update.display {
            assert!(!tile.ready);
            assert_eq!(tile.fallback, tile.id.parent());
        }
        assert_eq!(update.requests.len(), 8);
        assert_eq!(update.stats.pending, 8);
    }

    #[test]
    fn test_back_side_is_culled() {
        let (registry, mut hierarchy) = globe();
        let mut controller = SubdivisionController::new(SubdivisionConfig::default());
        let view = view_from(&registry, 2.33, 48.24, 100_000.0);
        for _ in 0..3 {
            controller.update(&view, &mut hierarchy, &AlwaysReady);
        }
        let update = controller.update(&view, &mut hierarchy, &AlwaysReady);
        assert!(!update.culled.is_empty());

        let antipode = hierarchy
            .iter()
            .find(|(_, n)| n.level() == 2 && n.extent().contains_xy(-177.0, -48.0))
            .map(|(_, n)| n.state());
        assert_eq!(antipode, Some(TileState::Culled));
    }

    #[test]
    fn test_summary_json() {
        let (registry, mut hierarchy) = globe();
        let mut controller = SubdivisionController::new(SubdivisionConfig::default());
        let view = view_from(&registry, 0.0, 0.0, 1e8);
        let update = controller.update(&view, &mut hierarchy, &AlwaysReady);
        let summary = update.summary_json();
        assert_eq!(summary["frame"], 1);
        assert_eq!(summary["stats"]["subdivided"], 2);
    }
}
