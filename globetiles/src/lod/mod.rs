//! Level-of-detail selection.
//!
//! Per frame, the [`SubdivisionController`] walks a
//! [`TileHierarchy`](crate::tile::TileHierarchy) top-down:
//!
//! 1. **Culling** against the view frustum and, for globes, the horizon
//! 2. **Readiness** of the tile's resources from a [`ReadinessGate`]
//! 3. **Screen-space error** against [`SubdivisionConfig::sse_threshold`]
//!
//! and then applies the resulting [`Decision`]s.

mod config;
mod controller;
mod culling;
mod decision;
mod readiness;
mod sse;
mod view;

pub use config::{
    SubdivisionConfig, DEFAULT_MAX_DELTA_ELEVATION_LEVEL, DEFAULT_MAX_SUBDIVISION_LEVEL,
    DEFAULT_MERGE_HYSTERESIS, DEFAULT_MIN_CULLING_LEVEL, DEFAULT_MIN_SUBDIVISION_LEVEL,
    DEFAULT_SSE_THRESHOLD, DEFAULT_TILE_PIXEL_SIZE, MAX_SUBDIVISION_LEVEL,
};
pub use controller::{DisplayTile, FrameStats, FrameUpdate, SubdivisionController};
pub use culling::{Frustum, HorizonCuller};
pub use decision::Decision;
pub use readiness::{AlwaysReady, ReadinessGate};
pub use sse::{screen_space_error, tile_sse, MIN_SSE_DISTANCE};
pub use view::ViewState;
