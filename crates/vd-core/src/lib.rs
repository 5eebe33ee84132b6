pub mod geometry;
pub mod id;
pub mod model;
pub mod scene;
pub mod spatial;
pub mod view;

pub use geometry::{BoundingArea, Decomposed, compose, decompose};
pub use id::{NodeId, OperationId};
pub use model::{AttrPatch, NodeAttrs, NodeKind, SceneNode};
pub use scene::{
    AttrChange, CoordPath, DirtyFlags, DraggingKind, NodeTarget, SceneError, SceneGraph,
    SelectionDraggingState,
};
pub use spatial::SpatialIndex;
pub use view::ViewState;

// Re-export kurbo geometry types so downstream crates share one version.
pub use kurbo::{Affine, Point, Size, Vec2};
