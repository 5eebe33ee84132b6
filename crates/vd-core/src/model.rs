//! Node data model.
//!
//! A node's attributes are an immutable value: mutation replaces the whole
//! `NodeAttrs` rather than writing fields in place, so a snapshot for undo
//! is a plain clone.

use crate::geometry::BoundingArea;
use crate::id::NodeId;
use kurbo::{Affine, BezPath, Rect, Size};

// ─── Node kinds ──────────────────────────────────────────────────────────

/// What a node is. Containers own an ordered child list; leaves do not.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Root of the document. Transform is always identity.
    Document,

    /// Container whose extent is the union of its children.
    Group,

    /// Axis-aligned rectangle in local space, `(0,0)..size`.
    Rectangle { corner_radius: f64 },

    /// Vector path in local space. `size` tracks the path extent.
    Vector { path: BezPath },
}

impl NodeKind {
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::Group)
    }

    /// Short lowercase tag used for generated ids and logging.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Group => "group",
            NodeKind::Rectangle { .. } => "rectangle",
            NodeKind::Vector { .. } => "vector",
        }
    }
}

// ─── Attributes ──────────────────────────────────────────────────────────

/// The mutable-by-replacement state of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAttrs {
    pub name: String,
    /// Local → parent transform.
    pub transform: Affine,
    /// Size in local space.
    pub size: Size,
    pub visible: bool,
    pub locked: bool,
    pub aspect_ratio_locked: bool,
    /// Width / height target when the aspect ratio is locked.
    pub aspect_ratio: Option<f64>,
    pub opacity: f64,
}

impl Default for NodeAttrs {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Affine::IDENTITY,
            size: Size::ZERO,
            visible: true,
            locked: false,
            aspect_ratio_locked: false,
            aspect_ratio: None,
            opacity: 1.0,
        }
    }
}

impl NodeAttrs {
    /// Local-space rectangle `(0,0)..size`.
    pub fn local_rect(&self) -> Rect {
        Rect::from_origin_size((0.0, 0.0), self.size)
    }

    /// Return a new attribute set with `patch` merged over `self`.
    pub fn merged(&self, patch: &AttrPatch) -> NodeAttrs {
        NodeAttrs {
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            transform: patch.transform.unwrap_or(self.transform),
            size: patch.size.unwrap_or(self.size),
            visible: patch.visible.unwrap_or(self.visible),
            locked: patch.locked.unwrap_or(self.locked),
            aspect_ratio_locked: patch.aspect_ratio_locked.unwrap_or(self.aspect_ratio_locked),
            aspect_ratio: patch.aspect_ratio.unwrap_or(self.aspect_ratio),
            opacity: patch.opacity.unwrap_or(self.opacity),
        }
    }
}

/// A partial attribute update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrPatch {
    pub name: Option<String>,
    pub transform: Option<Affine>,
    pub size: Option<Size>,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    pub aspect_ratio_locked: Option<bool>,
    pub aspect_ratio: Option<Option<f64>>,
    pub opacity: Option<f64>,
}

impl AttrPatch {
    pub fn transform(transform: Affine) -> Self {
        Self {
            transform: Some(transform),
            ..Self::default()
        }
    }

    pub fn geometry(transform: Affine, size: Size) -> Self {
        Self {
            transform: Some(transform),
            size: Some(size),
            ..Self::default()
        }
    }

    /// A patch that replaces every field with the values in `attrs`.
    pub fn from_attrs(attrs: &NodeAttrs) -> Self {
        Self {
            name: Some(attrs.name.clone()),
            transform: Some(attrs.transform),
            size: Some(attrs.size),
            visible: Some(attrs.visible),
            locked: Some(attrs.locked),
            aspect_ratio_locked: Some(attrs.aspect_ratio_locked),
            aspect_ratio: Some(attrs.aspect_ratio),
            opacity: Some(attrs.opacity),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// A single node in the scene graph. Children live in the graph, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Immutable, never reused.
    pub id: NodeId,
    pub kind: NodeKind,
    pub attrs: NodeAttrs,
}

impl SceneNode {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        let attrs = NodeAttrs {
            name: id.as_str().to_string(),
            ..NodeAttrs::default()
        };
        Self { id, kind, attrs }
    }

    /// A rectangle with a fresh id at `(x, y)` in parent space.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        let mut node = Self::new(
            NodeId::with_prefix("rectangle"),
            NodeKind::Rectangle { corner_radius: 0.0 },
        );
        node.attrs.transform = Affine::translate((x, y));
        node.attrs.size = Size::new(width, height);
        node
    }

    /// An empty group with a fresh id.
    pub fn group() -> Self {
        Self::new(NodeId::with_prefix("group"), NodeKind::Group)
    }

    /// A vector node whose size is taken from the path extent. The path is
    /// shifted so its extent starts at the local origin and the transform
    /// carries the original offset.
    pub fn vector(path: BezPath) -> Self {
        use kurbo::Shape;
        let bbox = path.bounding_box();
        let mut local = path;
        local.apply_affine(Affine::translate(-bbox.origin().to_vec2()));
        let mut node = Self::new(NodeId::with_prefix("vector"), NodeKind::Vector { path: local });
        node.attrs.transform = Affine::translate(bbox.origin().to_vec2());
        node.attrs.size = bbox.size();
        node
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.attrs.name = name.to_string();
        self
    }

    /// Bounding area of a leaf under `world` (local → scene). Containers
    /// report empty here; their extent is derived from children.
    pub fn leaf_bounding_area(&self, world: Affine) -> BoundingArea {
        if self.kind.is_container() {
            return BoundingArea::EMPTY;
        }
        BoundingArea::from(self.attrs.local_rect()).transform(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn merged_replaces_only_patched_fields() {
        let attrs = NodeAttrs {
            name: "card".into(),
            size: Size::new(10.0, 20.0),
            ..NodeAttrs::default()
        };
        let patch = AttrPatch {
            opacity: Some(0.5),
            ..AttrPatch::default()
        };
        let merged = attrs.merged(&patch);
        assert_eq!(merged.name, "card");
        assert_eq!(merged.size, Size::new(10.0, 20.0));
        assert_eq!(merged.opacity, 0.5);
        // source untouched
        assert_eq!(attrs.opacity, 1.0);
    }

    #[test]
    fn from_attrs_restores_everything() {
        let before = NodeAttrs {
            name: "a".into(),
            locked: true,
            aspect_ratio: Some(2.0),
            ..NodeAttrs::default()
        };
        let after = NodeAttrs::default().merged(&AttrPatch::from_attrs(&before));
        assert_eq!(before, after);
    }

    #[test]
    fn vector_node_is_normalized_to_origin() {
        let mut path = BezPath::new();
        path.move_to(Point::new(10.0, 20.0));
        path.line_to(Point::new(40.0, 60.0));
        let node = SceneNode::vector(path);
        assert_eq!(node.attrs.size, Size::new(30.0, 40.0));
        assert_eq!(node.attrs.transform, Affine::translate((10.0, 20.0)));
        let area = node.leaf_bounding_area(node.attrs.transform);
        assert_eq!(area, BoundingArea::new(10.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn containers_have_no_leaf_area() {
        let g = SceneNode::group();
        assert!(g.leaf_bounding_area(Affine::IDENTITY).is_empty());
    }
}
