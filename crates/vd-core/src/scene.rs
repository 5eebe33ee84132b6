//! The scene graph: document tree, node registry, selection, hover and the
//! spatial index.
//!
//! Nodes live in a `StableDiGraph` with parent → child edges. Child order is
//! kept explicitly per container, since it is paint order. The registry maps
//! `NodeId → NodeIndex`; a node is registered exactly when it is reachable
//! from the root, and every such node with a non-empty bounding area has one
//! spatial-index entry.
//!
//! Attribute writes are expected to come from the operation layer only.

use crate::geometry::BoundingArea;
use crate::id::NodeId;
use crate::model::{AttrPatch, NodeAttrs, NodeKind, SceneNode};
use crate::spatial::SpatialIndex;
use kurbo::{Affine, Point};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use smallvec::SmallVec;
use std::collections::HashMap;
use thiserror::Error;

/// Sequence of child indices from the root. The empty path is the root.
pub type CoordPath = SmallVec<[usize; 8]>;

/// How an update addresses its node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTarget {
    Id(NodeId),
    Path(CoordPath),
}

impl From<NodeId> for NodeTarget {
    fn from(id: NodeId) -> Self {
        NodeTarget::Id(id)
    }
}

impl From<&SceneNode> for NodeTarget {
    fn from(node: &SceneNode) -> Self {
        NodeTarget::Id(node.id)
    }
}

impl From<&[usize]> for NodeTarget {
    fn from(path: &[usize]) -> Self {
        NodeTarget::Path(CoordPath::from_slice(path))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("no node registered with id {0}")]
    UnknownId(NodeId),
    #[error("coordinate path {0:?} does not resolve")]
    InvalidPath(Vec<usize>),
    #[error("node {0} cannot hold children")]
    NotAContainer(NodeId),
    #[error("node id {0} is already registered")]
    DuplicateId(NodeId),
    #[error("node {0} still has children")]
    HasChildren(NodeId),
    #[error("the document root cannot be removed")]
    RootImmutable,
}

/// What kind of gesture is currently manipulating the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraggingKind {
    Move,
    Resize,
    Rotate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionDraggingState {
    pub kind: DraggingKind,
    pub shift_key: bool,
    pub alt_key: bool,
}

/// Coalesced change notifications, drained by the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirtyFlags {
    pub layout: bool,
    pub selection: bool,
    /// Union of scene areas touched since the last drain.
    pub area: BoundingArea,
}

impl Default for DirtyFlags {
    fn default() -> Self {
        Self {
            layout: false,
            selection: false,
            area: BoundingArea::EMPTY,
        }
    }
}

impl DirtyFlags {
    pub fn any(&self) -> bool {
        self.layout || self.selection
    }
}

/// Result of an attribute update.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrChange {
    pub id: NodeId,
    pub previous: NodeAttrs,
    /// Union of the node's bounding area before and after the change.
    pub dirty_area: BoundingArea,
}

#[derive(Debug)]
pub struct SceneGraph {
    graph: StableDiGraph<SceneNode, ()>,
    root: NodeIndex,
    /// Registry: `NodeId → NodeIndex`.
    id_index: HashMap<NodeId, NodeIndex>,
    /// Ordered children of every container (paint order, back to front).
    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,
    /// Position of every non-root node within its parent's `child_order`.
    sibling_rank: HashMap<NodeIndex, usize>,
    selection: Vec<NodeId>,
    hover: Option<NodeId>,
    spatial: SpatialIndex,
    dirty: DirtyFlags,
    dragging: Option<SelectionDraggingState>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let root_node = SceneNode::new(NodeId::document(), NodeKind::Document);
        let root = graph.add_node(root_node);

        let mut id_index = HashMap::new();
        id_index.insert(NodeId::document(), root);
        let mut child_order = HashMap::new();
        child_order.insert(root, Vec::new());

        Self {
            graph,
            root,
            id_index,
            child_order,
            sibling_rank: HashMap::new(),
            selection: Vec::new(),
            hover: None,
            spatial: SpatialIndex::new(),
            dirty: DirtyFlags::default(),
            dragging: None,
        }
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    pub fn root_id(&self) -> NodeId {
        self.graph[self.root].id
    }

    pub fn root_node(&self) -> &SceneNode {
        &self.graph[self.root]
    }

    pub fn get_node_by_id(&self, id: NodeId) -> Option<&SceneNode> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Number of registered nodes, the root included.
    pub fn len(&self) -> usize {
        self.id_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.child_order[&self.root].is_empty()
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.index_of(id)?;
        self.parent_index(idx).map(|p| self.graph[p].id)
    }

    /// Children in paint order. Empty for leaves and unknown ids.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.index_of(id)
            .and_then(|idx| self.child_order.get(&idx))
            .map(|order| order.iter().map(|c| self.graph[*c].id).collect())
            .unwrap_or_default()
    }

    /// `id` followed by all of its descendants, depth-first in paint order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(idx) = self.index_of(id) {
            self.collect_subtree(idx, &mut out);
        }
        out
    }

    fn collect_subtree(&self, idx: NodeIndex, out: &mut Vec<NodeId>) {
        out.push(self.graph[idx].id);
        if let Some(order) = self.child_order.get(&idx) {
            for &child in order {
                self.collect_subtree(child, out);
            }
        }
    }

    /// Strict ancestors of `id`, nearest first, the root included.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(mut idx) = self.index_of(id) else {
            return out;
        };
        while let Some(parent) = self.parent_index(idx) {
            out.push(self.graph[parent].id);
            idx = parent;
        }
        out
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        ancestor != descendant && self.ancestors(descendant).contains(&ancestor)
    }

    /// Coordinate path of a registered node.
    pub fn path_of(&self, id: NodeId) -> Option<CoordPath> {
        let mut idx = self.index_of(id)?;
        let mut path = CoordPath::new();
        while let Some(parent) = self.parent_index(idx) {
            path.push(*self.sibling_rank.get(&idx)?);
            idx = parent;
        }
        path.reverse();
        Some(path)
    }

    pub fn node_at_path(&self, path: &[usize]) -> Option<NodeId> {
        let mut idx = self.root;
        for &i in path {
            idx = *self.child_order.get(&idx)?.get(i)?;
        }
        Some(self.graph[idx].id)
    }

    pub fn resolve_target(&self, target: &NodeTarget) -> Result<NodeId, SceneError> {
        match target {
            NodeTarget::Id(id) if self.contains(*id) => Ok(*id),
            NodeTarget::Id(id) => Err(SceneError::UnknownId(*id)),
            NodeTarget::Path(path) => self
                .node_at_path(path)
                .ok_or_else(|| SceneError::InvalidPath(path.to_vec())),
        }
    }

    fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    fn parent_index(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph.neighbors_directed(idx, Direction::Incoming).next()
    }

    /// Refresh the sibling ranks of `parent`'s children from `from` onwards.
    /// Appending touches only the new child.
    fn renumber_children(&mut self, parent: NodeIndex, from: usize) {
        let Some(order) = self.child_order.get(&parent) else {
            return;
        };
        for (rank, child) in order.iter().enumerate().skip(from) {
            self.sibling_rank.insert(*child, rank);
        }
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    /// Local → scene transform: the product of every ancestor transform and
    /// the node's own.
    pub fn world_transform(&self, id: NodeId) -> Affine {
        let Some(mut idx) = self.index_of(id) else {
            return Affine::IDENTITY;
        };
        let mut m = self.graph[idx].attrs.transform;
        while let Some(parent) = self.parent_index(idx) {
            m = self.graph[parent].attrs.transform * m;
            idx = parent;
        }
        m
    }

    /// Parent-local → scene transform.
    pub fn parent_world_transform(&self, id: NodeId) -> Affine {
        self.parent_of(id)
            .map(|p| self.world_transform(p))
            .unwrap_or(Affine::IDENTITY)
    }

    /// Scene-space bounding area. Containers report the union of their
    /// children.
    pub fn bounding_area(&self, id: NodeId) -> BoundingArea {
        let Some(node) = self.get_node_by_id(id) else {
            return BoundingArea::EMPTY;
        };
        if node.kind.is_container() {
            return self
                .children(id)
                .into_iter()
                .fold(BoundingArea::EMPTY, |acc, c| acc.union(&self.bounding_area(c)));
        }
        node.leaf_bounding_area(self.world_transform(id))
    }

    /// Union of the bounding areas of all selected nodes.
    pub fn selection_bounding_area(&self) -> BoundingArea {
        self.selection
            .iter()
            .fold(BoundingArea::EMPTY, |acc, id| acc.union(&self.bounding_area(*id)))
    }

    // ─── Registry ────────────────────────────────────────────────────────

    /// Register `node` and insert it as child `index` of `parent`.
    ///
    /// `index == children.len()` appends. The node, its ancestors and the
    /// spatial index are updated together so the registry stays consistent.
    pub fn register_node(
        &mut self,
        parent: NodeId,
        index: usize,
        node: SceneNode,
    ) -> Result<(), SceneError> {
        if self.contains(node.id) {
            return Err(SceneError::DuplicateId(node.id));
        }
        let parent_idx = self.index_of(parent).ok_or(SceneError::UnknownId(parent))?;
        let len = match self.child_order.get(&parent_idx) {
            Some(order) => order.len(),
            None => return Err(SceneError::NotAContainer(parent)),
        };
        if index > len {
            let mut path = self.path_of(parent).unwrap_or_default().to_vec();
            path.push(index);
            return Err(SceneError::InvalidPath(path));
        }

        let id = node.id;
        let is_container = node.kind.is_container();
        let idx = self.graph.add_node(node);
        self.graph.add_edge(parent_idx, idx, ());
        if let Some(order) = self.child_order.get_mut(&parent_idx) {
            order.insert(index, idx);
        }
        self.renumber_children(parent_idx, index);
        if is_container {
            self.child_order.insert(idx, Vec::new());
        }
        self.id_index.insert(id, idx);

        self.reindex_around(id);
        self.mark_layout_dirty(self.bounding_area(id));
        Ok(())
    }

    /// Unlink and unregister a node that has no children.
    ///
    /// Returns the node together with its former parent and child index.
    /// The node is also dropped from the selection and hover state.
    pub fn unregister_node(&mut self, id: NodeId) -> Result<(SceneNode, NodeId, usize), SceneError> {
        let idx = self.index_of(id).ok_or(SceneError::UnknownId(id))?;
        if idx == self.root {
            return Err(SceneError::RootImmutable);
        }
        if self.child_order.get(&idx).is_some_and(|c| !c.is_empty()) {
            return Err(SceneError::HasChildren(id));
        }
        let area = self.bounding_area(id);
        let parent_idx = self.parent_index(idx).unwrap_or(self.root);
        let position = self.sibling_rank.remove(&idx).unwrap_or(0);
        if let Some(order) = self.child_order.get_mut(&parent_idx) {
            if order.get(position) == Some(&idx) {
                order.remove(position);
            }
        }
        self.renumber_children(parent_idx, position);

        self.spatial.remove(id);
        self.child_order.remove(&idx);
        self.id_index.remove(&id);
        let parent = self.graph[parent_idx].id;
        let node = self
            .graph
            .remove_node(idx)
            .ok_or(SceneError::UnknownId(id))?;

        if self.delete_selection(id) {
            log::debug!("unregistered node {id} was selected");
        }
        if self.hover == Some(id) {
            self.hover = None;
        }
        self.reindex_ancestors(parent);
        self.mark_layout_dirty(area);
        Ok((node, parent, position))
    }

    // ─── Attributes ──────────────────────────────────────────────────────

    /// Merge `patch` into the target's attributes.
    ///
    /// The node leaves the spatial index, gets a new attribute value (never
    /// an in-place field write) and is indexed again together with its
    /// descendants and ancestors.
    pub fn update_node_property(
        &mut self,
        target: impl Into<NodeTarget>,
        patch: &AttrPatch,
    ) -> Result<AttrChange, SceneError> {
        let id = self.resolve_target(&target.into())?;
        let idx = self.index_of(id).ok_or(SceneError::UnknownId(id))?;
        let previous = self.graph[idx].attrs.clone();
        let mut next = previous.merged(patch);
        if idx == self.root && next.transform != Affine::IDENTITY {
            log::warn!("ignoring transform update on the document root");
            next.transform = Affine::IDENTITY;
        }
        Ok(self.replace_attrs(id, idx, previous, next))
    }

    /// Replace the attributes of `id` verbatim. Used to restore snapshots.
    pub fn set_node_attrs(&mut self, id: NodeId, attrs: NodeAttrs) -> Result<AttrChange, SceneError> {
        let idx = self.index_of(id).ok_or(SceneError::UnknownId(id))?;
        let previous = self.graph[idx].attrs.clone();
        Ok(self.replace_attrs(id, idx, previous, attrs))
    }

    fn replace_attrs(
        &mut self,
        id: NodeId,
        idx: NodeIndex,
        previous: NodeAttrs,
        next: NodeAttrs,
    ) -> AttrChange {
        let before = self.bounding_area(id);
        self.spatial.remove(id);
        self.graph[idx].attrs = next;
        self.reindex_around(id);
        let dirty_area = before.union(&self.bounding_area(id));
        self.mark_layout_dirty(dirty_area);
        AttrChange {
            id,
            previous,
            dirty_area,
        }
    }

    // ─── Selection & hover ───────────────────────────────────────────────

    /// Add `id` to the selection. Returns whether the selection changed.
    pub fn add_selection(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            log::warn!("cannot select unknown node {id}");
            return false;
        }
        if self.selection.contains(&id) {
            return false;
        }
        self.selection.push(id);
        self.dirty.selection = true;
        self.dirty.layout = true;
        true
    }

    /// Remove `id` from the selection. Returns whether the selection changed.
    pub fn delete_selection(&mut self, id: NodeId) -> bool {
        let Some(pos) = self.selection.iter().position(|s| *s == id) else {
            return false;
        };
        self.selection.remove(pos);
        self.dirty.selection = true;
        self.dirty.layout = true;
        true
    }

    pub fn clear_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.clear();
        self.dirty.selection = true;
        self.dirty.layout = true;
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selection.contains(&id)
    }

    /// Selected ids in selection order.
    pub fn selections_copy(&self) -> Vec<NodeId> {
        self.selection.clone()
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    pub fn set_hover_node(&mut self, id: Option<NodeId>) {
        let id = id.filter(|id| self.contains(*id));
        if self.hover != id {
            self.hover = id;
            self.dirty.layout = true;
        }
    }

    pub fn hover_node(&self) -> Option<NodeId> {
        self.hover
    }

    pub fn set_selection_dragging_state(&mut self, state: Option<SelectionDraggingState>) {
        self.dragging = state;
    }

    pub fn selection_dragging_state(&self) -> Option<SelectionDraggingState> {
        self.dragging
    }

    // ─── Picking ─────────────────────────────────────────────────────────

    /// Topmost pickable node whose bounding area contains `point` (scene
    /// space). Topmost is the node painted last.
    pub fn pick_node_at_point(&self, point: Point) -> Option<NodeId> {
        self.spatial
            .query_point(point)
            .into_iter()
            .filter(|id| self.is_pickable(*id))
            .filter_map(|id| self.path_of(id).map(|path| (path, id)))
            .max_by(|a, b| a.0.as_slice().cmp(b.0.as_slice()))
            .map(|(_, id)| id)
    }

    /// Every pickable node whose bounding area intersects `area`, in paint
    /// order.
    pub fn pick_nodes_in_range(&self, area: &BoundingArea) -> Vec<NodeId> {
        let mut hits: Vec<(CoordPath, NodeId)> = self
            .spatial
            .query_range(area)
            .into_iter()
            .filter(|id| self.is_pickable(*id))
            .filter_map(|id| self.path_of(id).map(|path| (path, id)))
            .collect();
        hits.sort_by(|a, b| a.0.as_slice().cmp(b.0.as_slice()));
        hits.into_iter().map(|(_, id)| id).collect()
    }

    /// Visible (with all ancestors visible) and unlocked.
    pub fn is_pickable(&self, id: NodeId) -> bool {
        let Some(node) = self.get_node_by_id(id) else {
            return false;
        };
        if node.attrs.locked || !node.attrs.visible || matches!(node.kind, NodeKind::Document) {
            return false;
        }
        self.ancestors(id).iter().all(|a| {
            self.get_node_by_id(*a)
                .is_some_and(|n| n.attrs.visible)
        })
    }

    pub fn spatial_index(&self) -> &SpatialIndex {
        &self.spatial
    }

    // ─── Dirty signal ────────────────────────────────────────────────────

    pub fn mark_layout_dirty(&mut self, area: BoundingArea) {
        self.dirty.layout = true;
        self.dirty.area = self.dirty.area.union(&area);
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    /// Drain the coalesced dirty flags.
    pub fn take_dirty(&mut self) -> DirtyFlags {
        std::mem::take(&mut self.dirty)
    }

    // ─── Index maintenance ───────────────────────────────────────────────

    /// Re-insert `id`, its descendants and its ancestors into the index.
    fn reindex_around(&mut self, id: NodeId) {
        for n in self.subtree(id) {
            self.reindex_one(n);
        }
        if let Some(parent) = self.parent_of(id) {
            self.reindex_ancestors(parent);
        }
    }

    /// Re-insert `id` and every ancestor above it.
    fn reindex_ancestors(&mut self, id: NodeId) {
        let mut chain = vec![id];
        chain.extend(self.ancestors(id));
        for n in chain {
            self.reindex_one(n);
        }
    }

    fn reindex_one(&mut self, id: NodeId) {
        if id == self.root_id() {
            return;
        }
        let area = self.bounding_area(id);
        self.spatial.insert(id, area);
    }

    /// Check the registry / tree / index invariants. Returns one message per
    /// violation; empty when consistent.
    pub fn integrity_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let reachable = self.subtree(self.root_id());
        if reachable.len() != self.id_index.len() {
            problems.push(format!(
                "{} nodes reachable but {} registered",
                reachable.len(),
                self.id_index.len()
            ));
        }
        for id in &reachable {
            if !self.id_index.contains_key(id) {
                problems.push(format!("{id} reachable but not registered"));
            }
            if *id == self.root_id() {
                continue;
            }
            let area = self.bounding_area(*id);
            match self.spatial.bounding_area(*id) {
                Some(indexed) if indexed != area => {
                    problems.push(format!("{id} indexed with stale area {indexed:?}"))
                }
                None if !area.is_empty() => problems.push(format!("{id} missing from index")),
                _ => {}
            }
        }
        for (id, _) in self.spatial.entries() {
            if !self.contains(id) {
                problems.push(format!("{id} indexed but not registered"));
            }
        }
        for (parent, order) in &self.child_order {
            for (rank, child) in order.iter().enumerate() {
                if self.sibling_rank.get(child) != Some(&rank) {
                    problems.push(format!(
                        "{} has a stale sibling rank under {}",
                        self.graph[*child].id, self.graph[*parent].id
                    ));
                }
            }
        }
        for id in &self.selection {
            if !self.contains(*id) {
                problems.push(format!("{id} selected but not registered"));
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use pretty_assertions::assert_eq;

    fn rect(name: &str, x: f64, y: f64, w: f64, h: f64) -> SceneNode {
        let mut n = SceneNode::new(
            NodeId::intern(name),
            NodeKind::Rectangle { corner_radius: 0.0 },
        );
        n.attrs.transform = Affine::translate((x, y));
        n.attrs.size = Size::new(w, h);
        n
    }

    #[test]
    fn register_inserts_at_index() {
        let mut scene = SceneGraph::new();
        let root = scene.root_id();
        scene.register_node(root, 0, rect("sg_a", 0.0, 0.0, 10.0, 10.0)).unwrap();
        scene.register_node(root, 0, rect("sg_b", 0.0, 0.0, 10.0, 10.0)).unwrap();
        assert_eq!(
            scene.children(root),
            vec![NodeId::intern("sg_b"), NodeId::intern("sg_a")]
        );
        assert_eq!(
            scene.path_of(NodeId::intern("sg_a")).unwrap().as_slice(),
            &[1]
        );
        assert!(scene.integrity_violations().is_empty());
    }

    #[test]
    fn register_rejects_out_of_range_index() {
        let mut scene = SceneGraph::new();
        let root = scene.root_id();
        let err = scene
            .register_node(root, 3, rect("sg_far", 0.0, 0.0, 1.0, 1.0))
            .unwrap_err();
        assert_eq!(err, SceneError::InvalidPath(vec![3]));
        assert!(!scene.contains(NodeId::intern("sg_far")));
    }

    #[test]
    fn leaves_cannot_hold_children() {
        let mut scene = SceneGraph::new();
        let root = scene.root_id();
        scene.register_node(root, 0, rect("sg_leaf", 0.0, 0.0, 1.0, 1.0)).unwrap();
        let err = scene
            .register_node(NodeId::intern("sg_leaf"), 0, rect("sg_child", 0.0, 0.0, 1.0, 1.0))
            .unwrap_err();
        assert_eq!(err, SceneError::NotAContainer(NodeId::intern("sg_leaf")));
    }

    #[test]
    fn group_bounds_follow_children_and_transform() {
        let mut scene = SceneGraph::new();
        let root = scene.root_id();
        let mut group = SceneNode::new(NodeId::intern("sg_group"), NodeKind::Group);
        group.attrs.transform = Affine::translate((100.0, 0.0));
        scene.register_node(root, 0, group).unwrap();
        let g = NodeId::intern("sg_group");
        scene.register_node(g, 0, rect("sg_c1", 0.0, 0.0, 10.0, 10.0)).unwrap();
        scene.register_node(g, 1, rect("sg_c2", 20.0, 20.0, 10.0, 10.0)).unwrap();

        assert_eq!(scene.bounding_area(g), BoundingArea::new(100.0, 0.0, 130.0, 30.0));

        scene
            .update_node_property(g, &AttrPatch::transform(Affine::translate((0.0, 50.0))))
            .unwrap();
        assert_eq!(
            scene.spatial_index().bounding_area(NodeId::intern("sg_c2")),
            Some(BoundingArea::new(20.0, 70.0, 30.0, 80.0))
        );
        assert!(scene.integrity_violations().is_empty());
    }

    #[test]
    fn update_by_path_and_dirty_area() {
        let mut scene = SceneGraph::new();
        let root = scene.root_id();
        scene.register_node(root, 0, rect("sg_p", 0.0, 0.0, 10.0, 10.0)).unwrap();
        scene.take_dirty();

        let path: &[usize] = &[0];
        let change = scene
            .update_node_property(path, &AttrPatch::transform(Affine::translate((50.0, 0.0))))
            .unwrap();
        assert_eq!(change.dirty_area, BoundingArea::new(0.0, 0.0, 60.0, 10.0));
        assert_eq!(change.previous.transform, Affine::IDENTITY);
        assert!(scene.take_dirty().layout);
        assert!(!scene.dirty().layout);
    }

    #[test]
    fn root_transform_stays_identity() {
        let mut scene = SceneGraph::new();
        let root = scene.root_id();
        scene
            .update_node_property(root, &AttrPatch::transform(Affine::scale(2.0)))
            .unwrap();
        assert_eq!(scene.root_node().attrs.transform, Affine::IDENTITY);
    }

    #[test]
    fn unregister_refuses_root_and_parents() {
        let mut scene = SceneGraph::new();
        let root = scene.root_id();
        assert_eq!(scene.unregister_node(root).unwrap_err(), SceneError::RootImmutable);
        scene
            .register_node(root, 0, SceneNode::new(NodeId::intern("sg_g2"), NodeKind::Group))
            .unwrap();
        scene
            .register_node(NodeId::intern("sg_g2"), 0, rect("sg_in", 0.0, 0.0, 5.0, 5.0))
            .unwrap();
        assert_eq!(
            scene.unregister_node(NodeId::intern("sg_g2")).unwrap_err(),
            SceneError::HasChildren(NodeId::intern("sg_g2"))
        );
        let (node, parent, pos) = scene.unregister_node(NodeId::intern("sg_in")).unwrap();
        assert_eq!(node.id, NodeId::intern("sg_in"));
        assert_eq!(parent, NodeId::intern("sg_g2"));
        assert_eq!(pos, 0);
        assert!(scene.integrity_violations().is_empty());
    }

    #[test]
    fn selection_changes_are_minimal() {
        let mut scene = SceneGraph::new();
        let root = scene.root_id();
        scene.register_node(root, 0, rect("sg_s", 0.0, 0.0, 5.0, 5.0)).unwrap();
        let id = NodeId::intern("sg_s");
        assert!(scene.add_selection(id));
        assert!(!scene.add_selection(id));
        assert!(!scene.add_selection(NodeId::intern("sg_nope")));
        assert_eq!(scene.selections_copy(), vec![id]);
        assert!(scene.delete_selection(id));
        assert!(!scene.delete_selection(id));
    }

    #[test]
    fn hidden_and_locked_nodes_are_not_picked() {
        let mut scene = SceneGraph::new();
        let root = scene.root_id();
        scene.register_node(root, 0, rect("sg_under", 0.0, 0.0, 10.0, 10.0)).unwrap();
        scene.register_node(root, 1, rect("sg_over", 0.0, 0.0, 10.0, 10.0)).unwrap();
        let over = NodeId::intern("sg_over");
        let p = Point::new(5.0, 5.0);
        assert_eq!(scene.pick_node_at_point(p), Some(over));

        scene
            .update_node_property(over, &AttrPatch { visible: Some(false), ..AttrPatch::default() })
            .unwrap();
        assert_eq!(scene.pick_node_at_point(p), Some(NodeId::intern("sg_under")));

        scene
            .update_node_property(
                NodeId::intern("sg_under"),
                &AttrPatch { locked: Some(true), ..AttrPatch::default() },
            )
            .unwrap();
        assert_eq!(scene.pick_node_at_point(p), None);
    }

    #[test]
    fn child_in_group_wins_over_group() {
        let mut scene = SceneGraph::new();
        let root = scene.root_id();
        scene
            .register_node(root, 0, SceneNode::new(NodeId::intern("sg_g3"), NodeKind::Group))
            .unwrap();
        let g = NodeId::intern("sg_g3");
        scene.register_node(g, 0, rect("sg_k1", 0.0, 0.0, 10.0, 10.0)).unwrap();
        scene.register_node(g, 1, rect("sg_k2", 40.0, 40.0, 10.0, 10.0)).unwrap();
        assert_eq!(scene.pick_node_at_point(Point::new(5.0, 5.0)), Some(NodeId::intern("sg_k1")));
        // inside the group's box, outside both children
        assert_eq!(scene.pick_node_at_point(Point::new(25.0, 25.0)), Some(g));
    }
}
