//! Atomic, reversible scene-graph mutations.
//!
//! An operation is built from an intent (what to add, which attributes to
//! patch, which ids to select). `execute` records whatever prior state it
//! needs and `undo` puts it back, so `execute` followed by `undo` leaves the
//! registry, tree, selection and spatial index as they were.
//!
//! Operations that cannot resolve their target (a stale id or coordinate
//! path) do nothing, log a warning and report `false` from `execute`.

use vd_core::{
    AttrPatch, BoundingArea, CoordPath, NodeAttrs, NodeId, NodeTarget, OperationId, SceneGraph,
    SceneNode,
};

/// One undoable mutation.
#[derive(Debug, Clone)]
pub enum Operation {
    AddNode(AddNodeOperation),
    RemoveNode(RemoveNodeOperation),
    UpdateProperty(UpdatePropertyOperation),
    UpdateSelection(UpdateSelectionOperation),
}

impl Operation {
    pub fn id(&self) -> OperationId {
        match self {
            Operation::AddNode(op) => op.id,
            Operation::RemoveNode(op) => op.id,
            Operation::UpdateProperty(op) => op.id,
            Operation::UpdateSelection(op) => op.id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Operation::AddNode(_) => "add node",
            Operation::RemoveNode(_) => "remove node",
            Operation::UpdateProperty(_) => "update property",
            Operation::UpdateSelection(_) => "update selection",
        }
    }

    /// Apply the mutation. Returns whether anything was applied.
    pub fn execute(&mut self, scene: &mut SceneGraph) -> bool {
        let applied = match self {
            Operation::AddNode(op) => op.execute(scene),
            Operation::RemoveNode(op) => op.execute(scene),
            Operation::UpdateProperty(op) => op.execute(scene),
            Operation::UpdateSelection(op) => op.execute(scene),
        };
        log::trace!("execute {} {:?}: applied={applied}", self.label(), self.id());
        applied
    }

    /// Revert the last `execute`. A no-op if it did not apply.
    pub fn undo(&mut self, scene: &mut SceneGraph) {
        log::trace!("undo {} {:?}", self.label(), self.id());
        match self {
            Operation::AddNode(op) => op.undo(scene),
            Operation::RemoveNode(op) => op.undo(scene),
            Operation::UpdateProperty(op) => op.undo(scene),
            Operation::UpdateSelection(op) => op.undo(scene),
        }
    }
}

impl From<AddNodeOperation> for Operation {
    fn from(op: AddNodeOperation) -> Self {
        Operation::AddNode(op)
    }
}

impl From<RemoveNodeOperation> for Operation {
    fn from(op: RemoveNodeOperation) -> Self {
        Operation::RemoveNode(op)
    }
}

impl From<UpdatePropertyOperation> for Operation {
    fn from(op: UpdatePropertyOperation) -> Self {
        Operation::UpdateProperty(op)
    }
}

impl From<UpdateSelectionOperation> for Operation {
    fn from(op: UpdateSelectionOperation) -> Self {
        Operation::UpdateSelection(op)
    }
}

// ─── Add ─────────────────────────────────────────────────────────────────

/// Insert a node at a coordinate path. The last path element is the child
/// index inside the container addressed by the rest of the path.
#[derive(Debug, Clone)]
pub struct AddNodeOperation {
    id: OperationId,
    path: CoordPath,
    node: SceneNode,
    applied: bool,
}

impl AddNodeOperation {
    pub fn new(path: &[usize], node: SceneNode) -> Self {
        Self {
            id: OperationId::next(),
            path: CoordPath::from_slice(path),
            node,
            applied: false,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node.id
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Whether the last `execute` actually inserted the node.
    pub fn applied(&self) -> bool {
        self.applied
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> bool {
        let Some((&index, parent_path)) = self.path.split_last() else {
            log::warn!("add {}: empty coordinate path", self.node.id);
            return false;
        };
        let Some(parent) = scene.node_at_path(parent_path) else {
            log::warn!(
                "add {}: no container at coordinate path {:?}",
                self.node.id,
                parent_path
            );
            return false;
        };
        match scene.register_node(parent, index, self.node.clone()) {
            Ok(()) => {
                self.applied = true;
                true
            }
            Err(err) => {
                log::warn!("add {}: {err}", self.node.id);
                false
            }
        }
    }

    fn undo(&mut self, scene: &mut SceneGraph) {
        if !self.applied {
            return;
        }
        self.applied = false;
        match scene.unregister_node(self.node.id) {
            // keep the latest value for a redo
            Ok((node, _, _)) => self.node = node,
            Err(err) => log::warn!("undo add {}: {err}", self.node.id),
        }
    }
}

// ─── Remove ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RemovedNode {
    parent: NodeId,
    index: usize,
    node: SceneNode,
}

/// Remove a node together with its subtree.
#[derive(Debug, Clone)]
pub struct RemoveNodeOperation {
    id: OperationId,
    target: NodeTarget,
    /// Removed nodes in pre-order, so re-inserting front to back rebuilds
    /// the subtree with the original child indices.
    removed: Vec<RemovedNode>,
    /// Selected ids inside the removed subtree.
    selected: Vec<NodeId>,
}

impl RemoveNodeOperation {
    pub fn new(target: impl Into<NodeTarget>) -> Self {
        Self {
            id: OperationId::next(),
            target: target.into(),
            removed: Vec::new(),
            selected: Vec::new(),
        }
    }

    /// Ids removed by the last `execute`, in pre-order.
    pub fn removed_ids(&self) -> Vec<NodeId> {
        self.removed.iter().map(|r| r.node.id).collect()
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> bool {
        let id = match scene.resolve_target(&self.target) {
            Ok(id) => id,
            Err(err) => {
                log::warn!("remove: {err}");
                return false;
            }
        };
        if id == scene.root_id() {
            log::warn!("remove: the document root cannot be removed");
            return false;
        }

        let subtree = scene.subtree(id);
        self.selected = scene
            .selections_copy()
            .into_iter()
            .filter(|s| subtree.contains(s))
            .collect();
        self.removed.clear();
        // deepest-last pre-order reversed: children go before their parent
        for node_id in subtree.iter().rev() {
            match scene.unregister_node(*node_id) {
                Ok((node, parent, index)) => self.removed.push(RemovedNode {
                    parent,
                    index,
                    node,
                }),
                Err(err) => log::warn!("remove {node_id}: {err}"),
            }
        }
        self.removed.reverse();
        !self.removed.is_empty()
    }

    fn undo(&mut self, scene: &mut SceneGraph) {
        for r in self.removed.drain(..) {
            if let Err(err) = scene.register_node(r.parent, r.index, r.node) {
                log::warn!("undo remove: {err}");
            }
        }
        for id in self.selected.drain(..) {
            scene.add_selection(id);
        }
    }
}

// ─── Update property ─────────────────────────────────────────────────────

/// Merge a partial attribute set into one node.
#[derive(Debug, Clone)]
pub struct UpdatePropertyOperation {
    id: OperationId,
    target: NodeTarget,
    patch: AttrPatch,
    /// Resolved node and its full attribute snapshot from before `execute`.
    previous: Option<(NodeId, NodeAttrs)>,
    dirty_area: BoundingArea,
}

impl UpdatePropertyOperation {
    pub fn new(target: impl Into<NodeTarget>, patch: AttrPatch) -> Self {
        Self {
            id: OperationId::next(),
            target: target.into(),
            patch,
            previous: None,
            dirty_area: BoundingArea::EMPTY,
        }
    }

    pub fn patch(&self) -> &AttrPatch {
        &self.patch
    }

    /// Union of the node's scene area before and after the last
    /// execute/undo, for incremental redraw.
    pub fn get_dirty_bounding_area(&self) -> BoundingArea {
        self.dirty_area
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> bool {
        match scene.update_node_property(self.target.clone(), &self.patch) {
            Ok(change) => {
                self.dirty_area = change.dirty_area;
                self.previous = Some((change.id, change.previous));
                true
            }
            Err(err) => {
                log::warn!("update property: {err}");
                self.previous = None;
                false
            }
        }
    }

    fn undo(&mut self, scene: &mut SceneGraph) {
        let Some((id, attrs)) = self.previous.take() else {
            return;
        };
        match scene.set_node_attrs(id, attrs) {
            Ok(change) => self.dirty_area = change.dirty_area,
            Err(err) => log::warn!("undo update property: {err}"),
        }
    }
}

// ─── Update selection ────────────────────────────────────────────────────

/// Replace the selection with a target set, touching only ids that change.
#[derive(Debug, Clone)]
pub struct UpdateSelectionOperation {
    id: OperationId,
    target: Vec<NodeId>,
    previous: Option<Vec<NodeId>>,
}

impl UpdateSelectionOperation {
    pub fn new(target: impl IntoIterator<Item = NodeId>) -> Self {
        let mut ids: Vec<NodeId> = Vec::new();
        for id in target {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Self {
            id: OperationId::next(),
            target: ids,
            previous: None,
        }
    }

    pub fn target(&self) -> &[NodeId] {
        &self.target
    }

    fn execute(&mut self, scene: &mut SceneGraph) -> bool {
        let previous = scene.selections_copy();
        let changed = apply_selection_diff(scene, &previous, &self.target);
        self.previous = Some(previous);
        changed
    }

    fn undo(&mut self, scene: &mut SceneGraph) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        let current = scene.selections_copy();
        apply_selection_diff(scene, &current, &previous);
    }
}

/// Move the selection from `from` to `to` with the fewest add/delete calls.
fn apply_selection_diff(scene: &mut SceneGraph, from: &[NodeId], to: &[NodeId]) -> bool {
    let mut changed = false;
    for id in from.iter().filter(|id| !to.contains(id)) {
        changed |= scene.delete_selection(*id);
    }
    for id in to.iter().filter(|id| !from.contains(id)) {
        changed |= scene.add_selection(*id);
    }
    changed
}
