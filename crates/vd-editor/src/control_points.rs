//! Control points: the resize and rotate handles around the selection.
//!
//! The handle set is rebuilt from the selection:
//!
//! | Selection | Handles |
//! |-----------|---------|
//! | none, the document, or only locked nodes | none |
//! | one leaf node | 4 corner resize, 4 edge resize, 4 rotate (in the node's own frame) |
//! | one container | same, on its axis-aligned bounding box |
//! | several nodes | 4 corner resize, 4 edge resize on the union bounding box |
//!
//! A drag opens a command on the `CommandManager`, appends one
//! `UpdatePropertyOperation` per target and step, and commits on release so
//! the whole gesture is a single undo step. Every step is computed from the
//! drag-start snapshot, never from the previous step.
//!
//! ## Modifier behaviors
//!
//! | Modifier | Resize | Rotate |
//! |----------|--------|--------|
//! | **Shift** | Keep aspect ratio | Snap to `rotate_snap_deg` |

use crate::commands::CommandManager;
use crate::config::EditorConfig;
use crate::input::Modifiers;
use crate::operations::UpdatePropertyOperation;
use vd_core::geometry::{about, decompose, invert, normalize_degree, rad_to_deg, round_to, signed_angle};
use vd_core::{
    Affine, AttrPatch, BoundingArea, DraggingKind, NodeAttrs, NodeId, Point, SceneGraph,
    SelectionDraggingState, Size, Vec2, ViewState,
};

/// Denominators below this are treated as zero-length.
const DEGENERATE: f64 = 1e-9;

// ─── Handle kinds ────────────────────────────────────────────────────────

/// A resize handle, named by compass position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl ResizeHandle {
    pub const CORNERS: [ResizeHandle; 4] = [
        ResizeHandle::NW,
        ResizeHandle::NE,
        ResizeHandle::SE,
        ResizeHandle::SW,
    ];

    pub const EDGES: [ResizeHandle; 4] = [
        ResizeHandle::N,
        ResizeHandle::E,
        ResizeHandle::S,
        ResizeHandle::W,
    ];

    /// Normalized position in the unit frame, `(0,0)` = NW, `(1,1)` = SE.
    pub fn anchor(self) -> Point {
        match self {
            ResizeHandle::NW => Point::new(0.0, 0.0),
            ResizeHandle::N => Point::new(0.5, 0.0),
            ResizeHandle::NE => Point::new(1.0, 0.0),
            ResizeHandle::E => Point::new(1.0, 0.5),
            ResizeHandle::SE => Point::new(1.0, 1.0),
            ResizeHandle::S => Point::new(0.5, 1.0),
            ResizeHandle::SW => Point::new(0.0, 1.0),
            ResizeHandle::W => Point::new(0.0, 0.5),
        }
    }

    /// The opposite handle, which stays put while this one is dragged.
    pub fn fixed(self) -> ResizeHandle {
        match self {
            ResizeHandle::N => ResizeHandle::S,
            ResizeHandle::S => ResizeHandle::N,
            ResizeHandle::E => ResizeHandle::W,
            ResizeHandle::W => ResizeHandle::E,
            ResizeHandle::NE => ResizeHandle::SW,
            ResizeHandle::SW => ResizeHandle::NE,
            ResizeHandle::NW => ResizeHandle::SE,
            ResizeHandle::SE => ResizeHandle::NW,
        }
    }

    pub fn is_corner(self) -> bool {
        matches!(
            self,
            ResizeHandle::NE | ResizeHandle::NW | ResizeHandle::SE | ResizeHandle::SW
        )
    }

    /// Whether dragging this handle changes the x / y extent.
    fn moves_axes(self) -> (bool, bool) {
        let a = self.anchor();
        (a.x != 0.5, a.y != 0.5)
    }
}

/// A rotate handle sits in a ring just outside one corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotateHandle {
    NW,
    NE,
    SE,
    SW,
}

impl RotateHandle {
    pub const ALL: [RotateHandle; 4] = [
        RotateHandle::NW,
        RotateHandle::NE,
        RotateHandle::SE,
        RotateHandle::SW,
    ];

    pub fn corner(self) -> ResizeHandle {
        match self {
            RotateHandle::NW => ResizeHandle::NW,
            RotateHandle::NE => ResizeHandle::NE,
            RotateHandle::SE => ResizeHandle::SE,
            RotateHandle::SW => ResizeHandle::SW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Resize(ResizeHandle),
    Rotate(RotateHandle),
}

/// Cursor the presentation layer should show over a handle.
///
/// `degree` is the scene-space direction of the handle seen from the
/// frame's center, so rotated and flipped frames get matching icons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cursor {
    /// Double arrow; `degree` in `[0, 180)`.
    Resize { degree: f64 },
    /// Curved arrow; `degree` in `[0, 360)`.
    Rotate { degree: f64 },
}

// ─── Frame ───────────────────────────────────────────────────────────────

/// The box a handle set is laid out on: a unit-anchored rectangle
/// `(0,0)..size` mapped into scene space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub to_scene: Affine,
    pub size: Size,
}

impl Frame {
    fn axis_aligned(area: &BoundingArea) -> Self {
        Self {
            to_scene: Affine::translate((area.left, area.top)),
            size: Size::new(area.width(), area.height()),
        }
    }

    /// Local point of a normalized anchor.
    fn local(&self, anchor: Point) -> Point {
        Point::new(anchor.x * self.size.width, anchor.y * self.size.height)
    }

    /// Scene point of a normalized anchor.
    pub fn scene_point(&self, anchor: Point) -> Point {
        self.to_scene * self.local(anchor)
    }

    pub fn center(&self) -> Point {
        self.scene_point(Point::new(0.5, 0.5))
    }
}

/// Aspect constraint applied to a resize.
#[derive(Debug, Clone, Copy, PartialEq)]
enum AspectLock {
    Free,
    /// Keep the frame's current proportions.
    Proportional,
    /// Keep `width / height` at the node's target ratio.
    Ratio(f64),
}

/// How a resize writes its result back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResizeMode {
    /// Single leaf: fold the scale into `size`, keep translate/rotate/flip
    /// in the transform.
    FoldIntoSize,
    /// Containers and multi-selection: pre-multiply every target's scene
    /// transform with one scene-space scale.
    Compound,
}

// ─── Control point ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct TargetSnapshot {
    id: NodeId,
    attrs: NodeAttrs,
    world: Affine,
    parent_world: Affine,
}

#[derive(Debug, Clone)]
struct DragState {
    start: Point,
    targets: Vec<TargetSnapshot>,
}

/// One interactive handle.
#[derive(Debug, Clone)]
pub struct ControlPoint {
    kind: HandleKind,
    frame: Frame,
    mode: ResizeMode,
    targets: Vec<NodeId>,
    drag: Option<DragState>,
}

impl ControlPoint {
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Scene position of the handle.
    pub fn position(&self) -> Point {
        match self.kind {
            HandleKind::Resize(h) => self.frame.scene_point(h.anchor()),
            HandleKind::Rotate(h) => self.frame.scene_point(h.corner().anchor()),
        }
    }

    /// Cursor direction in scene space. Edges face along the frame's axis
    /// normal; corners face the frame's 45° diagonal whatever its aspect.
    pub fn get_cursor(&self) -> Cursor {
        let anchor = match self.kind {
            HandleKind::Resize(h) => h.anchor(),
            HandleKind::Rotate(h) => h.corner().anchor(),
        };
        let origin = self.frame.to_scene * Point::ORIGIN;
        let axis = |local: Vec2| {
            let d = self.frame.to_scene * local.to_point() - origin;
            if d.hypot2() < DEGENERATE { local } else { d.normalize() }
        };
        let dir = axis(Vec2::new(1.0, 0.0)) * (anchor.x * 2.0 - 1.0)
            + axis(Vec2::new(0.0, 1.0)) * (anchor.y * 2.0 - 1.0);
        let degree = if dir.hypot2() < DEGENERATE {
            0.0
        } else {
            normalize_degree(rad_to_deg(dir.atan2()))
        };
        match self.kind {
            HandleKind::Resize(_) => Cursor::Resize {
                degree: degree % 180.0,
            },
            HandleKind::Rotate(_) => Cursor::Rotate { degree },
        }
    }

    /// Whether `point` (scene space) activates this handle. Radii are in
    /// screen pixels and scale with the view zoom.
    pub fn hit_test(&self, point: Point, view: &ViewState, config: &EditorConfig) -> bool {
        match self.kind {
            HandleKind::Resize(h) if h.is_corner() => {
                let radius = view.screen_len_to_scene(config.handle_hit_radius);
                point.distance(self.position()) <= radius
            }
            HandleKind::Resize(h) => {
                let radius = view.screen_len_to_scene(config.handle_hit_radius);
                let a = h.anchor();
                let (from, to) = if a.x == 0.5 {
                    (Point::new(0.0, a.y), Point::new(1.0, a.y))
                } else {
                    (Point::new(a.x, 0.0), Point::new(a.x, 1.0))
                };
                distance_to_segment(
                    point,
                    self.frame.scene_point(from),
                    self.frame.scene_point(to),
                ) <= radius
            }
            HandleKind::Rotate(_) => {
                let ring = view.screen_len_to_scene(config.rotate_ring_size);
                let Some(inv) = invert(self.frame.to_scene) else {
                    return false;
                };
                let local = inv * point;
                let inside = local.x >= 0.0
                    && local.y >= 0.0
                    && local.x <= self.frame.size.width
                    && local.y <= self.frame.size.height;
                !inside && point.distance(self.position()) <= ring
            }
        }
    }

    fn dragging_kind(&self) -> DraggingKind {
        match self.kind {
            HandleKind::Resize(_) => DraggingKind::Resize,
            HandleKind::Rotate(_) => DraggingKind::Rotate,
        }
    }

    fn description(&self) -> &'static str {
        match self.kind {
            HandleKind::Resize(_) => "resize",
            HandleKind::Rotate(_) => "rotate",
        }
    }

    /// Snapshot the targets, open a command and publish the dragging state.
    pub fn on_drag_start(
        &mut self,
        scene: &mut SceneGraph,
        commands: &mut CommandManager,
        point: Point,
        modifiers: Modifiers,
    ) {
        let targets = self
            .targets
            .iter()
            .filter_map(|id| {
                let node = scene.get_node_by_id(*id)?;
                Some(TargetSnapshot {
                    id: *id,
                    attrs: node.attrs.clone(),
                    world: scene.world_transform(*id),
                    parent_world: scene.parent_world_transform(*id),
                })
            })
            .collect();
        self.drag = Some(DragState {
            start: point,
            targets,
        });
        commands.begin(self.description());
        scene.set_selection_dragging_state(Some(SelectionDraggingState {
            kind: self.dragging_kind(),
            shift_key: modifiers.shift,
            alt_key: modifiers.alt,
        }));
        log::debug!("{} drag start at {point:?}", self.description());
    }

    /// Apply one drag step. Returns whether anything changed.
    pub fn on_drag(
        &mut self,
        scene: &mut SceneGraph,
        commands: &mut CommandManager,
        config: &EditorConfig,
        point: Point,
        modifiers: Modifiers,
    ) -> bool {
        let Some(drag) = &self.drag else {
            return false;
        };
        scene.set_selection_dragging_state(Some(SelectionDraggingState {
            kind: self.dragging_kind(),
            shift_key: modifiers.shift,
            alt_key: modifiers.alt,
        }));
        let patches = match self.kind {
            HandleKind::Resize(h) => self.resize_patches(drag, h, config, point, modifiers),
            HandleKind::Rotate(_) => self.rotate_patches(drag, config, point, modifiers),
        };
        log::trace!("{} step at {point:?}: {} patches", self.description(), patches.len());
        let mut changed = false;
        for (id, patch) in patches {
            changed |= commands.append(scene, UpdatePropertyOperation::new(id, patch));
        }
        changed
    }

    /// Commit the gesture as one undo step and clear the dragging state.
    pub fn on_drag_end(&mut self, scene: &mut SceneGraph, commands: &mut CommandManager) {
        if self.drag.take().is_none() {
            return;
        }
        commands.commit();
        scene.set_selection_dragging_state(None);
    }

    /// Abandon the gesture, undoing every live step.
    pub fn on_drag_cancel(&mut self, scene: &mut SceneGraph, commands: &mut CommandManager) {
        if self.drag.take().is_none() {
            return;
        }
        commands.discard(scene);
        scene.set_selection_dragging_state(None);
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    fn resize_patches(
        &self,
        drag: &DragState,
        handle: ResizeHandle,
        config: &EditorConfig,
        point: Point,
        modifiers: Modifiers,
    ) -> Vec<(NodeId, AttrPatch)> {
        let point = if handle.is_corner() {
            point
        } else {
            self.snap_edge_pointer(handle, config, point)
        };
        let node_lock = if self.mode == ResizeMode::FoldIntoSize {
            drag.targets.iter().find(|t| t.attrs.aspect_ratio_locked)
        } else {
            None
        };
        let lock = match node_lock.and_then(|t| t.attrs.aspect_ratio) {
            Some(ratio) if ratio.is_finite() && ratio > DEGENERATE => AspectLock::Ratio(ratio),
            _ if modifiers.shift || node_lock.is_some() => AspectLock::Proportional,
            _ => AspectLock::Free,
        };
        let Some(scale) = self.resize_scale(drag.start, point, handle, lock) else {
            return Vec::new();
        };
        let fixed = self.frame.local(handle.fixed().anchor());

        match self.mode {
            ResizeMode::FoldIntoSize => drag
                .targets
                .iter()
                .filter_map(|t| {
                    fold_resize(&t.attrs, fixed, scale, config.size_precision)
                        .map(|patch| (t.id, patch))
                })
                .collect(),
            ResizeMode::Compound => {
                let m = about(
                    self.frame.to_scene * fixed,
                    Affine::scale_non_uniform(scale.x, scale.y),
                );
                drag.targets
                    .iter()
                    .filter_map(|t| {
                        let inv = invert(t.parent_world)?;
                        Some((t.id, AttrPatch::transform(inv * m * t.world)))
                    })
                    .collect()
            }
        }
    }

    /// Per-axis scale that keeps the fixed anchor stationary, or `None`
    /// when the frame is degenerate or the result would collapse it.
    ///
    fn resize_scale(
        &self,
        start: Point,
        point: Point,
        handle: ResizeHandle,
        lock: AspectLock,
    ) -> Option<Vec2> {
        let inv = invert(self.frame.to_scene)?;
        let delta = (inv * point) - (inv * start);
        let moving = self.frame.local(handle.anchor());
        let fixed = self.frame.local(handle.fixed().anchor());
        let (moves_x, moves_y) = handle.moves_axes();

        let axis = |moves: bool, moving: f64, fixed: f64, delta: f64| {
            let span = moving - fixed;
            if !moves || span.abs() < DEGENERATE {
                1.0
            } else {
                (moving + delta - fixed) / span
            }
        };
        let mut sx = axis(moves_x, moving.x, fixed.x, delta.x);
        let mut sy = axis(moves_y, moving.y, fixed.y, delta.y);

        let (w, h) = (self.frame.size.width, self.frame.size.height);
        match lock {
            AspectLock::Free => {}
            AspectLock::Ratio(ratio) if w > DEGENERATE && h > DEGENERATE => {
                let width = (w * sx).abs();
                let height = (h * sy).abs();
                let width_drives = if handle.is_corner() {
                    width / ratio >= height
                } else {
                    moves_x
                };
                if width_drives {
                    sy = (width / ratio / h).copysign(sy);
                } else {
                    sx = (height * ratio / w).copysign(sx);
                }
            }
            _ if handle.is_corner() => {
                let m = sx.abs().max(sy.abs());
                sx = m.copysign(sx);
                sy = m.copysign(sy);
            }
            _ if moves_x => sy = sx.abs(),
            _ => sx = sy.abs(),
        }

        let finite = sx.is_finite() && sy.is_finite();
        (finite && sx.abs() > DEGENERATE && sy.abs() > DEGENERATE).then(|| Vec2::new(sx, sy))
    }

    /// Snap the pointer to whole scene units along the edge normal when that
    /// normal is (nearly) parallel to a screen axis.
    fn snap_edge_pointer(&self, handle: ResizeHandle, config: &EditorConfig, point: Point) -> Point {
        let (moves_x, _) = handle.moves_axes();
        let local_normal = if moves_x {
            Vec2::new(1.0, 0.0)
        } else {
            Vec2::new(0.0, 1.0)
        };
        let normal = self.frame.to_scene * local_normal.to_point() - self.frame.to_scene * Point::ORIGIN;
        if normal.hypot2() < DEGENERATE {
            return point;
        }
        let degree = normalize_degree(rad_to_deg(normal.atan2())) % 180.0;
        let tolerance = config.axis_snap_tolerance_deg;
        if degree <= tolerance || degree >= 180.0 - tolerance {
            Point::new(point.x.round(), point.y)
        } else if (degree - 90.0).abs() <= tolerance {
            Point::new(point.x, point.y.round())
        } else {
            point
        }
    }

    fn rotate_patches(
        &self,
        drag: &DragState,
        config: &EditorConfig,
        point: Point,
        modifiers: Modifiers,
    ) -> Vec<(NodeId, AttrPatch)> {
        let center = self.frame.center();
        let Some(mut angle) = signed_angle(drag.start - center, point - center) else {
            return Vec::new();
        };
        if modifiers.shift && config.rotate_snap_deg > 0.0 {
            // snap the resulting orientation, not the sweep
            let step = config.rotate_snap_deg.to_radians();
            let base = decompose(self.frame.to_scene).rotation;
            angle = ((base + angle) / step).round() * step - base;
        }
        let m = about(center, Affine::rotate(angle));
        drag.targets
            .iter()
            .filter_map(|t| {
                let inv = invert(t.parent_world)?;
                Some((t.id, AttrPatch::transform(inv * m * t.world)))
            })
            .collect()
    }
}

/// `transform ∘ about(fixed, scale)`, decomposed so that the scale lands in
/// `size` and only translation, rotation and flips stay in the transform.
fn fold_resize(attrs: &NodeAttrs, fixed: Point, scale: Vec2, precision: u32) -> Option<AttrPatch> {
    let m = attrs.transform * about(fixed, Affine::scale_non_uniform(scale.x, scale.y));
    let d = decompose(m);
    if !(d.scale.x.is_finite() && d.scale.y.is_finite()) {
        return None;
    }
    let size = Size::new(
        round_to((attrs.size.width * d.scale.x).abs(), precision),
        round_to((attrs.size.height * d.scale.y).abs(), precision),
    );
    if size.width <= 0.0 || size.height <= 0.0 {
        return None;
    }
    Some(AttrPatch::geometry(d.without_scale().to_affine(), size))
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.hypot2();
    if len2 < DEGENERATE {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

// ─── Manager ─────────────────────────────────────────────────────────────

/// The active handle set and the handle being dragged.
#[derive(Debug, Default)]
pub struct ControlPointManager {
    points: Vec<ControlPoint>,
    active: Option<usize>,
}

impl ControlPointManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn control_points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Rebuild the handles from the current selection. Ignored while a drag
    /// is in progress.
    pub fn rebuild(&mut self, scene: &SceneGraph) {
        if self.is_dragging() {
            return;
        }
        self.points.clear();

        let selected: Vec<NodeId> = scene
            .selections_copy()
            .into_iter()
            .filter(|id| id != &scene.root_id())
            .filter(|id| scene.get_node_by_id(*id).is_some_and(|n| !n.attrs.locked))
            .collect();

        match selected.as_slice() {
            [] => {}
            [id] => {
                let Some(node) = scene.get_node_by_id(*id) else {
                    return;
                };
                let (frame, mode) = if node.kind.is_container() {
                    let area = scene.bounding_area(*id);
                    if area.is_empty() {
                        return;
                    }
                    (Frame::axis_aligned(&area), ResizeMode::Compound)
                } else {
                    (
                        Frame {
                            to_scene: scene.world_transform(*id),
                            size: node.attrs.size,
                        },
                        ResizeMode::FoldIntoSize,
                    )
                };
                self.push_resize_handles(frame, mode, &selected);
                for h in RotateHandle::ALL {
                    self.points.push(ControlPoint {
                        kind: HandleKind::Rotate(h),
                        frame,
                        mode,
                        targets: selected.clone(),
                        drag: None,
                    });
                }
            }
            _ => {
                // a node under a selected ancestor moves with it already
                let targets: Vec<NodeId> = selected
                    .iter()
                    .copied()
                    .filter(|id| !scene.ancestors(*id).iter().any(|a| selected.contains(a)))
                    .collect();
                let area = targets
                    .iter()
                    .fold(BoundingArea::EMPTY, |acc, id| acc.union(&scene.bounding_area(*id)));
                if area.is_empty() {
                    return;
                }
                self.push_resize_handles(Frame::axis_aligned(&area), ResizeMode::Compound, &targets);
            }
        }
        log::debug!(
            "rebuilt {} control points for {} selected",
            self.points.len(),
            selected.len()
        );
    }

    fn push_resize_handles(&mut self, frame: Frame, mode: ResizeMode, targets: &[NodeId]) {
        for h in ResizeHandle::CORNERS.into_iter().chain(ResizeHandle::EDGES) {
            self.points.push(ControlPoint {
                kind: HandleKind::Resize(h),
                frame,
                mode,
                targets: targets.to_vec(),
                drag: None,
            });
        }
    }

    /// First handle under `point` (scene space): corners, then edges, then
    /// rotate rings.
    pub fn hit_test(&self, point: Point, view: &ViewState, config: &EditorConfig) -> Option<usize> {
        self.points
            .iter()
            .position(|cp| cp.hit_test(point, view, config))
    }

    pub fn cursor_at(&self, point: Point, view: &ViewState, config: &EditorConfig) -> Option<Cursor> {
        self.hit_test(point, view, config)
            .map(|i| self.points[i].get_cursor())
    }

    pub fn begin_drag(
        &mut self,
        index: usize,
        scene: &mut SceneGraph,
        commands: &mut CommandManager,
        point: Point,
        modifiers: Modifiers,
    ) -> bool {
        if self.active.is_some() {
            return false;
        }
        let Some(cp) = self.points.get_mut(index) else {
            return false;
        };
        cp.on_drag_start(scene, commands, point, modifiers);
        self.active = Some(index);
        true
    }

    pub fn drag(
        &mut self,
        scene: &mut SceneGraph,
        commands: &mut CommandManager,
        config: &EditorConfig,
        point: Point,
        modifiers: Modifiers,
    ) -> bool {
        let Some(cp) = self.active.and_then(|i| self.points.get_mut(i)) else {
            return false;
        };
        cp.on_drag(scene, commands, config, point, modifiers)
    }

    pub fn end_drag(&mut self, scene: &mut SceneGraph, commands: &mut CommandManager) {
        if let Some(cp) = self.active.take().and_then(|i| self.points.get_mut(i)) {
            cp.on_drag_end(scene, commands);
        }
        self.rebuild(scene);
    }

    pub fn cancel_drag(&mut self, scene: &mut SceneGraph, commands: &mut CommandManager) {
        if let Some(cp) = self.active.take().and_then(|i| self.points.get_mut(i)) {
            cp.on_drag_cancel(scene, commands);
        }
        self.rebuild(scene);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vd_core::{NodeKind, SceneNode};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn scene_with_rect(name: &str, transform: Affine, size: Size) -> (SceneGraph, NodeId) {
        let mut scene = SceneGraph::new();
        let root = scene.root_id();
        let id = NodeId::intern(name);
        let mut node = SceneNode::new(id, NodeKind::Rectangle { corner_radius: 0.0 });
        node.attrs.transform = transform;
        node.attrs.size = size;
        scene.register_node(root, 0, node).unwrap();
        scene.add_selection(id);
        (scene, id)
    }

    fn handle(manager: &ControlPointManager, kind: HandleKind) -> usize {
        manager
            .control_points()
            .iter()
            .position(|cp| cp.kind() == kind)
            .unwrap()
    }

    #[test]
    fn anchors_and_opposites() {
        assert_eq!(ResizeHandle::SE.anchor(), Point::new(1.0, 1.0));
        assert_eq!(ResizeHandle::SE.fixed(), ResizeHandle::NW);
        assert_eq!(ResizeHandle::N.fixed(), ResizeHandle::S);
        for h in ResizeHandle::CORNERS.into_iter().chain(ResizeHandle::EDGES) {
            assert_eq!(h.fixed().fixed(), h);
        }
    }

    #[test]
    fn rebuild_counts() {
        let (mut scene, id) = scene_with_rect("cp_count", Affine::IDENTITY, Size::new(10.0, 10.0));
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);
        assert_eq!(manager.len(), 12);

        scene.clear_selection();
        manager.rebuild(&scene);
        assert!(manager.is_empty());

        scene.add_selection(scene.root_id());
        manager.rebuild(&scene);
        assert!(manager.is_empty(), "the document has no handles");

        scene.clear_selection();
        scene
            .update_node_property(id, &AttrPatch {
                locked: Some(true),
                ..Default::default()
            })
            .unwrap();
        scene.add_selection(id);
        manager.rebuild(&scene);
        assert!(manager.is_empty(), "locked nodes have no handles");
    }

    #[test]
    fn cursor_degrees_follow_rotation() {
        let (scene, _) = scene_with_rect("cp_cursor", Affine::IDENTITY, Size::new(10.0, 10.0));
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);
        let e = &manager.control_points()[handle(&manager, HandleKind::Resize(ResizeHandle::E))];
        assert_eq!(e.get_cursor(), Cursor::Resize { degree: 0.0 });
        let s = &manager.control_points()[handle(&manager, HandleKind::Resize(ResizeHandle::S))];
        assert!(matches!(s.get_cursor(), Cursor::Resize { degree } if approx(degree, 90.0)));
        let w = &manager.control_points()[handle(&manager, HandleKind::Resize(ResizeHandle::W))];
        assert_eq!(w.get_cursor(), Cursor::Resize { degree: 0.0 });

        let (scene, _) = scene_with_rect(
            "cp_cursor_rot",
            Affine::rotate(std::f64::consts::FRAC_PI_2),
            Size::new(10.0, 10.0),
        );
        manager.rebuild(&scene);
        let e = &manager.control_points()[handle(&manager, HandleKind::Resize(ResizeHandle::E))];
        let Cursor::Resize { degree } = e.get_cursor() else {
            panic!("expected a resize cursor");
        };
        assert!(approx(degree, 90.0), "got {degree}");
    }

    #[test]
    fn rotate_ring_excludes_shape() {
        let (scene, _) = scene_with_rect("cp_ring", Affine::IDENTITY, Size::new(100.0, 100.0));
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);
        let view = ViewState::default();
        let config = EditorConfig::default();
        let ring = &manager.control_points()[handle(&manager, HandleKind::Rotate(RotateHandle::SE))];
        assert!(ring.hit_test(Point::new(110.0, 110.0), &view, &config));
        assert!(!ring.hit_test(Point::new(95.0, 95.0), &view, &config));
        assert!(!ring.hit_test(Point::new(140.0, 140.0), &view, &config));
    }

    #[test]
    fn corner_wins_over_rotate_ring() {
        let (scene, _) = scene_with_rect("cp_order", Affine::IDENTITY, Size::new(100.0, 100.0));
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);
        let view = ViewState::default();
        let config = EditorConfig::default();
        let hit = manager.hit_test(Point::new(102.0, 102.0), &view, &config).unwrap();
        assert_eq!(
            manager.control_points()[hit].kind(),
            HandleKind::Resize(ResizeHandle::SE)
        );
    }

    #[test]
    fn shift_locks_corner_aspect() {
        let (mut scene, id) =
            scene_with_rect("cp_lock", Affine::IDENTITY, Size::new(100.0, 50.0));
        let mut commands = CommandManager::default();
        let config = EditorConfig::default();
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);
        let se = handle(&manager, HandleKind::Resize(ResizeHandle::SE));
        manager.begin_drag(se, &mut scene, &mut commands, Point::new(100.0, 50.0), Modifiers::SHIFT);
        manager.drag(&mut scene, &mut commands, &config, Point::new(300.0, 60.0), Modifiers::SHIFT);
        manager.end_drag(&mut scene, &mut commands);
        assert_eq!(scene.get_node_by_id(id).unwrap().attrs.size, Size::new(300.0, 150.0));
    }

    #[test]
    fn edge_resize_moves_one_axis() {
        let (mut scene, id) =
            scene_with_rect("cp_edge", Affine::translate((10.0, 10.0)), Size::new(100.0, 50.0));
        let mut commands = CommandManager::default();
        let config = EditorConfig::default();
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);
        let w = handle(&manager, HandleKind::Resize(ResizeHandle::W));
        manager.begin_drag(w, &mut scene, &mut commands, Point::new(10.0, 35.0), Modifiers::NONE);
        manager.drag(&mut scene, &mut commands, &config, Point::new(-10.4, 80.0), Modifiers::NONE);
        manager.end_drag(&mut scene, &mut commands);

        let attrs = &scene.get_node_by_id(id).unwrap().attrs;
        // pointer snapped to x = -10
        assert_eq!(attrs.size, Size::new(120.0, 50.0));
        let t = attrs.transform.translation();
        assert!(approx(t.x, -10.0) && approx(t.y, 10.0), "got {t:?}");
    }

    #[test]
    fn dragging_across_the_anchor_flips() {
        let (mut scene, id) =
            scene_with_rect("cp_flip", Affine::IDENTITY, Size::new(100.0, 100.0));
        let mut commands = CommandManager::default();
        let config = EditorConfig::default();
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);
        let e = handle(&manager, HandleKind::Resize(ResizeHandle::E));
        manager.begin_drag(e, &mut scene, &mut commands, Point::new(100.0, 50.0), Modifiers::NONE);
        manager.drag(&mut scene, &mut commands, &config, Point::new(-50.0, 50.0), Modifiers::NONE);
        manager.end_drag(&mut scene, &mut commands);

        assert_eq!(scene.get_node_by_id(id).unwrap().attrs.size, Size::new(50.0, 100.0));
        let area = scene.bounding_area(id);
        assert!(approx(area.left, -50.0) && approx(area.right, 0.0), "got {area:?}");
        assert!(approx(area.top, 0.0) && approx(area.bottom, 100.0), "got {area:?}");
    }

    #[test]
    fn degenerate_drag_changes_nothing() {
        let (mut scene, id) =
            scene_with_rect("cp_degenerate", Affine::IDENTITY, Size::new(100.0, 100.0));
        let before = scene.get_node_by_id(id).unwrap().attrs.clone();
        let mut commands = CommandManager::default();
        let config = EditorConfig::default();
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);
        let e = handle(&manager, HandleKind::Resize(ResizeHandle::E));
        manager.begin_drag(e, &mut scene, &mut commands, Point::new(100.0, 50.0), Modifiers::NONE);
        // collapses the width onto the fixed edge
        assert!(!manager.drag(&mut scene, &mut commands, &config, Point::new(0.0, 50.0), Modifiers::NONE));
        manager.end_drag(&mut scene, &mut commands);
        assert_eq!(scene.get_node_by_id(id).unwrap().attrs, before);
        assert!(!commands.can_undo());
    }

    #[test]
    fn resize_that_rounds_to_zero_width_is_refused() {
        let (mut scene, id) =
            scene_with_rect("cp_sliver", Affine::IDENTITY, Size::new(100.0, 100.0));
        let before = scene.get_node_by_id(id).unwrap().attrs.clone();
        let mut commands = CommandManager::default();
        let config = EditorConfig::default();
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);
        let se = handle(&manager, HandleKind::Resize(ResizeHandle::SE));
        manager.begin_drag(se, &mut scene, &mut commands, Point::new(100.0, 100.0), Modifiers::NONE);
        // 0.004 wide rounds to 0.00 at two decimals
        assert!(!manager.drag(&mut scene, &mut commands, &config, Point::new(0.004, 100.0), Modifiers::NONE));
        manager.end_drag(&mut scene, &mut commands);
        assert_eq!(scene.get_node_by_id(id).unwrap().attrs, before);
        assert!(scene.spatial_index().contains(id));
        assert_eq!(scene.pick_node_at_point(Point::new(1.0, 50.0)), Some(id));

        // the node stays resizable
        let se = handle(&manager, HandleKind::Resize(ResizeHandle::SE));
        manager.begin_drag(se, &mut scene, &mut commands, Point::new(100.0, 100.0), Modifiers::NONE);
        manager.drag(&mut scene, &mut commands, &config, Point::new(80.0, 100.0), Modifiers::NONE);
        manager.end_drag(&mut scene, &mut commands);
        assert_eq!(scene.get_node_by_id(id).unwrap().attrs.size, Size::new(80.0, 100.0));
    }

    #[test]
    fn target_ratio_overrides_current_proportions() {
        let mut scene = SceneGraph::new();
        let root = scene.root_id();
        let id = NodeId::intern("cp_ratio_square");
        let mut node = SceneNode::new(id, NodeKind::Rectangle { corner_radius: 0.0 });
        node.attrs.size = Size::new(100.0, 50.0);
        node.attrs.aspect_ratio_locked = true;
        node.attrs.aspect_ratio = Some(1.0);
        scene.register_node(root, 0, node).unwrap();
        scene.add_selection(id);
        let mut commands = CommandManager::default();
        let config = EditorConfig::default();
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);

        let se = handle(&manager, HandleKind::Resize(ResizeHandle::SE));
        manager.begin_drag(se, &mut scene, &mut commands, Point::new(100.0, 50.0), Modifiers::NONE);
        manager.drag(&mut scene, &mut commands, &config, Point::new(150.0, 60.0), Modifiers::NONE);
        manager.end_drag(&mut scene, &mut commands);
        let attrs = &scene.get_node_by_id(id).unwrap().attrs;
        assert_eq!(attrs.size, Size::new(150.0, 150.0));
        assert_eq!(attrs.transform * Point::ORIGIN, Point::ORIGIN);
    }

    #[test]
    fn corner_cursors_are_diagonal_on_wide_frames() {
        let (scene, _) = scene_with_rect("cp_cursor_wide", Affine::IDENTITY, Size::new(200.0, 50.0));
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);
        let degree_of = |kind| match manager.control_points()[handle(&manager, kind)].get_cursor() {
            Cursor::Resize { degree } | Cursor::Rotate { degree } => degree,
        };
        assert!(approx(degree_of(HandleKind::Resize(ResizeHandle::SE)), 45.0));
        assert!(approx(degree_of(HandleKind::Resize(ResizeHandle::NE)), 135.0));
        assert!(approx(degree_of(HandleKind::Rotate(RotateHandle::SE)), 45.0));
    }

    #[test]
    fn shift_rotate_snaps_resulting_orientation() {
        let center = Point::new(50.0, 50.0);
        let tilted = about(center, Affine::rotate(10f64.to_radians()));
        let (mut scene, id) = scene_with_rect("cp_rotate_abs", tilted, Size::new(100.0, 100.0));
        let mut commands = CommandManager::default();
        let config = EditorConfig::default();
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);
        let ring = handle(&manager, HandleKind::Rotate(RotateHandle::SE));

        // sweep 22°: 10° + 22° lands nearest to 30°
        let sweep = 22f64.to_radians();
        let end = Point::new(50.0 + 100.0 * sweep.cos(), 50.0 + 100.0 * sweep.sin());
        manager.begin_drag(ring, &mut scene, &mut commands, Point::new(150.0, 50.0), Modifiers::SHIFT);
        manager.drag(&mut scene, &mut commands, &config, end, Modifiers::SHIFT);
        manager.end_drag(&mut scene, &mut commands);

        let t = scene.get_node_by_id(id).unwrap().attrs.transform;
        let degree = vd_core::geometry::rotation_degree(t);
        assert!(approx(degree, 30.0), "got {degree}");
        assert!((t * center).distance(center) < 1e-6);
    }

    #[test]
    fn rotate_snaps_with_shift() {
        let (mut scene, id) =
            scene_with_rect("cp_rotate", Affine::IDENTITY, Size::new(100.0, 100.0));
        let mut commands = CommandManager::default();
        let config = EditorConfig::default();
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);
        let ring = handle(&manager, HandleKind::Rotate(RotateHandle::SE));
        // center (50,50); start along +45°, end at 45° + ~50°
        let start = Point::new(110.0, 110.0);
        let angle = 50f64.to_radians() + std::f64::consts::FRAC_PI_4;
        let end = Point::new(50.0 + 80.0 * angle.cos(), 50.0 + 80.0 * angle.sin());
        manager.begin_drag(ring, &mut scene, &mut commands, start, Modifiers::SHIFT);
        assert_eq!(
            scene.selection_dragging_state().map(|s| s.kind),
            Some(DraggingKind::Rotate)
        );
        manager.drag(&mut scene, &mut commands, &config, end, Modifiers::SHIFT);
        manager.end_drag(&mut scene, &mut commands);
        assert_eq!(scene.selection_dragging_state(), None);

        let t = scene.get_node_by_id(id).unwrap().attrs.transform;
        let degree = vd_core::geometry::rotation_degree(t);
        assert!(approx(degree, 45.0), "got {degree}");
        // rotation is about the center
        assert!(approx((t * Point::new(50.0, 50.0)).x, 50.0));
        assert!(approx((t * Point::new(50.0, 50.0)).y, 50.0));
    }

    #[test]
    fn cancel_restores_and_records_nothing() {
        let (mut scene, id) =
            scene_with_rect("cp_cancel", Affine::IDENTITY, Size::new(100.0, 100.0));
        let before = scene.get_node_by_id(id).unwrap().attrs.clone();
        let mut commands = CommandManager::default();
        let config = EditorConfig::default();
        let mut manager = ControlPointManager::new();
        manager.rebuild(&scene);
        let se = handle(&manager, HandleKind::Resize(ResizeHandle::SE));
        manager.begin_drag(se, &mut scene, &mut commands, Point::new(100.0, 100.0), Modifiers::NONE);
        manager.drag(&mut scene, &mut commands, &config, Point::new(150.0, 150.0), Modifiers::NONE);
        manager.drag(&mut scene, &mut commands, &config, Point::new(180.0, 120.0), Modifiers::NONE);
        manager.cancel_drag(&mut scene, &mut commands);
        assert_eq!(scene.get_node_by_id(id).unwrap().attrs, before);
        assert!(!commands.can_undo());
        assert_eq!(scene.selection_dragging_state(), None);
    }
}
