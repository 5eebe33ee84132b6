//! One editing session: the document, its history, the view and the
//! handles, with pointer routing and change notifications.
//!
//! Every write funnels through operations on the `CommandManager`; the
//! session never edits nodes directly. Dirty flags raised by the scene are
//! drained once at the end of each public call and turned into events.
//!
//! ## Select tool
//!
//! | Input | Effect |
//! |-------|--------|
//! | Press on a handle | Resize / rotate drag |
//! | Press on a node | Select it (Shift toggles), then move drag |
//! | Press on empty space | Clear (unless Shift), then marquee |
//! | **Shift** while moving | Constrain to the dominant axis |

use crate::commands::{Command, CommandManager};
use crate::config::EditorConfig;
use crate::control_points::{ControlPointManager, Cursor};
use crate::events::{EditorEvent, EventHub, EventKind, SubscriptionId, ToolKind};
use crate::input::{Modifiers, PointerButton, PointerEvent};
use crate::operations::{AddNodeOperation, UpdatePropertyOperation, UpdateSelectionOperation};
use vd_core::geometry::invert;
use vd_core::{
    Affine, AttrPatch, BoundingArea, DraggingKind, NodeId, Point, SceneGraph, SceneNode,
    SelectionDraggingState, Vec2, ViewState,
};

/// Smallest rectangle the rectangle tool will create, in scene units.
const MIN_DRAW_SIZE: f64 = 1.0;

#[derive(Debug, Clone)]
struct MoveTarget {
    id: NodeId,
    world: Affine,
    parent_world: Affine,
}

/// Pointer gesture in progress.
#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    /// A control point owns the drag.
    Handle,
    Move {
        start: Point,
        targets: Vec<MoveTarget>,
    },
    Marquee {
        start: Point,
        current: Point,
        additive: bool,
    },
    Draw {
        start: Point,
        current: Point,
    },
    Pan {
        last: Point,
    },
}

pub struct Session {
    scene: SceneGraph,
    commands: CommandManager,
    view: ViewState,
    control_points: ControlPointManager,
    active_tool: ToolKind,
    config: EditorConfig,
    events: EventHub,
    gesture: Gesture,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("nodes", &self.scene.len())
            .field("selected", &self.scene.selection_len())
            .field("undo", &self.commands.undo_len())
            .field("tool", &self.active_tool)
            .field("gesture", &self.gesture)
            .finish()
    }
}

impl Session {
    /// Start a session on an empty document.
    pub fn new(config: EditorConfig) -> Self {
        Self::with_scene(SceneGraph::new(), config)
    }

    /// Start a session on an existing scene graph.
    pub fn with_scene(scene: SceneGraph, config: EditorConfig) -> Self {
        let mut session = Self {
            scene,
            commands: CommandManager::new(config.max_undo_depth),
            view: ViewState::default(),
            control_points: ControlPointManager::new(),
            active_tool: ToolKind::default(),
            config,
            events: EventHub::new(),
            gesture: Gesture::Idle,
        };
        session.control_points.rebuild(&session.scene);
        session.scene.take_dirty();
        session
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn commands(&self) -> &CommandManager {
        &self.commands
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn control_points(&self) -> &ControlPointManager {
        &self.control_points
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn active_tool(&self) -> ToolKind {
        self.active_tool
    }

    /// Scene-space marquee rectangle while one is being dragged.
    pub fn marquee(&self) -> Option<BoundingArea> {
        match &self.gesture {
            Gesture::Marquee { start, current, .. } => {
                Some(BoundingArea::from_points([*start, *current]))
            }
            _ => None,
        }
    }

    // ─── Observers ───────────────────────────────────────────────────────

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&EditorEvent) + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(kind, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Drain the scene's dirty flags into events and refresh the handles.
    pub fn flush(&mut self) {
        let dirty = self.scene.take_dirty();
        if !dirty.any() {
            return;
        }
        self.control_points.rebuild(&self.scene);
        if dirty.layout {
            self.events
                .emit(&EditorEvent::LayoutDirty { area: dirty.area });
        }
        if dirty.selection {
            self.events.emit(&EditorEvent::SelectionChange {
                selected: self.scene.selections_copy(),
            });
        }
    }

    // ─── Commands ────────────────────────────────────────────────────────

    pub fn execute_command(&mut self, command: Command) {
        self.commands.execute_command(&mut self.scene, command);
        self.flush();
    }

    pub fn undo(&mut self) -> Option<String> {
        self.cancel_drag();
        let desc = self.commands.undo(&mut self.scene);
        self.flush();
        desc
    }

    pub fn redo(&mut self) -> Option<String> {
        self.cancel_drag();
        let desc = self.commands.redo(&mut self.scene);
        self.flush();
        desc
    }

    /// Replace the selection as one undo step. Returns whether it changed;
    /// an unchanged selection records nothing.
    pub fn select(&mut self, ids: impl IntoIterator<Item = NodeId>) -> bool {
        let op = UpdateSelectionOperation::new(ids);
        if same_set(op.target(), &self.scene.selections_copy()) {
            return false;
        }
        self.commands
            .execute_command(&mut self.scene, Command::new("select").with(op));
        self.flush();
        true
    }

    // ─── View & tool ─────────────────────────────────────────────────────

    pub fn set_view(&mut self, view: ViewState) {
        if self.view == view {
            return;
        }
        self.view = view;
        self.events
            .emit(&EditorEvent::ViewSpaceMetaChange { view: self.view });
    }

    pub fn zoom_at(&mut self, screen_point: Point, zoom: f64) {
        let mut view = self.view;
        view.zoom_at(screen_point, zoom);
        self.set_view(view);
    }

    pub fn scroll_by(&mut self, screen_delta: Vec2) {
        let mut view = self.view;
        view.scroll_by(screen_delta);
        self.set_view(view);
    }

    pub fn set_active_tool(&mut self, tool: ToolKind) {
        if self.active_tool == tool {
            return;
        }
        self.cancel_drag();
        self.active_tool = tool;
        log::debug!("active tool: {tool:?}");
        self.events.emit(&EditorEvent::ActiveToolChange { tool });
    }

    // ─── Pointer routing ─────────────────────────────────────────────────

    /// Returns whether the press started a gesture.
    pub fn pointer_down(&mut self, event: &PointerEvent) -> bool {
        if !matches!(self.gesture, Gesture::Idle) {
            self.cancel_drag();
        }
        if event.button != PointerButton::Primary {
            return false;
        }
        let point = self.view.screen_to_scene(event.position);
        match self.active_tool {
            ToolKind::Select => self.select_down(point, event.modifiers),
            ToolKind::Rectangle => {
                self.gesture = Gesture::Draw {
                    start: point,
                    current: point,
                };
            }
            ToolKind::Hand => {
                self.gesture = Gesture::Pan {
                    last: event.position,
                };
            }
        }
        self.flush();
        !matches!(self.gesture, Gesture::Idle)
    }

    fn select_down(&mut self, point: Point, modifiers: Modifiers) {
        if let Some(index) = self
            .control_points
            .hit_test(point, &self.view, &self.config)
        {
            self.control_points.begin_drag(
                index,
                &mut self.scene,
                &mut self.commands,
                point,
                modifiers,
            );
            self.gesture = Gesture::Handle;
            return;
        }

        let Some(hit) = self.scene.pick_node_at_point(point) else {
            if !modifiers.shift {
                self.select(Vec::new());
            }
            self.gesture = Gesture::Marquee {
                start: point,
                current: point,
                additive: modifiers.shift,
            };
            return;
        };

        let mut selection = self.scene.selections_copy();
        if modifiers.shift {
            if let Some(pos) = selection.iter().position(|id| *id == hit) {
                selection.remove(pos);
            } else {
                selection.push(hit);
            }
        } else if !selection.contains(&hit) {
            selection = vec![hit];
        }
        self.select(selection);

        let selected = self.scene.selections_copy();
        let targets: Vec<MoveTarget> = selected
            .iter()
            .copied()
            .filter(|id| !self.scene.ancestors(*id).iter().any(|a| selected.contains(a)))
            .filter(|id| self.scene.get_node_by_id(*id).is_some_and(|n| !n.attrs.locked))
            .map(|id| MoveTarget {
                id,
                world: self.scene.world_transform(id),
                parent_world: self.scene.parent_world_transform(id),
            })
            .collect();
        if targets.is_empty() {
            return;
        }
        self.commands.begin("move");
        self.scene
            .set_selection_dragging_state(Some(SelectionDraggingState {
                kind: DraggingKind::Move,
                shift_key: modifiers.shift,
                alt_key: modifiers.alt,
            }));
        self.gesture = Gesture::Move {
            start: point,
            targets,
        };
    }

    /// Advance the current gesture, or update hover when idle. Returns the
    /// cursor to show.
    pub fn pointer_move(&mut self, event: &PointerEvent) -> Option<Cursor> {
        let point = self.view.screen_to_scene(event.position);
        let modifiers = event.modifiers;
        let mut cursor = None;
        let mut pan = None;
        match &mut self.gesture {
            Gesture::Idle => {
                if self.active_tool == ToolKind::Select {
                    cursor = self
                        .control_points
                        .cursor_at(point, &self.view, &self.config);
                    let hover = self.scene.pick_node_at_point(point);
                    self.scene.set_hover_node(hover);
                }
            }
            Gesture::Handle => {
                self.control_points.drag(
                    &mut self.scene,
                    &mut self.commands,
                    &self.config,
                    point,
                    modifiers,
                );
            }
            Gesture::Move { start, targets } => {
                let mut delta = point - *start;
                if modifiers.shift {
                    if delta.x.abs() > delta.y.abs() {
                        delta.y = 0.0;
                    } else {
                        delta.x = 0.0;
                    }
                }
                let shift = Affine::translate(delta);
                let ops: Vec<UpdatePropertyOperation> = targets
                    .iter()
                    .filter_map(|t| {
                        let inv = invert(t.parent_world)?;
                        Some(UpdatePropertyOperation::new(
                            t.id,
                            AttrPatch::transform(inv * shift * t.world),
                        ))
                    })
                    .collect();
                for op in ops {
                    self.commands.append(&mut self.scene, op);
                }
            }
            Gesture::Marquee { current, .. } | Gesture::Draw { current, .. } => {
                *current = point;
            }
            Gesture::Pan { last } => {
                pan = Some(event.position - *last);
                *last = event.position;
            }
        }
        if let Some(delta) = pan {
            // dragging the canvas moves the content with the pointer
            self.scroll_by(delta);
        }
        self.flush();
        cursor
    }

    /// Finish the current gesture.
    pub fn pointer_up(&mut self, event: &PointerEvent) {
        let point = self.view.screen_to_scene(event.position);
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle | Gesture::Pan { .. } => {}
            Gesture::Handle => {
                self.control_points
                    .end_drag(&mut self.scene, &mut self.commands);
            }
            Gesture::Move { .. } => {
                self.commands.commit();
                self.scene.set_selection_dragging_state(None);
            }
            Gesture::Marquee {
                start, additive, ..
            } => {
                let area = BoundingArea::from_points([start, point]);
                let mut ids = if additive {
                    self.scene.selections_copy()
                } else {
                    Vec::new()
                };
                ids.extend(self.scene.pick_nodes_in_range(&area));
                self.select(ids);
            }
            Gesture::Draw { start, .. } => {
                self.draw_rectangle(start, point, event.modifiers);
            }
        }
        self.flush();
    }

    /// Abandon the current gesture, reverting any live changes.
    pub fn cancel_drag(&mut self) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Handle => {
                self.control_points
                    .cancel_drag(&mut self.scene, &mut self.commands);
            }
            Gesture::Move { .. } => {
                self.commands.discard(&mut self.scene);
                self.scene.set_selection_dragging_state(None);
            }
            _ => {}
        }
        self.flush();
    }

    fn draw_rectangle(&mut self, start: Point, end: Point, modifiers: Modifiers) {
        let mut w = (end.x - start.x).abs();
        let mut h = (end.y - start.y).abs();
        // Shift: square
        if modifiers.shift {
            let side = w.max(h);
            w = side;
            h = side;
        }
        if w < MIN_DRAW_SIZE || h < MIN_DRAW_SIZE {
            return;
        }
        let x = if end.x < start.x { start.x - w } else { start.x };
        let y = if end.y < start.y { start.y - h } else { start.y };
        let node = SceneNode::rectangle(x, y, w, h);
        let id = node.id;
        let index = self.scene.children(self.scene.root_id()).len();
        let command = Command::new("draw rectangle")
            .with(AddNodeOperation::new(&[index], node))
            .with(UpdateSelectionOperation::new([id]));
        self.commands.execute_command(&mut self.scene, command);
    }
}

fn same_set(a: &[NodeId], b: &[NodeId]) -> bool {
    a.len() == b.len() && a.iter().all(|id| b.contains(id))
}
