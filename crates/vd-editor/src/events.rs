//! Change notifications for the presentation layer.
//!
//! Observers register per event kind and are called synchronously in
//! registration order. Unsubscribing is idempotent.

use vd_core::{BoundingArea, NodeId, ViewState};

/// Which tool interprets pointer input outside control-point drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Rectangle,
    Hand,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Layout or geometry changed; `area` is the scene region to redraw.
    LayoutDirty { area: BoundingArea },
    SelectionChange { selected: Vec<NodeId> },
    ViewSpaceMetaChange { view: ViewState },
    ActiveToolChange { tool: ToolKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    LayoutDirty,
    SelectionChange,
    ViewSpaceMetaChange,
    ActiveToolChange,
}

impl EditorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EditorEvent::LayoutDirty { .. } => EventKind::LayoutDirty,
            EditorEvent::SelectionChange { .. } => EventKind::SelectionChange,
            EditorEvent::ViewSpaceMetaChange { .. } => EventKind::ViewSpaceMetaChange,
            EditorEvent::ActiveToolChange { .. } => EventKind::ActiveToolChange,
        }
    }
}

/// Handle returned by `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&EditorEvent)>;

/// Ordered observer list.
#[derive(Default)]
pub struct EventHub {
    next_id: u64,
    observers: Vec<(SubscriptionId, EventKind, Handler)>,
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&EditorEvent) + 'static,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.observers.push((id, kind, Box::new(handler)));
        id
    }

    /// Remove an observer. Returns whether it was still registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _, _)| *sub != id);
        self.observers.len() != before
    }

    pub fn emit(&mut self, event: &EditorEvent) {
        let kind = event.kind();
        for (_, _, handler) in self.observers.iter_mut().filter(|(_, k, _)| *k == kind) {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
