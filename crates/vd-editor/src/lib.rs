pub mod commands;
pub mod config;
pub mod control_points;
pub mod events;
pub mod input;
pub mod operations;
pub mod session;

pub use commands::{Command, CommandError, CommandManager};
pub use config::EditorConfig;
pub use control_points::{
    ControlPoint, ControlPointManager, Cursor, HandleKind, ResizeHandle, RotateHandle,
};
pub use events::{EditorEvent, EventHub, EventKind, SubscriptionId, ToolKind};
pub use input::{Modifiers, PointerButton, PointerEvent};
pub use operations::{
    AddNodeOperation, Operation, RemoveNodeOperation, UpdatePropertyOperation,
    UpdateSelectionOperation,
};
pub use session::Session;
