//! Undo/Redo commands.
//!
//! A `Command` is an ordered batch of operations that forms one undo step.
//! It is *open* while operations are being appended and *complete* once
//! sealed; appending to a complete command is a programming error.
//!
//! The `CommandManager` keeps the undo and redo stacks. Drag gestures open a
//! command with `begin`, apply every intermediate operation live through
//! `append`, and seal it with `commit`. The whole gesture then undoes in one
//! step. `discard` cancels a gesture by undoing what was applied.

use crate::operations::Operation;
use thiserror::Error;
use vd_core::SceneGraph;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command \"{0}\" is already complete")]
    Completed(String),
}

/// An ordered, append-only batch of operations.
#[derive(Debug, Clone)]
pub struct Command {
    description: String,
    operations: Vec<Operation>,
    complete: bool,
}

impl Command {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            operations: Vec::new(),
            complete: false,
        }
    }

    /// Append an operation.
    ///
    /// # Panics
    /// Panics if the command is already complete.
    pub fn add(&mut self, op: impl Into<Operation>) -> &mut Self {
        if let Err(err) = self.try_add(op) {
            panic!("{err}");
        }
        self
    }

    /// Append an operation, refusing if the command is complete.
    pub fn try_add(&mut self, op: impl Into<Operation>) -> Result<(), CommandError> {
        if self.complete {
            return Err(CommandError::Completed(self.description.clone()));
        }
        self.operations.push(op.into());
        Ok(())
    }

    /// Builder-style `add`.
    pub fn with(mut self, op: impl Into<Operation>) -> Self {
        self.add(op);
        self
    }

    /// Seal the command. Idempotent.
    pub fn complete(&mut self) {
        self.complete = true;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Execute every operation in append order.
    fn execute_all(&mut self, scene: &mut SceneGraph) {
        for op in &mut self.operations {
            op.execute(scene);
        }
    }

    /// Undo every operation in reverse order.
    fn undo_all(&mut self, scene: &mut SceneGraph) {
        for op in self.operations.iter_mut().rev() {
            op.undo(scene);
        }
    }
}

/// Undo/redo stacks plus at most one open command.
#[derive(Debug)]
pub struct CommandManager {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Command accepting live operations (drag gesture in progress).
    open: Option<Command>,
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new(100)
    }
}

impl CommandManager {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(128)),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            open: None,
        }
    }

    /// Execute all of `command`'s operations in order, seal it, and push it
    /// onto the undo stack. Clears the redo stack.
    pub fn execute_command(&mut self, scene: &mut SceneGraph, mut command: Command) {
        log::debug!(
            "execute \"{}\" ({} operations)",
            command.description,
            command.len()
        );
        command.execute_all(scene);
        command.complete();
        self.push_undo(command);
    }

    /// Undo the last command. Returns its description.
    pub fn undo(&mut self, scene: &mut SceneGraph) -> Option<String> {
        let mut command = self.undo_stack.pop()?;
        log::debug!("undo \"{}\"", command.description);
        command.undo_all(scene);
        let desc = command.description.clone();
        self.redo_stack.push(command);
        Some(desc)
    }

    /// Redo the last undone command. Returns its description.
    pub fn redo(&mut self, scene: &mut SceneGraph) -> Option<String> {
        let mut command = self.redo_stack.pop()?;
        log::debug!("redo \"{}\"", command.description);
        command.execute_all(scene);
        let desc = command.description.clone();
        self.undo_stack.push(command);
        Some(desc)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    // ─── Open command (live gesture) ─────────────────────────────────────

    /// Open a command for live operations. An already open command is
    /// committed first.
    pub fn begin(&mut self, description: &str) {
        if self.open.is_some() {
            log::warn!("begin \"{description}\" while a command is open; committing it");
            self.commit();
        }
        self.open = Some(Command::new(description));
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Execute `op` against the live scene and record it in the open
    /// command. Without an open command the operation becomes its own
    /// one-step command.
    pub fn append(&mut self, scene: &mut SceneGraph, op: impl Into<Operation>) -> bool {
        let mut op = op.into();
        let applied = op.execute(scene);
        if let Some(command) = self.open.as_mut() {
            command.add(op);
        } else {
            let mut command = Command::new(op.label());
            command.add(op);
            command.complete();
            self.push_undo(command);
        }
        applied
    }

    /// Seal the open command and push it. Empty commands are dropped.
    /// Returns whether an undo step was recorded.
    pub fn commit(&mut self) -> bool {
        let Some(mut command) = self.open.take() else {
            return false;
        };
        if command.is_empty() {
            return false;
        }
        log::debug!(
            "commit \"{}\" ({} operations)",
            command.description,
            command.len()
        );
        command.complete();
        self.push_undo(command);
        true
    }

    /// Cancel the open command: undo its live operations in reverse order
    /// and drop it.
    pub fn discard(&mut self, scene: &mut SceneGraph) {
        if let Some(mut command) = self.open.take() {
            log::debug!("discard \"{}\"", command.description);
            command.undo_all(scene);
        }
    }

    fn push_undo(&mut self, command: Command) {
        self.undo_stack.push(command);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // Clear redo stack on new action
        self.redo_stack.clear();
    }
}
