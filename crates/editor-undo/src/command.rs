//! Reversible commands
//!
//! A [`ReversibleCommand`] is one semantically atomic, invertible edit with a
//! label for the undo/redo menu. Editor tools implement it for their concrete
//! edits (move a symbol, add a trace, ...) and hand instances to a
//! [`CommandHistory`](crate::CommandHistory) or a [`CommandGroup`](crate::CommandGroup),
//! which take ownership.
//!
//! # Example
//!
//! ```rust
//! use editor_undo::{CommandError, CommandHistory, ReversibleCommand};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! struct SetWidth {
//!     width: Rc<RefCell<u32>>,
//!     new: u32,
//!     old: u32,
//! }
//!
//! impl ReversibleCommand for SetWidth {
//!     fn label(&self) -> &str {
//!         "Set Trace Width"
//!     }
//!
//!     fn execute(&mut self) -> Result<bool, CommandError> {
//!         self.old = *self.width.borrow();
//!         if self.old == self.new {
//!             return Ok(false);
//!         }
//!         *self.width.borrow_mut() = self.new;
//!         Ok(true)
//!     }
//!
//!     fn undo(&mut self) -> Result<(), CommandError> {
//!         *self.width.borrow_mut() = self.old;
//!         Ok(())
//!     }
//!
//!     fn redo(&mut self) -> Result<(), CommandError> {
//!         *self.width.borrow_mut() = self.new;
//!         Ok(())
//!     }
//! }
//!
//! let width = Rc::new(RefCell::new(10));
//! let mut history = CommandHistory::new();
//!
//! let changed = history
//!     .push_command(SetWidth { width: width.clone(), new: 25, old: 0 })
//!     .unwrap();
//! assert!(changed);
//! assert_eq!(*width.borrow(), 25);
//!
//! history.undo().unwrap();
//! assert_eq!(*width.borrow(), 10);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CommandError;

/// An invertible edit.
///
/// The engine guarantees the calling protocol: `execute` exactly once first,
/// then alternating `undo` and `redo`. Implementations only have to make
/// `undo` exactly reverse `execute`/`redo`.
pub trait ReversibleCommand: Any {
    /// Text shown in the undo/redo menu.
    fn label(&self) -> &str;

    /// Apply the edit for the first time.
    ///
    /// Returns `Ok(false)` if there was nothing to do; the caller then
    /// discards the command instead of recording it. On `Err` the command
    /// must not have changed anything.
    fn execute(&mut self) -> Result<bool, CommandError>;

    /// Reverse a previously applied edit.
    ///
    /// Failure here means the history can no longer be trusted.
    fn undo(&mut self) -> Result<(), CommandError>;

    /// Re-apply an edit that was undone. Same failure contract as `undo`.
    fn redo(&mut self) -> Result<(), CommandError>;

    /// Try to absorb a newer, already executed command into this one.
    ///
    /// Returning `true` means `self.undo()` now also reverses `newer`'s edit
    /// and `newer` will be dropped. Use `(newer as &dyn Any).downcast_ref`
    /// to inspect it. The default never merges.
    fn merge(&mut self, newer: &dyn ReversibleCommand) -> bool {
        let _ = newer;
        false
    }
}

impl fmt::Debug for dyn ReversibleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReversibleCommand")
            .field("label", &self.label())
            .finish_non_exhaustive()
    }
}

/// Where a tracked command is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionState {
    /// Accepted but never executed.
    Pending,
    /// Its edit is currently applied (after `execute` or `redo`).
    Applied,
    /// Its edit has been undone.
    Reverted,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionState::Pending => "never executed",
            ExecutionState::Applied => "applied",
            ExecutionState::Reverted => "reverted",
        })
    }
}

/// Process-unique identity of a command accepted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(u64);

impl CommandId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        CommandId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A command owned by the engine together with its execution state.
///
/// The state check refuses out-of-protocol calls instead of forwarding them.
pub(crate) struct TrackedCommand {
    id: CommandId,
    /// Content revision, bumped by every merge.
    revision: u64,
    state: ExecutionState,
    command: Box<dyn ReversibleCommand>,
}

impl TrackedCommand {
    pub(crate) fn new(command: Box<dyn ReversibleCommand>) -> Self {
        Self {
            id: CommandId::next(),
            revision: 0,
            state: ExecutionState::Pending,
            command,
        }
    }

    /// Wraps a command that its owner already executed, starting at
    /// `revision`.
    pub(crate) fn applied(
        command: Box<dyn ReversibleCommand>,
        id: CommandId,
        revision: u64,
    ) -> Self {
        Self {
            id,
            revision,
            state: ExecutionState::Applied,
            command,
        }
    }

    pub(crate) fn id(&self) -> CommandId {
        self.id
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn state(&self) -> ExecutionState {
        self.state
    }

    pub(crate) fn label(&self) -> &str {
        self.command.label()
    }

    pub(crate) fn command(&self) -> &dyn ReversibleCommand {
        self.command.as_ref()
    }

    pub(crate) fn execute(&mut self) -> Result<bool, CommandError> {
        self.expect_state(ExecutionState::Pending, "executed")?;
        let modified = self.command.execute()?;
        self.state = ExecutionState::Applied;
        Ok(modified)
    }

    pub(crate) fn undo(&mut self) -> Result<(), CommandError> {
        self.expect_state(ExecutionState::Applied, "undone")?;
        self.command.undo()?;
        self.state = ExecutionState::Reverted;
        Ok(())
    }

    pub(crate) fn redo(&mut self) -> Result<(), CommandError> {
        self.expect_state(ExecutionState::Reverted, "redone")?;
        self.command.redo()?;
        self.state = ExecutionState::Applied;
        Ok(())
    }

    /// Offers `newer` to this command's merge hook. Only applied commands merge.
    pub(crate) fn merge(&mut self, newer: &dyn ReversibleCommand) -> bool {
        if self.state != ExecutionState::Applied || !self.command.merge(newer) {
            return false;
        }
        self.revision += 1;
        true
    }

    fn expect_state(&self, expected: ExecutionState, verb: &str) -> Result<(), CommandError> {
        if self.state == expected {
            return Ok(());
        }
        Err(CommandError::new(format!(
            "`{}` cannot be {verb}: it is {}",
            self.command.label(),
            self.state
        )))
    }
}

impl fmt::Debug for TrackedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedCommand")
            .field("id", &self.id)
            .field("label", &self.label())
            .field("state", &self.state)
            .field("revision", &self.revision)
            .finish()
    }
}
