//! Command groups
//!
//! A [`CommandGroup`] is a composite [`ReversibleCommand`]: an ordered list of
//! children (possibly groups themselves) that is applied, undone and redone as
//! one all-or-nothing unit. If any child fails, the children that already ran
//! are rolled back before the error is returned.
//!
//! A group is usually built through a [`Transaction`](crate::Transaction), where
//! each appended child runs immediately. A group that was never executed only
//! records its children; they run when the group itself is executed (for example
//! when it is pushed with [`CommandHistory::push_command`](crate::CommandHistory::push_command)).

use std::fmt;

use tracing::{debug, trace, warn};

use crate::command::{ExecutionState, ReversibleCommand, TrackedCommand};
use crate::error::{CommandError, HistoryResult, IllegalState};

/// An ordered, atomic sequence of child commands.
pub struct CommandGroup {
    label: String,
    children: Vec<TrackedCommand>,
    executed: bool,
    reverted: bool,
}

impl CommandGroup {
    /// Create an empty group.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
            executed: false,
            reverted: false,
        }
    }

    /// Number of retained children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the group has no children (and therefore does nothing).
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Labels of the children in execution order.
    pub fn child_labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.children.iter().map(TrackedCommand::label)
    }

    /// Whether the group has been reverted at least once.
    pub fn was_reverted(&self) -> bool {
        self.reverted
    }

    /// Add a child at the end of the group.
    ///
    /// If the group has already been executed the child is executed right
    /// away. A child reporting "nothing to do" is dropped and `Ok(false)` is
    /// returned. If the child fails, every child appended before it is undone
    /// (last first), the group becomes rolled back, and the child's error is
    /// returned. If undoing the earlier children fails too, an
    /// [`unrecoverable`](CommandError::is_unrecoverable) error is returned
    /// instead.
    pub fn append_child(&mut self, command: Box<dyn ReversibleCommand>) -> HistoryResult<bool> {
        if self.reverted {
            return Err(IllegalState::GroupRolledBack.into());
        }

        let mut child = TrackedCommand::new(command);
        if !self.executed {
            trace!(group = %self.label, child = child.label(), "child recorded");
            self.children.push(child);
            return Ok(true);
        }

        match child.execute() {
            Ok(true) => {
                trace!(
                    group = %self.label,
                    child = child.label(),
                    children = self.children.len() + 1,
                    "child appended"
                );
                self.children.push(child);
                Ok(true)
            }
            Ok(false) => {
                debug!(group = %self.label, child = child.label(), "no-op child discarded");
                Ok(false)
            }
            Err(err) => {
                self.reverted = true;
                if err.is_unrecoverable() {
                    return Err(err.into());
                }
                warn!(
                    group = %self.label,
                    child = child.label(),
                    error = %err,
                    "child failed, rolling back group"
                );
                let applied = self.children.len();
                let recovery = self.revert_prefix(applied, "rollback after failed append in");
                Err(recovered_or(err, recovery).into())
            }
        }
    }

    /// Undo the applied children in `[0, end)`, last first.
    fn revert_prefix(&mut self, end: usize, context: &str) -> Result<(), CommandError> {
        for child in self.children[..end].iter_mut().rev() {
            if child.state() != ExecutionState::Applied {
                continue;
            }
            if let Err(err) = child.undo() {
                return Err(CommandError::unrecoverable(context, &self.label, err));
            }
        }
        Ok(())
    }

    /// Redo the reverted children in `[start, len)`, first first.
    fn reapply_suffix(&mut self, start: usize, context: &str) -> Result<(), CommandError> {
        for child in self.children[start..].iter_mut() {
            if child.state() != ExecutionState::Reverted {
                continue;
            }
            if let Err(err) = child.redo() {
                return Err(CommandError::unrecoverable(context, &self.label, err));
            }
        }
        Ok(())
    }
}

/// The error to report once recovery from `cause` has run.
fn recovered_or(cause: CommandError, recovery: Result<(), CommandError>) -> CommandError {
    match recovery {
        Ok(()) => cause,
        Err(unrecoverable) => unrecoverable,
    }
}

impl ReversibleCommand for CommandGroup {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(&mut self) -> Result<bool, CommandError> {
        let mut modified = false;
        for index in 0..self.children.len() {
            match self.children[index].execute() {
                Ok(changed) => modified |= changed,
                Err(err) if err.is_unrecoverable() => return Err(err),
                Err(err) => {
                    warn!(group = %self.label, index, error = %err, "child execute failed");
                    let recovery = self.revert_prefix(index, "rollback after failed execute of");
                    return Err(recovered_or(err, recovery));
                }
            }
        }
        self.executed = true;
        Ok(modified)
    }

    fn undo(&mut self) -> Result<(), CommandError> {
        for index in (0..self.children.len()).rev() {
            if let Err(err) = self.children[index].undo() {
                if err.is_unrecoverable() {
                    return Err(err);
                }
                warn!(group = %self.label, index, error = %err, "child undo failed");
                let recovery = self.reapply_suffix(index + 1, "restore after failed undo of");
                return Err(recovered_or(err, recovery));
            }
        }
        self.reverted = true;
        Ok(())
    }

    fn redo(&mut self) -> Result<(), CommandError> {
        for index in 0..self.children.len() {
            if let Err(err) = self.children[index].redo() {
                if err.is_unrecoverable() {
                    return Err(err);
                }
                warn!(group = %self.label, index, error = %err, "child redo failed");
                let recovery = self.revert_prefix(index, "rollback after failed redo of");
                return Err(recovered_or(err, recovery));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandGroup")
            .field("label", &self.label)
            .field("children", &self.children)
            .field("executed", &self.executed)
            .field("reverted", &self.reverted)
            .finish()
    }
}
