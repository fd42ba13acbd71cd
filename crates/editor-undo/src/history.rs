//! Command history
//!
//! [`CommandHistory`] owns the linear sequence of committed commands, the
//! cursor splitting it into undoable (`< current`) and redoable (`>= current`)
//! halves, the saved ("clean") position, and at most one open
//! [`CommandGroup`].
//!
//! # State machine
//!
//! ```text
//!            begin_group
//!   Idle ─────────────────► GroupOpen
//!    ▲                          │
//!    └──── commit_group ────────┤
//!    └──── abort_group  ────────┘
//! ```
//!
//! `push_command`, `undo` and `redo` are only accepted while idle;
//! `append_to_group`, `commit_group` and `abort_group` only while a group is
//! open. If undoing or redoing a committed command fails, or a rollback after
//! a failure fails (including one inside a group), the history is marked
//! corrupted and the call panics: nobody can tell any more which edits are
//! applied.
//!
//! # Example
//!
//! ```rust
//! use editor_undo::{CommandError, CommandHistory, ReversibleCommand};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! struct AddPart {
//!     board: Rc<RefCell<Vec<String>>>,
//!     name: String,
//! }
//!
//! impl ReversibleCommand for AddPart {
//!     fn label(&self) -> &str {
//!         "Add Part"
//!     }
//!     fn execute(&mut self) -> Result<bool, CommandError> {
//!         self.board.borrow_mut().push(self.name.clone());
//!         Ok(true)
//!     }
//!     fn undo(&mut self) -> Result<(), CommandError> {
//!         self.board.borrow_mut().pop();
//!         Ok(())
//!     }
//!     fn redo(&mut self) -> Result<(), CommandError> {
//!         self.execute().map(|_| ())
//!     }
//! }
//!
//! let board = Rc::new(RefCell::new(Vec::new()));
//! let mut history = CommandHistory::new();
//!
//! history.push_command(AddPart { board: board.clone(), name: "R1".into() }).unwrap();
//! history.push_command(AddPart { board: board.clone(), name: "C1".into() }).unwrap();
//! assert_eq!(history.undo_label(), Some("Add Part"));
//!
//! history.undo().unwrap();
//! assert_eq!(*board.borrow(), ["R1"]);
//! assert!(history.can_redo());
//! assert!(!history.is_clean());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::{debug, trace, warn};

use crate::command::{CommandId, ExecutionState, ReversibleCommand, TrackedCommand};
use crate::config::HistoryConfig;
use crate::error::{CommandError, HistoryError, HistoryResult, IllegalState, corrupted};
use crate::group::CommandGroup;
use crate::state::{HistoryChange, HistoryChangeKind, Observers, UndoRedoState};
use crate::transaction::Transaction;

/// A group being built. It logically sits at index `current`.
struct OpenGroup {
    id: CommandId,
    group: CommandGroup,
}

enum Phase {
    Idle,
    GroupOpen(OpenGroup),
    Corrupted,
}

/// Linear undo/redo history of reversible commands.
pub struct CommandHistory {
    config: HistoryConfig,
    entries: Vec<TrackedCommand>,
    current: usize,
    /// Saved position; `None` once that position was discarded.
    clean_mark: Option<usize>,
    phase: Phase,
    observers: Observers,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHistory {
    /// Create an empty, clean history with the default configuration.
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    /// Create an empty, clean history.
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            current: 0,
            clean_mark: Some(0),
            phase: Phase::Idle,
            observers: Observers::default(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Execute a command and record it.
    ///
    /// Returns `Ok(false)` if the command reported that it had nothing to do;
    /// it is then dropped without touching the history. Otherwise the redo
    /// branch is destroyed (most recent first) and the command becomes the
    /// newest undoable entry, unless it was merged into the previous one.
    ///
    /// # Panics
    ///
    /// Panics (after marking the history corrupted) if the command is a group
    /// whose rollback after a failed child failed too.
    pub fn push_command<C: ReversibleCommand>(&mut self, command: C) -> HistoryResult<bool> {
        self.push_boxed(Box::new(command))
    }

    /// Like [`push_command`](Self::push_command) for an already boxed command.
    pub fn push_boxed(&mut self, command: Box<dyn ReversibleCommand>) -> HistoryResult<bool> {
        self.ensure_idle()?;

        let mut entry = TrackedCommand::new(command);
        match entry.execute() {
            Ok(true) => {}
            Ok(false) => {
                debug!(label = entry.label(), "no-op command discarded");
                return Ok(false);
            }
            Err(err) if err.is_unrecoverable() => {
                let label = entry.label().to_owned();
                self.poison("push of", &label, &err);
            }
            Err(err) => return Err(err.into()),
        }

        if self.try_merge(&entry) {
            debug!(
                label = entry.label(),
                into = self.entries[self.current - 1].label(),
                "command merged into previous entry"
            );
            self.notify(HistoryChangeKind::Merged);
            return Ok(true);
        }

        self.truncate_redo_branch();
        trace!(label = entry.label(), index = self.current, "command pushed");
        self.entries.push(entry);
        self.current += 1;
        self.enforce_max_depth();
        self.notify(HistoryChangeKind::Pushed);
        Ok(true)
    }

    /// Open a new, empty command group.
    ///
    /// This goes through the push path: the redo branch is destroyed even if
    /// the group later turns out empty.
    pub fn begin_group(&mut self, label: impl Into<String>) -> HistoryResult<()> {
        self.ensure_idle()?;

        let mut group = CommandGroup::new(label);
        group.execute()?;
        self.truncate_redo_branch();
        trace!(label = group.label(), index = self.current, "command group opened");
        self.phase = Phase::GroupOpen(OpenGroup {
            id: CommandId::next(),
            group,
        });
        self.notify(HistoryChangeKind::GroupOpened);
        Ok(())
    }

    /// Execute a command as the next child of the open group.
    ///
    /// A failing child rolls the whole group back (see
    /// [`CommandGroup::append_child`]) but leaves it open; the caller decides
    /// to abort. Returns `Ok(false)` if the child was a no-op.
    ///
    /// # Panics
    ///
    /// Panics (after marking the history corrupted) if that rollback fails.
    pub fn append_to_group<C: ReversibleCommand>(&mut self, command: C) -> HistoryResult<bool> {
        self.append_boxed_to_group(Box::new(command))
    }

    /// Like [`append_to_group`](Self::append_to_group) for a boxed command.
    pub fn append_boxed_to_group(
        &mut self,
        command: Box<dyn ReversibleCommand>,
    ) -> HistoryResult<bool> {
        let open = self.open_group_mut()?;
        match open.group.append_child(command) {
            Ok(appended) => {
                if appended {
                    self.notify(HistoryChangeKind::GroupAppended);
                }
                Ok(appended)
            }
            Err(HistoryError::EditFailed(err)) if err.is_unrecoverable() => {
                let label = self.open_group_label().unwrap_or_default().to_owned();
                self.poison("append to", &label, &err)
            }
            Err(err) => Err(err),
        }
    }

    /// Close the open group and keep it as a normal entry.
    ///
    /// An empty (or rolled back) group is discarded instead and `Ok(false)`
    /// is returned.
    pub fn commit_group(&mut self) -> HistoryResult<bool> {
        let open = self.take_open_group()?;

        if open.group.was_reverted() {
            warn!(label = open.group.label(), "rolled back group committed, discarding");
            drop(open);
            self.notify(HistoryChangeKind::GroupAborted);
            return Ok(false);
        }
        if open.group.is_empty() {
            trace!(label = open.group.label(), "empty command group discarded");
            drop(open);
            self.notify(HistoryChangeKind::GroupAborted);
            return Ok(false);
        }

        let children = open.group.len();
        trace!(
            label = open.group.label(),
            children,
            index = self.current,
            "command group committed"
        );
        // Same inputs the open group fed into `unique_state_id`.
        self.entries.push(TrackedCommand::applied(
            Box::new(open.group),
            open.id,
            children as u64,
        ));
        self.current += 1;
        self.enforce_max_depth();
        self.notify(HistoryChangeKind::GroupCommitted);
        Ok(true)
    }

    /// Undo everything appended to the open group and discard it.
    ///
    /// # Panics
    ///
    /// Panics (after marking the history corrupted) if the rollback fails.
    pub fn abort_group(&mut self) -> HistoryResult<()> {
        let mut open = self.take_open_group()?;

        if !open.group.was_reverted()
            && let Err(err) = open.group.undo()
        {
            let label = open.group.label().to_owned();
            self.poison("abort of", &label, &err);
        }

        trace!(label = open.group.label(), children = open.group.len(), "command group aborted");
        drop(open);
        self.notify(HistoryChangeKind::GroupAborted);
        Ok(())
    }

    /// Undo the newest applied entry. Returns `Ok(false)` if there is none.
    ///
    /// # Panics
    ///
    /// Panics (after marking the history corrupted) if the command fails.
    pub fn undo(&mut self) -> HistoryResult<bool> {
        self.ensure_idle()?;
        if self.current == 0 {
            return Ok(false);
        }

        let index = self.current - 1;
        if let Err(err) = self.entries[index].undo() {
            let label = self.entries[index].label().to_owned();
            self.poison("undo of", &label, &err);
        }
        self.current = index;
        trace!(label = self.entries[index].label(), current = self.current, "undo");
        self.notify(HistoryChangeKind::Undone);
        Ok(true)
    }

    /// Redo the oldest reverted entry. Returns `Ok(false)` if there is none.
    ///
    /// # Panics
    ///
    /// Panics (after marking the history corrupted) if the command fails.
    pub fn redo(&mut self) -> HistoryResult<bool> {
        self.ensure_idle()?;
        if self.current >= self.entries.len() {
            return Ok(false);
        }

        let index = self.current;
        if let Err(err) = self.entries[index].redo() {
            let label = self.entries[index].label().to_owned();
            self.poison("redo of", &label, &err);
        }
        self.current = index + 1;
        trace!(label = self.entries[index].label(), current = self.current, "redo");
        self.notify(HistoryChangeKind::Redone);
        Ok(true)
    }

    /// Record the current position as the saved state.
    ///
    /// Not allowed while a group is open.
    pub fn mark_clean(&mut self) -> HistoryResult<()> {
        self.ensure_idle()?;
        self.clean_mark = Some(self.current);
        self.notify(HistoryChangeKind::MarkedClean);
        Ok(())
    }

    /// Whether the history is at the saved position.
    pub fn is_clean(&self) -> bool {
        matches!(self.phase, Phase::Idle) && self.clean_mark == Some(self.current)
    }

    /// Saved position, or `None` if it is no longer reachable.
    pub fn clean_mark(&self) -> Option<usize> {
        self.clean_mark
    }

    /// Abort an open group, then destroy every entry (most recent first).
    ///
    /// Afterwards the history is empty and clean.
    pub fn clear(&mut self) -> HistoryResult<()> {
        match self.phase {
            Phase::Corrupted => return Err(IllegalState::Corrupted.into()),
            Phase::GroupOpen(_) => self.abort_group()?,
            Phase::Idle => {}
        }

        let discarded = self.entries.len();
        self.destroy_from(0);
        self.current = 0;
        self.clean_mark = Some(0);
        trace!(discarded, "history cleared");
        self.notify(HistoryChangeKind::Cleared);
        Ok(())
    }

    /// Open a group wrapped in a guard that aborts it unless committed.
    pub fn transaction(&mut self, label: impl Into<String>) -> HistoryResult<Transaction<'_>> {
        Transaction::begin(self, label)
    }

    /// Whether `undo` would revert something.
    pub fn can_undo(&self) -> bool {
        matches!(self.phase, Phase::Idle) && self.current > 0
    }

    /// Whether `redo` would re-apply something.
    pub fn can_redo(&self) -> bool {
        matches!(self.phase, Phase::Idle) && self.current < self.entries.len()
    }

    /// Label of the entry `undo` would revert.
    pub fn undo_label(&self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        Some(self.entries[self.current - 1].label())
    }

    /// Label of the entry `redo` would re-apply.
    pub fn redo_label(&self) -> Option<&str> {
        if !self.can_redo() {
            return None;
        }
        Some(self.entries[self.current].label())
    }

    /// Cursor: number of undoable entries.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Number of committed entries (undoable and redoable).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no committed entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Execution state of the committed entry at `index`.
    pub fn entry_state(&self, index: usize) -> Option<ExecutionState> {
        self.entries.get(index).map(TrackedCommand::state)
    }

    /// Identity of the committed entry at `index`.
    pub fn entry_id(&self, index: usize) -> Option<CommandId> {
        self.entries.get(index).map(TrackedCommand::id)
    }

    /// Labels of all committed entries, oldest first.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(TrackedCommand::label)
    }

    /// Whether a command group is open.
    pub fn is_group_open(&self) -> bool {
        matches!(self.phase, Phase::GroupOpen(_))
    }

    /// Whether an earlier failure left the history unusable.
    pub fn is_corrupted(&self) -> bool {
        matches!(self.phase, Phase::Corrupted)
    }

    /// Label of the open group.
    pub fn open_group_label(&self) -> Option<&str> {
        match &self.phase {
            Phase::GroupOpen(open) => Some(open.group.label()),
            _ => None,
        }
    }

    /// Number of children in the open group.
    pub fn open_group_len(&self) -> Option<usize> {
        match &self.phase {
            Phase::GroupOpen(open) => Some(open.group.len()),
            _ => None,
        }
    }

    /// Fingerprint of the applied state.
    ///
    /// Combines the identity and revision of every entry below the cursor
    /// and, if a group with applied children is open, its identity and child
    /// count. Equal ids mean the same edits are applied; no deep comparison
    /// is made.
    ///
    /// A committed group's revision is its child count, so committing does
    /// not change the id (unless it evicts the oldest entry). Aborting, or
    /// discarding an empty group, returns it to the value before the group
    /// was opened.
    pub fn unique_state_id(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for entry in &self.entries[..self.current] {
            entry.id().hash(&mut hasher);
            entry.revision().hash(&mut hasher);
        }
        if let Phase::GroupOpen(open) = &self.phase
            && !open.group.is_empty()
            && !open.group.was_reverted()
        {
            open.id.hash(&mut hasher);
            (open.group.len() as u64).hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Snapshot for UI state.
    pub fn undo_redo_state(&self) -> UndoRedoState {
        UndoRedoState {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            undo_label: self.undo_label().map(str::to_owned),
            redo_label: self.redo_label().map(str::to_owned),
            undo_depth: self.current,
            redo_depth: self.entries.len() - self.current,
            is_clean: self.is_clean(),
            group_open: self.is_group_open(),
            state_id: self.unique_state_id(),
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&HistoryChange) + 'static,
    {
        self.observers.subscribe(Box::new(callback));
    }

    /// Notification version, incremented on every state change.
    pub fn version(&self) -> u64 {
        self.observers.version()
    }

    /// Check if the state changed since `version`.
    pub fn has_changed_since(&self, version: u64) -> bool {
        self.observers.version() > version
    }

    fn ensure_idle(&self) -> HistoryResult<()> {
        match self.phase {
            Phase::Idle => Ok(()),
            Phase::GroupOpen(_) => Err(IllegalState::GroupOpen.into()),
            Phase::Corrupted => Err(IllegalState::Corrupted.into()),
        }
    }

    fn open_group_mut(&mut self) -> HistoryResult<&mut OpenGroup> {
        match &mut self.phase {
            Phase::GroupOpen(open) => Ok(open),
            Phase::Idle => Err(IllegalState::NoGroupOpen.into()),
            Phase::Corrupted => Err(IllegalState::Corrupted.into()),
        }
    }

    fn take_open_group(&mut self) -> HistoryResult<OpenGroup> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::GroupOpen(open) => Ok(open),
            Phase::Idle => Err(IllegalState::NoGroupOpen.into()),
            Phase::Corrupted => {
                self.phase = Phase::Corrupted;
                Err(IllegalState::Corrupted.into())
            }
        }
    }

    fn try_merge(&mut self, newer: &TrackedCommand) -> bool {
        if !self.config.allow_merge
            || self.current == 0
            || self.current != self.entries.len()
            || self.clean_mark == Some(self.current)
        {
            return false;
        }
        self.entries[self.current - 1].merge(newer.command())
    }

    /// Destroys the redo branch. The clean mark is dropped if it lay there.
    fn truncate_redo_branch(&mut self) {
        if self.current >= self.entries.len() {
            return;
        }
        if let Some(mark) = self.clean_mark
            && mark > self.current
        {
            self.clean_mark = None;
        }
        let discarded = self.entries.len() - self.current;
        self.destroy_from(self.current);
        trace!(discarded, current = self.current, "redo branch discarded");
    }

    /// Drops `entries[start..]`, newest first.
    fn destroy_from(&mut self, start: usize) {
        while self.entries.len() > start {
            drop(self.entries.pop());
        }
    }

    /// Evicts the oldest entries beyond `max_depth`.
    fn enforce_max_depth(&mut self) {
        let Some(max_depth) = self.config.max_depth else {
            return;
        };
        while self.entries.len() > max_depth {
            let evicted = self.entries.remove(0);
            self.current = self.current.saturating_sub(1);
            self.clean_mark = match self.clean_mark {
                Some(0) | None => None,
                Some(mark) => Some(mark - 1),
            };
            trace!(label = evicted.label(), "oldest entry evicted");
        }
    }

    fn notify(&mut self, kind: HistoryChangeKind) {
        let mut observers = std::mem::take(&mut self.observers);
        observers.notify(kind, || self.undo_redo_state());
        self.observers = observers;
    }

    /// Marks the history unusable and halts.
    fn poison(&mut self, context: &str, label: &str, err: &CommandError) -> ! {
        self.phase = Phase::Corrupted;
        corrupted(context, label, err)
    }
}

impl Drop for CommandHistory {
    fn drop(&mut self) {
        if self.is_group_open()
            && let Err(err) = self.abort_group()
        {
            warn!(error = %err, "open command group not aborted on drop");
        }
        self.destroy_from(0);
    }
}

impl std::fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHistory")
            .field("entries", &self.entries)
            .field("current", &self.current)
            .field("clean_mark", &self.clean_mark)
            .field("group_open", &self.is_group_open())
            .field("corrupted", &self.is_corrupted())
            .finish()
    }
}
