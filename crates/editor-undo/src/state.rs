//! History State Interface
//!
//! Read-only observations of a [`CommandHistory`](crate::CommandHistory) for GUI
//! layers: undo/redo availability and labels, the clean flag and a cheap state
//! fingerprint, plus change notifications.
//!
//! Subscribers are called synchronously, in registration order, after the
//! state change has taken effect. Operations that change nothing (a no-op
//! push, an undo with nothing to undo) notify nobody.
//!
//! # Example
//!
//! ```rust
//! use editor_undo::{CommandHistory, HistoryChangeKind};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let mut history = CommandHistory::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! history.subscribe(move |change| sink.borrow_mut().push(change.kind));
//!
//! history.mark_clean().unwrap();
//! assert_eq!(*seen.borrow(), [HistoryChangeKind::MarkedClean]);
//! ```

/// Snapshot of everything an undo/redo UI needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoRedoState {
    /// Whether `undo` would do something now
    pub can_undo: bool,
    /// Whether `redo` would do something now
    pub can_redo: bool,
    /// Label of the command `undo` would revert
    pub undo_label: Option<String>,
    /// Label of the command `redo` would re-apply
    pub redo_label: Option<String>,
    /// Number of undoable entries (the cursor)
    pub undo_depth: usize,
    /// Number of redoable entries
    pub redo_depth: usize,
    /// Whether the history sits at the saved position
    pub is_clean: bool,
    /// Whether a command group is being built
    pub group_open: bool,
    /// Fingerprint, see [`CommandHistory::unique_state_id`](crate::CommandHistory::unique_state_id)
    pub state_id: u64,
}

/// What kind of operation produced a [`HistoryChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryChangeKind {
    /// A command was executed and recorded
    Pushed,
    /// A command was executed and folded into the previous entry
    Merged,
    /// A command group was opened
    GroupOpened,
    /// A child was appended to the open group
    GroupAppended,
    /// The open group was committed as a history entry
    GroupCommitted,
    /// The open group was rolled back and discarded
    GroupAborted,
    /// The last applied entry was undone
    Undone,
    /// The next reverted entry was redone
    Redone,
    /// The current position was marked as saved
    MarkedClean,
    /// All entries were discarded
    Cleared,
}

/// Change notification record
#[derive(Debug, Clone)]
pub struct HistoryChange {
    /// Change kind
    pub kind: HistoryChangeKind,
    /// Version before the change
    pub old_version: u64,
    /// Version after the change
    pub new_version: u64,
    /// State after the change
    pub state: UndoRedoState,
}

/// History change callback type
pub type HistoryChangeCallback = Box<dyn FnMut(&HistoryChange)>;

/// Registered subscribers plus the notification version counter.
#[derive(Default)]
pub(crate) struct Observers {
    version: u64,
    callbacks: Vec<HistoryChangeCallback>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, callback: HistoryChangeCallback) {
        self.callbacks.push(callback);
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    /// Bumps the version and calls every subscriber. `state` is only
    /// evaluated when someone is listening.
    pub(crate) fn notify(&mut self, kind: HistoryChangeKind, state: impl FnOnce() -> UndoRedoState) {
        let old_version = self.version;
        self.version += 1;
        if self.callbacks.is_empty() {
            return;
        }
        let change = HistoryChange {
            kind,
            old_version,
            new_version: self.version,
            state: state(),
        };
        for callback in &mut self.callbacks {
            callback(&change);
        }
    }
}
