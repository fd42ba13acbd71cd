//! Scoped transactions
//!
//! A [`Transaction`] lets a tool build one undo entry over several call sites.
//! Each appended command runs immediately. The transaction ends with
//! [`commit`](Transaction::commit), or it is rolled back: explicitly with
//! [`abort`](Transaction::abort), or implicitly when it goes out of scope,
//! including when the tool bails out early with `?` or a command panics.
//!
//! A failing implicit rollback is fatal like any other failed rollback. If
//! the thread is already unwinding, that second panic aborts the process.
//!
//! # Example
//!
//! ```rust
//! use editor_undo::{CommandError, CommandHistory, HistoryError, ReversibleCommand};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! struct AddVia(Rc<RefCell<Vec<u32>>>, u32);
//!
//! impl ReversibleCommand for AddVia {
//!     fn label(&self) -> &str {
//!         "Add Via"
//!     }
//!     fn execute(&mut self) -> Result<bool, CommandError> {
//!         if self.1 == 0 {
//!             return Err(CommandError::new("net 0 is unconnected"));
//!         }
//!         self.0.borrow_mut().push(self.1);
//!         Ok(true)
//!     }
//!     fn undo(&mut self) -> Result<(), CommandError> {
//!         self.0.borrow_mut().pop();
//!         Ok(())
//!     }
//!     fn redo(&mut self) -> Result<(), CommandError> {
//!         self.0.borrow_mut().push(self.1);
//!         Ok(())
//!     }
//! }
//!
//! fn stitch(history: &mut CommandHistory, vias: &Rc<RefCell<Vec<u32>>>, nets: &[u32]) -> Result<bool, HistoryError> {
//!     let mut transaction = history.transaction("Stitch Vias")?;
//!     for &net in nets {
//!         transaction.append(AddVia(vias.clone(), net))?;
//!     }
//!     transaction.commit()
//! }
//!
//! let vias = Rc::new(RefCell::new(Vec::new()));
//! let mut history = CommandHistory::new();
//!
//! assert!(stitch(&mut history, &vias, &[1, 2]).unwrap());
//! assert!(stitch(&mut history, &vias, &[3, 0]).is_err());
//! assert_eq!(*vias.borrow(), [1, 2]);
//! assert_eq!(history.len(), 1);
//! ```

use tracing::debug;

use crate::command::ReversibleCommand;
use crate::error::{CommandError, HistoryResult, IllegalState, corrupted};
use crate::history::CommandHistory;

/// Guard over an open command group.
///
/// Holding it borrows the history mutably, so a second transaction (or a
/// plain push) cannot start until this one ends.
#[must_use = "a transaction is rolled back when dropped; call `commit`"]
pub struct Transaction<'h> {
    history: &'h mut CommandHistory,
    live: bool,
}

impl<'h> Transaction<'h> {
    /// Open a group on `history`.
    pub fn begin(history: &'h mut CommandHistory, label: impl Into<String>) -> HistoryResult<Self> {
        history.begin_group(label)?;
        Ok(Self {
            history,
            live: true,
        })
    }

    /// Execute `command` and add it to the transaction.
    ///
    /// Returns `Ok(false)` if it was a no-op. After an error the group has
    /// been rolled back and only ending the transaction remains useful.
    pub fn append<C: ReversibleCommand>(&mut self, command: C) -> HistoryResult<bool> {
        self.history.append_to_group(command)
    }

    /// Like [`append`](Self::append) for a boxed command.
    pub fn append_boxed(&mut self, command: Box<dyn ReversibleCommand>) -> HistoryResult<bool> {
        self.history.append_boxed_to_group(command)
    }

    /// Keep everything appended as one history entry.
    ///
    /// Returns `Ok(false)` if nothing was committed (no children).
    pub fn commit(mut self) -> HistoryResult<bool> {
        self.live = false;
        self.history.commit_group()
    }

    /// Roll back everything appended so far.
    pub fn abort(mut self) -> HistoryResult<()> {
        self.live = false;
        self.history.abort_group()
    }

    /// Read access to the history while the transaction is open.
    pub fn history(&self) -> &CommandHistory {
        &*self.history
    }

    /// Number of children appended so far.
    pub fn len(&self) -> usize {
        self.history.open_group_len().unwrap_or(0)
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        let label = self.history.open_group_label().unwrap_or_default().to_owned();
        match self.history.abort_group() {
            Ok(()) => {}
            // Already logged and panicked by the call that corrupted it.
            Err(err) if err.illegal_state() == Some(IllegalState::Corrupted) => {
                debug!(label = %label, "transaction dropped on a corrupted history");
            }
            Err(err) => corrupted(
                "implicit abort of",
                &label,
                &CommandError::with_source("transaction could not be rolled back", err),
            ),
        }
    }
}
