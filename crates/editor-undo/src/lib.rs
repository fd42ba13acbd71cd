#![warn(missing_docs)]
//! Editor Undo - Reversible-Edit Engine for Design Editors
//!
//! # Overview
//!
//! `editor-undo` sequences the edits of an interactive editor (schematic,
//! board and library editors of a PCB design tool) into one linear history.
//! Tools express each edit as a command object; the engine guarantees that
//! every committed edit is atomic and exactly invertible, and that the
//! history's bookkeeping (cursor, saved marker, group in progress) stays
//! consistent even when a multi-step edit fails halfway through.
//!
//! # Core Features
//!
//! - **Reversible Commands**: one trait with `execute` / `undo` / `redo`
//! - **Atomic Groups**: composite commands that roll back on partial failure
//! - **Linear History**: cursor, redo-branch truncation and clean-state tracking
//! - **Scoped Transactions**: a guard that aborts the group unless committed
//! - **Change Notifications**: subscribers see every state change
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Transaction (scoped group builder)         │  ← Tool API
//! ├─────────────────────────────────────────────┤
//! │  CommandHistory (cursor, clean mark, phase) │  ← History
//! ├─────────────────────────────────────────────┤
//! │  CommandGroup (atomic composite)            │  ← Composition
//! ├─────────────────────────────────────────────┤
//! │  ReversibleCommand (leaf edits)             │  ← Tool-supplied
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use editor_undo::{CommandError, CommandHistory, ReversibleCommand};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! struct Rename {
//!     name: Rc<RefCell<String>>,
//!     new: String,
//!     old: String,
//! }
//!
//! impl ReversibleCommand for Rename {
//!     fn label(&self) -> &str {
//!         "Rename Net"
//!     }
//!     fn execute(&mut self) -> Result<bool, CommandError> {
//!         self.old = self.name.replace(self.new.clone());
//!         Ok(self.old != self.new)
//!     }
//!     fn undo(&mut self) -> Result<(), CommandError> {
//!         self.name.replace(self.old.clone());
//!         Ok(())
//!     }
//!     fn redo(&mut self) -> Result<(), CommandError> {
//!         self.name.replace(self.new.clone());
//!         Ok(())
//!     }
//! }
//!
//! let name = Rc::new(RefCell::new("N$1".to_string()));
//! let mut history = CommandHistory::new();
//!
//! let mut transaction = history.transaction("Rename Nets").unwrap();
//! transaction
//!     .append(Rename { name: name.clone(), new: "GND".into(), old: String::new() })
//!     .unwrap();
//! transaction.commit().unwrap();
//!
//! assert_eq!(*name.borrow(), "GND");
//! history.undo().unwrap();
//! assert_eq!(*name.borrow(), "N$1");
//! assert!(history.is_clean());
//! ```
//!
//! # Module Description
//!
//! - [`command`] - The command trait and execution tracking
//! - [`group`] - Atomic composite commands
//! - [`history`] - Linear history and its state machine
//! - [`transaction`] - Scoped group builder
//! - [`state`] - UI state snapshot and change notifications
//! - [`config`] - History limits and merging
//! - [`error`] - Error types
//!
//! # Threading
//!
//! Everything runs on the thread that owns the document. Commands are not
//! required to be `Send`; nothing here locks.

pub mod command;
pub mod config;
pub mod error;
pub mod group;
pub mod history;
pub mod state;
pub mod transaction;

pub use command::{CommandId, ExecutionState, ReversibleCommand};
pub use config::HistoryConfig;
pub use error::{BoxedSource, CommandError, HistoryError, HistoryResult, IllegalState};
pub use group::CommandGroup;
pub use history::CommandHistory;
pub use state::{HistoryChange, HistoryChangeCallback, HistoryChangeKind, UndoRedoState};
pub use transaction::Transaction;
