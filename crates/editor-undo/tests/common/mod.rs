//! Shared fixtures: a toy board database, board edits, and scripted commands
//! that record every call into a journal.

#![allow(dead_code)]

use editor_undo::{CommandError, ReversibleCommand};
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Call log shared by the commands of one test.
pub type Journal = Rc<RefCell<Vec<String>>>;

/// Minimal board: part designator -> position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    pub parts: BTreeMap<String, (i32, i32)>,
}

pub type SharedBoard = Rc<RefCell<Board>>;

pub fn fixture() -> (SharedBoard, Journal) {
    (SharedBoard::default(), Journal::default())
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.borrow().clone()
}

pub fn log(journal: &Journal, line: impl Into<String>) {
    journal.borrow_mut().push(line.into());
}

pub struct AddPart {
    pub board: SharedBoard,
    pub journal: Journal,
    pub name: String,
    pub at: (i32, i32),
}

impl AddPart {
    pub fn new(board: &SharedBoard, journal: &Journal, name: &str, at: (i32, i32)) -> Self {
        Self {
            board: board.clone(),
            journal: journal.clone(),
            name: name.to_string(),
            at,
        }
    }
}

impl ReversibleCommand for AddPart {
    fn label(&self) -> &str {
        "Add Part"
    }

    fn execute(&mut self) -> Result<bool, CommandError> {
        let mut board = self.board.borrow_mut();
        if board.parts.contains_key(&self.name) {
            return Err(CommandError::new(format!("part {} already exists", self.name)));
        }
        board.parts.insert(self.name.clone(), self.at);
        log(&self.journal, format!("add {}", self.name));
        Ok(true)
    }

    fn undo(&mut self) -> Result<(), CommandError> {
        if self.board.borrow_mut().parts.remove(&self.name).is_none() {
            return Err(CommandError::new(format!("part {} vanished", self.name)));
        }
        log(&self.journal, format!("undo add {}", self.name));
        Ok(())
    }

    fn redo(&mut self) -> Result<(), CommandError> {
        self.board.borrow_mut().parts.insert(self.name.clone(), self.at);
        log(&self.journal, format!("redo add {}", self.name));
        Ok(())
    }
}

/// Moves a part. Consecutive moves of the same part merge into one entry.
pub struct MovePart {
    pub board: SharedBoard,
    pub journal: Journal,
    pub name: String,
    pub to: (i32, i32),
    pub from: (i32, i32),
}

impl MovePart {
    pub fn new(board: &SharedBoard, journal: &Journal, name: &str, to: (i32, i32)) -> Self {
        Self {
            board: board.clone(),
            journal: journal.clone(),
            name: name.to_string(),
            to,
            from: (0, 0),
        }
    }

    fn place(&self, at: (i32, i32)) -> Result<(), CommandError> {
        match self.board.borrow_mut().parts.get_mut(&self.name) {
            Some(position) => {
                *position = at;
                Ok(())
            }
            None => Err(CommandError::new(format!("no part {}", self.name))),
        }
    }
}

impl ReversibleCommand for MovePart {
    fn label(&self) -> &str {
        "Move Part"
    }

    fn execute(&mut self) -> Result<bool, CommandError> {
        let current = self.board.borrow().parts.get(&self.name).copied();
        let Some(current) = current else {
            return Err(CommandError::new(format!("no part {}", self.name)));
        };
        if current == self.to {
            return Ok(false);
        }
        self.from = current;
        self.place(self.to)?;
        log(&self.journal, format!("move {}", self.name));
        Ok(true)
    }

    fn undo(&mut self) -> Result<(), CommandError> {
        self.place(self.from)?;
        log(&self.journal, format!("undo move {}", self.name));
        Ok(())
    }

    fn redo(&mut self) -> Result<(), CommandError> {
        self.place(self.to)?;
        log(&self.journal, format!("redo move {}", self.name));
        Ok(())
    }

    fn merge(&mut self, newer: &dyn ReversibleCommand) -> bool {
        match (newer as &dyn Any).downcast_ref::<MovePart>() {
            Some(other) if other.name == self.name => {
                self.to = other.to;
                true
            }
            _ => false,
        }
    }
}

/// Which call of a [`Scripted`] command fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Never,
    Execute,
    Undo,
    Redo,
}

/// A command that only journals its calls, failing where told to.
pub struct Scripted {
    pub name: String,
    pub journal: Journal,
    pub fail_on: FailOn,
    pub noop: bool,
}

impl Scripted {
    pub fn ok(journal: &Journal, name: &str) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            fail_on: FailOn::Never,
            noop: false,
        }
    }

    pub fn failing(journal: &Journal, name: &str, fail_on: FailOn) -> Self {
        let mut command = Self::ok(journal, name);
        command.fail_on = fail_on;
        command
    }

    pub fn noop(journal: &Journal, name: &str) -> Self {
        let mut command = Self::ok(journal, name);
        command.noop = true;
        command
    }
}

impl ReversibleCommand for Scripted {
    fn label(&self) -> &str {
        &self.name
    }

    fn execute(&mut self) -> Result<bool, CommandError> {
        if self.fail_on == FailOn::Execute {
            log(&self.journal, format!("fail exec {}", self.name));
            return Err(CommandError::new(format!("{} cannot be applied", self.name)));
        }
        log(&self.journal, format!("exec {}", self.name));
        Ok(!self.noop)
    }

    fn undo(&mut self) -> Result<(), CommandError> {
        if self.fail_on == FailOn::Undo {
            log(&self.journal, format!("fail undo {}", self.name));
            return Err(CommandError::new(format!("{} cannot be undone", self.name)));
        }
        log(&self.journal, format!("undo {}", self.name));
        Ok(())
    }

    fn redo(&mut self) -> Result<(), CommandError> {
        if self.fail_on == FailOn::Redo {
            log(&self.journal, format!("fail redo {}", self.name));
            return Err(CommandError::new(format!("{} cannot be redone", self.name)));
        }
        log(&self.journal, format!("redo {}", self.name));
        Ok(())
    }
}

/// A command that succeeds silently and journals only when it is destroyed.
pub struct DropTracker {
    pub name: String,
    pub journal: Journal,
}

impl DropTracker {
    pub fn new(journal: &Journal, name: &str) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
        }
    }
}

impl ReversibleCommand for DropTracker {
    fn label(&self) -> &str {
        &self.name
    }

    fn execute(&mut self) -> Result<bool, CommandError> {
        Ok(true)
    }

    fn undo(&mut self) -> Result<(), CommandError> {
        Ok(())
    }

    fn redo(&mut self) -> Result<(), CommandError> {
        Ok(())
    }
}

impl Drop for DropTracker {
    fn drop(&mut self) {
        log(&self.journal, format!("drop {}", self.name));
    }
}
