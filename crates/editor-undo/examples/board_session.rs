//! Board editing session example
//!
//! Walks through a short editing session on a toy board: placing parts,
//! dragging one around (the drag steps merge), a grouped edit, a failed
//! transaction and a save point. Run with `RUST_LOG=editor_undo=trace` to see
//! the history's own log output.

use editor_undo::{CommandError, CommandHistory, HistoryError, ReversibleCommand};
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

type Board = Rc<RefCell<BTreeMap<String, (i32, i32)>>>;

struct Place {
    board: Board,
    name: String,
    at: (i32, i32),
}

impl ReversibleCommand for Place {
    fn label(&self) -> &str {
        "Place Part"
    }

    fn execute(&mut self) -> Result<bool, CommandError> {
        let mut board = self.board.borrow_mut();
        if board.contains_key(&self.name) {
            return Err(CommandError::new(format!("{} is already on the board", self.name)));
        }
        board.insert(self.name.clone(), self.at);
        Ok(true)
    }

    fn undo(&mut self) -> Result<(), CommandError> {
        self.board.borrow_mut().remove(&self.name);
        Ok(())
    }

    fn redo(&mut self) -> Result<(), CommandError> {
        self.board.borrow_mut().insert(self.name.clone(), self.at);
        Ok(())
    }
}

struct Drag {
    board: Board,
    name: String,
    from: (i32, i32),
    to: (i32, i32),
}

impl Drag {
    fn new(board: &Board, name: &str, to: (i32, i32)) -> Self {
        Self {
            board: board.clone(),
            name: name.to_string(),
            from: (0, 0),
            to,
        }
    }

    fn set(&self, at: (i32, i32)) -> Result<(), CommandError> {
        let mut board = self.board.borrow_mut();
        let position = board
            .get_mut(&self.name)
            .ok_or_else(|| CommandError::new(format!("{} is not on the board", self.name)))?;
        *position = at;
        Ok(())
    }
}

impl ReversibleCommand for Drag {
    fn label(&self) -> &str {
        "Move Part"
    }

    fn execute(&mut self) -> Result<bool, CommandError> {
        let current = self.board.borrow().get(&self.name).copied();
        self.from = current
            .ok_or_else(|| CommandError::new(format!("{} is not on the board", self.name)))?;
        if self.from == self.to {
            return Ok(false);
        }
        self.set(self.to)?;
        Ok(true)
    }

    fn undo(&mut self) -> Result<(), CommandError> {
        self.set(self.from)
    }

    fn redo(&mut self) -> Result<(), CommandError> {
        self.set(self.to)
    }

    fn merge(&mut self, newer: &dyn ReversibleCommand) -> bool {
        match (newer as &dyn Any).downcast_ref::<Drag>() {
            Some(other) if other.name == self.name => {
                self.to = other.to;
                true
            }
            _ => false,
        }
    }
}

fn place(board: &Board, name: &str, at: (i32, i32)) -> Place {
    Place {
        board: board.clone(),
        name: name.to_string(),
        at,
    }
}

/// Places a decoupling capacitor next to each part, all or nothing.
fn decouple(history: &mut CommandHistory, board: &Board, parts: &[&str]) -> Result<bool, HistoryError> {
    let mut transaction = history.transaction("Add Decoupling")?;
    for part in parts {
        let at = board.borrow().get(*part).copied().unwrap_or_default();
        transaction.append(place(board, &format!("C_{part}"), (at.0 + 2, at.1)))?;
    }
    transaction.commit()
}

fn show(step: &str, history: &CommandHistory, board: &Board) {
    println!("{step}");
    println!("  board: {:?}", board.borrow());
    println!(
        "  undo: {:?}  redo: {:?}  clean: {}",
        history.undo_label(),
        history.redo_label(),
        history.is_clean()
    );
}

fn main() -> Result<(), HistoryError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("editor_undo=debug")),
        )
        .init();

    let board = Board::default();
    let mut history = CommandHistory::new();
    history.subscribe(|change| println!("  [{:?}] state {:x}", change.kind, change.state.state_id));

    history.push_command(place(&board, "U1", (0, 0)))?;
    history.push_command(place(&board, "U2", (10, 0)))?;
    show("1. placed U1 and U2", &history, &board);

    for x in 1..=4 {
        history.push_command(Drag::new(&board, "U1", (x, x)))?;
    }
    show("2. dragged U1 (one undo step)", &history, &board);

    decouple(&mut history, &board, &["U1", "U2"])?;
    show("3. decoupled both parts", &history, &board);

    history.mark_clean()?;
    show("4. saved", &history, &board);

    if let Err(err) = decouple(&mut history, &board, &["U1"]) {
        println!("  decoupling again failed: {err}");
    }
    show("5. failed transaction left the board alone", &history, &board);

    while history.undo()? {}
    show("6. undid everything", &history, &board);

    while history.redo()? {}
    show("7. redid everything", &history, &board);

    Ok(())
}
