//! Error types
//!
//! Two kinds of failure are reported as values:
//!
//! - [`CommandError`]: a command could not apply (or reverse) its edit. This is
//!   the error type implementations of [`ReversibleCommand`](crate::ReversibleCommand)
//!   return, and it is always recoverable at the history level.
//! - [`IllegalState`]: the caller used the history in the wrong state
//!   (for example `undo` while a group is open). Always a bug in the caller.
//!
//! A third kind, a corrupt history, is not a value. A group whose rollback
//! fails reports it upward as an
//! [`unrecoverable`](CommandError::is_unrecoverable) error; the history then
//! marks itself corrupted, logs and panics.

use std::error::Error as StdError;

use thiserror::Error;
use tracing::error;

/// Boxed source error attached to a [`CommandError`].
pub type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// A command failed to apply or reverse its edit.
///
/// A command returning this from `execute` must not have left any partial
/// change behind. The one exception is an error produced by a
/// [`CommandGroup`](crate::CommandGroup) whose rollback failed as well; see
/// [`is_unrecoverable`](Self::is_unrecoverable).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
    unrecoverable: bool,
}

impl CommandError {
    /// Create an error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            unrecoverable: false,
        }
    }

    /// Create an error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
            unrecoverable: false,
        }
    }

    /// A rollback after `cause` failed itself; applied edits are unknown.
    pub(crate) fn unrecoverable(context: &str, label: &str, cause: CommandError) -> Self {
        Self {
            message: format!("{context} `{label}` failed: {cause}"),
            source: Some(Box::new(cause)),
            unrecoverable: true,
        }
    }

    /// Human-readable message (without the source chain).
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether a group's rollback failed while handling this error.
    ///
    /// The history treats such an error as a corrupt history instead of an
    /// ordinary edit failure.
    pub fn is_unrecoverable(&self) -> bool {
        self.unrecoverable
    }
}

/// An operation was attempted in a state that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IllegalState {
    #[error("a command group is open; commit or abort it first")]
    /// A group is open, so only group operations are allowed.
    GroupOpen,

    #[error("no command group is open")]
    /// A group operation was attempted while idle.
    NoGroupOpen,

    #[error("the command group was rolled back and accepts no more children")]
    /// The group has already been reverted (for example by a failed append).
    GroupRolledBack,

    #[error("the command history is corrupted and refuses further edits")]
    /// A previous undo/redo or rollback failed; the history can no longer be trusted.
    Corrupted,
}

/// Errors returned by [`CommandHistory`](crate::CommandHistory),
/// [`CommandGroup`](crate::CommandGroup) and [`Transaction`](crate::Transaction).
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("edit failed: {0}")]
    /// A command could not be applied. The history is left consistent.
    EditFailed(#[from] CommandError),

    #[error("illegal state: {0}")]
    /// The operation is not valid in the current state.
    IllegalState(#[from] IllegalState),
}

impl HistoryError {
    /// Returns the illegal-state reason, if this is one.
    pub fn illegal_state(&self) -> Option<IllegalState> {
        match self {
            HistoryError::IllegalState(state) => Some(*state),
            HistoryError::EditFailed(_) => None,
        }
    }

    /// Whether this is an [`HistoryError::EditFailed`].
    pub fn is_edit_failed(&self) -> bool {
        matches!(self, HistoryError::EditFailed(_))
    }
}

/// Result alias for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Halts on a failure that leaves applied edits in an unknown state.
///
/// Called when the undo/redo of a committed command fails, or when rolling
/// back after an earlier failure fails itself. The engine can no longer say
/// which mutations are applied, so continuing would risk silently corrupting
/// the document.
#[cold]
#[track_caller]
pub(crate) fn corrupted(context: &str, label: &str, cause: &CommandError) -> ! {
    error!(context, label, error = %cause, "command history corrupted");
    panic!("command history corrupted: {context} `{label}` failed: {cause}");
}
