//! History configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tunables for a [`CommandHistory`](crate::CommandHistory).
///
/// ```rust
/// use editor_undo::{CommandHistory, HistoryConfig};
///
/// let config = HistoryConfig::default().with_max_depth(200).with_merge(false);
/// let history = CommandHistory::with_config(config);
/// assert_eq!(history.config().max_depth, Some(200));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HistoryConfig {
    /// Maximum number of committed entries kept. When exceeded, the oldest
    /// entry is destroyed. `None` keeps everything.
    pub max_depth: Option<usize>,
    /// Whether a pushed command is offered to the previous entry's
    /// [`merge`](crate::ReversibleCommand::merge) hook.
    pub allow_merge: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            allow_merge: true,
        }
    }
}

impl HistoryConfig {
    /// Limit the number of committed entries.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Keep every committed entry.
    pub fn unbounded(mut self) -> Self {
        self.max_depth = None;
        self
    }

    /// Enable or disable command merging.
    pub fn with_merge(mut self, allow_merge: bool) -> Self {
        self.allow_merge = allow_merge;
        self
    }
}
