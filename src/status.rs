//! Progress reports emitted by a run.

use std::fmt;

/// A status update from the key loop.
///
/// `Display` gives the human-readable line shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Pre-start countdown, emitted once per second.
    Waiting { remaining_secs: u64 },
    /// A cycle is starting. `total` is `None` for infinite runs.
    Cycle { index: u64, total: Option<u32> },
    /// The run was stopped before finishing.
    Stopped,
    /// A finite run played every cycle.
    Completed,
    /// The run aborted on an error.
    Failed { message: String },
}

impl RunStatus {
    /// Whether this status ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Stopped | RunStatus::Completed | RunStatus::Failed { .. }
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Waiting { remaining_secs: 1 } => write!(f, "waiting 1 second"),
            RunStatus::Waiting { remaining_secs } => {
                write!(f, "waiting {remaining_secs} seconds")
            }
            RunStatus::Cycle {
                index,
                total: Some(total),
            } => write!(f, "cycle {index} of {total}"),
            RunStatus::Cycle { index, total: None } => write!(f, "cycle {index}"),
            RunStatus::Stopped => write!(f, "stopped"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed { message } => write!(f, "{message}"),
        }
    }
}
