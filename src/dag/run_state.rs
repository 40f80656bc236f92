// src/dag/run_state.rs

//! Per-run state of a mission node.

use std::fmt;

/// Where a mission is in the current (or most recent) run.
///
/// ```text
/// Waiting --(deps satisfied, dispatched)--> Running --(perform ok)--> Finished
///                                            Running --(perform err)--> Failed
/// Waiting --(an upstream mission failed)--> Skipped
/// ```
///
/// Terminal states survive the end of a run and go back to `Waiting` when
/// the next run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Not started yet in this run (or no run has happened).
    Waiting,
    /// `perform` has been invoked and has not returned yet.
    Running,
    /// `perform` returned successfully.
    Finished,
    /// `perform` returned an error or panicked.
    Failed,
    /// Never performed because a dependency failed or was skipped.
    Skipped,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Waiting => "waiting",
            RunState::Running => "running",
            RunState::Finished => "finished",
            RunState::Failed => "failed",
            RunState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}
