// src/dag/mod.rs

//! Mission graph and concurrent scheduling.
//!
//! - [`scheduler`] owns the node table: registration, execution, run state.
//! - `node` wraps one mission with its dependents, inputs and counters.
//! - `state_manager` holds the per-run state transitions (reset, frontier,
//!   delivery to dependents).
//! - [`run_state`] is the per-node state machine.
//! - [`run_report`] describes the outcome of a run.

pub(crate) mod node;
pub mod run_report;
pub mod run_state;
pub mod scheduler;
pub(crate) mod state_manager;

pub use run_report::{MissionFailure, RunReport};
pub use run_state::RunState;
pub use scheduler::Scheduler;
