// src/dag/node.rs

//! The scheduler's wrapper around one registered mission.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::error;

use crate::dag::run_state::RunState;
use crate::mission::{Mission, MissionName};
use crate::store::{ResultStore, Value};

/// Fields mutated by concurrent completions of this node's dependencies.
///
/// Guarded by the node's own lock; never by a scheduler-wide one.
#[derive(Debug, Default)]
pub(crate) struct NodeInputs {
    /// Dependencies that have not reported yet in this run.
    pub unmet_dependencies: usize,
    /// Results of direct dependencies, keyed by producer name.
    pub store: ResultStore,
    /// Set when a dependency failed or was skipped in this run.
    pub poisoned: bool,
}

/// What a dependency hands to a dependent when it is done.
#[derive(Clone)]
pub(crate) enum Delivery {
    /// The dependency finished; its result (if any) becomes an input.
    Result(Option<Value>),
    /// The dependency failed or was skipped; the dependent must not run.
    Poison,
}

pub(crate) struct GraphNode {
    pub name: MissionName,
    pub mission: Arc<dyn Mission>,
    /// Number of distinct direct dependencies. Static after registration.
    pub dependency_count: usize,
    /// Direct dependents, appended as later missions register.
    dependents: RwLock<Vec<Arc<GraphNode>>>,
    inputs: Mutex<NodeInputs>,
    run_state: Mutex<RunState>,
}

impl GraphNode {
    pub fn new(mission: Arc<dyn Mission>, dependency_count: usize) -> Self {
        Self {
            name: mission.name().to_string(),
            mission,
            dependency_count,
            dependents: RwLock::new(Vec::new()),
            inputs: Mutex::new(NodeInputs {
                unmet_dependencies: dependency_count,
                ..NodeInputs::default()
            }),
            run_state: Mutex::new(RunState::Waiting),
        }
    }

    pub fn add_dependent(&self, dependent: Arc<GraphNode>) {
        self.dependents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(dependent);
    }

    pub fn dependents(&self) -> Vec<Arc<GraphNode>> {
        self.dependents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn dependent_count(&self) -> usize {
        self.dependents.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn run_state(&self) -> RunState {
        *lock(&self.run_state)
    }

    pub fn set_run_state(&self, state: RunState) {
        *lock(&self.run_state) = state;
    }

    pub fn unmet_dependencies(&self) -> usize {
        lock(&self.inputs).unmet_dependencies
    }

    pub fn is_poisoned(&self) -> bool {
        lock(&self.inputs).poisoned
    }

    /// Copy of the inputs delivered so far, handed to `perform`.
    pub fn inputs_snapshot(&self) -> ResultStore {
        lock(&self.inputs).store.clone()
    }

    /// Accept a delivery from the dependency `producer`.
    ///
    /// The input is recorded before the counter is decremented, both under
    /// this node's lock. Returns `true` exactly once per run: for the
    /// delivery that brings the counter to zero. The caller dispatches the
    /// node after this returns, outside the lock.
    pub fn deliver(&self, producer: &str, delivery: Delivery) -> bool {
        let mut inputs = lock(&self.inputs);

        match delivery {
            Delivery::Result(result) => {
                if let Err(err) = inputs.store.register_result(producer, result) {
                    error!(
                        mission = %self.name,
                        producer = %producer,
                        error = %err,
                        "input delivered twice in one run"
                    );
                }
            }
            Delivery::Poison => inputs.poisoned = true,
        }

        match inputs.unmet_dependencies.checked_sub(1) {
            Some(remaining) => {
                inputs.unmet_dependencies = remaining;
                remaining == 0
            }
            None => {
                error!(
                    mission = %self.name,
                    producer = %producer,
                    "delivery to a node with no unmet dependencies"
                );
                false
            }
        }
    }

    /// Restore the per-run fields from the static dependency edges.
    pub fn reset_inputs(&self) {
        let mut inputs = lock(&self.inputs);
        inputs.unmet_dependencies = self.dependency_count;
        inputs.store.clear();
        inputs.poisoned = false;
    }
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("name", &self.name)
            .field("dependency_count", &self.dependency_count)
            .field("dependents", &self.dependent_count())
            .field("run_state", &self.run_state())
            .finish_non_exhaustive()
    }
}

/// Lock a node mutex, recovering the data if a holder panicked.
///
/// Mission code never runs while one of these locks is held.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
