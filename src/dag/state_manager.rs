// src/dag/state_manager.rs

//! Per-run state management for mission nodes.

use std::sync::Arc;

use tracing::debug;

use crate::dag::node::{Delivery, GraphNode};
use crate::dag::run_state::RunState;

/// Manages per-run state transitions across the whole node table.
pub(crate) struct StateManager<'a> {
    nodes: &'a [Arc<GraphNode>],
}

impl<'a> StateManager<'a> {
    pub(crate) fn new(nodes: &'a [Arc<GraphNode>]) -> Self {
        Self { nodes }
    }

    /// Whether a previous run left any node outside `Waiting`.
    pub fn needs_reset(&self) -> bool {
        self.nodes
            .iter()
            .any(|node| node.run_state() != RunState::Waiting)
    }

    /// Put every node back to its pre-run state: counters recomputed from the
    /// static edges, inputs cleared, `Waiting`.
    pub fn reset_for_new_run(&self) {
        for node in self.nodes {
            node.reset_inputs();
            node.set_run_state(RunState::Waiting);
        }
        debug!(nodes = self.nodes.len(), "reset all nodes for a new run");
    }

    /// Clear transient per-run data once every node has reported.
    ///
    /// Run states are left alone so the outcome stays observable until the
    /// next run starts.
    pub fn clear_transient_state(&self) {
        for node in self.nodes {
            node.reset_inputs();
        }
    }

    /// Snapshot of the nodes with no unmet dependencies.
    ///
    /// Collected in full before anything is dispatched, so completions can
    /// never change the set while it is being built.
    pub(crate) fn initial_frontier(&self) -> Vec<Arc<GraphNode>> {
        self.nodes
            .iter()
            .filter(|node| node.unmet_dependencies() == 0)
            .cloned()
            .collect()
    }
}

/// Hand `delivery` from `producer` to each of its dependents.
///
/// Returns the dependents whose last unmet dependency this was; the caller
/// dispatches them.
pub(crate) fn deliver_to_dependents(
    producer: &GraphNode,
    delivery: &Delivery,
) -> Vec<Arc<GraphNode>> {
    let mut ready = Vec::new();

    for dependent in producer.dependents() {
        if dependent.deliver(&producer.name, delivery.clone()) {
            debug!(
                mission = %dependent.name,
                producer = %producer.name,
                "all dependencies reported; mission is ready"
            );
            ready.push(dependent);
        }
    }

    ready
}
