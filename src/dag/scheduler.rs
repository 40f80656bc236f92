// src/dag/scheduler.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::node::{Delivery, GraphNode};
use crate::dag::run_report::{MissionFailure, NodeReport, RunReport};
use crate::dag::run_state::RunState;
use crate::dag::state_manager::{StateManager, deliver_to_dependents};
use crate::errors::{MissionDagError, Result};
use crate::mission::{Mission, MissionName};
use crate::store::ResultStore;

/// Scheduler holds the mission graph plus the per-node run state.
///
/// It is responsible for:
/// - validating registrations (unique names, known dependencies)
/// - wiring each new mission under the missions it depends on
/// - running every mission once per run, as soon as its dependencies are done
/// - handing each mission exactly the results of its direct dependencies
/// - skipping everything downstream of a failed mission
/// - resetting per-run state so the same graph can run again
///
/// A dependency must be registered before anything can depend on it, so the
/// graph is acyclic by construction.
pub struct Scheduler {
    /// Nodes in registration order.
    nodes: Vec<Arc<GraphNode>>,
    index: HashMap<MissionName, usize>,
    /// Set while a `run` call is active.
    running: AtomicBool,
    /// Node workers spawned and not yet finished, across runs.
    in_flight: Arc<AtomicUsize>,
    /// Monotonically increasing run ID, for logs.
    run_counter: AtomicU64,
}

/// Shared by every worker of one run.
#[derive(Clone)]
struct RunContext {
    run_id: u64,
    report_tx: mpsc::Sender<NodeReport>,
    in_flight: Arc<AtomicUsize>,
}

/// Clears `running` when a run call returns or its future is dropped.
struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            running: AtomicBool::new(false),
            in_flight: Arc::new(AtomicUsize::new(0)),
            run_counter: AtomicU64::new(0),
        }
    }

    /// Number of registered missions.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Mission names in registration order.
    pub fn mission_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.name.as_str())
    }

    /// Deduplicated direct dependencies of `name`, in declaration order.
    pub fn dependencies_of(&self, name: &str) -> Result<Vec<MissionName>> {
        let node = self.node(name)?;
        let mut deps: Vec<MissionName> = Vec::with_capacity(node.dependency_count);
        for dep in node.mission.dependencies() {
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
        Ok(deps)
    }

    /// Register a mission.
    ///
    /// Fails without touching the graph if the mission has no name, its name
    /// is taken, or one of its dependencies is not registered yet.
    pub fn register<M: Mission + 'static>(&mut self, mission: M) -> Result<()> {
        if self.in_flight.load(Ordering::Acquire) > 0 {
            return Err(MissionDagError::RunInProgress);
        }

        let mission: Arc<dyn Mission> = Arc::new(mission);
        let name = mission.name();

        if name.trim().is_empty() {
            return Err(MissionDagError::NullMission);
        }
        if self.index.contains_key(name) {
            return Err(MissionDagError::DuplicateName(name.to_string()));
        }

        // Validate every dependency before wiring any edge.
        let mut dep_indices: Vec<usize> = Vec::new();
        for dep in mission.dependencies() {
            let Some(&idx) = self.index.get(dep) else {
                return Err(MissionDagError::UnknownDependency {
                    mission: name.to_string(),
                    dependency: dep.clone(),
                });
            };
            if !dep_indices.contains(&idx) {
                dep_indices.push(idx);
            }
        }

        let node = Arc::new(GraphNode::new(Arc::clone(&mission), dep_indices.len()));
        for &idx in &dep_indices {
            self.nodes[idx].add_dependent(Arc::clone(&node));
        }

        debug!(
            mission = %node.name,
            dependencies = dep_indices.len(),
            "registered mission"
        );

        self.index.insert(node.name.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Current run state of `name`.
    ///
    /// Meant for observability; the value may already be stale when read.
    pub fn run_state(&self, name: &str) -> Result<RunState> {
        Ok(self.node(name)?.run_state())
    }

    /// Run every mission once and return the aggregate store.
    ///
    /// Fails with [`MissionDagError::MissionFailed`] for the first mission
    /// that failed; the rest of the graph still ran as far as it could.
    pub async fn run(&self) -> Result<ResultStore> {
        self.run_report().await?.into_result()
    }

    /// Run every mission once and report what happened to each of them.
    ///
    /// Only fails if a run is already in progress (or detached workers of an
    /// abandoned run are still going).
    pub async fn run_report(&self) -> Result<RunReport> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(MissionDagError::RunInProgress);
        }
        let _guard = RunGuard {
            running: &self.running,
        };
        if self.in_flight.load(Ordering::Acquire) > 0 {
            return Err(MissionDagError::RunInProgress);
        }

        let started = Instant::now();
        let run_id = self.run_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let mut report = RunReport::default();

        if self.nodes.is_empty() {
            debug!(run_id, "no missions registered; run finished immediately");
            return Ok(report);
        }

        let manager = StateManager::new(&self.nodes);
        if manager.needs_reset() {
            manager.reset_for_new_run();
        }

        let frontier = manager.initial_frontier();
        info!(
            run_id,
            missions = self.nodes.len(),
            frontier = frontier.len(),
            "starting mission run"
        );

        // One report per node; sized so no worker ever waits to send.
        let (report_tx, mut report_rx) = mpsc::channel::<NodeReport>(self.nodes.len());
        let ctx = RunContext {
            run_id,
            report_tx,
            in_flight: Arc::clone(&self.in_flight),
        };
        for node in frontier {
            dispatch(node, ctx.clone());
        }
        drop(ctx);

        while report.reported() < self.nodes.len() {
            let Some(node_report) = report_rx.recv().await else {
                manager.clear_transient_state();
                return Err(anyhow!(
                    "run {run_id}: workers stopped after {} of {} missions reported",
                    report.reported(),
                    self.nodes.len()
                )
                .into());
            };

            match node_report {
                NodeReport::Finished { mission, result } => {
                    report.results.register_result(&mission, result)?;
                    report.finished.push(mission);
                }
                NodeReport::Failed(failure) => report.failures.push(failure),
                NodeReport::Skipped { mission } => report.skipped.push(mission),
            }
        }

        manager.clear_transient_state();
        report.elapsed = started.elapsed();

        if report.is_success() {
            info!(
                run_id,
                finished = report.finished.len(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "mission run finished"
            );
        } else {
            warn!(
                run_id,
                finished = report.finished.len(),
                failed = report.failures.len(),
                skipped = report.skipped.len(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "mission run finished with failures"
            );
        }

        Ok(report)
    }

    fn node(&self, name: &str) -> Result<&Arc<GraphNode>> {
        self.index
            .get(name)
            .map(|&idx| &self.nodes[idx])
            .ok_or_else(|| MissionDagError::NotFound(name.to_string()))
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("nodes", &self.nodes)
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish()
    }
}

/// Start `node` on its own Tokio task.
fn dispatch(node: Arc<GraphNode>, ctx: RunContext) {
    ctx.in_flight.fetch_add(1, Ordering::AcqRel);
    tokio::spawn(perform_node(node, ctx));
}

async fn perform_node(node: Arc<GraphNode>, ctx: RunContext) {
    let report = if node.is_poisoned() {
        skip_node(&node, &ctx)
    } else {
        execute_node(&node, &ctx).await
    };

    // Dependents were dispatched above, so the count cannot touch zero
    // while the run still has work.
    ctx.in_flight.fetch_sub(1, Ordering::AcqRel);

    if ctx.report_tx.send(report).await.is_err() {
        debug!(
            run_id = ctx.run_id,
            mission = %node.name,
            "run collector is gone; dropping report"
        );
    }
}

async fn execute_node(node: &Arc<GraphNode>, ctx: &RunContext) -> NodeReport {
    node.set_run_state(RunState::Running);
    debug!(run_id = ctx.run_id, mission = %node.name, "performing mission");

    let inputs = Arc::new(node.inputs_snapshot());
    let mission = Arc::clone(&node.mission);

    // Run the action on its own task so a panic is contained.
    let outcome = match tokio::spawn(async move { mission.perform(inputs).await }).await {
        Ok(outcome) => outcome,
        Err(join_err) => Err(anyhow!("mission panicked: {join_err}")),
    };

    match outcome {
        Ok(result) => {
            // Terminal state first, so no dependent is ever seen running
            // next to a producer that still reads as `Running`.
            node.set_run_state(RunState::Finished);
            debug!(run_id = ctx.run_id, mission = %node.name, "mission finished");
            for ready in deliver_to_dependents(node, &Delivery::Result(result.clone())) {
                dispatch(ready, ctx.clone());
            }

            NodeReport::Finished {
                mission: node.name.clone(),
                result,
            }
        }
        Err(error) => {
            warn!(
                run_id = ctx.run_id,
                mission = %node.name,
                error = %error,
                "mission failed; skipping its dependents in this run"
            );
            node.set_run_state(RunState::Failed);
            for ready in deliver_to_dependents(node, &Delivery::Poison) {
                dispatch(ready, ctx.clone());
            }

            NodeReport::Failed(MissionFailure {
                mission: node.name.clone(),
                error,
            })
        }
    }
}

fn skip_node(node: &Arc<GraphNode>, ctx: &RunContext) -> NodeReport {
    node.set_run_state(RunState::Skipped);
    debug!(
        run_id = ctx.run_id,
        mission = %node.name,
        "upstream mission failed; skipping"
    );

    for ready in deliver_to_dependents(node, &Delivery::Poison) {
        dispatch(ready, ctx.clone());
    }

    NodeReport::Skipped {
        mission: node.name.clone(),
    }
}
