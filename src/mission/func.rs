// src/mission/func.rs

//! Closure-backed missions.

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;

use crate::mission::{Mission, MissionFuture, MissionName, MissionOutput};
use crate::store::{ResultStore, Value};

type MissionFn = dyn Fn(&ResultStore) -> MissionOutput + Send + Sync;

/// A mission whose action is a plain closure.
///
/// The closure runs on Tokio's blocking pool, so it may block freely.
#[derive(Clone)]
pub struct FnMission {
    name: MissionName,
    dependencies: Vec<MissionName>,
    action: Arc<MissionFn>,
}

impl FnMission {
    pub fn new<F>(name: impl Into<MissionName>, action: F) -> Self
    where
        F: Fn(&ResultStore) -> MissionOutput + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            action: Arc::new(action),
        }
    }

    /// A mission that ignores its inputs and always yields `value`.
    pub fn returning(name: impl Into<MissionName>, value: Value) -> Self {
        Self::new(name, move |_| Ok(Some(Arc::clone(&value))))
    }

    /// Add a dependency on `dependency`.
    pub fn after(mut self, dependency: impl Into<MissionName>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Replace the dependency list.
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MissionName>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for FnMission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMission")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl Mission for FnMission {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[MissionName] {
        &self.dependencies
    }

    fn perform(&self, inputs: Arc<ResultStore>) -> MissionFuture<'_> {
        let action = Arc::clone(&self.action);
        let name = self.name.clone();

        Box::pin(async move {
            tokio::task::spawn_blocking(move || action(inputs.as_ref()))
                .await
                .map_err(|e| anyhow!("closure of mission '{name}' did not complete: {e}"))?
        })
    }
}
