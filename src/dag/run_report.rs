// src/dag/run_report.rs

//! Structured outcome of one scheduler run.

use std::time::Duration;

use crate::errors::{MissionDagError, Result};
use crate::mission::MissionName;
use crate::store::{ResultStore, Value};

/// A mission whose `perform` returned an error (or panicked).
#[derive(Debug)]
pub struct MissionFailure {
    pub mission: MissionName,
    pub error: anyhow::Error,
}

/// What each node reports to the run's collector when it is done.
pub(crate) enum NodeReport {
    Finished {
        mission: MissionName,
        result: Option<Value>,
    },
    Failed(MissionFailure),
    Skipped {
        mission: MissionName,
    },
}

/// Everything one run produced.
///
/// Every registered mission appears in exactly one of `finished`,
/// `failures` or `skipped`. Each list is in the order the reports arrived.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Results of finished missions that produced a value, keyed by name.
    pub results: ResultStore,
    pub finished: Vec<MissionName>,
    pub failures: Vec<MissionFailure>,
    /// Missions never performed because something upstream failed.
    pub skipped: Vec<MissionName>,
    pub elapsed: Duration,
}

impl RunReport {
    /// Whether every mission finished.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    /// Total number of missions that reported.
    pub fn reported(&self) -> usize {
        self.finished.len() + self.failures.len() + self.skipped.len()
    }

    /// The aggregate store on success, or the first failure.
    pub fn into_result(mut self) -> Result<ResultStore> {
        if self.failures.is_empty() {
            return Ok(self.results);
        }

        let first = self.failures.remove(0);
        Err(MissionDagError::MissionFailed {
            mission: first.mission,
            skipped: self.skipped.len(),
            source: first.error,
        })
    }
}
