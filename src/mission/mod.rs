// src/mission/mod.rs

//! Units of work the scheduler runs.
//!
//! The scheduler talks to a [`Mission`] trait object instead of a concrete
//! type, so callers can plug in anything that has a name, a list of
//! dependencies and an async action.
//!
//! - [`func`] adapts a plain closure into a mission (`FnMission`).
//! - [`command`] runs a shell command as a mission (`CommandMission`); this
//!   is what the `missiondag` binary builds from its config file.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::store::{ResultStore, Value};

pub mod command;
pub mod func;

pub use command::CommandMission;
pub use func::FnMission;

/// Canonical mission name type used throughout the crate.
pub type MissionName = String;

/// What a mission's action yields: an optional value, or an error that fails
/// the mission (and skips everything downstream of it).
pub type MissionOutput = anyhow::Result<Option<Value>>;

/// Boxed future returned by [`Mission::perform`].
pub type MissionFuture<'a> = Pin<Box<dyn Future<Output = MissionOutput> + Send + 'a>>;

/// A named unit of work with declared dependencies.
///
/// `perform` may be invoked from any worker task; implementations must not
/// assume a particular thread. Long blocking work should be moved off the
/// async workers (see [`FnMission`], which uses `spawn_blocking`).
pub trait Mission: Send + Sync {
    /// Unique name of this mission.
    fn name(&self) -> &str;

    /// Names of the missions whose results this one needs.
    ///
    /// Duplicates are allowed; the scheduler deduplicates them.
    fn dependencies(&self) -> &[MissionName];

    /// Run the mission.
    ///
    /// `inputs` holds exactly the results of this mission's direct
    /// dependencies, keyed by producer name.
    fn perform(&self, inputs: Arc<ResultStore>) -> MissionFuture<'_>;
}

impl<M: Mission + ?Sized> Mission for Arc<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn dependencies(&self) -> &[MissionName] {
        (**self).dependencies()
    }

    fn perform(&self, inputs: Arc<ResultStore>) -> MissionFuture<'_> {
        (**self).perform(inputs)
    }
}

impl<M: Mission + ?Sized> Mission for Box<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn dependencies(&self) -> &[MissionName] {
        (**self).dependencies()
    }

    fn perform(&self, inputs: Arc<ResultStore>) -> MissionFuture<'_> {
        (**self).perform(inputs)
    }
}
