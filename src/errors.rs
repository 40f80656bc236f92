// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::mission::MissionName;

#[derive(Error, Debug)]
pub enum MissionDagError {
    #[error("Cannot register a mission without a name")]
    NullMission,

    #[error("Mission already registered: {0}")]
    DuplicateName(MissionName),

    #[error("Mission {mission} depends on mission {dependency} which was never registered")]
    UnknownDependency {
        mission: MissionName,
        dependency: MissionName,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("A result is already registered under {0}")]
    DuplicateKey(MissionName),

    #[error("Result {name} is not of type {expected}")]
    TypeMismatch {
        name: MissionName,
        expected: &'static str,
    },

    #[error("More than one result of type {0}; look it up by name instead")]
    AmbiguousType(&'static str),

    #[error("A run is already in progress on this scheduler")]
    RunInProgress,

    #[error("Mission {mission} failed ({skipped} dependent mission(s) skipped): {source}")]
    MissionFailed {
        mission: MissionName,
        skipped: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in mission graph: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MissionDagError>;
