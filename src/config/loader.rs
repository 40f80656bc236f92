// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::Scheduler;
use crate::errors::{MissionDagError, Result};
use crate::mission::CommandMission;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (unknown dependencies, cycles). Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for unknown `after` references and cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    debug!(
        path = %path.as_ref().display(),
        missions = config.mission.len(),
        "loaded mission config"
    );
    Ok(config)
}

/// Default config path: `Missions.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Missions.toml")
}

/// Build a scheduler with one [`CommandMission`] per configured mission.
///
/// Missions are registered in `registration_order`, so every dependency is
/// known by the time a dependent is registered.
pub fn build_scheduler(cfg: &ConfigFile) -> Result<Scheduler> {
    let mut scheduler = Scheduler::new();

    for name in cfg.registration_order() {
        let mission = cfg.mission.get(name).ok_or_else(|| {
            MissionDagError::ConfigError(format!(
                "mission '{}' is in the registration order but not configured",
                name
            ))
        })?;

        scheduler.register(CommandMission::new(
            name.clone(),
            mission.cmd.clone(),
            mission.after.clone(),
            cfg.capture_of(mission),
        ))?;
    }

    Ok(scheduler)
}
