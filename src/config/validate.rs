// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{MissionDagError, Result};
use crate::mission::MissionName;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::MissionDagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let order = validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.default, raw.mission, order))
    }
}

/// Validate a raw config and return a dependency-first registration order.
///
/// This checks:
/// - there is at least one mission
/// - every mission has a non-empty `cmd`
/// - all `after` entries refer to existing missions (and not to themselves)
/// - the mission graph has no cycles
///
/// The scheduler itself only accepts dependencies that are already
/// registered, so a file listing missions out of order needs this explicit
/// cycle check plus a topological order to register in.
fn validate_raw_config(cfg: &RawConfigFile) -> Result<Vec<MissionName>> {
    ensure_has_missions(cfg)?;
    validate_commands(cfg)?;
    validate_mission_dependencies(cfg)?;
    registration_order(cfg)
}

fn ensure_has_missions(cfg: &RawConfigFile) -> Result<()> {
    if cfg.mission.is_empty() {
        return Err(MissionDagError::ConfigError(
            "config must contain at least one [mission.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    for (name, mission) in cfg.mission.iter() {
        if name.trim().is_empty() {
            return Err(MissionDagError::ConfigError(
                "mission names must not be empty".to_string(),
            ));
        }
        if mission.cmd.trim().is_empty() {
            return Err(MissionDagError::ConfigError(format!(
                "mission '{}' has an empty `cmd`",
                name
            )));
        }
    }
    Ok(())
}

fn validate_mission_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, mission) in cfg.mission.iter() {
        for dep in mission.after.iter() {
            if !cfg.mission.contains_key(dep) {
                return Err(MissionDagError::ConfigError(format!(
                    "mission '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(MissionDagError::ConfigError(format!(
                    "mission '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn registration_order(cfg: &RawConfigFile) -> Result<Vec<MissionName>> {
    // Edge direction: dep -> mission
    // For:
    //   [mission.B]
    //   after = ["A"]
    // we add edge A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.mission.keys() {
        graph.add_node(name.as_str());
    }

    for (name, mission) in cfg.mission.iter() {
        for dep in mission.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(MissionDagError::DagCycle(format!(
                "cycle detected in mission graph involving mission '{}'",
                node
            )))
        }
    }
}
