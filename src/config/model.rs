// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::mission::MissionName;
use crate::types::CaptureMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [default]
/// capture = "stdout"
///
/// [mission.fetch]
/// cmd = "echo data"
///
/// [mission.build]
/// cmd = "echo built from $MISSIONDAG_INPUT_FETCH"
/// after = ["fetch"]
/// ```
///
/// Missions may appear in any order in the file; dependency order is worked
/// out during validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Defaults from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// All missions from `[mission.<name>]`, keyed by mission name.
    #[serde(default)]
    pub mission: BTreeMap<MissionName, MissionConfig>,
}

/// A validated configuration.
///
/// Only constructed through `ConfigFile::try_from(RawConfigFile)`, which
/// rejects unknown dependencies and cycles.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub default: DefaultSection,
    pub mission: BTreeMap<MissionName, MissionConfig>,
    /// Mission names in an order where every dependency comes first.
    registration_order: Vec<MissionName>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        default: DefaultSection,
        mission: BTreeMap<MissionName, MissionConfig>,
        registration_order: Vec<MissionName>,
    ) -> Self {
        Self {
            default,
            mission,
            registration_order,
        }
    }

    /// Mission names in dependency order.
    pub fn registration_order(&self) -> &[MissionName] {
        &self.registration_order
    }

    /// Effective capture mode of a mission, taking `[default]` into account.
    pub fn capture_of(&self, mission: &MissionConfig) -> CaptureMode {
        mission.capture.unwrap_or(self.default.capture)
    }
}

/// `[default]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultSection {
    /// Capture mode for missions that do not set their own.
    #[serde(default)]
    pub capture: CaptureMode,
}

/// `[mission.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MissionConfig {
    /// Shell command to execute.
    pub cmd: String,

    /// Missions whose results this one waits for (`after = ["A", "B"]`).
    #[serde(default)]
    pub after: Vec<MissionName>,

    /// Overrides `default.capture`.
    #[serde(default)]
    pub capture: Option<CaptureMode>,
}
