#![allow(dead_code)]

use std::collections::BTreeMap;

use missiondag::config::{ConfigFile, DefaultSection, MissionConfig, RawConfigFile};
use missiondag::errors::Result;
use missiondag::types::CaptureMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                default: DefaultSection::default(),
                mission: BTreeMap::new(),
            },
        }
    }

    pub fn with_mission(mut self, name: &str, mission: MissionConfig) -> Self {
        self.config.mission.insert(name.to_string(), mission);
        self
    }

    pub fn with_default_capture(mut self, capture: CaptureMode) -> Self {
        self.config.default.capture = capture;
        self
    }

    /// The raw, unvalidated config.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `MissionConfig`.
pub struct MissionConfigBuilder {
    mission: MissionConfig,
}

impl MissionConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            mission: MissionConfig {
                cmd: cmd.to_string(),
                after: vec![],
                capture: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.mission.after.push(dep.to_string());
        self
    }

    pub fn capture(mut self, capture: CaptureMode) -> Self {
        self.mission.capture = Some(capture);
        self
    }

    pub fn build(self) -> MissionConfig {
        self.mission
    }
}
