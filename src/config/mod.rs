// src/config/mod.rs

//! Configuration loading and validation for missiondag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and turn it into a scheduler (`loader.rs`).
//! - Validate dependencies and compute a registration order (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{build_scheduler, default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, DefaultSection, MissionConfig, RawConfigFile};
