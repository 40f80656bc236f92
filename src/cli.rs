// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::loader::default_config_path;

/// Command-line arguments for `missiondag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "missiondag",
    version,
    about = "Run a graph of shell commands, each as soon as its dependencies are done.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Missions.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MISSIONDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the mission graph, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,

    /// Run the whole graph this many times in sequence.
    #[arg(long, value_name = "N", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["missiondag"]).unwrap();
        assert_eq!(args.config, default_config_path());
        assert_eq!(args.repeat, 1);
        assert!(!args.dry_run);
        assert!(args.log_level.is_none());
    }

    #[test]
    fn repeat_must_be_positive() {
        assert!(CliArgs::try_parse_from(["missiondag", "--repeat", "0"]).is_err());

        let args = CliArgs::try_parse_from(["missiondag", "--repeat", "3", "--log-level", "debug"])
            .unwrap();
        assert_eq!(args.repeat, 3);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
