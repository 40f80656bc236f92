// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod logging;
pub mod mission;
pub mod store;
pub mod types;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::{build_scheduler, load_and_validate};
use crate::config::model::ConfigFile;

pub use crate::dag::{MissionFailure, RunReport, RunState, Scheduler};
pub use crate::errors::MissionDagError;
pub use crate::mission::{CommandMission, FnMission, Mission, MissionName};
pub use crate::store::{ResultStore, Value, value};

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, builds a scheduler of command missions
/// and runs it `--repeat` times in sequence.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let scheduler = build_scheduler(&cfg)?;

    for iteration in 1..=args.repeat {
        let report = scheduler.run_report().await?;
        info!(
            iteration,
            finished = report.finished.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "run complete"
        );

        print_results(&report.results);

        if !report.is_success() {
            for failure in &report.failures {
                eprintln!("mission '{}' failed: {:#}", failure.mission, failure.error);
            }
            if !report.skipped.is_empty() {
                eprintln!("skipped: {}", report.skipped.join(", "));
            }
            bail!(
                "{} mission(s) failed, {} skipped",
                report.failures.len(),
                report.skipped.len()
            );
        }
    }

    Ok(())
}

/// Print `name = value` for every string result, sorted by name.
fn print_results(results: &ResultStore) {
    let mut names: Vec<&str> = results.names().collect();
    names.sort_unstable();

    for name in names {
        if let Ok(text) = results.get_as::<String>(name) {
            println!("{name} = {text}");
        }
    }
}

/// Simple dry-run output: print missions in registration order with their
/// commands and dependencies.
fn print_dry_run(cfg: &ConfigFile) {
    println!("missiondag dry-run");
    println!("  default.capture = {:?}", cfg.default.capture);
    println!();

    println!("missions ({}):", cfg.mission.len());
    for name in cfg.registration_order() {
        let Some(mission) = cfg.mission.get(name) else {
            continue;
        };
        println!("  - {name}");
        println!("      cmd: {}", mission.cmd);
        if !mission.after.is_empty() {
            println!("      after: {:?}", mission.after);
        }
        if let Some(capture) = mission.capture {
            println!("      capture: {capture:?}");
        }
    }

    debug!("dry-run complete (no execution)");
}
