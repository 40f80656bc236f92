// tests/config_loader.rs

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tempfile::TempDir;

use missiondag::cli::CliArgs;
use missiondag::config::{build_scheduler, load_and_validate, load_from_path};
use missiondag::errors::MissionDagError;
use missiondag::types::CaptureMode;
use missiondag_test_utils::{ConfigFileBuilder, MissionConfigBuilder, init_tracing, with_timeout};

fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("Missions.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, MissionDagError::IoError(_)));
}

#[test]
fn invalid_toml_is_a_toml_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[mission.a\ncmd = 1");
    assert!(matches!(
        load_from_path(&path),
        Err(MissionDagError::TomlError(_))
    ));
}

#[test]
fn unknown_dependency_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[mission.build]
cmd = "echo build"
after = ["fetch"]
"#,
    );

    match load_and_validate(&path) {
        Err(MissionDagError::ConfigError(msg)) => {
            assert!(msg.contains("unknown dependency 'fetch'"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn builder_config_respects_default_capture() {
    let cfg = ConfigFileBuilder::new()
        .with_default_capture(CaptureMode::None)
        .with_mission("a", MissionConfigBuilder::new("echo a").build())
        .with_mission(
            "b",
            MissionConfigBuilder::new("echo b")
                .after("a")
                .capture(CaptureMode::Stdout)
                .build(),
        )
        .build();

    assert_eq!(cfg.registration_order(), ["a".to_string(), "b".to_string()]);
    assert_eq!(cfg.capture_of(&cfg.mission["a"]), CaptureMode::None);
    assert_eq!(cfg.capture_of(&cfg.mission["b"]), CaptureMode::Stdout);
}

#[test]
fn builder_rejects_cycles() {
    let err = ConfigFileBuilder::new()
        .with_mission("x", MissionConfigBuilder::new("echo x").after("y").build())
        .with_mission("y", MissionConfigBuilder::new("echo y").after("x").build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, MissionDagError::DagCycle(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn loaded_config_runs_commands_in_order() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[mission.report]
cmd = "echo \"$MISSIONDAG_INPUT_BUILD and $MISSIONDAG_INPUT_LINT\""
after = ["build", "lint"]

[mission.build]
cmd = "echo built-$MISSIONDAG_INPUT_FETCH"
after = ["fetch"]

[mission.lint]
cmd = "echo lint-ok"
after = ["fetch"]

[mission.fetch]
cmd = "echo data"

[mission.silent]
cmd = "echo hidden"
capture = "none"
"#,
    );

    let cfg = load_and_validate(&path).unwrap();
    let scheduler = build_scheduler(&cfg).unwrap();
    assert_eq!(scheduler.len(), 5);

    let store = with_timeout(scheduler.run()).await.unwrap();

    assert_eq!(store.count(), 4);
    assert!(!store.contains("silent"));
    assert_eq!(store.get_as::<String>("build").unwrap().as_str(), "built-data");
    assert_eq!(
        store.get_as::<String>("report").unwrap().as_str(),
        "built-data and lint-ok"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn failing_command_skips_dependents() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[mission.broken]
cmd = "echo oops >&2; exit 2"

[mission.after_broken]
cmd = "echo never"
after = ["broken"]

[mission.fine]
cmd = "echo fine"
"#,
    );

    let scheduler = build_scheduler(&load_and_validate(&path).unwrap()).unwrap();
    let report = with_timeout(scheduler.run_report()).await.unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].mission, "broken");
    assert!(report.failures[0].error.to_string().contains("exited with code 2"));
    assert_eq!(report.skipped, vec!["after_broken"]);
    assert_eq!(report.finished, vec!["fine"]);
}

#[cfg(unix)]
#[tokio::test]
async fn cli_entry_point_runs_and_repeats() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let counter = dir.path().join("count");
    let path = write_config(
        &dir,
        &format!(
            "[mission.tick]\ncmd = \"echo x >> {}\"\ncapture = \"none\"\n",
            counter.display()
        ),
    );

    let args = CliArgs::try_parse_from([
        "missiondag",
        "--config",
        path.to_str().unwrap(),
        "--repeat",
        "3",
    ])
    .unwrap();
    with_timeout(missiondag::run(args)).await.unwrap();

    assert_eq!(fs::read_to_string(&counter).unwrap().lines().count(), 3);
}

#[cfg(unix)]
#[tokio::test]
async fn cli_dry_run_executes_nothing() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("marker");
    let path = write_config(
        &dir,
        &format!("[mission.touch]\ncmd = \"touch {}\"\n", marker.display()),
    );

    let args = CliArgs::try_parse_from([
        "missiondag",
        "--config",
        path.to_str().unwrap(),
        "--dry-run",
    ])
    .unwrap();
    missiondag::run(args).await.unwrap();

    assert!(!marker.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn cli_fails_when_a_mission_fails() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[mission.bad]\ncmd = \"exit 1\"\n");

    let args =
        CliArgs::try_parse_from(["missiondag", "--config", path.to_str().unwrap()]).unwrap();
    let err = with_timeout(missiondag::run(args)).await.unwrap_err();
    assert!(err.to_string().contains("1 mission(s) failed"));
}
