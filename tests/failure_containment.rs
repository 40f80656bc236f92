// tests/failure_containment.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use missiondag::errors::MissionDagError;
use missiondag::{FnMission, RunState, Scheduler, value};
use missiondag_test_utils::{ControlledMission, init_tracing, with_timeout};

/// ```text
/// ok_root -> ok_leaf
/// bad -> child -> grandchild
///   \--------------------------> joined <- ok_root
/// ```
fn graph_with_one_failure() -> (Scheduler, Arc<ControlledMission>, Arc<ControlledMission>) {
    let child = ControlledMission::new("child").after("bad").shared();
    let ok_leaf = ControlledMission::new("ok_leaf")
        .after("ok_root")
        .returning(value("fine".to_string()))
        .shared();

    let mut scheduler = Scheduler::new();
    scheduler
        .register(ControlledMission::new("ok_root"))
        .unwrap();
    scheduler.register(Arc::clone(&ok_leaf)).unwrap();
    scheduler
        .register(ControlledMission::new("bad").failing("disk on fire"))
        .unwrap();
    scheduler.register(Arc::clone(&child)).unwrap();
    scheduler
        .register(ControlledMission::new("grandchild").after("child"))
        .unwrap();
    scheduler
        .register(
            ControlledMission::new("joined")
                .after("bad")
                .after("ok_root"),
        )
        .unwrap();

    (scheduler, child, ok_leaf)
}

#[tokio::test]
async fn failure_skips_dependents_and_keeps_other_branches() {
    init_tracing();
    let (scheduler, child, ok_leaf) = graph_with_one_failure();

    let mut report = with_timeout(scheduler.run_report()).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.reported(), 6);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].mission, "bad");
    assert!(report.failures[0].error.to_string().contains("disk on fire"));

    report.skipped.sort();
    assert_eq!(report.skipped, vec!["child", "grandchild", "joined"]);
    report.finished.sort();
    assert_eq!(report.finished, vec!["ok_leaf", "ok_root"]);

    assert_eq!(child.started_count(), 0);
    assert_eq!(ok_leaf.finished_count(), 1);
    assert_eq!(
        report.results.get_as::<String>("ok_leaf").unwrap().as_str(),
        "fine"
    );

    assert_eq!(scheduler.run_state("bad").unwrap(), RunState::Failed);
    assert_eq!(scheduler.run_state("grandchild").unwrap(), RunState::Skipped);
    assert_eq!(scheduler.run_state("ok_leaf").unwrap(), RunState::Finished);
}

#[tokio::test]
async fn run_reports_the_failed_mission() {
    init_tracing();
    let (scheduler, _, _) = graph_with_one_failure();

    match with_timeout(scheduler.run()).await {
        Err(MissionDagError::MissionFailed {
            mission,
            skipped,
            source,
        }) => {
            assert_eq!(mission, "bad");
            assert_eq!(skipped, 3);
            assert!(source.to_string().contains("disk on fire"));
        }
        other => panic!("expected MissionFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn panicking_mission_is_reported_as_failed() {
    init_tracing();
    let after_panic = ControlledMission::new("after").after("boom").shared();
    let mut scheduler = Scheduler::new();
    scheduler
        .register(ControlledMission::new("boom").panicking())
        .unwrap();
    scheduler.register(Arc::clone(&after_panic)).unwrap();
    scheduler.register(ControlledMission::new("bystander")).unwrap();

    let report = with_timeout(scheduler.run_report()).await.unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.to_string().contains("panicked"));
    assert_eq!(report.skipped, vec!["after"]);
    assert_eq!(report.finished, vec!["bystander"]);
    assert_eq!(after_panic.started_count(), 0);
}

#[tokio::test]
async fn graph_recovers_once_the_failure_goes_away() {
    init_tracing();
    let attempts = Arc::new(AtomicUsize::new(0));
    let flaky = {
        let attempts = Arc::clone(&attempts);
        FnMission::new("flaky", move |_| {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("first attempt fails");
            }
            Ok(Some(value(7u32)))
        })
    };

    let mut scheduler = Scheduler::new();
    scheduler.register(flaky).unwrap();
    scheduler
        .register(
            FnMission::new("double", |inputs| {
                Ok(Some(value(*inputs.get_as::<u32>("flaky")? * 2)))
            })
            .after("flaky"),
        )
        .unwrap();

    assert!(with_timeout(scheduler.run()).await.is_err());
    assert_eq!(scheduler.run_state("double").unwrap(), RunState::Skipped);

    let store = with_timeout(scheduler.run()).await.unwrap();
    assert_eq!(*store.get_as::<u32>("double").unwrap(), 14);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn overlapping_run_is_refused() {
    init_tracing();
    let slow = ControlledMission::new("slow").gated().shared();
    let mut scheduler = Scheduler::new();
    scheduler.register(Arc::clone(&slow)).unwrap();
    let scheduler = Arc::new(scheduler);

    let first = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.run().await })
    };
    with_timeout(slow.wait_started(1)).await;

    assert!(matches!(
        scheduler.run().await,
        Err(MissionDagError::RunInProgress)
    ));

    slow.release();
    with_timeout(first).await.unwrap().unwrap();
    assert_eq!(slow.started_count(), 1);
}

#[tokio::test]
async fn abandoned_run_blocks_until_its_workers_finish() {
    init_tracing();
    let slow = ControlledMission::new("slow").gated().shared();
    let mut scheduler = Scheduler::new();
    scheduler.register(Arc::clone(&slow)).unwrap();

    // Drop the run future while "slow" is still in flight.
    let abandoned = tokio::time::timeout(Duration::from_millis(50), scheduler.run()).await;
    assert!(abandoned.is_err());
    assert_eq!(slow.started_count(), 1);

    assert!(matches!(
        scheduler.register(ControlledMission::new("late")),
        Err(MissionDagError::RunInProgress)
    ));
    assert!(matches!(
        scheduler.run().await,
        Err(MissionDagError::RunInProgress)
    ));

    // One permit for the detached worker, one for the next run.
    slow.release();
    slow.release();

    let store = with_timeout(async {
        loop {
            match scheduler.run().await {
                Err(MissionDagError::RunInProgress) => {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                other => break other,
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(store.count(), 0);
    assert_eq!(slow.finished_count(), 2);
    scheduler.register(ControlledMission::new("late")).unwrap();
}
