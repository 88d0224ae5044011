//! Dry-run mode: the plan is computed and reported, nothing is touched.

use gsm_e2e_tests::{build_controller, sleep_server, CollectingSink, ScriptedRemoteSource};
use gsm_engine::domain::ports::VersionStore;
use gsm_engine::infrastructure::FileVersionStore;
use gsm_engine::{ActionKind, Subject, SubjectId, SupervisorState, TickOutcome};
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn test_dry_run_touches_nothing() {
    let dir = tempfile::TempDir::new().unwrap();
    let state_path = dir.path().join("versions.json");

    let store = Arc::new(FileVersionStore::open(&state_path).await.unwrap());
    store.set(&SubjectId::new("serverA"), "100").await.unwrap();
    let disk_before = std::fs::read_to_string(&state_path).unwrap();

    let source = Arc::new(ScriptedRemoteSource::new(&[
        ("serverA", "101"),
        ("modX", "v3"),
    ]));
    let sink = Arc::new(CollectingSink::new());
    let subjects = vec![Subject::server_build("serverA"), Subject::package("modX")];

    let mut controller = build_controller(
        subjects,
        sleep_server(),
        source.clone(),
        store.clone(),
        sink.clone(),
        true,
    );

    let report = controller.tick().await;

    assert_eq!(report.outcome, TickOutcome::PlanOnly);
    assert_eq!(report.plan.len(), 2);
    assert_eq!(report.plan.actions()[0].kind, ActionKind::InstallServer);
    assert_eq!(report.plan.actions()[1].kind, ActionKind::InstallPackage);

    // Nothing fetched, nothing spawned, nothing persisted, nothing sent.
    assert!(source.fetched().is_empty());
    assert_eq!(controller.supervisor_state(), SupervisorState::Stopped);
    assert_eq!(std::fs::read_to_string(&state_path).unwrap(), disk_before);
    assert!(sink.kinds().is_empty());
}
