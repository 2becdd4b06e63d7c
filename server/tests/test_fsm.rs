//! Lifecycle state machine tests

use botdock::deploy::fsm::{DeploymentEvent, DeploymentFsm, DeploymentStatus};

#[test]
fn test_initial_state() {
    let fsm = DeploymentFsm::new();
    assert_eq!(fsm.status(), DeploymentStatus::Pending);
    assert!(fsm.error().is_none());
    assert!(!fsm.status().is_terminal());
}

#[test]
fn test_full_pipeline_path() {
    let mut fsm = DeploymentFsm::new();

    // Pending -> Fetching
    fsm.process(DeploymentEvent::Fetch).unwrap();
    assert_eq!(fsm.status(), DeploymentStatus::Fetching);

    // Fetching -> Starting
    fsm.process(DeploymentEvent::Spawn).unwrap();
    assert_eq!(fsm.status(), DeploymentStatus::Starting);

    // Starting -> Running
    fsm.process(DeploymentEvent::Started).unwrap();
    assert_eq!(fsm.status(), DeploymentStatus::Running);

    // Running -> Stopped
    fsm.process(DeploymentEvent::Stop).unwrap();
    assert_eq!(fsm.status(), DeploymentStatus::Stopped);
    assert!(fsm.status().is_terminal());
}

#[test]
fn test_fetch_failure_is_terminal_with_reason() {
    let mut fsm = DeploymentFsm::new();

    fsm.process(DeploymentEvent::Fetch).unwrap();
    fsm.process(DeploymentEvent::Fail("bad branch reference".to_string()))
        .unwrap();

    assert_eq!(fsm.status(), DeploymentStatus::Failed);
    assert_eq!(fsm.error(), Some("bad branch reference"));
    assert!(fsm.status().is_terminal());

    // No retry: the pipeline cannot restart a failed deployment
    assert!(fsm.process(DeploymentEvent::Fetch).is_err());
}

#[test]
fn test_spawn_failure_is_terminal() {
    let mut fsm = DeploymentFsm::new();

    fsm.process(DeploymentEvent::Fetch).unwrap();
    fsm.process(DeploymentEvent::Spawn).unwrap();
    fsm.process(DeploymentEvent::Fail("entry point not found".to_string()))
        .unwrap();

    assert_eq!(fsm.status(), DeploymentStatus::Failed);
}

#[test]
fn test_stop_allowed_while_starting() {
    let mut fsm = DeploymentFsm::new();

    fsm.process(DeploymentEvent::Fetch).unwrap();
    fsm.process(DeploymentEvent::Spawn).unwrap();
    fsm.process(DeploymentEvent::Stop).unwrap();

    assert_eq!(fsm.status(), DeploymentStatus::Stopped);
}

#[test]
fn test_no_skipped_transitions() {
    // Pending cannot jump to Starting or Running
    let mut fsm = DeploymentFsm::new();
    assert!(fsm.process(DeploymentEvent::Spawn).is_err());
    assert!(fsm.process(DeploymentEvent::Started).is_err());

    // Fetching cannot jump to Running
    fsm.process(DeploymentEvent::Fetch).unwrap();
    assert!(fsm.process(DeploymentEvent::Started).is_err());
}

#[test]
fn test_no_reversed_transitions() {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::Fetch).unwrap();
    fsm.process(DeploymentEvent::Spawn).unwrap();
    fsm.process(DeploymentEvent::Started).unwrap();

    // A running deployment never re-enters the pipeline
    assert!(fsm.process(DeploymentEvent::Fetch).is_err());
    assert!(fsm.process(DeploymentEvent::Spawn).is_err());
    assert_eq!(fsm.status(), DeploymentStatus::Running);
}

#[test]
fn test_delete_allowed_from_any_state() {
    let mut pending = DeploymentFsm::new();
    pending.process(DeploymentEvent::Delete).unwrap();
    assert_eq!(pending.status(), DeploymentStatus::Deleted);

    let mut failed = DeploymentFsm::new();
    failed.process(DeploymentEvent::Fetch).unwrap();
    failed
        .process(DeploymentEvent::Fail("boom".to_string()))
        .unwrap();
    failed.process(DeploymentEvent::Delete).unwrap();
    assert_eq!(failed.status(), DeploymentStatus::Deleted);

    // But not twice
    assert!(failed.process(DeploymentEvent::Delete).is_err());
}

#[test]
fn test_status_serde_roundtrip() {
    let json = serde_json::to_string(&DeploymentStatus::Running).unwrap();
    assert_eq!(json, "\"running\"");

    let status: DeploymentStatus = serde_json::from_str("\"fetching\"").unwrap();
    assert_eq!(status, DeploymentStatus::Fetching);
}
