//! Deployment registry tests

use std::path::Path;
use std::time::Duration;

use botdock::deploy::fsm::{DeploymentEvent, DeploymentStatus};
use botdock::deploy::supervisor;
use botdock::errors::HostError;
use botdock::registry::DeploymentRegistry;
use tempfile::tempdir;
use uuid::Uuid;

fn spawn_sleeper(dir: &Path) -> supervisor::ProcessHandle {
    let workdir = dir.join("work");
    std::fs::create_dir_all(&workdir).unwrap();
    std::fs::write(workdir.join("bot.sh"), "sleep 30\n").unwrap();
    supervisor::spawn("sh", "bot.sh", &workdir, &dir.join("out.log")).expect("spawn failed")
}

#[tokio::test]
async fn test_register_rejects_duplicate_id() {
    let registry = DeploymentRegistry::new();
    let id = Uuid::new_v4();

    registry
        .register(id, "/tmp/work".into(), "/tmp/out.log".into())
        .await
        .expect("first register failed");

    let result = registry
        .register(id, "/tmp/work".into(), "/tmp/out.log".into())
        .await;
    assert!(matches!(result, Err(HostError::RegistryError(_))));
}

#[tokio::test]
async fn test_apply_drives_status() {
    let registry = DeploymentRegistry::new();
    let id = Uuid::new_v4();
    registry
        .register(id, "/tmp/work".into(), "/tmp/out.log".into())
        .await
        .unwrap();

    assert_eq!(registry.status(&id).await, Some(DeploymentStatus::Pending));

    let status = registry.apply(&id, DeploymentEvent::Fetch).await.unwrap();
    assert_eq!(status, DeploymentStatus::Fetching);
    assert_eq!(registry.status(&id).await, Some(DeploymentStatus::Fetching));

    // Invalid transitions are rejected and change nothing
    assert!(registry.apply(&id, DeploymentEvent::Started).await.is_err());
    assert_eq!(registry.status(&id).await, Some(DeploymentStatus::Fetching));
}

#[tokio::test]
async fn test_apply_unknown_id_is_not_found() {
    let registry = DeploymentRegistry::new();
    let result = registry.apply(&Uuid::new_v4(), DeploymentEvent::Fetch).await;
    assert!(matches!(result, Err(HostError::NotFound(_))));
}

#[tokio::test]
async fn test_begin_stop_without_live_process_is_not_found() {
    let registry = DeploymentRegistry::new();
    let id = Uuid::new_v4();
    registry
        .register(id, "/tmp/work".into(), "/tmp/out.log".into())
        .await
        .unwrap();

    // Registered but nothing spawned yet
    let result = registry.begin_stop(&id).await;
    assert!(matches!(result, Err(HostError::NotFound(_))));
}

#[tokio::test]
async fn test_begin_stop_on_terminal_deployment() {
    let registry = DeploymentRegistry::new();
    let id = Uuid::new_v4();
    registry
        .register(id, "/tmp/work".into(), "/tmp/out.log".into())
        .await
        .unwrap();

    registry.apply(&id, DeploymentEvent::Fetch).await.unwrap();
    registry
        .apply(&id, DeploymentEvent::Fail("boom".to_string()))
        .await
        .unwrap();

    let result = registry.begin_stop(&id).await;
    assert!(matches!(result, Err(HostError::AlreadyTerminal(_))));
}

#[tokio::test]
async fn test_concurrent_stops_yield_exactly_one_handle() {
    let dir = tempdir().unwrap();
    let registry = DeploymentRegistry::new();
    let id = Uuid::new_v4();
    registry
        .register(
            id,
            dir.path().join("work"),
            dir.path().join("out.log"),
        )
        .await
        .unwrap();

    registry.apply(&id, DeploymentEvent::Fetch).await.unwrap();
    registry.apply(&id, DeploymentEvent::Spawn).await.unwrap();
    registry
        .attach_process(&id, spawn_sleeper(dir.path()))
        .await
        .unwrap();
    registry.apply(&id, DeploymentEvent::Started).await.unwrap();

    let (first, second) = tokio::join!(registry.begin_stop(&id), registry.begin_stop(&id));

    let winners = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(winners, 1, "exactly one stop may claim the process");

    for result in [first, second] {
        match result {
            Ok(handle) => handle
                .terminate(Duration::from_secs(2))
                .await
                .expect("terminate failed"),
            Err(HostError::NotFound(_)) | Err(HostError::AlreadyTerminal(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}

#[tokio::test]
async fn test_unregister_removes_entry() {
    let registry = DeploymentRegistry::new();
    let id = Uuid::new_v4();
    registry
        .register(id, "/tmp/work".into(), "/tmp/out.log".into())
        .await
        .unwrap();

    registry.unregister(&id).await.expect("unregister failed");
    assert!(registry.status(&id).await.is_none());
    assert!(matches!(
        registry.unregister(&id).await,
        Err(HostError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_subscribe_requires_live_output() {
    let registry = DeploymentRegistry::new();
    let id = Uuid::new_v4();

    // Unknown deployment
    assert!(matches!(
        registry.subscribe(&id).await,
        Err(HostError::NotFound(_))
    ));

    // Known deployment, no broker attached yet
    registry
        .register(id, "/tmp/work".into(), "/tmp/out.log".into())
        .await
        .unwrap();
    assert!(matches!(
        registry.subscribe(&id).await,
        Err(HostError::NotFound(_))
    ));
}
