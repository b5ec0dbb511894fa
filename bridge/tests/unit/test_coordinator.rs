//! DeploymentCoordinator scenario tests

mod common;

use std::sync::Arc;
use std::time::Duration;

use cloudbridge::deploy::coordinator::{DeploymentCoordinator, CONFLICT_MESSAGE};
use cloudbridge::deploy::executor::LAUNCH_FAILURE_EXIT_CODE;
use cloudbridge::deploy::fsm::DeploymentState;
use cloudbridge::models::deployment::{DeploymentParams, ParamsValidator, StandardValidator};
use cloudbridge::storage::settings::ProvisionerSettings;
use openapi_server::models::{ApiStatus, StatusPayload};

use common::{invalid_params, valid_params, Fixture, WAIT_LIMIT};

async fn wait_for_halt(coordinator: &DeploymentCoordinator) -> i32 {
    let runner = coordinator.current_runner().await.unwrap();
    tokio::time::timeout(WAIT_LIMIT, runner.wait_until_halted())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_status_without_runner() {
    let fixture = Fixture::new(0);
    let coordinator = fixture.coordinator();

    let ret = coordinator.status().await;
    assert_eq!(ret.status, ApiStatus::Success);
    assert_eq!(ret.message, "");
    assert_eq!(ret.data, Some(StatusPayload::default()));
}

#[tokio::test]
async fn test_create_conflict_and_reap() {
    let fixture = Fixture::new(0);
    let coordinator = fixture.coordinator();

    let ret = coordinator.create(valid_params()).await;
    assert_eq!(ret.status, ApiStatus::Success);
    assert_eq!(ret.message, "Deployment Started Successfully");
    assert!(coordinator.is_busy());

    // Both directions conflict while the first run is alive
    let ret = coordinator.create(valid_params()).await;
    assert_eq!(ret.status, ApiStatus::Fail);
    assert_eq!(ret.message, CONFLICT_MESSAGE);
    let ret = coordinator.delete(valid_params()).await;
    assert_eq!(ret.status, ApiStatus::Fail);
    assert_eq!(ret.message, CONFLICT_MESSAGE);

    let status = coordinator.status().await;
    let data = status.data.unwrap();
    assert_eq!(data.state.as_deref(), Some("STATE_RUNNING"));
    assert_eq!(data.exit_value, None);

    fixture.open_gate();
    assert_eq!(wait_for_halt(&coordinator).await, 0);
    assert!(!coordinator.is_busy());

    // First status after halting reports the outcome and reaps
    let status = coordinator.status().await;
    assert_eq!(status.status, ApiStatus::Success);
    assert!(status.message.contains("tool deploy -r us-west-2"));
    assert!(status.message.contains("done"));
    assert_eq!(
        status.data,
        Some(StatusPayload {
            state: Some(DeploymentState::Halted.to_string()),
            exit_value: Some(0),
        })
    );

    // Second status sees no runner
    let status = coordinator.status().await;
    assert_eq!(status.message, "");
    assert_eq!(status.data, Some(StatusPayload::default()));
    assert!(coordinator.current_runner().await.is_none());
}

#[tokio::test]
async fn test_invalid_params_leave_lock_free() {
    let fixture = Fixture::new(0);
    let coordinator = fixture.coordinator();

    let ret = coordinator.create(invalid_params()).await;
    assert_eq!(ret.status, ApiStatus::Fail);
    assert_eq!(ret.message, "Invalid Account ID");
    assert!(!coordinator.is_busy());
    assert!(coordinator.current_runner().await.is_none());

    let ret = coordinator.create(valid_params()).await;
    assert_eq!(ret.status, ApiStatus::Success);

    fixture.open_gate();
    wait_for_halt(&coordinator).await;
}

#[tokio::test]
async fn test_delete_runs_undeploy_and_reports_exit_code() {
    let fixture = Fixture::new(4);
    let coordinator = fixture.coordinator();
    fixture.open_gate();

    let ret = coordinator.delete(valid_params()).await;
    assert_eq!(ret.status, ApiStatus::Success);
    assert_eq!(ret.message, "Undeployment Started Successfully");

    assert_eq!(wait_for_halt(&coordinator).await, 4);

    let status = coordinator.status().await;
    assert!(status.message.contains("undeploy -r us-west-2"));
    assert_eq!(status.data.unwrap().exit_value, Some(4));

    let tf_log = std::fs::read_to_string(fixture.logs_dir().join("terraform.log")).unwrap();
    assert_eq!(tf_log, "tf output\n");
    let deploy_log = std::fs::read_to_string(fixture.logs_dir().join("deploy.log")).unwrap();
    assert!(deploy_log.contains("undeploy"));
}

#[tokio::test]
async fn test_new_run_after_halt_without_reaping() {
    let fixture = Fixture::new(0);
    let coordinator = fixture.coordinator();
    fixture.open_gate();

    coordinator.create(valid_params()).await;
    let first = coordinator.current_runner().await.unwrap();
    wait_for_halt(&coordinator).await;

    // Lock is free as soon as the run halts, reaped or not
    let ret = coordinator.create(valid_params()).await;
    assert_eq!(ret.status, ApiStatus::Success);
    let second = coordinator.current_runner().await.unwrap();
    assert_ne!(first.id(), second.id());
    wait_for_halt(&coordinator).await;
}

#[tokio::test]
async fn test_launch_failure_visible_through_status() {
    let fixture = Fixture::new(0);
    let provisioner = ProvisionerSettings {
        shell: "/nonexistent/shell".into(),
        ..fixture.provisioner()
    };
    let coordinator =
        DeploymentCoordinator::new(Arc::new(StandardValidator), provisioner, fixture.layout());

    let ret = coordinator.create(valid_params()).await;
    assert_eq!(ret.status, ApiStatus::Success);
    assert!(!coordinator.is_busy());

    let status = coordinator.status().await;
    let data = status.data.unwrap();
    assert_eq!(data.state.as_deref(), Some("STATE_HALTED"));
    assert_eq!(data.exit_value, Some(LAUNCH_FAILURE_EXIT_CODE));
    assert!(status.message.contains("Failed to launch provisioning tool"));

    let ret = coordinator.create(valid_params()).await;
    assert_eq!(ret.status, ApiStatus::Success);
}

struct RejectAll;

impl ParamsValidator for RejectAll {
    fn validate(&self, _params: &DeploymentParams) -> Result<(), String> {
        Err("deployments are frozen".to_string())
    }
}

#[tokio::test]
async fn test_injected_validator_reason_is_returned() {
    let fixture = Fixture::new(0);
    let coordinator =
        DeploymentCoordinator::new(Arc::new(RejectAll), fixture.provisioner(), fixture.layout());

    let ret = coordinator.delete(valid_params()).await;
    assert_eq!(ret.status, ApiStatus::Fail);
    assert_eq!(ret.message, "deployments are frozen");
    assert!(!coordinator.is_busy());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_admit_one() {
    let fixture = Fixture::new(0);
    let coordinator = Arc::new(fixture.coordinator());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.create(valid_params()).await })
        })
        .collect();

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        let ret = handle.await.unwrap();
        match ret.status {
            ApiStatus::Success => successes += 1,
            ApiStatus::Fail => {
                assert_eq!(ret.message, CONFLICT_MESSAGE);
                conflicts += 1;
            }
            ApiStatus::Error => panic!("unexpected error: {}", ret.message),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);

    fixture.open_gate();
    wait_for_halt(&coordinator).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abandoned_create_still_releases_lock() {
    let fixture = Fixture::new(0);
    let coordinator = fixture.coordinator();

    // Poll the request once, then drop it as a disconnected client would
    let _ = tokio::time::timeout(Duration::ZERO, coordinator.create(valid_params())).await;

    let runner = tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            if let Some(runner) = coordinator.current_runner().await {
                if runner.state().await != DeploymentState::Pending {
                    return runner;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(runner.state().await, DeploymentState::Running);

    fixture.open_gate();
    let exit_value = tokio::time::timeout(WAIT_LIMIT, runner.wait_until_halted())
        .await
        .unwrap();
    assert_eq!(exit_value, 0);
    assert!(!coordinator.is_busy());

    let ret = coordinator.create(valid_params()).await;
    assert_eq!(ret.status, ApiStatus::Success);
    fixture.open_gate();
    assert_eq!(wait_for_halt(&coordinator).await, 0);
}
