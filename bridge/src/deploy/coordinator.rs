//! Single-flight deployment coordinator
//!
//! Holds the provisioning lock and the one runner slot shared by every
//! request. Create and delete requests are validated, admitted through the
//! lock, and handed to a fresh [`DeploymentRunner`]; status requests read the
//! runner's snapshot and reap it once it has halted.

use std::sync::Arc;

use openapi_server::models::{ApiReturn, StatusPayload};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::deploy::command::Direction;
use crate::deploy::fsm::DeploymentState;
use crate::deploy::lock::SingleFlightLock;
use crate::deploy::runner::DeploymentRunner;
use crate::models::deployment::{DeploymentParams, ParamsValidator, ValidatedParams};
use crate::storage::layout::StorageLayout;
use crate::storage::settings::ProvisionerSettings;

pub const CONFLICT_MESSAGE: &str = "Another deployment is in progress";

/// Coordinator of deploy/undeploy lifecycles
pub struct DeploymentCoordinator {
    validator: Arc<dyn ParamsValidator>,
    provisioner: ProvisionerSettings,
    layout: StorageLayout,
    lock: Arc<SingleFlightLock>,
    runner: Arc<Mutex<Option<Arc<DeploymentRunner>>>>,
}

impl DeploymentCoordinator {
    pub fn new(
        validator: Arc<dyn ParamsValidator>,
        provisioner: ProvisionerSettings,
        layout: StorageLayout,
    ) -> Self {
        Self {
            validator,
            provisioner,
            layout,
            lock: Arc::new(SingleFlightLock::new()),
            runner: Arc::new(Mutex::new(None)),
        }
    }

    /// Start provisioning
    pub async fn create(&self, params: DeploymentParams) -> ApiReturn {
        info!("Received deployment request: {:?}", params);
        self.run_deployment(Direction::Deploy, params).await
    }

    /// Start deprovisioning
    pub async fn delete(&self, params: DeploymentParams) -> ApiReturn {
        info!("Received undeployment request: {:?}", params);
        self.run_deployment(Direction::Undeploy, params).await
    }

    async fn run_deployment(&self, direction: Direction, params: DeploymentParams) -> ApiReturn {
        if let Err(reason) = self.validator.validate(&params) {
            info!("  Rejected input: {}", reason);
            return ApiReturn::fail(reason);
        }
        let params = ValidatedParams::new(params);
        info!("  Validated input");

        if !self.lock.try_acquire() {
            error!("  {}", CONFLICT_MESSAGE);
            return ApiReturn::fail(CONFLICT_MESSAGE);
        }
        info!("  No deployment conflicts found");

        let lock = self.lock.clone();
        let runner = Arc::new(DeploymentRunner::new(
            direction,
            &params,
            &self.provisioner,
            &self.layout,
            Box::new(move || lock.release()),
        ));

        // Launch detached from the request: only a halting runner releases the lock
        let slot = Arc::clone(&self.runner);
        let admitted = Arc::clone(&runner);
        let launch = tokio::spawn(async move {
            *slot.lock().await = Some(Arc::clone(&admitted));
            admitted.start().await;
        });

        if let Err(e) = launch.await {
            error!("  Launch task for run {} failed: {}", runner.id(), e);
            if runner.state().await == DeploymentState::Pending {
                self.lock.release();
            }
            return ApiReturn::error(format!("Failed to start {}: {}", direction, e));
        }

        info!("  Deployment request finalized (run {})", runner.id());
        ApiReturn::success(direction.started_message())
    }

    /// Snapshot of the tracked lifecycle.
    ///
    /// A halted runner is reported once with its exit value and then dropped
    /// from the slot, so the next call sees no runner.
    pub async fn status(&self) -> ApiReturn {
        debug!("Received status request");
        let mut slot = self.runner.lock().await;

        let Some(runner) = slot.as_ref() else {
            debug!("  No deployment tracked");
            return ApiReturn::success("").with_data(StatusPayload::default());
        };

        let state = runner.state().await;
        let output = runner.output().await;
        let mut payload = StatusPayload {
            state: Some(state.to_string()),
            exit_value: None,
        };

        if state == DeploymentState::Halted {
            payload.exit_value = runner.exit_value().await;
            info!(
                "  Reaping run {} (exit value {:?})",
                runner.id(),
                payload.exit_value
            );
            *slot = None;
        }

        ApiReturn::success(output).with_data(payload)
    }

    /// Currently tracked runner, without reaping it
    pub async fn current_runner(&self) -> Option<Arc<DeploymentRunner>> {
        self.runner.lock().await.clone()
    }

    /// Whether a lifecycle holds the provisioning lock
    pub fn is_busy(&self) -> bool {
        self.lock.is_held()
    }

    /// Log files bundled by the logs endpoint
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }
}
