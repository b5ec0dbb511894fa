//! Deployment lifecycle runner

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tracing::{error, info, warn};

use crate::deploy::command::{Direction, ToolCommand};
use crate::deploy::executor::{ProcessExecutor, LAUNCH_FAILURE_EXIT_CODE};
use crate::deploy::fsm::{DeploymentEvent, DeploymentFsm, DeploymentState};
use crate::filesys::file::File;
use crate::models::deployment::ValidatedParams;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::ProvisionerSettings;
use crate::utils::generate_run_id;

/// Callback fired exactly once when the lifecycle halts
pub type ReleaseFn = Box<dyn FnOnce() + Send + 'static>;

/// One deploy or undeploy lifecycle.
///
/// Owns the executor handle for the tool process and moves through
/// PENDING -> RUNNING -> HALTED. The release callback runs inside the
/// critical section that records HALTED, so an observer of HALTED never
/// sees the lock still held.
pub struct DeploymentRunner {
    id: String,
    direction: Direction,
    command: ToolCommand,
    deploy_log: File,
    created_at: DateTime<Utc>,
    fsm: RwLock<DeploymentFsm>,
    executor: RwLock<Option<ProcessExecutor>>,
    launch_error: RwLock<Option<String>>,
    release: Mutex<Option<ReleaseFn>>,
    halted_tx: watch::Sender<bool>,
}

impl DeploymentRunner {
    /// Create a runner in PENDING state
    pub fn new(
        direction: Direction,
        params: &ValidatedParams,
        settings: &ProvisionerSettings,
        layout: &StorageLayout,
        release: ReleaseFn,
    ) -> Self {
        let command = ToolCommand::for_deployment(
            direction,
            params,
            settings,
            layout.terraform_log().path(),
        );
        Self::with_command(direction, command, layout.deploy_log(), release)
    }

    /// Create a runner for an already resolved tool invocation
    pub fn with_command(
        direction: Direction,
        command: ToolCommand,
        deploy_log: File,
        release: ReleaseFn,
    ) -> Self {
        let (halted_tx, _) = watch::channel(false);
        Self {
            id: generate_run_id(),
            direction,
            command,
            deploy_log,
            created_at: Utc::now(),
            fsm: RwLock::new(DeploymentFsm::new()),
            executor: RwLock::new(None),
            launch_error: RwLock::new(None),
            release: Mutex::new(Some(release)),
            halted_tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Launch the tool and return without waiting for it to finish.
    ///
    /// A launch failure halts the runner immediately with
    /// `LAUNCH_FAILURE_EXIT_CODE` and fires the release callback.
    pub async fn start(self: &Arc<Self>) {
        let mut fsm = self.fsm.write().await;
        if fsm.state() != DeploymentState::Pending {
            warn!("[{}] Runner already started, ignoring", self.id);
            return;
        }

        info!("[{}] Starting {}", self.id, self.direction);
        match ProcessExecutor::start(&self.command, &self.deploy_log).await {
            Ok(executor) => {
                let completion = executor.completion();
                *self.executor.write().await = Some(executor);
                if let Err(e) = fsm.process(DeploymentEvent::Launched) {
                    error!("[{}] {}", self.id, e);
                }
                drop(fsm);

                let runner = Arc::clone(self);
                tokio::spawn(async move {
                    let exit_value = completion.wait().await;
                    runner.halt(DeploymentEvent::Exited { exit_value }).await;
                });
            }
            Err(e) => {
                error!("[{}] {}", self.id, e);
                *self.launch_error.write().await = Some(e.to_string());
                self.halt_locked(
                    &mut fsm,
                    DeploymentEvent::LaunchFailed {
                        exit_value: LAUNCH_FAILURE_EXIT_CODE,
                    },
                );
            }
        }
    }

    async fn halt(&self, event: DeploymentEvent) {
        let mut fsm = self.fsm.write().await;
        self.halt_locked(&mut fsm, event);
    }

    fn halt_locked(&self, fsm: &mut DeploymentFsm, event: DeploymentEvent) {
        if let Err(e) = fsm.process(event) {
            error!("[{}] {}", self.id, e);
            return;
        }

        let elapsed = Utc::now() - self.created_at;
        info!(
            "[{}] {} halted with exit value {:?} after {}s",
            self.id,
            self.direction,
            fsm.exit_value(),
            elapsed.num_seconds()
        );

        let release = self.release.lock().ok().and_then(|mut slot| slot.take());
        match release {
            Some(release) => release(),
            None => warn!("[{}] Release callback already consumed", self.id),
        }
        self.halted_tx.send_replace(true);
    }

    /// Point-in-time state
    pub async fn state(&self) -> DeploymentState {
        self.fsm.read().await.state()
    }

    /// Exit value, only set once HALTED
    pub async fn exit_value(&self) -> Option<i32> {
        self.fsm.read().await.exit_value()
    }

    /// Output captured from the tool so far
    pub async fn output(&self) -> String {
        if let Some(executor) = self.executor.read().await.as_ref() {
            return executor.captured_output();
        }
        self.launch_error
            .read()
            .await
            .as_ref()
            .map(|e| format!("{}\n", e))
            .unwrap_or_default()
    }

    /// Wait until the runner reaches HALTED and return its exit value
    pub async fn wait_until_halted(&self) -> i32 {
        let mut halted_rx = self.halted_tx.subscribe();
        let _ = halted_rx.wait_for(|halted| *halted).await;
        self.exit_value().await.unwrap_or(LAUNCH_FAILURE_EXIT_CODE)
    }
}
