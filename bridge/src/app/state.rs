//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::deploy::coordinator::DeploymentCoordinator;
use crate::errors::BridgeError;
use crate::models::deployment::{ParamsValidator, StandardValidator};

/// Main application state
pub struct AppState {
    /// Deployment lifecycle coordinator
    pub coordinator: Arc<DeploymentCoordinator>,
}

impl AppState {
    /// Initialize application state with the standard validator
    pub async fn init(options: &AppOptions) -> Result<Self, BridgeError> {
        Self::init_with_validator(options, Arc::new(StandardValidator)).await
    }

    /// Initialize application state
    pub async fn init_with_validator(
        options: &AppOptions,
        validator: Arc<dyn ParamsValidator>,
    ) -> Result<Self, BridgeError> {
        info!("Initializing application state...");

        options.layout.setup().await?;

        let coordinator = Arc::new(DeploymentCoordinator::new(
            validator,
            options.provisioner.clone(),
            options.layout.clone(),
        ));

        Ok(Self { coordinator })
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), BridgeError> {
        info!("Shutting down application state...");
        if self.coordinator.is_busy() {
            info!("A provisioning run is still in progress and is left running");
        }
        Ok(())
    }
}
