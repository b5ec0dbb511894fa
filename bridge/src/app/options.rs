//! Application configuration options

use std::time::Duration;

use crate::storage::layout::StorageLayout;
use crate::storage::settings::{ProvisionerSettings, Settings};

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Log file locations
    pub layout: StorageLayout,

    /// Server configuration
    pub server: ServerOptions,

    /// Provisioning tool configuration
    pub provisioner: ProvisionerSettings,
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            layout: StorageLayout::new(&settings.log_dir),
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            provisioner: settings.provisioner.clone(),
            ..Default::default()
        }
    }
}

/// Lifecycle options for the bridge process
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}
