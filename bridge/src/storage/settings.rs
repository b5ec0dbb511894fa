//! Settings file management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Bridge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit stdout logs as JSON
    #[serde(default)]
    pub json_logs: bool,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Provisioning tool configuration
    #[serde(default)]
    pub provisioner: ProvisionerSettings,

    /// Directory for the server, deploy and terraform logs
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            server: ServerSettings::default(),
            provisioner: ProvisionerSettings::default(),
            log_dir: default_log_dir(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Provisioning tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionerSettings {
    /// Interpreter used to run the deploy script
    #[serde(default = "default_shell")]
    pub shell: PathBuf,

    /// Deploy script handed to the interpreter
    #[serde(default = "default_script")]
    pub script: PathBuf,

    /// Value of `TF_LOG` for the tool's terraform runs
    #[serde(default = "default_terraform_log_level")]
    pub terraform_log_level: String,
}

fn default_shell() -> PathBuf {
    PathBuf::from("/bin/bash")
}

fn default_script() -> PathBuf {
    PathBuf::from("/terraform_deployment/deploy.sh")
}

fn default_terraform_log_level() -> String {
    "DEBUG".to_string()
}

impl Default for ProvisionerSettings {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            script: default_script(),
            terraform_log_level: default_terraform_log_level(),
        }
    }
}
