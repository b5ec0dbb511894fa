//! Storage layout configuration

use std::path::PathBuf;

use crate::errors::BridgeError;
use crate::export::LogEntry;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

pub const SERVER_LOG: &str = "server.log";
pub const DEPLOY_LOG: &str = "deploy.log";
pub const TERRAFORM_LOG: &str = "terraform.log";

/// Locations of the log files written by the bridge and the provisioning tool
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Directory holding every log file
    pub log_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    /// Get the logs directory
    pub fn logs_dir(&self) -> Dir {
        Dir::new(&self.log_dir)
    }

    /// Log file of the bridge itself
    pub fn server_log(&self) -> File {
        self.logs_dir().file(SERVER_LOG)
    }

    /// Combined stdout/stderr of the provisioning tool
    pub fn deploy_log(&self) -> File {
        self.logs_dir().file(DEPLOY_LOG)
    }

    /// Internal log of terraform, written by the tool itself
    pub fn terraform_log(&self) -> File {
        self.logs_dir().file(TERRAFORM_LOG)
    }

    /// Files bundled by the logs endpoint, in archive order
    pub fn log_entries(&self) -> Vec<LogEntry> {
        vec![
            LogEntry::new(self.server_log(), SERVER_LOG),
            LogEntry::new(self.deploy_log(), DEPLOY_LOG),
            LogEntry::new(self.terraform_log(), TERRAFORM_LOG),
        ]
    }

    /// Setup the storage layout (create directories)
    pub async fn setup(&self) -> Result<(), BridgeError> {
        self.logs_dir().create().await
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new("/tmp")
    }
}
