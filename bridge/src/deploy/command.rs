//! Provisioning tool invocation

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;

use crate::models::deployment::ValidatedParams;
use crate::storage::settings::ProvisionerSettings;

/// Which way the provisioning tool is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Deploy,
    Undeploy,
}

impl Direction {
    /// Sub-command understood by the deploy script
    pub fn as_arg(&self) -> &'static str {
        match self {
            Direction::Deploy => "deploy",
            Direction::Undeploy => "undeploy",
        }
    }

    /// Acknowledgement returned once a lifecycle has been started
    pub fn started_message(&self) -> &'static str {
        match self {
            Direction::Deploy => "Deployment Started Successfully",
            Direction::Undeploy => "Undeployment Started Successfully",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// Fully resolved invocation of the provisioning tool.
///
/// Environment values are kept as secrets since they carry cloud credentials.
#[derive(Debug)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub envs: Vec<(String, SecretString)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs
            .push((key.into(), SecretString::from(value.into())));
        self
    }

    /// Build the deploy script invocation for a validated request
    pub fn for_deployment(
        direction: Direction,
        params: &ValidatedParams,
        settings: &ProvisionerSettings,
        terraform_log: &Path,
    ) -> Self {
        let mut command = Self::new(&settings.shell)
            .arg(settings.script.to_string_lossy())
            .arg(direction.as_arg())
            .arg("-r")
            .arg(&params.region)
            .arg("-a")
            .arg(&params.account_id)
            .arg("-p")
            .arg(&params.pub_account_id)
            .arg("-v")
            .arg(&params.vpc_id)
            .arg("-t")
            .arg(&params.tag);

        if params.enable_semi_automated_data_ingestion {
            command = command.arg("-b");
        }

        command = command
            .env("AWS_ACCESS_KEY_ID", params.aws_access_key_id.expose_secret())
            .env(
                "AWS_SECRET_ACCESS_KEY",
                params.aws_secret_access_key.expose_secret(),
            );
        if let Some(token) = &params.aws_session_token {
            command = command.env("AWS_SESSION_TOKEN", token.expose_secret());
        }

        command
            .env("TF_LOG", settings.terraform_log_level.as_str())
            .env("TF_LOG_PATH", terraform_log.to_string_lossy())
    }

    /// Process builder with both output streams piped
    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(
                self.envs
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.expose_secret())),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Program and arguments, for logging
    pub fn display(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Value of an environment variable, for inspection
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.expose_secret())
    }
}
