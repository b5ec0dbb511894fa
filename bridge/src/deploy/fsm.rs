//! Finite State Machine for a deployment lifecycle

use std::fmt;

use serde::{Deserialize, Serialize};

/// Deployment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentState {
    /// Lifecycle created, tool not yet confirmed alive
    #[serde(rename = "STATE_PENDING")]
    Pending,

    /// Tool process launched and alive
    #[serde(rename = "STATE_RUNNING")]
    Running,

    /// Tool process terminated; an exit value is available
    #[serde(rename = "STATE_HALTED")]
    Halted,
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentState::Pending => "STATE_PENDING",
            DeploymentState::Running => "STATE_RUNNING",
            DeploymentState::Halted => "STATE_HALTED",
        };
        f.write_str(name)
    }
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    /// The tool process was spawned
    Launched,

    /// The tool process could not be spawned
    LaunchFailed { exit_value: i32 },

    /// The tool process terminated
    Exited { exit_value: i32 },
}

/// Deployment FSM
#[derive(Debug, Clone)]
pub struct DeploymentFsm {
    state: DeploymentState,
    exit_value: Option<i32>,
}

impl DeploymentFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            state: DeploymentState::Pending,
            exit_value: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> DeploymentState {
        self.state
    }

    /// Exit value, set once halted
    pub fn exit_value(&self) -> Option<i32> {
        self.exit_value
    }

    pub fn is_halted(&self) -> bool {
        self.state == DeploymentState::Halted
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: DeploymentEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (DeploymentState::Pending, DeploymentEvent::Launched) => DeploymentState::Running,
            (DeploymentState::Pending, DeploymentEvent::LaunchFailed { exit_value }) => {
                self.exit_value = Some(*exit_value);
                DeploymentState::Halted
            }
            (DeploymentState::Running, DeploymentEvent::Exited { exit_value }) => {
                self.exit_value = Some(*exit_value);
                DeploymentState::Halted
            }

            // Halted is terminal
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for DeploymentFsm {
    fn default() -> Self {
        Self::new()
    }
}
