//! FSM unit tests

use cloudbridge::deploy::fsm::{DeploymentEvent, DeploymentFsm, DeploymentState};

#[test]
fn test_fsm_initial_state() {
    let fsm = DeploymentFsm::new();
    assert_eq!(fsm.state(), DeploymentState::Pending);
    assert_eq!(fsm.exit_value(), None);
    assert!(!fsm.is_halted());
}

#[test]
fn test_fsm_launch_and_exit_flow() {
    let mut fsm = DeploymentFsm::new();

    // Pending -> Running
    fsm.process(DeploymentEvent::Launched).unwrap();
    assert_eq!(fsm.state(), DeploymentState::Running);

    // Running -> Halted
    fsm.process(DeploymentEvent::Exited { exit_value: 0 }).unwrap();
    assert_eq!(fsm.state(), DeploymentState::Halted);
    assert_eq!(fsm.exit_value(), Some(0));
}

#[test]
fn test_fsm_launch_failure_halts_directly() {
    let mut fsm = DeploymentFsm::new();

    fsm.process(DeploymentEvent::LaunchFailed { exit_value: -1 }).unwrap();
    assert!(fsm.is_halted());
    assert_eq!(fsm.exit_value(), Some(-1));
}

#[test]
fn test_fsm_halted_is_terminal() {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::Launched).unwrap();
    fsm.process(DeploymentEvent::Exited { exit_value: 2 }).unwrap();

    assert!(fsm.process(DeploymentEvent::Launched).is_err());
    assert!(fsm.process(DeploymentEvent::Exited { exit_value: 0 }).is_err());
    assert!(fsm
        .process(DeploymentEvent::LaunchFailed { exit_value: -1 })
        .is_err());

    assert_eq!(fsm.state(), DeploymentState::Halted);
    assert_eq!(fsm.exit_value(), Some(2));
}

#[test]
fn test_fsm_invalid_transition() {
    let mut fsm = DeploymentFsm::new();

    // Cannot exit before launching
    let result = fsm.process(DeploymentEvent::Exited { exit_value: 0 });
    assert!(result.is_err());
    assert_eq!(fsm.state(), DeploymentState::Pending);

    // Cannot fail to launch once running
    fsm.process(DeploymentEvent::Launched).unwrap();
    let result = fsm.process(DeploymentEvent::LaunchFailed { exit_value: -1 });
    assert!(result.is_err());
    assert_eq!(fsm.state(), DeploymentState::Running);
}
