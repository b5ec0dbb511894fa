//! Deployment lifecycle module

pub mod command;
pub mod coordinator;
pub mod executor;
pub mod fsm;
pub mod lock;
pub mod runner;
