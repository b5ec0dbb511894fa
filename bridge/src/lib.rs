//! Cloud bridge library
//!
//! Control server that runs one infrastructure provisioning tool invocation
//! at a time and exposes its progress and logs over HTTP.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod export;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod utils;
