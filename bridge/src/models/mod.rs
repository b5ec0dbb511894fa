//! Request models

pub mod deployment;
