//! Wire models for the cloud bridge control surface.

pub mod models;
