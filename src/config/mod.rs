//! Configuration management
//!
//! This module handles basic configuration settings for a chain process,
//! including the data directory and the local miner identity.

pub mod settings;

pub use settings::{Config, GLOBAL_CONFIG};
