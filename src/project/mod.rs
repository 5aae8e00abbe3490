//! Project-level state owned by the process
//!
//! This module provides:
//! - mo.config.json loading with a default template
//! - A single persist path for configuration mutations

pub mod config;

pub use config::{ConfigError, ConfigStore, MoConfig, CONFIG_FILE_NAME};
