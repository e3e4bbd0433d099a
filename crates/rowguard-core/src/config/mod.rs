//! Configuration types for Rowguard.
//!
//! Rendering is driven by a single [`DialectConfig`], usually loaded from a
//! `rowguard.yaml` file kept next to the migrations it generates.

pub mod dialect;

use thiserror::Error;

pub use dialect::{DialectConfig, UnknownValuePolicy};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
