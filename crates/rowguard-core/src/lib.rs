//! # rowguard-core
//!
//! Types shared across the Rowguard crates:
//! - [`DialectConfig`], the rendering configuration (context expressions,
//!   identifier limits, escaping strictness) loaded from YAML
//! - [`PolicyCommand`] and [`PolicyKind`], the policy metadata enums

pub mod command;
pub mod config;

pub use command::{PolicyCommand, PolicyKind};
pub use config::{ConfigError, DialectConfig, UnknownValuePolicy};
