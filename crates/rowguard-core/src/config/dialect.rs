//! Dialect configuration for SQL rendering.
//!
//! Holds the dialect constants that condition rendering depends on: the
//! expression naming the current authenticated user, the session lookup
//! function, the maximum identifier length and how unknown literal values
//! are escaped.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::ConfigError;

/// Smallest identifier limit accepted; truncated names still need room for
/// the hash suffix.
const MIN_IDENTIFIER_LENGTH: usize = 16;

/// What the escaper does with a value that has no escaping rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownValuePolicy {
    /// Fail with an unsupported value error.
    #[default]
    Reject,
    /// Stringify the value and single-quote it.
    Quote,
}

/// Rendering configuration for a PostgreSQL-family dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialectConfig {
    /// Expression yielding the current authenticated user's id.
    #[serde(default = "default_current_user_expression")]
    pub current_user_expression: String,

    /// Expression yielding the current database role.
    #[serde(default = "default_current_role_expression")]
    pub current_role_expression: String,

    /// Function used to read session variables.
    #[serde(default = "default_session_function")]
    pub session_function: String,

    /// Pass `missing_ok = true` to the session function so unset variables
    /// read as NULL instead of raising.
    #[serde(default)]
    pub session_missing_ok: bool,

    /// Maximum identifier length in bytes.
    #[serde(default = "default_max_identifier_length")]
    pub max_identifier_length: usize,

    /// Escaping behavior for values with no escaping rule.
    #[serde(default)]
    pub unknown_values: UnknownValuePolicy,

    /// Table consulted by role checks.
    #[serde(default = "default_role_table")]
    pub default_role_table: String,

    /// Type that date literals are cast to.
    #[serde(default = "default_timestamp_cast")]
    pub timestamp_cast: String,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self {
            current_user_expression: default_current_user_expression(),
            current_role_expression: default_current_role_expression(),
            session_function: default_session_function(),
            session_missing_ok: false,
            max_identifier_length: default_max_identifier_length(),
            unknown_values: UnknownValuePolicy::default(),
            default_role_table: default_role_table(),
            timestamp_cast: default_timestamp_cast(),
        }
    }
}

impl DialectConfig {
    /// Create the default PostgreSQL configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load dialect configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse dialect configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configured values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_identifier_length < MIN_IDENTIFIER_LENGTH {
            return Err(ConfigError::Config(format!(
                "max_identifier_length must be at least {}, got {}",
                MIN_IDENTIFIER_LENGTH, self.max_identifier_length
            )));
        }
        if self.current_user_expression.trim().is_empty() {
            return Err(ConfigError::Config(
                "current_user_expression must not be empty".to_string(),
            ));
        }
        if self.session_function.trim().is_empty() {
            return Err(ConfigError::Config(
                "session_function must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Use a different current-user expression (e.g. `current_setting('jwt.sub')`).
    pub fn with_current_user_expression(mut self, expression: impl Into<String>) -> Self {
        self.current_user_expression = expression.into();
        self
    }

    /// Use a different unknown value policy.
    pub fn with_unknown_values(mut self, policy: UnknownValuePolicy) -> Self {
        self.unknown_values = policy;
        self
    }

    /// Render session lookups with `missing_ok = true`.
    pub fn with_session_missing_ok(mut self, missing_ok: bool) -> Self {
        self.session_missing_ok = missing_ok;
        self
    }

    /// Use a different maximum identifier length.
    ///
    /// Lengths below the minimum accepted by [`DialectConfig::validate`] are
    /// raised to that minimum.
    pub fn with_max_identifier_length(mut self, length: usize) -> Self {
        self.max_identifier_length = length.max(MIN_IDENTIFIER_LENGTH);
        self
    }
}

fn default_current_user_expression() -> String {
    "auth.uid()".to_string()
}

fn default_current_role_expression() -> String {
    "current_user".to_string()
}

fn default_session_function() -> String {
    "current_setting".to_string()
}

fn default_max_identifier_length() -> usize {
    63
}

fn default_role_table() -> String {
    "user_roles".to_string()
}

fn default_timestamp_cast() -> String {
    "timestamp".to_string()
}
