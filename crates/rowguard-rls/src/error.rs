//! Error types for the RLS crate.

use thiserror::Error;

/// Errors that can occur while building or rendering conditions and policies.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RlsError {
    /// A required piece of a policy or condition is missing or malformed.
    #[error("invalid construction: {reason}")]
    Construction { reason: String },

    /// A policy name cannot be turned into a valid identifier.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A subquery condition references a table alias that is not in scope.
    #[error(
        "{clause} on '{source_table}' references unknown table(s): {}; add .join(...) for each before calling {clause}",
        .missing.join(", ")
    )]
    DanglingReference {
        missing: Vec<String>,
        clause: &'static str,
        source_table: String,
    },

    /// A value has no escaping rule and the dialect rejects unknown values.
    #[error("unsupported value: {value}")]
    UnsupportedValue { value: String },
}

impl RlsError {
    pub fn construction(reason: impl Into<String>) -> Self {
        RlsError::Construction {
            reason: reason.into(),
        }
    }

    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        RlsError::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Construction and naming failures are both construction errors.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            RlsError::Construction { .. } | RlsError::InvalidName { .. }
        )
    }
}
