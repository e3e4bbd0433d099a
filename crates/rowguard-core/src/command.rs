//! Policy command and kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// The statement kind a row-level security policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyCommand {
    Select,
    Insert,
    Update,
    Delete,
    All,
}

impl PolicyCommand {
    /// SQL keyword used after `FOR`.
    pub fn as_sql(&self) -> &'static str {
        match self {
            PolicyCommand::Select => "SELECT",
            PolicyCommand::Insert => "INSERT",
            PolicyCommand::Update => "UPDATE",
            PolicyCommand::Delete => "DELETE",
            PolicyCommand::All => "ALL",
        }
    }

    /// Whether rows already in the table are filtered (USING applies).
    pub fn filters_existing_rows(&self) -> bool {
        !matches!(self, PolicyCommand::Insert)
    }

    /// Whether new row contents are checked (WITH CHECK applies).
    pub fn checks_new_rows(&self) -> bool {
        matches!(
            self,
            PolicyCommand::Insert | PolicyCommand::Update | PolicyCommand::All
        )
    }
}

impl fmt::Display for PolicyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for PolicyCommand {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SELECT" => Ok(PolicyCommand::Select),
            "INSERT" => Ok(PolicyCommand::Insert),
            "UPDATE" => Ok(PolicyCommand::Update),
            "DELETE" => Ok(PolicyCommand::Delete),
            "ALL" => Ok(PolicyCommand::All),
            other => Err(ConfigError::Config(format!(
                "unknown policy command '{}'",
                other
            ))),
        }
    }
}

/// How a policy combines with other policies on the same table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// OR-combined with other permissive policies.
    #[default]
    Permissive,
    /// AND-combined with every other applicable policy.
    Restrictive,
}

impl PolicyKind {
    pub fn is_restrictive(&self) -> bool {
        matches!(self, PolicyKind::Restrictive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_case_insensitive() {
        assert_eq!("select".parse::<PolicyCommand>().unwrap(), PolicyCommand::Select);
        assert_eq!(" All ".parse::<PolicyCommand>().unwrap(), PolicyCommand::All);
        assert!("TRUNCATE".parse::<PolicyCommand>().is_err());
    }

    #[test]
    fn test_command_clause_applicability() {
        assert!(!PolicyCommand::Insert.filters_existing_rows());
        assert!(PolicyCommand::Insert.checks_new_rows());
        assert!(PolicyCommand::Select.filters_existing_rows());
        assert!(!PolicyCommand::Select.checks_new_rows());
        assert!(!PolicyCommand::Delete.checks_new_rows());
        assert!(PolicyCommand::Update.filters_existing_rows());
        assert!(PolicyCommand::Update.checks_new_rows());
    }

    #[test]
    fn test_kind_defaults_to_permissive() {
        assert_eq!(PolicyKind::default(), PolicyKind::Permissive);
        assert!(PolicyKind::Restrictive.is_restrictive());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_yaml::to_string(&PolicyCommand::Delete).unwrap();
        assert_eq!(json.trim(), "DELETE");
        let kind: PolicyKind = serde_yaml::from_str("restrictive").unwrap();
        assert_eq!(kind, PolicyKind::Restrictive);
    }
}
