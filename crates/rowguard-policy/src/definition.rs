//! Policy definitions and the fluent builder that produces them.

use rowguard_core::{DialectConfig, PolicyCommand, PolicyKind};
use rowguard_rls::{sanitize_identifier_name, Condition, RlsError};
use serde::{Deserialize, Serialize};

use crate::assembler::{render_policy_sql, RenderOptions};

/// A complete row-level security policy, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDefinition {
    /// Explicit name; generated from table and command when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub table: String,
    pub command: PolicyCommand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub kind: PolicyKind,
    /// Filter on existing rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<Condition>,
    /// Check on new or modified rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_check: Option<Condition>,
    /// Free text for reviewers; never rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PolicyDefinition {
    /// The sanitized policy name.
    ///
    /// Without an explicit name this is `<table>_<command>_policy`, or
    /// `<table>_<command>_restrictive_policy` for restrictive policies.
    pub fn resolved_name(&self, dialect: &DialectConfig) -> Result<String, RlsError> {
        let name = match &self.name {
            Some(name) => name.clone(),
            None => {
                let command = self.command.as_sql().to_lowercase();
                if self.kind.is_restrictive() {
                    format!("{}_{}_restrictive_policy", self.table, command)
                } else {
                    format!("{}_{}_policy", self.table, command)
                }
            }
        };
        sanitize_identifier_name(&name, dialect.max_identifier_length)
    }

    /// Render with the default dialect.
    pub fn to_sql(&self, options: &RenderOptions) -> Result<String, RlsError> {
        render_policy_sql(self, options, &DialectConfig::default())
    }

    /// Render with the given dialect.
    pub fn render(
        &self,
        options: &RenderOptions,
        dialect: &DialectConfig,
    ) -> Result<String, RlsError> {
        render_policy_sql(self, options, dialect)
    }
}

/// Start a named policy.
pub fn policy(name: impl Into<String>) -> PolicyBuilder {
    PolicyBuilder::new().named(name)
}

/// Fluent builder for [`PolicyDefinition`].
#[derive(Debug, Clone, Default)]
pub struct PolicyBuilder {
    name: Option<String>,
    table: Option<String>,
    command: Option<PolicyCommand>,
    role: Option<String>,
    kind: PolicyKind,
    using: Option<Condition>,
    with_check: Option<Condition>,
    description: Option<String>,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn on(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn for_command(mut self, command: PolicyCommand) -> Self {
        self.command = Some(command);
        self
    }

    pub fn read(self) -> Self {
        self.for_command(PolicyCommand::Select)
    }

    pub fn write(self) -> Self {
        self.for_command(PolicyCommand::Insert)
    }

    pub fn update(self) -> Self {
        self.for_command(PolicyCommand::Update)
    }

    pub fn delete(self) -> Self {
        self.for_command(PolicyCommand::Delete)
    }

    pub fn all(self) -> Self {
        self.for_command(PolicyCommand::All)
    }

    /// Restrict the policy to one role.
    pub fn to(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn restrictive(mut self) -> Self {
        self.kind = PolicyKind::Restrictive;
        self
    }

    pub fn permissive(mut self) -> Self {
        self.kind = PolicyKind::Permissive;
        self
    }

    /// Set the USING condition. A second call ANDs with the first.
    pub fn using(mut self, condition: Condition) -> Self {
        self.using = Some(match self.using.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Set the WITH CHECK condition. A second call ANDs with the first.
    pub fn with_check(mut self, condition: Condition) -> Self {
        self.with_check = Some(match self.with_check.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Finish the definition. Fails if the table or command is missing.
    pub fn build(self) -> Result<PolicyDefinition, RlsError> {
        let table = self
            .table
            .filter(|table| !table.trim().is_empty())
            .ok_or_else(|| RlsError::construction("policy table is required; call .on(table)"))?;
        let command = self.command.ok_or_else(|| {
            RlsError::construction("policy command is required; call .for_command(...)")
        })?;

        Ok(PolicyDefinition {
            name: self.name,
            table,
            command,
            role: self.role,
            kind: self.kind,
            using: self.using,
            with_check: self.with_check,
            description: self.description,
        })
    }

    /// Build and render with default options and dialect.
    pub fn to_sql(self) -> Result<String, RlsError> {
        self.build()?.to_sql(&RenderOptions::default())
    }
}
