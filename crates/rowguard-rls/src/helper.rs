//! Shorthand conditions that expand to fixed SQL templates.

use rowguard_core::DialectConfig;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::RlsError;
use crate::escape::{escape_identifier, escape_qualified, escape_string_literal};
use crate::render::RenderSql;
use crate::value::ColumnRef;

/// Column holding the user id in membership and role tables.
pub const USER_ID_COLUMN: &str = "user_id";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Helper {
    /// `local_key IN (SELECT foreign_key FROM join_table WHERE user_id = <current user>)`
    IsMemberOf {
        join_table: String,
        foreign_key: String,
        local_key: ColumnRef,
    },
    /// `EXISTS (SELECT 1 FROM table WHERE user_id = <current user> AND role = '<role>')`
    ///
    /// Without a table, the dialect's default role table is used.
    HasRole { role: String, table: Option<String> },
    AlwaysTrue,
}

impl RenderSql for Helper {
    fn render_sql(&self, dialect: &DialectConfig) -> Result<String, RlsError> {
        match self {
            Helper::IsMemberOf {
                join_table,
                foreign_key,
                local_key,
            } => Ok(format!(
                "{} IN (SELECT {} FROM {} WHERE {} = {})",
                escape_qualified(local_key.as_str()),
                escape_identifier(foreign_key),
                escape_qualified(join_table),
                USER_ID_COLUMN,
                dialect.current_user_expression
            )),
            Helper::HasRole { role, table } => {
                let table = table.as_deref().unwrap_or(&dialect.default_role_table);
                Ok(format!(
                    "EXISTS (SELECT 1 FROM {} WHERE {} = {} AND role = {})",
                    escape_qualified(table),
                    USER_ID_COLUMN,
                    dialect.current_user_expression,
                    escape_string_literal(role)
                ))
            }
            Helper::AlwaysTrue => Ok("true".to_string()),
        }
    }
}

/// The current user holds `role` in the default role table.
pub fn has_role(role: impl Into<String>) -> Condition {
    Condition::Helper(Helper::HasRole {
        role: role.into(),
        table: None,
    })
}

/// The current user holds `role` in `table`.
pub fn has_role_in(role: impl Into<String>, table: impl Into<String>) -> Condition {
    Condition::Helper(Helper::HasRole {
        role: role.into(),
        table: Some(table.into()),
    })
}

pub fn always_true() -> Condition {
    Condition::Helper(Helper::AlwaysTrue)
}
