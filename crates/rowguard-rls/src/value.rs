//! Literal and dynamic values used on the right-hand side of conditions.

use chrono::{DateTime, Utc};
use rowguard_core::DialectConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::condition::Condition;
use crate::error::RlsError;
use crate::escape::{escape_qualified, escape_string_literal};
use crate::render::RenderSql;

/// A column reference, either unqualified (`owner_id`) or qualified
/// (`p.owner_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnRef(String);

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The table or alias part of a qualified reference.
    pub fn qualifier(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(qualifier, _)| qualifier)
    }

    /// The column part, without any qualifier.
    pub fn name(&self) -> &str {
        self.0
            .rsplit_once('.')
            .map(|(_, name)| name)
            .unwrap_or(&self.0)
    }

    pub fn is_qualified(&self) -> bool {
        self.qualifier().is_some()
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::new(name)
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        ColumnRef(name)
    }
}

impl RenderSql for ColumnRef {
    fn render_sql(&self, _dialect: &DialectConfig) -> Result<String, RlsError> {
        Ok(escape_qualified(&self.0))
    }
}

/// Start a condition on a column.
pub fn column(name: impl Into<String>) -> ColumnRef {
    ColumnRef::new(name)
}

/// A raw SQL expression passed through unescaped, e.g. `NOW() - INTERVAL '7 days'`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSql(String);

impl RawSql {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RenderSql for RawSql {
    fn render_sql(&self, _dialect: &DialectConfig) -> Result<String, RlsError> {
        Ok(self.0.clone())
    }
}

/// Wrap a raw SQL expression.
pub fn raw(sql: impl Into<String>) -> RawSql {
    RawSql::new(sql)
}

/// Types a session variable can be cast to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Integer,
    Uuid,
    Boolean,
    Timestamp,
    /// No cast; the setting is already text.
    Text,
}

impl SessionType {
    fn cast(&self) -> Option<&'static str> {
        match self {
            SessionType::Integer => Some("integer"),
            SessionType::Uuid => Some("uuid"),
            SessionType::Boolean => Some("boolean"),
            SessionType::Timestamp => Some("timestamp"),
            SessionType::Text => None,
        }
    }
}

/// A runtime value provided by the database session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextValue {
    /// The current authenticated user's id.
    CurrentUserId,
    /// A session variable read through the dialect's session function.
    Session { key: String, value_type: SessionType },
    /// The current database role.
    CurrentRole,
}

impl RenderSql for ContextValue {
    fn render_sql(&self, dialect: &DialectConfig) -> Result<String, RlsError> {
        match self {
            ContextValue::CurrentUserId => Ok(dialect.current_user_expression.clone()),
            ContextValue::CurrentRole => Ok(dialect.current_role_expression.clone()),
            ContextValue::Session { key, value_type } => {
                let lookup = if dialect.session_missing_ok {
                    format!(
                        "{}({}, true)",
                        dialect.session_function,
                        escape_string_literal(key)
                    )
                } else {
                    format!("{}({})", dialect.session_function, escape_string_literal(key))
                };
                Ok(match value_type.cast() {
                    Some(cast) => format!("{}::{}", lookup, cast),
                    None => lookup,
                })
            }
        }
    }
}

/// The current authenticated user's id.
pub fn current_user_id() -> ContextValue {
    ContextValue::CurrentUserId
}

/// A session variable cast to `value_type`.
pub fn session(key: impl Into<String>, value_type: SessionType) -> ContextValue {
    ContextValue::Session {
        key: key.into(),
        value_type,
    }
}

/// The current database role.
pub fn current_role() -> ContextValue {
    ContextValue::CurrentRole
}

/// A value on the right-hand side of a comparison, or an element of an
/// `IN` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Array(Vec<SqlValue>),
    /// Another column, e.g. the other side of a join condition.
    Column(ColumnRef),
    Raw(RawSql),
    Context(ContextValue),
    Condition(Box<Condition>),
    /// Arbitrary JSON. Scalars and arrays escape like their native
    /// counterparts; objects have no escaping rule.
    Json(serde_json::Value),
}

impl SqlValue {
    /// Values whose runtime identity varies per row or per session.
    ///
    /// Equality against one of these makes the column a lookup index
    /// candidate; equality against a constant does not.
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            SqlValue::Column(_) | SqlValue::Raw(_) | SqlValue::Context(_) | SqlValue::Condition(_)
        )
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value.into())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<u32> for SqlValue {
    fn from(value: u32) -> Self {
        SqlValue::Int(value.into())
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl From<Uuid> for SqlValue {
    fn from(value: Uuid) -> Self {
        SqlValue::Uuid(value)
    }
}

impl From<ColumnRef> for SqlValue {
    fn from(value: ColumnRef) -> Self {
        SqlValue::Column(value)
    }
}

impl From<RawSql> for SqlValue {
    fn from(value: RawSql) -> Self {
        SqlValue::Raw(value)
    }
}

impl From<ContextValue> for SqlValue {
    fn from(value: ContextValue) -> Self {
        SqlValue::Context(value)
    }
}

impl From<Condition> for SqlValue {
    fn from(value: Condition) -> Self {
        SqlValue::Condition(Box::new(value))
    }
}

impl<T: Into<SqlValue>> From<Vec<T>> for SqlValue {
    fn from(values: Vec<T>) -> Self {
        SqlValue::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else if n.is_u64() {
                    // Above i64::MAX; keep the exact digits.
                    SqlValue::Json(Value::Number(n))
                } else {
                    match n.as_f64() {
                        Some(f) => SqlValue::Float(f),
                        None => SqlValue::Json(Value::Number(n)),
                    }
                }
            }
            Value::String(s) => SqlValue::Text(s),
            Value::Array(items) => {
                SqlValue::Array(items.into_iter().map(SqlValue::from).collect())
            }
            object @ Value::Object(_) => SqlValue::Json(object),
        }
    }
}
