//! The condition node model.
//!
//! A [`Condition`] is a closed tree of SQL boolean expressions. Every node
//! renders to a self-contained fragment: logical groups carry their own
//! parentheses, so callers never add any.

use rowguard_core::DialectConfig;
use serde::{Deserialize, Serialize};

use crate::error::RlsError;
use crate::escape::{escape_qualified, escape_value};
use crate::helper::Helper;
use crate::render::RenderSql;
use crate::subquery::SubqueryDefinition;
use crate::value::{ColumnRef, ContextValue, SqlValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Neq => "!=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternOp {
    Like,
    Ilike,
}

impl PatternOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            PatternOp::Like => "LIKE",
            PatternOp::Ilike => "ILIKE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullCheck {
    IsNull,
    IsNotNull,
}

/// The right-hand side of a membership test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    /// `col IN (v1, v2, ...)`
    In(Vec<SqlValue>),
    /// `col IN (SELECT ...)`
    InSubquery(Box<SubqueryDefinition>),
    /// `col @> value`
    Contains(SqlValue),
}

/// An argument to a SQL function call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionArg {
    /// A column or other identifier, escaped but never quoted as a literal.
    Identifier(String),
    Condition(Condition),
    Value(SqlValue),
}

impl From<&str> for FunctionArg {
    fn from(identifier: &str) -> Self {
        FunctionArg::Identifier(identifier.to_string())
    }
}

impl From<String> for FunctionArg {
    fn from(identifier: String) -> Self {
        FunctionArg::Identifier(identifier)
    }
}

impl From<Condition> for FunctionArg {
    fn from(condition: Condition) -> Self {
        FunctionArg::Condition(condition)
    }
}

impl From<SqlValue> for FunctionArg {
    fn from(value: SqlValue) -> Self {
        FunctionArg::Value(value)
    }
}

/// A SQL boolean expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Comparison {
        column: ColumnRef,
        op: ComparisonOp,
        value: SqlValue,
    },
    Pattern {
        column: ColumnRef,
        op: PatternOp,
        pattern: String,
    },
    Membership {
        column: ColumnRef,
        membership: Membership,
    },
    NullCheck {
        column: ColumnRef,
        check: NullCheck,
    },
    /// Two or more conditions joined by one operator. Built through
    /// [`Condition::and`]/[`Condition::or`], which keep same-operator groups flat.
    Logical {
        op: LogicalOp,
        conditions: Vec<Condition>,
    },
    Subquery {
        column: ColumnRef,
        subquery: Box<SubqueryDefinition>,
    },
    Function {
        name: String,
        args: Vec<FunctionArg>,
    },
    Helper(Helper),
    Context(ContextValue),
}

impl Condition {
    pub fn comparison(
        column: impl Into<ColumnRef>,
        op: ComparisonOp,
        value: impl Into<SqlValue>,
    ) -> Self {
        Condition::Comparison {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn pattern(
        column: impl Into<ColumnRef>,
        op: PatternOp,
        pattern: impl Into<String>,
    ) -> Self {
        Condition::Pattern {
            column: column.into(),
            op,
            pattern: pattern.into(),
        }
    }

    pub fn membership(column: impl Into<ColumnRef>, membership: Membership) -> Self {
        Condition::Membership {
            column: column.into(),
            membership,
        }
    }

    pub fn null_check(column: impl Into<ColumnRef>, check: NullCheck) -> Self {
        Condition::NullCheck {
            column: column.into(),
            check,
        }
    }

    pub fn subquery(column: impl Into<ColumnRef>, subquery: SubqueryDefinition) -> Self {
        Condition::Subquery {
            column: column.into(),
            subquery: Box::new(subquery),
        }
    }

    /// A function call such as `has_access(owner_id, auth.uid() IS NOT NULL)`.
    pub fn function<I, A>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<FunctionArg>,
    {
        Condition::Function {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The column this node tests, for nodes that test one.
    pub fn column(&self) -> Option<&ColumnRef> {
        match self {
            Condition::Comparison { column, .. }
            | Condition::Pattern { column, .. }
            | Condition::Membership { column, .. }
            | Condition::NullCheck { column, .. }
            | Condition::Subquery { column, .. } => Some(column),
            Condition::Helper(Helper::IsMemberOf { local_key, .. }) => Some(local_key),
            _ => None,
        }
    }
}

impl RenderSql for Condition {
    fn render_sql(&self, dialect: &DialectConfig) -> Result<String, RlsError> {
        match self {
            Condition::Comparison { column, op, value } => Ok(format!(
                "{} {} {}",
                escape_qualified(column.as_str()),
                op.symbol(),
                escape_value(value, dialect)?
            )),
            Condition::Pattern {
                column,
                op,
                pattern,
            } => Ok(format!(
                "{} {} {}",
                escape_qualified(column.as_str()),
                op.keyword(),
                escape_value(&SqlValue::Text(pattern.clone()), dialect)?
            )),
            Condition::Membership { column, membership } => {
                let column = escape_qualified(column.as_str());
                match membership {
                    Membership::In(values) => {
                        let escaped = values
                            .iter()
                            .map(|value| escape_value(value, dialect))
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(format!("{} IN ({})", column, escaped.join(", ")))
                    }
                    Membership::InSubquery(subquery) => {
                        Ok(format!("{} IN {}", column, subquery.render_sql(dialect)?))
                    }
                    Membership::Contains(value) => {
                        Ok(format!("{} @> {}", column, escape_value(value, dialect)?))
                    }
                }
            }
            Condition::NullCheck { column, check } => {
                let suffix = match check {
                    NullCheck::IsNull => "IS NULL",
                    NullCheck::IsNotNull => "IS NOT NULL",
                };
                Ok(format!("{} {}", escape_qualified(column.as_str()), suffix))
            }
            Condition::Logical { op, conditions } => {
                match conditions.as_slice() {
                    [] => {
                        return Err(RlsError::construction(format!(
                            "empty {} group",
                            op.keyword()
                        )));
                    }
                    [only] => return only.render_sql(dialect),
                    _ => {}
                }
                let rendered = conditions
                    .iter()
                    .map(|condition| condition.render_sql(dialect))
                    .collect::<Result<Vec<_>, _>>()?;
                let separator = format!(" {} ", op.keyword());
                Ok(format!("({})", rendered.join(&separator)))
            }
            Condition::Subquery { column, subquery } => Ok(format!(
                "{} IN {}",
                escape_qualified(column.as_str()),
                subquery.render_sql(dialect)?
            )),
            Condition::Function { name, args } => {
                let rendered = args
                    .iter()
                    .map(|arg| match arg {
                        FunctionArg::Identifier(identifier) => Ok(escape_qualified(identifier)),
                        FunctionArg::Condition(condition) => condition.render_sql(dialect),
                        FunctionArg::Value(value) => escape_value(value, dialect),
                    })
                    .collect::<Result<Vec<_>, RlsError>>()?;
                Ok(format!("{}({})", escape_qualified(name), rendered.join(", ")))
            }
            Condition::Helper(helper) => helper.render_sql(dialect),
            Condition::Context(context) => context.render_sql(dialect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subquery::from;
    use crate::value::{column, current_user_id, raw, session, SessionType};
    use pretty_assertions::assert_eq;

    fn sql(condition: &Condition) -> String {
        condition.to_sql().unwrap()
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(sql(&column("age").eq(18)), "age = 18");
        assert_eq!(sql(&column("age").neq(18)), "age != 18");
        assert_eq!(sql(&column("age").gt(18)), "age > 18");
        assert_eq!(sql(&column("age").gte(18)), "age >= 18");
        assert_eq!(sql(&column("age").lt(18)), "age < 18");
        assert_eq!(sql(&column("age").lte(18)), "age <= 18");
    }

    #[test]
    fn test_comparison_escapes_both_sides() {
        assert_eq!(
            sql(&column("last-name").eq("O'Brien")),
            "\"last-name\" = 'O''Brien'"
        );
    }

    #[test]
    fn test_pattern() {
        assert_eq!(sql(&column("email").like("%@acme.com")), "email LIKE '%@acme.com'");
        assert_eq!(sql(&column("title").ilike("draft%")), "title ILIKE 'draft%'");
    }

    #[test]
    fn test_membership_list() {
        assert_eq!(
            sql(&column("status").is_in(["active", "pending"])),
            "status IN ('active', 'pending')"
        );
        // Empty lists are kept as-is: always false in PostgreSQL.
        assert_eq!(
            sql(&column("status").is_in(Vec::<String>::new())),
            "status IN ()"
        );
    }

    #[test]
    fn test_membership_contains() {
        assert_eq!(
            sql(&column("tags").contains(vec!["admin"])),
            "tags @> ARRAY['admin']"
        );
    }

    #[test]
    fn test_membership_subquery() {
        let subquery = from("teams")
            .select(["id"])
            .filter(column("owner_id").eq(current_user_id()))
            .unwrap()
            .build();
        assert_eq!(
            sql(&column("team_id").in_subquery(subquery)),
            "team_id IN (SELECT id FROM teams WHERE owner_id = auth.uid())"
        );
    }

    #[test]
    fn test_null_checks() {
        assert_eq!(sql(&column("deleted_at").is_null()), "deleted_at IS NULL");
        assert_eq!(
            sql(&column("published_at").is_not_null()),
            "published_at IS NOT NULL"
        );
    }

    #[test]
    fn test_function_call() {
        let condition = Condition::function(
            "auth.can_access",
            [
                FunctionArg::from("p.id"),
                FunctionArg::from(column("role").eq("editor")),
                FunctionArg::from(SqlValue::from("read")),
            ],
        );
        assert_eq!(
            sql(&condition),
            "auth.can_access(p.id, role = 'editor', 'read')"
        );
    }

    #[test]
    fn test_context_condition() {
        let condition = Condition::Context(session("app.is_admin", SessionType::Boolean));
        assert_eq!(sql(&condition), "current_setting('app.is_admin')::boolean");
    }

    #[test]
    fn test_raw_value() {
        assert_eq!(
            sql(&column("created_at").gt(raw("NOW() - INTERVAL '7 days'"))),
            "created_at > NOW() - INTERVAL '7 days'"
        );
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let condition = column("user_id")
            .eq(current_user_id())
            .or(column("is_public").eq(true))
            .and(column("deleted_at").is_null());
        assert_eq!(sql(&condition), sql(&condition));
    }

    #[test]
    fn test_column_accessor() {
        assert_eq!(
            column("a.b").eq(1).column().map(ColumnRef::as_str),
            Some("a.b")
        );
        assert!(column("a").eq(1).and(column("b").eq(2)).column().is_none());
    }

    #[test]
    fn test_empty_logical_group_is_rejected() {
        let decoded: Condition =
            serde_json::from_str(r#"{"logical":{"op":"and","conditions":[]}}"#).unwrap();
        let err = decoded.to_sql().unwrap_err();
        assert!(err.is_construction_error());

        let built = Condition::Logical {
            op: LogicalOp::Or,
            conditions: vec![],
        };
        assert!(built.to_sql().unwrap_err().is_construction_error());
    }

    #[test]
    fn test_single_child_logical_group_renders_child() {
        let condition = Condition::Logical {
            op: LogicalOp::And,
            conditions: vec![column("user_id").eq(current_user_id())],
        };
        assert_eq!(sql(&condition), "user_id = auth.uid()");
    }
}
