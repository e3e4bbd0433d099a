//! Derived tables used by `IN (SELECT ...)` conditions.
//!
//! A [`SubqueryBuilder`] validates table references as it grows: every
//! qualified column used in a join's ON condition or in the WHERE condition
//! must name the FROM table or a join added before it.

use rowguard_core::DialectConfig;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::RlsError;
use crate::escape::{escape_identifier, escape_qualified};
use crate::references::{ReferenceClause, check_references};
use crate::render::RenderSql;

/// Select list used when none is given.
const DEFAULT_SELECT: &str = "id";

/// A table in a subquery's FROM or JOIN, with its optional alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubqueryTable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl SubqueryTable {
    pub fn new(name: impl Into<String>, alias: Option<&str>) -> Self {
        Self {
            name: name.into(),
            alias: alias.map(str::to_string),
        }
    }

    /// The identifier columns must be qualified with: the alias, else the name.
    pub fn reference_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} {}", escape_qualified(&self.name), escape_identifier(alias)),
            None => escape_qualified(&self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub table: SubqueryTable,
    pub kind: JoinKind,
    pub on: Condition,
}

/// An immutable derived table: `(SELECT ... FROM ... [JOIN ...] [WHERE ...])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubqueryDefinition {
    pub from: SubqueryTable,
    pub select: Vec<String>,
    /// Rendered in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<Join>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Box<Condition>>,
}

impl SubqueryDefinition {
    /// Every identifier a column in this subquery may be qualified with.
    pub fn available_tables(&self) -> Vec<&str> {
        std::iter::once(self.from.reference_name())
            .chain(self.joins.iter().map(|join| join.table.reference_name()))
            .collect()
    }
}

impl RenderSql for SubqueryDefinition {
    fn render_sql(&self, dialect: &DialectConfig) -> Result<String, RlsError> {
        let select = if self.select.is_empty() {
            DEFAULT_SELECT.to_string()
        } else {
            self.select
                .iter()
                .map(|column| match column.as_str() {
                    "*" => "*".to_string(),
                    other => escape_qualified(other),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("(SELECT {} FROM {}", select, self.from.render());
        for join in &self.joins {
            sql.push_str(&format!(
                " {} {} ON {}",
                join.kind.keyword(),
                join.table.render(),
                join.on.render_sql(dialect)?
            ));
        }
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.render_sql(dialect)?);
        }
        sql.push(')');
        Ok(sql)
    }
}

/// Incrementally builds a [`SubqueryDefinition`], rejecting dangling table
/// references as soon as a condition is attached.
#[derive(Debug, Clone)]
pub struct SubqueryBuilder {
    definition: SubqueryDefinition,
}

/// Start a subquery over `table`.
pub fn from(table: impl Into<String>) -> SubqueryBuilder {
    SubqueryBuilder::new(SubqueryTable::new(table, None))
}

/// Start a subquery over `table` aliased as `alias`.
pub fn from_as(table: impl Into<String>, alias: &str) -> SubqueryBuilder {
    SubqueryBuilder::new(SubqueryTable::new(table, Some(alias)))
}

impl SubqueryBuilder {
    fn new(from: SubqueryTable) -> Self {
        Self {
            definition: SubqueryDefinition {
                from,
                select: vec![DEFAULT_SELECT.to_string()],
                joins: Vec::new(),
                filter: None,
            },
        }
    }

    /// Replace the select list.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.definition.select = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a join on `table`, referenced by its own name.
    pub fn join(
        self,
        table: impl Into<String>,
        on: Condition,
        kind: JoinKind,
    ) -> Result<Self, RlsError> {
        self.push_join(SubqueryTable::new(table, None), on, kind)
    }

    /// Add a join on `table` aliased as `alias`.
    pub fn join_as(
        self,
        table: impl Into<String>,
        alias: &str,
        on: Condition,
        kind: JoinKind,
    ) -> Result<Self, RlsError> {
        self.push_join(SubqueryTable::new(table, Some(alias)), on, kind)
    }

    fn push_join(
        mut self,
        table: SubqueryTable,
        on: Condition,
        kind: JoinKind,
    ) -> Result<Self, RlsError> {
        // The ON condition may reference the table being joined.
        let mut scope = self.scope();
        scope.push(table.reference_name().to_string());
        check_references(&on, &scope, ReferenceClause::Join, &self.definition.from.name)?;

        self.definition.joins.push(Join { table, kind, on });
        Ok(self)
    }

    /// Set the WHERE condition. A second call ANDs with the first.
    pub fn filter(mut self, condition: Condition) -> Result<Self, RlsError> {
        let scope = self.scope();
        check_references(&condition, &scope, ReferenceClause::Where, &self.definition.from.name)?;

        self.definition.filter = Some(Box::new(match self.definition.filter.take() {
            Some(existing) => (*existing).and(condition),
            None => condition,
        }));
        Ok(self)
    }

    fn scope(&self) -> Vec<String> {
        self.definition
            .available_tables()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn build(self) -> SubqueryDefinition {
        self.definition
    }
}

impl From<SubqueryBuilder> for SubqueryDefinition {
    fn from(builder: SubqueryBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{column, current_user_id};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_subquery() {
        let subquery = from("projects").build();
        assert_eq!(subquery.to_sql().unwrap(), "(SELECT id FROM projects)");
    }

    #[test]
    fn test_subquery_with_alias_select_and_where() {
        let subquery = from_as("projects", "p")
            .select(["p.id", "p.name"])
            .filter(column("p.owner_id").eq(current_user_id()))
            .unwrap()
            .build();
        assert_eq!(
            subquery.to_sql().unwrap(),
            "(SELECT p.id, p.name FROM projects p WHERE p.owner_id = auth.uid())"
        );
    }

    #[test]
    fn test_join_positioned_between_from_and_where() {
        let subquery = from_as("projects", "p")
            .join_as(
                "members",
                "m",
                column("m.project_id").eq(column("p.id")),
                JoinKind::Inner,
            )
            .unwrap()
            .filter(column("m.user_id").eq(current_user_id()))
            .unwrap()
            .build();
        assert_eq!(
            subquery.to_sql().unwrap(),
            "(SELECT id FROM projects p INNER JOIN members m ON m.project_id = p.id WHERE m.user_id = auth.uid())"
        );
    }

    #[test]
    fn test_join_kinds() {
        assert_eq!(JoinKind::Left.keyword(), "LEFT JOIN");
        assert_eq!(JoinKind::Right.keyword(), "RIGHT JOIN");
        assert_eq!(JoinKind::Full.keyword(), "FULL JOIN");
        assert_eq!(JoinKind::default(), JoinKind::Inner);
    }

    // Every join is rendered, in the order it was added; none are dropped.
    #[test]
    fn test_multiple_joins_all_rendered_in_order() {
        let subquery = from_as("projects", "p")
            .join_as("members", "m", column("m.project_id").eq(column("p.id")), JoinKind::Inner)
            .unwrap()
            .join_as("teams", "t", column("t.id").eq(column("m.team_id")), JoinKind::Left)
            .unwrap()
            .filter(column("t.active").eq(true))
            .unwrap()
            .build();
        let sql = subquery.to_sql().unwrap();
        assert_eq!(
            sql,
            "(SELECT id FROM projects p INNER JOIN members m ON m.project_id = p.id LEFT JOIN teams t ON t.id = m.team_id WHERE t.active = TRUE)"
        );
        assert_eq!(sql.matches(" JOIN ").count(), 2);
    }

    #[test]
    fn test_dangling_where_reference_rejected() {
        let err = from("projects")
            .filter(column("members.user_id").eq(current_user_id()))
            .unwrap_err();
        match err {
            RlsError::DanglingReference { missing, .. } => assert_eq!(missing, vec!["members"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_where_reference_after_join_accepted() {
        let result = from("projects")
            .join(
                "members",
                column("members.project_id").eq(column("projects.id")),
                JoinKind::Inner,
            )
            .and_then(|builder| builder.filter(column("members.user_id").eq(current_user_id())));
        assert!(result.is_ok());
    }

    #[test]
    fn test_join_on_may_reference_joined_table_only() {
        // Own target is in scope.
        assert!(
            from_as("projects", "p")
                .join_as("members", "m", column("m.project_id").eq(column("p.id")), JoinKind::Inner)
                .is_ok()
        );

        // A table joined later is not.
        let err = from_as("projects", "p")
            .join_as("members", "m", column("t.id").eq(column("m.team_id")), JoinKind::Inner)
            .unwrap_err();
        assert!(matches!(
            err,
            RlsError::DanglingReference { ref missing, clause: "join", .. } if missing == &vec!["t".to_string()]
        ));
    }

    #[test]
    fn test_aliased_table_referenced_by_alias() {
        let err = from_as("projects", "p")
            .filter(column("projects.owner_id").eq(current_user_id()))
            .unwrap_err();
        assert!(matches!(err, RlsError::DanglingReference { .. }));
    }

    #[test]
    fn test_unqualified_columns_always_accepted() {
        assert!(
            from("projects")
                .filter(column("owner_id").eq(current_user_id()))
                .is_ok()
        );
    }

    #[test]
    fn test_repeated_filter_is_anded() {
        let subquery = from("projects")
            .filter(column("archived").eq(false))
            .unwrap()
            .filter(column("owner_id").eq(current_user_id()))
            .unwrap()
            .build();
        assert_eq!(
            subquery.to_sql().unwrap(),
            "(SELECT id FROM projects WHERE (archived = FALSE AND owner_id = auth.uid()))"
        );
    }
}
