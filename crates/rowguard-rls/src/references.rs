//! Table reference validation for subquery conditions.
//!
//! Walks a condition tree and collects the qualifier of every qualified
//! column reference (`alias.column`). Unqualified columns resolve against the
//! current table and are never reported. Nested subqueries extend the scope
//! with their own FROM and JOIN tables while their conditions are walked.

use crate::condition::{Condition, FunctionArg, Membership};
use crate::error::RlsError;
use crate::helper::Helper;
use crate::subquery::SubqueryDefinition;
use crate::value::{ColumnRef, SqlValue};

/// Which clause a condition is being attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceClause {
    Join,
    Where,
}

impl ReferenceClause {
    fn name(&self) -> &'static str {
        match self {
            ReferenceClause::Join => "join",
            ReferenceClause::Where => "where",
        }
    }
}

/// Fail with a dangling reference error if `condition` uses a qualifier
/// outside `scope`.
pub fn check_references(
    condition: &Condition,
    scope: &[String],
    clause: ReferenceClause,
    source_table: &str,
) -> Result<(), RlsError> {
    let missing = missing_references(condition, scope);
    if missing.is_empty() {
        tracing::debug!(
            table = source_table,
            clause = clause.name(),
            "Subquery table references resolved"
        );
        return Ok(());
    }

    Err(RlsError::DanglingReference {
        missing,
        clause: clause.name(),
        source_table: source_table.to_string(),
    })
}

/// Qualifiers used in `condition` that are not in `scope`, deduplicated in
/// first-seen order.
pub fn missing_references(condition: &Condition, scope: &[String]) -> Vec<String> {
    let mut walker = ReferenceWalker {
        scopes: vec![scope.to_vec()],
        missing: Vec::new(),
    };
    walker.condition(condition);
    walker.missing
}

struct ReferenceWalker {
    /// Stack of scopes; nested subqueries push their own tables.
    scopes: Vec<Vec<String>>,
    missing: Vec<String>,
}

impl ReferenceWalker {
    fn in_scope(&self, qualifier: &str) -> bool {
        self.scopes
            .iter()
            .any(|scope| scope.iter().any(|name| name == qualifier))
    }

    fn column(&mut self, column: &ColumnRef) {
        self.qualified_name(column.as_str());
    }

    fn qualified_name(&mut self, name: &str) {
        let Some((qualifier, _)) = name.rsplit_once('.') else {
            return;
        };
        if !self.in_scope(qualifier) && !self.missing.iter().any(|m| m == qualifier) {
            self.missing.push(qualifier.to_string());
        }
    }

    fn value(&mut self, value: &SqlValue) {
        match value {
            SqlValue::Column(column) => self.column(column),
            SqlValue::Condition(condition) => self.condition(condition),
            SqlValue::Array(items) => items.iter().for_each(|item| self.value(item)),
            _ => {}
        }
    }

    fn subquery(&mut self, subquery: &SubqueryDefinition) {
        self.scopes.push(
            subquery
                .available_tables()
                .into_iter()
                .map(str::to_string)
                .collect(),
        );
        for join in &subquery.joins {
            self.condition(&join.on);
        }
        if let Some(filter) = &subquery.filter {
            self.condition(filter);
        }
        self.scopes.pop();
    }

    fn condition(&mut self, condition: &Condition) {
        match condition {
            Condition::Comparison { column, value, .. } => {
                self.column(column);
                self.value(value);
            }
            Condition::Pattern { column, .. } | Condition::NullCheck { column, .. } => {
                self.column(column);
            }
            Condition::Membership { column, membership } => {
                self.column(column);
                match membership {
                    Membership::In(values) => values.iter().for_each(|value| self.value(value)),
                    Membership::InSubquery(subquery) => self.subquery(subquery),
                    Membership::Contains(value) => self.value(value),
                }
            }
            Condition::Logical { conditions, .. } => {
                conditions.iter().for_each(|child| self.condition(child));
            }
            Condition::Subquery { column, subquery } => {
                self.column(column);
                self.subquery(subquery);
            }
            Condition::Function { args, .. } => {
                for arg in args {
                    match arg {
                        FunctionArg::Identifier(identifier) => self.qualified_name(identifier),
                        FunctionArg::Condition(condition) => self.condition(condition),
                        FunctionArg::Value(value) => self.value(value),
                    }
                }
            }
            Condition::Helper(Helper::IsMemberOf { local_key, .. }) => self.column(local_key),
            Condition::Helper(Helper::HasRole { .. } | Helper::AlwaysTrue) => {}
            Condition::Context(_) => {}
        }
    }
}
