//! Index candidate extraction.
//!
//! Walks a condition tree and collects the `(table, column)` pairs a policy
//! filters on per row: equality against a dynamic value (a context value,
//! another column, a raw expression), `IN (SELECT ...)` columns, and the keys
//! used by membership helpers. Equality against constants is not indexed.
//! Aliases are resolved to table names the same way reference validation
//! tracks them.

use rowguard_core::DialectConfig;

use crate::condition::{ComparisonOp, Condition, FunctionArg, Membership};
use crate::error::RlsError;
use crate::escape::{escape_identifier, escape_qualified, sanitize_identifier_name};
use crate::helper::{Helper, USER_ID_COLUMN};
use crate::subquery::SubqueryDefinition;
use crate::value::{ColumnRef, SqlValue};

/// Table → columns worth indexing, in discovery order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexCandidates {
    tables: Vec<(String, Vec<String>)>,
}

impl IndexCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pair. Returns false if it was already present.
    pub fn insert(&mut self, table: &str, column: &str) -> bool {
        let position = match self.tables.iter().position(|(name, _)| name == table) {
            Some(position) => position,
            None => {
                self.tables.push((table.to_string(), Vec::new()));
                self.tables.len() - 1
            }
        };
        let columns = &mut self.tables[position].1;
        if columns.iter().any(|existing| existing == column) {
            return false;
        }
        columns.push(column.to_string());
        true
    }

    /// Merge another set, keeping this set's order first.
    pub fn extend(&mut self, other: &IndexCandidates) {
        for (table, column) in other.pairs() {
            self.insert(table, column);
        }
    }

    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, columns)| columns.as_slice())
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tables.iter().flat_map(|(table, columns)| {
            columns
                .iter()
                .map(move |column| (table.as_str(), column.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.tables.iter().map(|(_, columns)| columns.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One `CREATE INDEX IF NOT EXISTS` statement per pair.
    pub fn to_statements(&self, dialect: &DialectConfig) -> Result<Vec<String>, RlsError> {
        self.pairs()
            .map(|(table, column)| {
                let name = sanitize_identifier_name(
                    &format!("idx_{}_{}", table, column),
                    dialect.max_identifier_length,
                )?;
                Ok(format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
                    escape_identifier(&name),
                    escape_qualified(table),
                    escape_identifier(column)
                ))
            })
            .collect()
    }
}

/// Collect index candidates from `condition`, resolving unqualified columns
/// against `base_table`.
pub fn extract_index_columns(condition: &Condition, base_table: &str) -> IndexCandidates {
    let mut extractor = IndexExtractor {
        scopes: vec![TableScope {
            current: base_table.to_string(),
            aliases: Vec::new(),
        }],
        candidates: IndexCandidates::new(),
    };
    extractor.condition(condition);
    extractor.candidates
}

struct TableScope {
    current: String,
    /// alias → table
    aliases: Vec<(String, String)>,
}

struct IndexExtractor {
    scopes: Vec<TableScope>,
    candidates: IndexCandidates,
}

impl IndexExtractor {
    fn resolve(&self, column: &ColumnRef) -> (String, String) {
        let table = match column.qualifier() {
            Some(qualifier) => self
                .scopes
                .iter()
                .rev()
                .flat_map(|scope| scope.aliases.iter())
                .find(|(alias, _)| alias == qualifier)
                .map(|(_, table)| table.clone())
                .unwrap_or_else(|| qualifier.to_string()),
            None => self
                .scopes
                .last()
                .map(|scope| scope.current.clone())
                .unwrap_or_default(),
        };
        (table, column.name().to_string())
    }

    fn record(&mut self, column: &ColumnRef) {
        let (table, name) = self.resolve(column);
        self.candidates.insert(&table, &name);
    }

    fn subquery(&mut self, subquery: &SubqueryDefinition) {
        let mut aliases = Vec::new();
        for table in
            std::iter::once(&subquery.from).chain(subquery.joins.iter().map(|j| &j.table))
        {
            if let Some(alias) = &table.alias {
                aliases.push((alias.clone(), table.name.clone()));
            }
        }
        self.scopes.push(TableScope {
            current: subquery.from.name.clone(),
            aliases,
        });
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
            Condition::Comparison { column, op, value } => {
                if *op == ComparisonOp::Eq && value.is_dynamic() {
                    self.record(column);
                }
                if let SqlValue::Condition(nested) = value {
                    self.condition(nested);
                }
            }
            Condition::Membership {
                column,
                membership: Membership::InSubquery(subquery),
            }
            | Condition::Subquery { column, subquery } => {
                self.record(column);
                self.subquery(subquery);
            }
            Condition::Membership { .. }
            | Condition::Pattern { .. }
            | Condition::NullCheck { .. } => {}
            Condition::Logical { conditions, .. } => {
                conditions.iter().for_each(|child| self.condition(child));
            }
            Condition::Function { args, .. } => {
                for arg in args {
                    match arg {
                        FunctionArg::Condition(nested) => self.condition(nested),
                        FunctionArg::Value(SqlValue::Condition(nested)) => self.condition(nested),
                        FunctionArg::Identifier(_) | FunctionArg::Value(_) => {}
                    }
                }
            }
            Condition::Helper(Helper::IsMemberOf {
                join_table,
                foreign_key,
                local_key,
            }) => {
                self.record(local_key);
                self.candidates.insert(join_table, foreign_key);
                self.candidates.insert(join_table, USER_ID_COLUMN);
            }
            Condition::Helper(Helper::HasRole { .. } | Helper::AlwaysTrue) => {}
            Condition::Context(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subquery::{from_as, JoinKind};
    use crate::value::{column, current_user_id, raw};
    use pretty_assertions::assert_eq;

    fn pairs(candidates: &IndexCandidates) -> Vec<(String, String)> {
        candidates
            .pairs()
            .map(|(t, c)| (t.to_string(), c.to_string()))
            .collect()
    }

    fn pair(table: &str, column: &str) -> (String, String) {
        (table.to_string(), column.to_string())
    }

    #[test]
    fn test_dynamic_equality_is_indexed() {
        let candidates =
            extract_index_columns(&column("user_id").eq(current_user_id()), "documents");
        assert_eq!(pairs(&candidates), vec![pair("documents", "user_id")]);
    }

    #[test]
    fn test_constant_equality_is_not_indexed() {
        let candidates = extract_index_columns(&column("status").eq("active"), "documents");
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_non_equality_is_not_indexed() {
        let candidates = extract_index_columns(&column("created_at").gt(raw("NOW()")), "documents");
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_function_value_conditions_are_walked() {
        let nested = SqlValue::from(column("owner_id").eq(current_user_id()));
        let condition = Condition::function(
            "coalesce",
            [FunctionArg::Value(nested), FunctionArg::from("false")],
        );
        let candidates = extract_index_columns(&condition, "documents");
        assert_eq!(pairs(&candidates), vec![pair("documents", "owner_id")]);
    }

    #[test]
    fn test_flattened_group_collects_all_columns() {
        let condition = column("user_id")
            .is_owner()
            .and(column("tenant_id").belongs_to_tenant())
            .and(column("status").eq("active"));
        let candidates = extract_index_columns(&condition, "documents");
        assert_eq!(
            pairs(&candidates),
            vec![pair("documents", "user_id"), pair("documents", "tenant_id")]
        );
    }

    #[test]
    fn test_duplicates_are_removed() {
        let condition = column("user_id")
            .is_owner()
            .or(column("user_id").eq(raw("current_setting('app.delegate')::uuid")));
        let candidates = extract_index_columns(&condition, "documents");
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_is_member_of_indexes_both_sides() {
        let condition = column("org_id").is_member_of("org_members", "org_id");
        let candidates = extract_index_columns(&condition, "projects");
        assert_eq!(
            pairs(&candidates),
            vec![
                pair("projects", "org_id"),
                pair("org_members", "org_id"),
                pair("org_members", "user_id"),
            ]
        );
    }

    #[test]
    fn test_subquery_aliases_resolved() {
        let subquery = from_as("projects", "p")
            .join_as("members", "m", column("m.project_id").eq(column("p.id")), JoinKind::Inner)
            .unwrap()
            .filter(column("m.user_id").eq(current_user_id()))
            .unwrap()
            .select(["p.id"])
            .build();
        let condition = column("project_id").in_subquery(subquery);
        let candidates = extract_index_columns(&condition, "tasks");
        assert_eq!(
            pairs(&candidates),
            vec![
                pair("tasks", "project_id"),
                pair("members", "project_id"),
                pair("members", "user_id"),
            ]
        );
    }

    #[test]
    fn test_user_belongs_to_indexes_membership_table() {
        let condition = column("team_id").user_belongs_to("team_members", None);
        let candidates = extract_index_columns(&condition, "documents");
        assert_eq!(
            pairs(&candidates),
            vec![pair("documents", "team_id"), pair("team_members", "user_id")]
        );
    }

    #[test]
    fn test_statements() {
        let candidates = extract_index_columns(&column("user_id").is_owner(), "documents");
        let statements = candidates.to_statements(&DialectConfig::default()).unwrap();
        assert_eq!(
            statements,
            vec!["CREATE INDEX IF NOT EXISTS idx_documents_user_id ON documents (user_id);"]
        );
    }

    #[test]
    fn test_statement_for_quoted_table() {
        let mut candidates = IndexCandidates::new();
        candidates.insert("Audit-Log", "actor_id");
        let statements = candidates.to_statements(&DialectConfig::default()).unwrap();
        assert_eq!(
            statements,
            vec!["CREATE INDEX IF NOT EXISTS idx_audit_log_actor_id ON \"Audit-Log\" (actor_id);"]
        );
    }

    #[test]
    fn test_extend_keeps_order_and_dedupes() {
        let mut first = IndexCandidates::new();
        first.insert("a", "x");
        let mut second = IndexCandidates::new();
        second.insert("a", "x");
        second.insert("b", "y");
        first.extend(&second);
        assert_eq!(pairs(&first), vec![pair("a", "x"), pair("b", "y")]);
        assert_eq!(first.columns("a"), Some(&["x".to_string()][..]));
    }
}
