//! CREATE POLICY assembly.
//!
//! Clause order is fixed:
//!
//! ```text
//! CREATE POLICY <name> ON <table> [AS RESTRICTIVE] FOR <COMMAND> [TO <role>]
//!     [USING (<condition>)] [WITH CHECK (<condition>)]
//! ```
//!
//! Companion statements (enabling RLS, dropping an existing policy, index
//! creation) are optional and surround the policy statement.

use rowguard_core::DialectConfig;
use rowguard_rls::{
    escape_identifier, escape_qualified, extract_index_columns, IndexCandidates, RenderSql,
    RlsError,
};

use crate::definition::PolicyDefinition;

/// Options for [`render_policy_sql`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Append `CREATE INDEX IF NOT EXISTS` statements for filtered columns.
    pub include_indexes: bool,
    /// Prepend `ALTER TABLE ... ENABLE ROW LEVEL SECURITY`.
    pub enable_row_level_security: bool,
    /// Prepend `DROP POLICY IF EXISTS` so the script can be re-run.
    pub drop_existing: bool,
}

impl RenderOptions {
    pub fn with_indexes() -> Self {
        Self {
            include_indexes: true,
            ..Self::default()
        }
    }
}

/// Render a policy, and any requested companion statements, to SQL.
///
/// Statements are separated by newlines and each ends with a semicolon.
pub fn render_policy_sql(
    definition: &PolicyDefinition,
    options: &RenderOptions,
    dialect: &DialectConfig,
) -> Result<String, RlsError> {
    validate(definition)?;

    let name = escape_identifier(&definition.resolved_name(dialect)?);
    let table = escape_qualified(&definition.table);

    let mut statements = Vec::new();
    if options.enable_row_level_security {
        statements.push(format!("ALTER TABLE {} ENABLE ROW LEVEL SECURITY;", table));
    }
    if options.drop_existing {
        statements.push(format!("DROP POLICY IF EXISTS {} ON {};", name, table));
    }
    statements.push(create_policy_statement(definition, &name, &table, dialect)?);

    let mut index_count = 0;
    if options.include_indexes {
        let indexes = policy_index_columns(definition);
        index_count = indexes.len();
        statements.extend(indexes.to_statements(dialect)?);
    }

    tracing::debug!(
        policy = %name,
        table = %table,
        command = %definition.command,
        restrictive = definition.kind.is_restrictive(),
        index_count,
        "Rendered policy"
    );

    Ok(statements.join("\n"))
}

fn create_policy_statement(
    definition: &PolicyDefinition,
    name: &str,
    table: &str,
    dialect: &DialectConfig,
) -> Result<String, RlsError> {
    let mut sql = format!("CREATE POLICY {} ON {}", name, table);
    if definition.kind.is_restrictive() {
        sql.push_str(" AS RESTRICTIVE");
    }
    sql.push_str(" FOR ");
    sql.push_str(definition.command.as_sql());
    if let Some(role) = &definition.role {
        sql.push_str(" TO ");
        sql.push_str(&escape_identifier(role));
    }
    if let Some(using) = &definition.using {
        sql.push_str(&format!(" USING ({})", using.render_sql(dialect)?));
    }
    if let Some(with_check) = &definition.with_check {
        sql.push_str(&format!(" WITH CHECK ({})", with_check.render_sql(dialect)?));
    }
    sql.push(';');
    Ok(sql)
}

fn validate(definition: &PolicyDefinition) -> Result<(), RlsError> {
    if definition.table.trim().is_empty() {
        return Err(RlsError::construction("policy table is required"));
    }
    if definition.using.is_some() && !definition.command.filters_existing_rows() {
        return Err(RlsError::construction(format!(
            "{} policies only accept WITH CHECK, not USING",
            definition.command
        )));
    }
    if definition.with_check.is_some() && !definition.command.checks_new_rows() {
        return Err(RlsError::construction(format!(
            "{} policies only accept USING, not WITH CHECK",
            definition.command
        )));
    }
    Ok(())
}

/// Index candidates across both of a policy's conditions.
pub fn policy_index_columns(definition: &PolicyDefinition) -> IndexCandidates {
    let mut candidates = IndexCandidates::new();
    for condition in [&definition.using, &definition.with_check].into_iter().flatten() {
        candidates.extend(&extract_index_columns(condition, &definition.table));
    }
    candidates
}

/// `DROP POLICY IF EXISTS` for a definition, for down migrations.
pub fn drop_policy_sql(
    definition: &PolicyDefinition,
    dialect: &DialectConfig,
) -> Result<String, RlsError> {
    Ok(format!(
        "DROP POLICY IF EXISTS {} ON {};",
        escape_identifier(&definition.resolved_name(dialect)?),
        escape_qualified(&definition.table)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::policy;
    use pretty_assertions::assert_eq;
    use rowguard_core::PolicyCommand;
    use rowguard_rls::{column, current_user_id};

    fn owner_policy() -> PolicyDefinition {
        policy("user_docs")
            .on("documents")
            .all()
            .to("authenticated")
            .using(column("user_id").eq(current_user_id()))
            .with_check(column("user_id").eq(current_user_id()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_clause_order() {
        let sql = owner_policy().to_sql(&RenderOptions::default()).unwrap();
        assert_eq!(
            sql,
            "CREATE POLICY user_docs ON documents FOR ALL TO authenticated USING (user_id = auth.uid()) WITH CHECK (user_id = auth.uid());"
        );
    }

    #[test]
    fn test_restrictive_marker_follows_table() {
        let mut definition = owner_policy();
        definition.kind = rowguard_core::PolicyKind::Restrictive;
        let sql = definition.to_sql(&RenderOptions::default()).unwrap();
        assert!(sql.starts_with(
            "CREATE POLICY user_docs ON documents AS RESTRICTIVE FOR ALL TO authenticated"
        ));
    }

    #[test]
    fn test_companion_statements() {
        let options = RenderOptions {
            include_indexes: true,
            enable_row_level_security: true,
            drop_existing: true,
        };
        let sql = owner_policy().to_sql(&options).unwrap();
        let lines: Vec<&str> = sql.lines().collect();
        assert_eq!(
            lines,
            vec![
                "ALTER TABLE documents ENABLE ROW LEVEL SECURITY;",
                "DROP POLICY IF EXISTS user_docs ON documents;",
                "CREATE POLICY user_docs ON documents FOR ALL TO authenticated USING (user_id = auth.uid()) WITH CHECK (user_id = auth.uid());",
                "CREATE INDEX IF NOT EXISTS idx_documents_user_id ON documents (user_id);",
            ]
        );
    }

    #[test]
    fn test_using_rejected_for_insert() {
        let mut definition = owner_policy();
        definition.command = PolicyCommand::Insert;
        let err = definition.to_sql(&RenderOptions::default()).unwrap_err();
        assert!(err.is_construction_error());
    }

    #[test]
    fn test_with_check_rejected_for_select() {
        let mut definition = owner_policy();
        definition.command = PolicyCommand::Select;
        let err = definition.to_sql(&RenderOptions::default()).unwrap_err();
        assert!(err.to_string().contains("WITH CHECK"));
    }

    #[test]
    fn test_empty_table_rejected() {
        let mut definition = owner_policy();
        definition.table = String::new();
        assert!(definition.to_sql(&RenderOptions::default()).is_err());
    }

    #[test]
    fn test_quoted_role_and_table() {
        let definition = policy("p")
            .on("audit-log")
            .read()
            .to("app-reader")
            .build()
            .unwrap();
        assert_eq!(
            definition.to_sql(&RenderOptions::default()).unwrap(),
            "CREATE POLICY p ON \"audit-log\" FOR SELECT TO \"app-reader\";"
        );
    }

    #[test]
    fn test_drop_policy_sql() {
        assert_eq!(
            drop_policy_sql(&owner_policy(), &DialectConfig::default()).unwrap(),
            "DROP POLICY IF EXISTS user_docs ON documents;"
        );
    }

    #[test]
    fn test_custom_dialect() {
        let dialect = DialectConfig::default()
            .with_current_user_expression("current_setting('request.jwt.claim.sub')::uuid");
        let sql = owner_policy()
            .render(&RenderOptions::default(), &dialect)
            .unwrap();
        assert!(sql.contains("USING (user_id = current_setting('request.jwt.claim.sub')::uuid)"));
    }
}
