//! Shared helpers for policy integration tests.

/// Collapse whitespace runs to one space and strip trailing semicolons.
pub fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(';')
        .trim_end()
        .to_string()
}
