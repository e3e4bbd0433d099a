//! Escaping of identifiers and literal values.
//!
//! Escaping follows standard SQL quoting: identifiers that are not plain
//! `[A-Za-z0-9_]+` words are double-quoted, string literals are
//! single-quoted with embedded quotes doubled.

use chrono::SecondsFormat;
use regex::Regex;
use rowguard_core::{DialectConfig, UnknownValuePolicy};
use std::sync::LazyLock;

use crate::error::RlsError;
use crate::render::RenderSql;
use crate::value::SqlValue;

static PLAIN_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("identifier pattern is valid"));

static NAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_]+").expect("separator pattern is valid"));

/// Length of the hash suffix appended to truncated names, including the `_`.
const HASH_SUFFIX_LEN: usize = 9;

/// Escape a single identifier.
///
/// Plain words are returned unchanged; anything else is double-quoted with
/// embedded double quotes doubled.
pub fn escape_identifier(name: &str) -> String {
    if PLAIN_IDENTIFIER.is_match(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Escape a possibly qualified name (`alias.column`, `schema.function`) part by part.
pub fn escape_qualified(name: &str) -> String {
    name.split('.')
        .map(escape_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// Single-quote a string literal.
pub fn escape_string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Escape a value for inclusion in SQL text.
pub fn escape_value(value: &SqlValue, dialect: &DialectConfig) -> Result<String, RlsError> {
    match value {
        SqlValue::Null => Ok("NULL".to_string()),
        SqlValue::Bool(true) => Ok("TRUE".to_string()),
        SqlValue::Bool(false) => Ok("FALSE".to_string()),
        SqlValue::Int(i) => Ok(i.to_string()),
        SqlValue::Float(f) if f.is_finite() => Ok(f.to_string()),
        SqlValue::Float(f) => unknown_value(f.to_string(), dialect),
        SqlValue::Text(s) => Ok(escape_string_literal(s)),
        SqlValue::Timestamp(ts) => Ok(format!(
            "{}::{}",
            escape_string_literal(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            dialect.timestamp_cast
        )),
        SqlValue::Uuid(id) => Ok(format!("{}::uuid", escape_string_literal(&id.to_string()))),
        SqlValue::Array(items) => {
            let escaped = items
                .iter()
                .map(|item| escape_value(item, dialect))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("ARRAY[{}]", escaped.join(", ")))
        }
        SqlValue::Column(column) => column.render_sql(dialect),
        SqlValue::Raw(raw) => raw.render_sql(dialect),
        SqlValue::Context(context) => context.render_sql(dialect),
        SqlValue::Condition(condition) => condition.render_sql(dialect),
        SqlValue::Json(json) => match json {
            serde_json::Value::Object(_) => unknown_value(json.to_string(), dialect),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            other => escape_value(&SqlValue::from(other.clone()), dialect),
        },
    }
}

fn unknown_value(text: String, dialect: &DialectConfig) -> Result<String, RlsError> {
    match dialect.unknown_values {
        UnknownValuePolicy::Reject => Err(RlsError::UnsupportedValue { value: text }),
        UnknownValuePolicy::Quote => {
            tracing::warn!(value = %text, "Quoting value with no escaping rule");
            Ok(escape_string_literal(&text))
        }
    }
}

/// Turn an arbitrary policy name into a valid lowercase identifier.
///
/// Runs of characters outside `[a-z0-9_]` collapse to one underscore, edge
/// underscores are trimmed and a leading digit gets a `_` prefix. Names longer
/// than `max_len` bytes are truncated and suffixed with a hash of the original
/// so distinct long names stay distinct.
pub fn sanitize_identifier_name(name: &str, max_len: usize) -> Result<String, RlsError> {
    if name.trim().is_empty() {
        return Err(RlsError::invalid_name(name, "name is empty"));
    }

    let lowered = name.to_lowercase();
    let replaced = NAME_SEPARATORS.replace_all(&lowered, "_");
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        return Err(RlsError::invalid_name(
            name,
            "name has no identifier characters",
        ));
    }

    let mut sanitized = if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", trimmed)
    } else {
        trimmed.to_string()
    };

    if sanitized.len() > max_len {
        if max_len <= HASH_SUFFIX_LEN {
            return Err(RlsError::invalid_name(
                name,
                format!("identifier limit {} leaves no room for a hashed suffix", max_len),
            ));
        }
        // Sanitized text is ASCII, so byte truncation is char-safe.
        let keep = max_len - HASH_SUFFIX_LEN;
        sanitized.truncate(keep);
        let prefix = sanitized.trim_end_matches('_');
        let truncated = format!("{}_{:08x}", prefix, fnv1a(name.as_bytes()));
        tracing::warn!(
            original = name,
            truncated = %truncated,
            "Policy name exceeds identifier limit; truncated"
        );
        sanitized = truncated;
    }

    Ok(sanitized)
}

/// 32-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
