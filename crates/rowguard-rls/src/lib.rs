//! # rowguard-rls
//!
//! The condition model and SQL rendering engine behind Rowguard policies.
//!
//! This crate provides:
//! - Escaping of identifiers and literal values
//! - A closed [`Condition`] tree that renders to self-contained SQL
//! - Composition helpers that keep AND/OR groups flat
//! - Subquery builders that reject dangling table references
//! - Extraction of columns worth indexing for a policy
//!
//! ## Example
//!
//! ```
//! use rowguard_rls::{column, current_user_id, RenderSql};
//!
//! let condition = column("user_id")
//!     .eq(current_user_id())
//!     .or(column("is_public").eq(true));
//!
//! assert_eq!(
//!     condition.to_sql().unwrap(),
//!     "(user_id = auth.uid() OR is_public = TRUE)"
//! );
//! ```

pub mod compose;
pub mod condition;
pub mod error;
pub mod escape;
pub mod helper;
pub mod index;
pub mod references;
pub mod render;
pub mod subquery;
pub mod value;

pub use compose::{all, any, DEFAULT_TENANT_KEY};
pub use condition::{
    ComparisonOp, Condition, FunctionArg, LogicalOp, Membership, NullCheck, PatternOp,
};
pub use error::RlsError;
pub use escape::{
    escape_identifier, escape_qualified, escape_string_literal, escape_value,
    sanitize_identifier_name,
};
pub use helper::{always_true, has_role, has_role_in, Helper};
pub use index::{extract_index_columns, IndexCandidates};
pub use references::{check_references, missing_references, ReferenceClause};
pub use render::RenderSql;
pub use subquery::{
    from, from_as, Join, JoinKind, SubqueryBuilder, SubqueryDefinition, SubqueryTable,
};
pub use value::{
    column, current_role, current_user_id, raw, session, ColumnRef, ContextValue, RawSql,
    SessionType, SqlValue,
};
