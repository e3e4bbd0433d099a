//! # rowguard-policy
//!
//! Row-level security policy definitions and SQL generation.
//!
//! A [`PolicyDefinition`] names a table, a command, an optional role and up
//! to two conditions; [`render_policy_sql`] turns it into a
//! `CREATE POLICY` statement, optionally surrounded by companion statements:
//!
//! ```sql
//! ALTER TABLE documents ENABLE ROW LEVEL SECURITY;
//! CREATE POLICY user_docs ON documents FOR SELECT USING (user_id = auth.uid());
//! CREATE INDEX IF NOT EXISTS idx_documents_user_id ON documents (user_id);
//! ```
//!
//! ## Example
//!
//! ```
//! use rowguard_policy::policy;
//! use rowguard_rls::{column, current_user_id};
//!
//! let sql = policy("user_docs")
//!     .on("documents")
//!     .read()
//!     .using(column("user_id").eq(current_user_id()))
//!     .to_sql()
//!     .unwrap();
//!
//! assert_eq!(
//!     sql,
//!     "CREATE POLICY user_docs ON documents FOR SELECT USING (user_id = auth.uid());"
//! );
//! ```

pub mod assembler;
pub mod definition;
pub mod templates;

pub use assembler::{drop_policy_sql, policy_index_columns, render_policy_sql, RenderOptions};
pub use definition::{policy, PolicyBuilder, PolicyDefinition};
