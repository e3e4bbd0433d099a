//! Ready-made builders for common access patterns.
//!
//! Each template returns a [`PolicyBuilder`], so callers can still rename
//! the policy, narrow it to a role or add conditions before building.

use rowguard_rls::{column, has_role};

use crate::definition::PolicyBuilder;

/// Users see and modify only the rows they own.
pub fn owner_only(table: impl Into<String>, owner_column: &str) -> PolicyBuilder {
    PolicyBuilder::new()
        .on(table)
        .all()
        .using(column(owner_column).is_owner())
        .with_check(column(owner_column).is_owner())
        .describe("Rows are visible and writable only by their owner")
}

/// Rows are confined to the tenant in `app.current_tenant_id`.
///
/// Restrictive, so it narrows whatever other policies grant.
pub fn tenant_isolation(table: impl Into<String>, tenant_column: &str) -> PolicyBuilder {
    PolicyBuilder::new()
        .on(table)
        .all()
        .restrictive()
        .using(column(tenant_column).belongs_to_tenant())
        .with_check(column(tenant_column).belongs_to_tenant())
        .describe("Rows are confined to the current tenant")
}

/// Anyone may read rows flagged public.
pub fn public_read(table: impl Into<String>, flag_column: &str) -> PolicyBuilder {
    PolicyBuilder::new()
        .on(table)
        .read()
        .using(column(flag_column).is_public())
        .describe("Public rows are readable by everyone")
}

/// Holders of `role` have full access.
pub fn role_based(table: impl Into<String>, role: &str) -> PolicyBuilder {
    PolicyBuilder::new()
        .on(table)
        .all()
        .using(has_role(role))
        .with_check(has_role(role))
        .describe(format!("Users with the '{}' role have full access", role))
}
