//! Condition composition.
//!
//! Logical combinators flatten same-operator groups, so
//! `a.and(b).and(c)` renders as `(a AND b AND c)` and index extraction sees
//! every column at one level. Groups with a different operator are kept as a
//! single nested child.

use chrono::{DateTime, Utc};

use crate::condition::{ComparisonOp, Condition, LogicalOp, Membership, NullCheck, PatternOp};
use crate::error::RlsError;
use crate::helper::{Helper, USER_ID_COLUMN};
use crate::subquery::{SubqueryDefinition, SubqueryTable};
use crate::value::{current_user_id, raw, session, ColumnRef, SessionType, SqlValue};

/// Session variable read by [`ColumnRef::belongs_to_tenant`].
pub const DEFAULT_TENANT_KEY: &str = "app.current_tenant_id";

impl Condition {
    /// `(self AND other)`, flattening nested AND groups.
    pub fn and(self, other: Condition) -> Condition {
        combine(LogicalOp::And, self, other)
    }

    /// `(self OR other)`, flattening nested OR groups.
    pub fn or(self, other: Condition) -> Condition {
        combine(LogicalOp::Or, self, other)
    }
}

fn combine(op: LogicalOp, left: Condition, right: Condition) -> Condition {
    let mut conditions = Vec::new();
    push_flattened(op, left, &mut conditions);
    push_flattened(op, right, &mut conditions);
    Condition::Logical { op, conditions }
}

fn push_flattened(op: LogicalOp, condition: Condition, out: &mut Vec<Condition>) {
    match condition {
        Condition::Logical {
            op: inner,
            conditions,
        } if inner == op => out.extend(conditions),
        other => out.push(other),
    }
}

fn fold(
    op: LogicalOp,
    conditions: impl IntoIterator<Item = Condition>,
) -> Result<Condition, RlsError> {
    let mut iter = conditions.into_iter();
    let first = iter.next().ok_or_else(|| {
        RlsError::construction(format!(
            "cannot build an empty {} group",
            op.keyword()
        ))
    })?;
    Ok(iter.fold(first, |acc, next| combine(op, acc, next)))
}

/// AND together every condition. A single condition is returned unchanged.
pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Result<Condition, RlsError> {
    fold(LogicalOp::And, conditions)
}

/// OR together every condition. A single condition is returned unchanged.
pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Result<Condition, RlsError> {
    fold(LogicalOp::Or, conditions)
}

impl ColumnRef {
    pub fn eq(self, value: impl Into<SqlValue>) -> Condition {
        Condition::comparison(self, ComparisonOp::Eq, value)
    }

    pub fn neq(self, value: impl Into<SqlValue>) -> Condition {
        Condition::comparison(self, ComparisonOp::Neq, value)
    }

    pub fn gt(self, value: impl Into<SqlValue>) -> Condition {
        Condition::comparison(self, ComparisonOp::Gt, value)
    }

    pub fn gte(self, value: impl Into<SqlValue>) -> Condition {
        Condition::comparison(self, ComparisonOp::Gte, value)
    }

    pub fn lt(self, value: impl Into<SqlValue>) -> Condition {
        Condition::comparison(self, ComparisonOp::Lt, value)
    }

    pub fn lte(self, value: impl Into<SqlValue>) -> Condition {
        Condition::comparison(self, ComparisonOp::Lte, value)
    }

    pub fn like(self, pattern: impl Into<String>) -> Condition {
        Condition::pattern(self, PatternOp::Like, pattern)
    }

    pub fn ilike(self, pattern: impl Into<String>) -> Condition {
        Condition::pattern(self, PatternOp::Ilike, pattern)
    }

    /// `col IN (...)` over literal values.
    pub fn is_in<I, V>(self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Condition::membership(
            self,
            Membership::In(values.into_iter().map(Into::into).collect()),
        )
    }

    /// `col IN (SELECT ...)`.
    pub fn in_subquery(self, subquery: impl Into<SubqueryDefinition>) -> Condition {
        Condition::membership(self, Membership::InSubquery(Box::new(subquery.into())))
    }

    /// `col @> value`.
    pub fn contains(self, value: impl Into<SqlValue>) -> Condition {
        Condition::membership(self, Membership::Contains(value.into()))
    }

    pub fn is_null(self) -> Condition {
        Condition::null_check(self, NullCheck::IsNull)
    }

    pub fn is_not_null(self) -> Condition {
        Condition::null_check(self, NullCheck::IsNotNull)
    }

    /// The row belongs to the current user.
    pub fn is_owner(self) -> Condition {
        self.eq(current_user_id())
    }

    /// The row is flagged public.
    pub fn is_public(self) -> Condition {
        self.eq(true)
    }

    /// The row belongs to the tenant in `app.current_tenant_id`.
    pub fn belongs_to_tenant(self) -> Condition {
        self.belongs_to_tenant_key(DEFAULT_TENANT_KEY)
    }

    /// The row belongs to the tenant held in an integer session variable.
    pub fn belongs_to_tenant_key(self, session_key: impl Into<String>) -> Condition {
        self.eq(session(session_key, SessionType::Integer))
    }

    /// The current user appears in `membership_table` for this row's value.
    ///
    /// Selects `membership_column`, or a column of the same name as this one.
    pub fn user_belongs_to(
        self,
        membership_table: impl Into<String>,
        membership_column: Option<&str>,
    ) -> Condition {
        let selected = membership_column.unwrap_or(self.name()).to_string();
        let subquery = SubqueryDefinition {
            from: SubqueryTable::new(membership_table, None),
            select: vec![selected],
            joins: Vec::new(),
            filter: Some(Box::new(ColumnRef::new(USER_ID_COLUMN).eq(current_user_id()))),
        };
        Condition::subquery(self, subquery)
    }

    /// The row's date is at or before `date`, or `NOW()` when none is given.
    pub fn released_before(self, date: Option<DateTime<Utc>>) -> Condition {
        match date {
            Some(date) => self.lte(date),
            None => self.lte(raw("NOW()")),
        }
    }

    /// `self IN (SELECT foreign_key FROM join_table WHERE user_id = <current user>)`.
    pub fn is_member_of(
        self,
        join_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Condition {
        Condition::Helper(Helper::IsMemberOf {
            join_table: join_table.into(),
            foreign_key: foreign_key.into(),
            local_key: self,
        })
    }
}
