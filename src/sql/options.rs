//! Per-statement option structures consumed by a [`StatementBuilder`]
//!
//! Table names are raw identifiers and get quoted by the builder. Columns,
//! conditions and values are already-rendered SQL fragments.
//!
//! [`StatementBuilder`]: crate::sql::dialect::StatementBuilder

use crate::sql::ast::{JoinKind, NullsOrder, OrderDirection};
use serde::Serialize;
use thiserror::Error;

/// A structural contradiction found in a SELECT before it is rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct SqlValidationError {
    pub field: String,
    pub message: String,
}

impl SqlValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// One ORDER BY entry
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByColumn {
    pub column: String,
    pub direction: OrderDirection,
    pub nulls: Option<NullsOrder>,
}

impl OrderByColumn {
    pub fn new(column: impl Into<String>, direction: OrderDirection) -> Self {
        Self {
            column: column.into(),
            direction,
            nulls: None,
        }
    }

    pub fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }
}

/// Correlated subquery body of a lateral join
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LateralSubquery {
    pub columns: Vec<String>,
    /// Rendered FROM expression (a quoted table, possibly with a link-table join)
    pub from: String,
    pub where_conditions: Vec<String>,
    pub order_by: Vec<OrderByColumn>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// One JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: String,
    pub alias: String,
    pub on: String,
    pub subquery: Option<LateralSubquery>,
}

/// Everything a SELECT statement can carry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    pub distinct_on: Vec<String>,
    pub columns: Vec<String>,
    pub table: String,
    pub alias: Option<String>,
    pub joins: Vec<JoinClause>,
    pub where_conditions: Vec<String>,
    pub group_by: Vec<String>,
    pub having: Vec<String>,
    pub order_by: Vec<OrderByColumn>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub for_update: bool,
    pub for_update_of: Vec<String>,
}

impl SelectOptions {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Report contradictory clause combinations
    ///
    /// Findings are advisory: the builder still renders the statement and the
    /// caller decides whether any of them is fatal.
    pub fn validate(&self) -> Vec<SqlValidationError> {
        let mut findings = Vec::new();

        if !self.distinct_on.is_empty() && !self.group_by.is_empty() {
            findings.push(SqlValidationError::new(
                "DistinctOn/GroupBy",
                "DISTINCT ON cannot be combined with GROUP BY",
            ));
        }

        if !self.distinct_on.is_empty() && !self.order_by.is_empty() {
            let prefix_matches = self.distinct_on.len() <= self.order_by.len()
                && self
                    .distinct_on
                    .iter()
                    .zip(&self.order_by)
                    .all(|(distinct, order)| *distinct == order.column);
            if !prefix_matches {
                findings.push(SqlValidationError::new(
                    "DistinctOn/OrderBy",
                    "DISTINCT ON expressions must match the leftmost ORDER BY expressions",
                ));
            }
        }

        if self.for_update
            && self.for_update_of.is_empty()
            && self.joins.iter().any(|j| j.kind.is_outer())
        {
            findings.push(SqlValidationError::new(
                "ForUpdate/Join",
                "FOR UPDATE cannot be applied to the nullable side of an outer join; name the locked tables with FOR UPDATE OF",
            ));
        }

        if !self.having.is_empty() && self.group_by.is_empty() {
            findings.push(SqlValidationError::new(
                "Having",
                "HAVING requires a GROUP BY clause",
            ));
        }

        if !self.having.is_empty()
            && self
                .joins
                .iter()
                .any(|j| matches!(j.kind, JoinKind::Left | JoinKind::LeftLateral))
        {
            findings.push(SqlValidationError::new(
                "Join/Having",
                "HAVING over a LEFT JOIN filters out NULL-extended rows; an INNER JOIN may be intended",
            ));
        }

        findings
    }
}

/// Conflict handling for INSERT
#[derive(Debug, Clone, PartialEq)]
pub struct OnConflict {
    pub columns: Vec<String>,
    pub action: ConflictAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConflictAction {
    DoNothing,
    DoUpdate {
        set: Vec<(String, String)>,
        where_conditions: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertOptions {
    pub table: String,
    pub columns: Vec<String>,
    /// One entry per row, each holding one rendered value per column
    pub values: Vec<Vec<String>>,
    pub on_conflict: Option<OnConflict>,
    pub returning: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOptions {
    pub table: String,
    pub alias: Option<String>,
    /// Assignments in emission order
    pub set: Vec<(String, String)>,
    pub from: Vec<String>,
    pub where_conditions: Vec<String>,
    pub returning: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOptions {
    pub table: String,
    pub alias: Option<String>,
    pub using: Vec<String>,
    pub where_conditions: Vec<String>,
    pub returning: Vec<String>,
}
