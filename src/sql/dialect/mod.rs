//! Dialect capability interface
//!
//! A [`Dialect`] answers feature questions and renders small pieces of SQL.
//! Dialects that can assemble whole statements also implement
//! [`StatementBuilder`] and expose it through [`Dialect::statement_builder`].

mod postgres;

pub use postgres::PostgresDialect;

use crate::core::error::ConfigError;
use crate::sql::ast::{BinaryOp, JoinKind, NullsOrder, OrderDirection, UnaryOp};
use crate::sql::options::{
    DeleteOptions, InsertOptions, SelectOptions, SqlValidationError, UpdateOptions,
};
use std::sync::Arc;

/// Feature flags and pure formatting functions for one SQL dialect
pub trait Dialect: Send + Sync {
    fn name(&self) -> &str;

    fn supports_returning(&self) -> bool;
    fn supports_upsert(&self) -> bool;
    fn supports_cte(&self) -> bool;
    fn supports_recursive_cte(&self) -> bool;
    fn supports_window_functions(&self) -> bool;
    fn supports_json(&self) -> bool;
    fn supports_arrays(&self) -> bool;
    fn supports_literal_join(&self) -> bool;
    fn supports_distinct_on(&self) -> bool;
    fn supports_limit_offset(&self) -> bool;
    fn supports_nulls_ordering(&self) -> bool;
    fn supports_row_locking(&self) -> bool;
    fn supports_materialized_cte(&self) -> bool;
    fn supports_full_outer_join(&self) -> bool;

    fn quote_identifier(&self, ident: &str) -> String;
    fn quote_string(&self, value: &str) -> String;
    /// Placeholder for the 1-based parameter position `n`
    fn placeholder(&self, n: usize) -> String;
    fn format_join_kind(&self, kind: JoinKind) -> &'static str;
    fn format_order_direction(&self, direction: OrderDirection) -> &'static str;
    fn format_nulls_order(&self, nulls: NullsOrder) -> &'static str;
    fn format_binary_op(&self, op: BinaryOp) -> &'static str;
    fn format_unary_op(&self, op: UnaryOp) -> &'static str;
    fn format_bool_literal(&self, value: bool) -> &'static str;
    fn format_cast(&self, expr: &str, type_name: &str) -> String;

    /// Statement assembly, when this dialect supports it
    fn statement_builder(&self) -> Option<&dyn StatementBuilder> {
        None
    }
}

/// Full statement assembly from option structures
pub trait StatementBuilder: Dialect {
    /// Render a SELECT, returning validation findings alongside the text
    fn build_select(&self, opts: &SelectOptions) -> (String, Vec<SqlValidationError>);
    fn build_insert(&self, opts: &InsertOptions) -> String;
    fn build_update(&self, opts: &UpdateOptions) -> String;
    fn build_delete(&self, opts: &DeleteOptions) -> String;
}

/// Look up a dialect by its configuration name
pub fn dialect_for_name(name: &str) -> Result<Arc<dyn Dialect>, ConfigError> {
    match name.to_ascii_lowercase().as_str() {
        "postgresql" | "postgres" | "pg" => Ok(Arc::new(PostgresDialect)),
        _ => Err(ConfigError::UnsupportedDialect {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_lookup() {
        let dialect = dialect_for_name("PostgreSQL").unwrap();
        assert_eq!(dialect.name(), "postgresql");
        assert!(dialect.statement_builder().is_some());

        assert!(matches!(
            dialect_for_name("oracle"),
            Err(ConfigError::UnsupportedDialect { .. })
        ));
    }
}
