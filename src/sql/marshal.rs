//! Placeholder and parameter bookkeeping for one conversion call

use crate::core::value::SqlValue;
use crate::sql::dialect::Dialect;
use serde_json::Value;

/// Issues placeholders and records the bound values in the same order
///
/// The value behind placeholder `$n` is always `params()[n - 1]`. A marshaler
/// lives for exactly one conversion call and is consumed by
/// [`ParamMarshaler::into_params`].
pub struct ParamMarshaler<'d> {
    dialect: &'d dyn Dialect,
    params: Vec<SqlValue>,
}

impl<'d> ParamMarshaler<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            params: Vec::new(),
        }
    }

    /// Bind a value and return its placeholder; `null` renders as `NULL` unbound
    pub fn marshal(&mut self, value: &Value) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        self.bind(SqlValue::from(value))
    }

    /// Bind an already-converted value
    pub fn bind(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }

    /// Dialect the placeholders are rendered for
    pub fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    /// Forget every value bound after the first `len`
    pub fn truncate(&mut self, len: usize) {
        self.params.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn into_params(self) -> Vec<SqlValue> {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::PostgresDialect;
    use serde_json::json;

    #[test]
    fn test_placeholders_follow_append_order() {
        let dialect = PostgresDialect;
        let mut marshaler = ParamMarshaler::new(&dialect);
        let inputs = [json!("a"), json!(2), json!(true), json!([1, 2])];

        let placeholders: Vec<String> = inputs.iter().map(|v| marshaler.marshal(v)).collect();
        assert_eq!(placeholders, vec!["$1", "$2", "$3", "$4"]);

        let params = marshaler.into_params();
        assert_eq!(params.len(), inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            assert_eq!(params[i], SqlValue::from(input));
        }
    }

    #[test]
    fn test_null_is_not_bound() {
        let dialect = PostgresDialect;
        let mut marshaler = ParamMarshaler::new(&dialect);
        assert_eq!(marshaler.marshal(&Value::Null), "NULL");
        assert!(marshaler.is_empty());
        assert_eq!(marshaler.marshal(&json!(5)), "$1");
    }
}
