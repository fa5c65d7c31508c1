//! Bound parameter values handed to the database driver

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value bound to one SQL placeholder
///
/// Built from the JSON-shaped argument values produced by the field collector.
/// Lists become `Array` (for `= ANY($n)` style operators), objects stay `Json`
/// so they can be bound to `jsonb` parameters (`@>`, `<@`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<SqlValue>),
    Json(Value),
}

impl SqlValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            SqlValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<&Value> for SqlValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Boolean(*b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => SqlValue::Integer(i),
                (None, Some(f)) if n.is_f64() => SqlValue::Float(f),
                // Unsigned beyond i64: keep the exact digits and let the server cast.
                _ => SqlValue::String(n.to_string()),
            },
            Value::String(s) => SqlValue::String(s.clone()),
            Value::Array(items) => SqlValue::Array(items.iter().map(SqlValue::from).collect()),
            Value::Object(_) => SqlValue::Json(value.clone()),
        }
    }
}

impl From<Value> for SqlValue {
    fn from(value: Value) -> Self {
        SqlValue::from(&value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(SqlValue::from(&json!(18)), SqlValue::Integer(18));
        assert_eq!(SqlValue::from(&json!(1.5)), SqlValue::Float(1.5));
        assert_eq!(SqlValue::from(&json!("x")).as_string(), Some("x"));
        assert_eq!(SqlValue::from(&json!(true)).as_bool(), Some(true));
        assert!(SqlValue::from(&Value::Null).is_null());
    }

    #[test]
    fn test_from_json_large_unsigned_keeps_digits() {
        assert_eq!(
            SqlValue::from(&json!(u64::MAX)),
            SqlValue::String("18446744073709551615".into())
        );
        assert_eq!(SqlValue::from(&json!(i64::MAX)), SqlValue::Integer(i64::MAX));
        assert_eq!(SqlValue::from(&json!(-2.5e300)), SqlValue::Float(-2.5e300));
    }

    #[test]
    fn test_from_json_list_becomes_array() {
        let value = SqlValue::from(&json!(["a", 2]));
        assert_eq!(
            value,
            SqlValue::Array(vec![SqlValue::String("a".into()), SqlValue::Integer(2)])
        );
    }

    #[test]
    fn test_from_json_object_stays_json() {
        let value = SqlValue::from(&json!({"tags": ["rust"]}));
        assert!(matches!(value, SqlValue::Json(_)));
    }

    #[test]
    fn test_serializes_untagged() {
        let out = serde_json::to_value(vec![SqlValue::Integer(1), SqlValue::Null]).unwrap();
        assert_eq!(out, json!([1, null]));
    }
}
