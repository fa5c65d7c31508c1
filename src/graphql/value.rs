//! Conversion of GraphQL literal values into native JSON values

use graphql_parser::query::Value as GqlValue;
use serde_json::{Map, Number, Value};

/// Variable values of one request, keyed by variable name (without `$`)
pub type Variables = Map<String, Value>;

/// Convert a GraphQL value to JSON, substituting variables
///
/// Unknown variables evaluate to `null`. Integers keep their signed 64-bit
/// value and floats their `f64` value as produced by the parser, so leading
/// minus signs and decimal points are already accounted for.
pub fn to_json<'a>(value: &GqlValue<'a, String>, variables: &Variables) -> Value {
    match value {
        GqlValue::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
        // graphql-parser stores every integer literal as an i64, so this is always `Some`.
        GqlValue::Int(i) => i.as_i64().map_or(Value::Null, Value::from),
        GqlValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        GqlValue::String(s) => Value::String(s.clone()),
        GqlValue::Boolean(b) => Value::Bool(*b),
        GqlValue::Null => Value::Null,
        GqlValue::Enum(e) => Value::String(e.clone()),
        GqlValue::List(items) => Value::Array(items.iter().map(|v| to_json(v, variables)).collect()),
        GqlValue::Object(fields) => {
            let mut map = Map::new();
            for (key, v) in fields {
                map.insert(key.clone(), to_json(v, variables));
            }
            Value::Object(map)
        }
    }
}

/// Convert a literal that cannot reference variables (schema default values)
pub fn literal_to_json<'a>(value: &GqlValue<'a, String>) -> Value {
    to_json(value, &Variables::new())
}

/// Render a JSON value back into GraphQL literal syntax
///
/// Used for `defaultValue` in introspection.
pub fn to_graphql_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s)),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(to_graphql_literal).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", k, to_graphql_literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
