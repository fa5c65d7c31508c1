//! Filter, ordering and pagination arguments
//!
//! Every operand goes through the [`ParamMarshaler`]; user values never
//! appear in the SQL text. Shapes that match none of the accepted forms are
//! rejected with [`ConversionError::InvalidArgument`].

use crate::core::error::ConversionError;
use crate::sql::ast::{BinaryOp, NullsOrder, OrderDirection, UnaryOp};
use crate::sql::marshal::ParamMarshaler;
use crate::sql::options::OrderByColumn;
use serde_json::{Map, Value};

/// Resolves a GraphQL field name to the column expression used in SQL
pub type ColumnResolver<'a> = &'a dyn Fn(&str) -> String;

/// A filter operator after alias resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Compare(BinaryOp),
    In,
    NotIn,
    IsNull,
}

impl Operator {
    fn parse(name: &str) -> Option<Self> {
        let op = match name {
            "_eq" | "eq" => Operator::Compare(BinaryOp::Eq),
            "_neq" | "neq" | "_ne" | "ne" => Operator::Compare(BinaryOp::NotEq),
            "_gt" | "gt" => Operator::Compare(BinaryOp::Gt),
            "_gte" | "gte" | "_ge" | "ge" => Operator::Compare(BinaryOp::GtEq),
            "_lt" | "lt" => Operator::Compare(BinaryOp::Lt),
            "_lte" | "lte" | "_le" | "le" => Operator::Compare(BinaryOp::LtEq),
            "_like" | "like" => Operator::Compare(BinaryOp::Like),
            "_ilike" | "ilike" => Operator::Compare(BinaryOp::ILike),
            "_contains" | "contains" => Operator::Compare(BinaryOp::JsonContains),
            "_contained_by" | "contained_by" | "containedBy" => {
                Operator::Compare(BinaryOp::JsonContainedBy)
            }
            "_in" | "in" => Operator::In,
            "_nin" | "nin" | "_not_in" | "not_in" => Operator::NotIn,
            "_is_null" | "is_null" | "isNull" => Operator::IsNull,
            _ => return None,
        };
        Some(op)
    }
}

/// Lowers a filter input object into WHERE conditions
pub struct FilterBuilder<'a, 'd> {
    argument: &'a str,
    column: ColumnResolver<'a>,
    marshaler: &'a mut ParamMarshaler<'d>,
}

impl<'a, 'd> FilterBuilder<'a, 'd> {
    /// `argument` names the GraphQL argument in error messages
    pub fn new(argument: &'a str, column: ColumnResolver<'a>, marshaler: &'a mut ParamMarshaler<'d>) -> Self {
        Self {
            argument,
            column,
            marshaler,
        }
    }

    /// AND-joined conditions of a filter, `None` when it constrains nothing
    pub fn build(&mut self, filter: &Value) -> Result<Option<String>, ConversionError> {
        match filter {
            Value::Null => Ok(None),
            Value::Object(map) => {
                let conditions = self.conditions(map)?;
                Ok((!conditions.is_empty()).then(|| conditions.join(" AND ")))
            }
            _ => Err(self.invalid("expected an input object")),
        }
    }

    fn conditions(&mut self, filter: &Map<String, Value>) -> Result<Vec<String>, ConversionError> {
        let mut out = Vec::new();

        for (key, value) in filter {
            match key.as_str() {
                "_and" | "AND" => {
                    for sub in self.sub_filters(key, value)? {
                        out.extend(self.conditions(sub)?);
                    }
                }
                "_or" | "OR" => {
                    let bound = self.marshaler.len();
                    let mut groups = Vec::new();
                    let mut always_true = false;
                    for sub in self.sub_filters(key, value)? {
                        let group = self.conditions(sub)?;
                        if group.is_empty() {
                            always_true = true;
                        } else {
                            groups.push(group.join(" AND "));
                        }
                    }
                    // An unconstrained branch matches every row, so the whole OR does too.
                    if always_true {
                        self.marshaler.truncate(bound);
                    } else if !groups.is_empty() {
                        out.push(format!("({})", groups.join(" OR ")));
                    }
                }
                "_not" | "NOT" => {
                    let Value::Object(sub) = value else {
                        return Err(self.invalid(format!("`{}` expects an input object", key)));
                    };
                    let inner = self.conditions(sub)?;
                    if inner.is_empty() {
                        out.push("NOT (TRUE)".to_string());
                    } else {
                        out.push(format!("NOT ({})", inner.join(" AND ")));
                    }
                }
                field => {
                    let column = (self.column)(field);
                    match value {
                        Value::Object(operators) => {
                            for (name, operand) in operators {
                                let op = Operator::parse(name).ok_or_else(|| {
                                    self.invalid(format!("unknown operator `{}` on `{}`", name, field))
                                })?;
                                out.push(self.condition(&column, op, operand)?);
                            }
                        }
                        operand => out.push(self.condition(&column, Operator::Compare(BinaryOp::Eq), operand)?),
                    }
                }
            }
        }
        Ok(out)
    }

    /// Operands of `_and` / `_or`: a list of filters, or a single one
    fn sub_filters<'v>(&self, key: &str, value: &'v Value) -> Result<Vec<&'v Map<String, Value>>, ConversionError> {
        match value {
            Value::Object(map) => Ok(vec![map]),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    _ => Err(self.invalid(format!("`{}` expects a list of input objects", key))),
                })
                .collect(),
            _ => Err(self.invalid(format!("`{}` expects a list of input objects", key))),
        }
    }

    fn condition(&mut self, column: &str, op: Operator, operand: &Value) -> Result<String, ConversionError> {
        let dialect = self.marshaler.dialect();
        match op {
            Operator::Compare(BinaryOp::Eq) if operand.is_null() => {
                Ok(format!("{} {}", column, dialect.format_unary_op(UnaryOp::IsNull)))
            }
            Operator::Compare(BinaryOp::NotEq) if operand.is_null() => {
                Ok(format!("{} {}", column, dialect.format_unary_op(UnaryOp::IsNotNull)))
            }
            Operator::Compare(op) => {
                if operand.is_null() {
                    return Err(self.invalid(format!(
                        "operator `{}` needs a non-null operand",
                        dialect.format_binary_op(op)
                    )));
                }
                let placeholder = self.marshaler.marshal(operand);
                Ok(format!("{} {} {}", column, dialect.format_binary_op(op), placeholder))
            }
            Operator::In | Operator::NotIn => {
                if !operand.is_array() {
                    return Err(self.invalid("`_in` / `_nin` expect a list"));
                }
                let placeholder = self.marshaler.marshal(operand);
                Ok(match op {
                    Operator::In => format!("{} = ANY({})", column, placeholder),
                    _ => format!("{} <> ALL({})", column, placeholder),
                })
            }
            Operator::IsNull => match operand {
                Value::Bool(true) => Ok(format!("{} {}", column, dialect.format_unary_op(UnaryOp::IsNull))),
                Value::Bool(false) => Ok(format!("{} {}", column, dialect.format_unary_op(UnaryOp::IsNotNull))),
                _ => Err(self.invalid("`_is_null` expects a boolean")),
            },
        }
    }

    fn invalid(&self, message: impl Into<String>) -> ConversionError {
        ConversionError::invalid_argument(self.argument, message)
    }
}

/// Lowers an `orderBy` argument into ORDER BY items
///
/// Accepts `{field, direction?, nulls?}` or a list of such objects.
pub struct OrderByBuilder<'a> {
    column: ColumnResolver<'a>,
}

impl<'a> OrderByBuilder<'a> {
    pub fn new(column: ColumnResolver<'a>) -> Self {
        Self { column }
    }

    pub fn build(&self, order_by: &Value) -> Result<Vec<OrderByColumn>, ConversionError> {
        match order_by {
            Value::Null => Ok(Vec::new()),
            Value::Object(entry) => Ok(vec![self.entry(entry)?]),
            Value::Array(entries) => entries
                .iter()
                .map(|entry| match entry {
                    Value::Object(entry) => self.entry(entry),
                    _ => Err(invalid_order("expected a list of ordering objects")),
                })
                .collect(),
            _ => Err(invalid_order("expected an ordering object or a list of them")),
        }
    }

    fn entry(&self, entry: &Map<String, Value>) -> Result<OrderByColumn, ConversionError> {
        let field = entry
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_order("each ordering needs a string `field`"))?;

        let direction = match entry.get("direction") {
            None | Some(Value::Null) => OrderDirection::Asc,
            Some(Value::String(raw)) => OrderDirection::parse(raw)
                .ok_or_else(|| invalid_order(format!("unknown direction `{}`", raw)))?,
            Some(_) => return Err(invalid_order("`direction` must be ASC or DESC")),
        };

        let column = OrderByColumn::new((self.column)(field), direction);
        match entry.get("nulls") {
            None | Some(Value::Null) => Ok(column),
            Some(Value::String(raw)) => match raw.to_ascii_uppercase().as_str() {
                "FIRST" => Ok(column.nulls(NullsOrder::First)),
                "LAST" => Ok(column.nulls(NullsOrder::Last)),
                _ => Err(invalid_order(format!("unknown nulls ordering `{}`", raw))),
            },
            Some(_) => Err(invalid_order("`nulls` must be FIRST or LAST")),
        }
    }
}

fn invalid_order(message: impl Into<String>) -> ConversionError {
    ConversionError::invalid_argument("orderBy", message)
}

/// Filtering, ordering and pagination taken from a field's arguments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryArguments {
    pub where_conditions: Vec<String>,
    pub order_by: Vec<OrderByColumn>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryArguments {
    /// Read `where`/`filter`, `id`, `limit`/`first`, `offset`/`skip` and `orderBy`
    ///
    /// Parameters are bound in that order.
    pub fn parse(
        arguments: &Map<String, Value>,
        column: ColumnResolver<'_>,
        marshaler: &mut ParamMarshaler<'_>,
    ) -> Result<Self, ConversionError> {
        let mut parsed = QueryArguments::default();

        for name in ["where", "filter"] {
            if let Some(filter) = arguments.get(name) {
                let mut builder = FilterBuilder::new(name, column, marshaler);
                if let Some(condition) = builder.build(filter)? {
                    parsed.where_conditions.push(condition);
                }
            }
        }

        if let Some(id) = arguments.get("id").filter(|id| !id.is_null()) {
            let placeholder = marshaler.marshal(id);
            parsed
                .where_conditions
                .push(format!("{} = {}", column("id"), placeholder));
        }

        parsed.limit = pagination(arguments, &["limit", "first"])?;
        parsed.offset = pagination(arguments, &["offset", "skip"])?;

        if let Some(order_by) = arguments.get("orderBy") {
            parsed.order_by = OrderByBuilder::new(column).build(order_by)?;
        }

        Ok(parsed)
    }
}

/// The first of `names` present, as a non-negative integer
fn pagination(arguments: &Map<String, Value>, names: &[&str]) -> Result<Option<u64>, ConversionError> {
    let Some((name, value)) = names
        .iter()
        .find_map(|name| arguments.get(*name).map(|value| (*name, value)))
    else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_u64().map(Some).ok_or_else(|| {
            ConversionError::invalid_argument(name, "expected a non-negative integer")
        }),
        _ => Err(ConversionError::invalid_argument(name, "expected a non-negative integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SqlValue;
    use crate::sql::dialect::PostgresDialect;
    use serde_json::json;

    fn column(field: &str) -> String {
        format!("u.\"{}\"", crate::core::naming::snake_case(field))
    }

    fn build(filter: Value) -> Result<(Option<String>, Vec<SqlValue>), ConversionError> {
        let dialect = PostgresDialect;
        let mut marshaler = ParamMarshaler::new(&dialect);
        let sql = FilterBuilder::new("where", &column, &mut marshaler).build(&filter)?;
        Ok((sql, marshaler.into_params()))
    }

    #[test]
    fn test_and_preserves_order() {
        let (sql, params) = build(json!({"_and": [{"age": {"_gt": 18}}, {"age": {"_lt": 65}}]})).unwrap();
        assert_eq!(sql.unwrap(), "u.\"age\" > $1 AND u.\"age\" < $2");
        assert_eq!(params, vec![SqlValue::Integer(18), SqlValue::Integer(65)]);
    }

    #[test]
    fn test_or_and_not() {
        let (sql, params) = build(json!({
            "OR": [{"name": "ada", "isActive": true}, {"name": {"_ilike": "%grace%"}}],
            "_not": {"role": {"_in": ["admin", "root"]}}
        }))
        .unwrap();
        assert_eq!(
            sql.unwrap(),
            "(u.\"name\" = $1 AND u.\"is_active\" = $2 OR u.\"name\" ILIKE $3) AND NOT (u.\"role\" = ANY($4))"
        );
        assert_eq!(params.len(), 4);
        assert_eq!(params[3], SqlValue::Array(vec!["admin".into(), "root".into()]));
    }

    #[test]
    fn test_operator_aliases() {
        let (sql, _) = build(json!({"a": {"ne": 1, "_gte": 2, "le": 3, "_nin": [4], "_contains": {"k": 1}, "containedBy": [5]}})).unwrap();
        assert_eq!(
            sql.unwrap(),
            "u.\"a\" <> $1 AND u.\"a\" >= $2 AND u.\"a\" <= $3 AND u.\"a\" <> ALL($4) AND u.\"a\" @> $5 AND u.\"a\" <@ $6"
        );
    }

    #[test]
    fn test_null_comparisons_bind_nothing() {
        let (sql, params) = build(json!({"deletedAt": null, "email": {"_neq": null}, "bio": {"_is_null": false}})).unwrap();
        assert_eq!(
            sql.unwrap(),
            "u.\"deleted_at\" IS NULL AND u.\"email\" IS NOT NULL AND u.\"bio\" IS NOT NULL"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_empty_filters() {
        assert_eq!(build(json!({})).unwrap().0, None);
        assert_eq!(build(Value::Null).unwrap().0, None);
        assert_eq!(build(json!({"_or": [], "_and": [{}]})).unwrap().0, None);
    }

    #[test]
    fn test_unconstrained_or_branch_matches_everything() {
        let (sql, params) = build(json!({"_or": [{}, {"age": {"_gt": 18}}]})).unwrap();
        assert_eq!(sql, None);
        assert!(params.is_empty());

        let (sql, params) = build(json!({
            "name": "Ada",
            "_or": [{"age": {"_gt": 18}}, {"_and": []}],
            "role": "admin"
        }))
        .unwrap();
        assert_eq!(sql.unwrap(), "u.\"name\" = $1 AND u.\"role\" = $2");
        assert_eq!(params, vec![SqlValue::from("Ada"), SqlValue::from("admin")]);
    }

    #[test]
    fn test_unconstrained_or_branch_still_validates_siblings() {
        let err = build(json!({"_or": [{}, {"age": {"_between": [1, 2]}}]})).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidArgument { .. }));
    }

    #[test]
    fn test_negated_empty_filter_matches_nothing() {
        let (sql, params) = build(json!({"_not": {}})).unwrap();
        assert_eq!(sql.unwrap(), "NOT (TRUE)");
        assert!(params.is_empty());

        let (sql, _) = build(json!({"_not": {"_or": [{"a": 1}, {}]}})).unwrap();
        assert_eq!(sql.unwrap(), "NOT (TRUE)");
    }

    #[test]
    fn test_malformed_filters_fail() {
        for bad in [
            json!("name"),
            json!({"age": {"_between": [1, 2]}}),
            json!({"_and": 3}),
            json!({"_not": [{"a": 1}]}),
            json!({"role": {"_in": "admin"}}),
            json!({"bio": {"_is_null": "yes"}}),
            json!({"age": {"_gt": null}}),
        ] {
            let err = build(bad.clone()).unwrap_err();
            assert!(
                matches!(err, ConversionError::InvalidArgument { ref argument, .. } if argument == "where"),
                "{bad} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_order_by_forms() {
        let builder = OrderByBuilder::new(&column);
        assert_eq!(
            builder.build(&json!({"field": "createdAt", "direction": "desc"})).unwrap(),
            vec![OrderByColumn::new("u.\"created_at\"", OrderDirection::Desc)]
        );
        assert_eq!(
            builder
                .build(&json!([{"field": "name"}, {"field": "id", "direction": "DESC", "nulls": "last"}]))
                .unwrap(),
            vec![
                OrderByColumn::new("u.\"name\"", OrderDirection::Asc),
                OrderByColumn::new("u.\"id\"", OrderDirection::Desc).nulls(NullsOrder::Last),
            ]
        );
        assert!(builder.build(&json!("name")).is_err());
        assert!(builder.build(&json!({"direction": "ASC"})).is_err());
        assert!(builder.build(&json!({"field": "name", "direction": "UP"})).is_err());
    }

    #[test]
    fn test_query_arguments() {
        let dialect = PostgresDialect;
        let mut marshaler = ParamMarshaler::new(&dialect);
        let args: Map<String, Value> = serde_json::from_value(json!({
            "orderBy": {"field": "name"},
            "first": 5,
            "skip": 10,
            "id": "42",
            "filter": {"age": {"_gte": 21}}
        }))
        .unwrap();

        let parsed = QueryArguments::parse(&args, &column, &mut marshaler).unwrap();
        assert_eq!(parsed.where_conditions, vec!["u.\"age\" >= $1", "u.\"id\" = $2"]);
        assert_eq!(parsed.limit, Some(5));
        assert_eq!(parsed.offset, Some(10));
        assert_eq!(parsed.order_by.len(), 1);
        assert_eq!(marshaler.into_params(), vec![SqlValue::Integer(21), SqlValue::String("42".into())]);
    }

    #[test]
    fn test_pagination_must_be_non_negative() {
        let dialect = PostgresDialect;
        let mut marshaler = ParamMarshaler::new(&dialect);
        let args: Map<String, Value> = serde_json::from_value(json!({"limit": -1})).unwrap();
        assert!(matches!(
            QueryArguments::parse(&args, &column, &mut marshaler),
            Err(ConversionError::InvalidArgument { argument, .. }) if argument == "limit"
        ));
    }
}
