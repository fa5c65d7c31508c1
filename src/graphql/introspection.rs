//! Schema introspection served straight from the schema model

use crate::graphql::collector::SelectionSet;
use crate::graphql::schema::{
    DirectiveDefinition, EnumValueDefinition, FieldDefinition, InputValueDefinition, Schema,
    TypeKind, TypeRef,
};
use crate::graphql::value::to_graphql_literal;
use serde_json::{Map, Value, json};

/// Return type of fields on the introspection types, for fragment matching
pub fn introspection_field_type(parent_type: &str, field_name: &str) -> Option<&'static str> {
    let ty = match (parent_type, field_name) {
        (_, "__schema") => "__Schema",
        (_, "__type") => "__Type",
        ("__Schema", "types" | "queryType" | "mutationType" | "subscriptionType") => "__Type",
        ("__Schema", "directives") => "__Directive",
        ("__Type", "fields") => "__Field",
        ("__Type", "interfaces" | "possibleTypes" | "ofType") => "__Type",
        ("__Type", "enumValues") => "__EnumValue",
        ("__Type", "inputFields") => "__InputValue",
        ("__Field", "args") | ("__Directive", "args") => "__InputValue",
        ("__Field", "type") | ("__InputValue", "type") => "__Type",
        (_, "kind") => "__TypeKind",
        (_, "locations") => "__DirectiveLocation",
        _ => return None,
    };
    Some(ty)
}

/// An introspection object
enum Node<'s> {
    Schema,
    Type(TypeRef),
    Field(&'s FieldDefinition),
    InputValue(&'s InputValueDefinition),
    EnumValue(&'s EnumValueDefinition),
    Directive(&'s DirectiveDefinition),
}

/// What an introspection field produced
enum Resolved<'s> {
    Leaf(Value),
    One(Option<Node<'s>>),
    Many(Vec<Node<'s>>),
}

/// Resolves `__schema` and `__type` selections
pub struct Introspector<'s> {
    schema: &'s Schema,
}

impl<'s> Introspector<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// `__schema { ... }`
    pub fn schema(&self, selections: Option<&SelectionSet>) -> Value {
        self.complete(&Node::Schema, selections)
    }

    /// `__type(name: ...) { ... }`, null for unknown names
    pub fn type_by_name(&self, name: &str, selections: Option<&SelectionSet>) -> Value {
        if self.schema.type_kind(name).is_none() {
            return Value::Null;
        }
        self.complete(&Node::Type(TypeRef::named(name)), selections)
    }

    fn complete(&self, node: &Node<'s>, selections: Option<&SelectionSet>) -> Value {
        let Some(selections) = selections else {
            return Value::Null;
        };
        let mut out = Map::new();
        for field in selections.iter() {
            let value = match self.resolve(node, &field.name, &field.arguments) {
                Resolved::Leaf(v) => v,
                Resolved::One(None) => Value::Null,
                Resolved::One(Some(child)) => self.complete(&child, field.selections.as_deref()),
                Resolved::Many(children) => Value::Array(
                    children
                        .iter()
                        .map(|child| self.complete(child, field.selections.as_deref()))
                        .collect(),
                ),
            };
            out.insert(field.response_key().to_string(), value);
        }
        if selections.typename {
            out.insert("__typename".to_string(), json!(typename(node)));
        }
        Value::Object(out)
    }

    fn resolve(&self, node: &Node<'s>, field: &str, args: &Map<String, Value>) -> Resolved<'s> {
        let include_deprecated = args
            .get("includeDeprecated")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        match node {
            Node::Schema => self.resolve_schema(field),
            Node::Type(ty) => self.resolve_type(ty, field, include_deprecated),
            Node::Field(def) => match field {
                "name" => Resolved::Leaf(json!(def.name)),
                "description" => Resolved::Leaf(json!(def.description)),
                "args" => Resolved::Many(def.arguments.iter().map(Node::InputValue).collect()),
                "type" => Resolved::One(Some(Node::Type(def.field_type.clone()))),
                "isDeprecated" => Resolved::Leaf(json!(def.is_deprecated())),
                "deprecationReason" => Resolved::Leaf(json!(def.deprecation_reason)),
                _ => Resolved::Leaf(Value::Null),
            },
            Node::InputValue(def) => match field {
                "name" => Resolved::Leaf(json!(def.name)),
                "description" => Resolved::Leaf(json!(def.description)),
                "type" => Resolved::One(Some(Node::Type(def.value_type.clone()))),
                "defaultValue" => {
                    Resolved::Leaf(json!(def.default_value.as_ref().map(to_graphql_literal)))
                }
                _ => Resolved::Leaf(Value::Null),
            },
            Node::EnumValue(def) => match field {
                "name" => Resolved::Leaf(json!(def.name)),
                "description" => Resolved::Leaf(json!(def.description)),
                "isDeprecated" => Resolved::Leaf(json!(def.deprecation_reason.is_some())),
                "deprecationReason" => Resolved::Leaf(json!(def.deprecation_reason)),
                _ => Resolved::Leaf(Value::Null),
            },
            Node::Directive(def) => match field {
                "name" => Resolved::Leaf(json!(def.name)),
                "description" => Resolved::Leaf(json!(def.description)),
                "locations" => Resolved::Leaf(json!(def.locations)),
                "args" => Resolved::Many(def.arguments.iter().map(Node::InputValue).collect()),
                "isRepeatable" => Resolved::Leaf(json!(def.repeatable)),
                _ => Resolved::Leaf(Value::Null),
            },
        }
    }

    fn resolve_schema(&self, field: &str) -> Resolved<'s> {
        let root = |name: Option<&str>| Resolved::One(name.map(|n| Node::Type(TypeRef::named(n))));
        match field {
            "types" => Resolved::Many(
                self.schema
                    .type_names()
                    .into_iter()
                    .filter(|name| !name.starts_with("__"))
                    .map(|name| Node::Type(TypeRef::Named(name)))
                    .collect(),
            ),
            "queryType" => root(self.schema.query_type()),
            "mutationType" => root(self.schema.mutation_type()),
            "subscriptionType" => root(self.schema.subscription_type()),
            "directives" => Resolved::Many(self.schema.directives().iter().map(Node::Directive).collect()),
            _ => Resolved::Leaf(Value::Null),
        }
    }

    fn resolve_type(&self, ty: &TypeRef, field: &str, include_deprecated: bool) -> Resolved<'s> {
        let name = match ty {
            TypeRef::Named(name) => name.as_str(),
            TypeRef::List(inner) | TypeRef::NonNull(inner) => {
                let kind = if matches!(ty, TypeRef::List(_)) { "LIST" } else { "NON_NULL" };
                return match field {
                    "kind" => Resolved::Leaf(json!(kind)),
                    "ofType" => Resolved::One(Some(Node::Type((**inner).clone()))),
                    _ => Resolved::Leaf(Value::Null),
                };
            }
        };
        let schema = self.schema;
        let kind = schema.type_kind(name);

        match field {
            "kind" => Resolved::Leaf(json!(kind.map(TypeKind::as_str))),
            "name" => Resolved::Leaf(json!(name)),
            "description" => Resolved::Leaf(json!(self.description(name))),
            "fields" => {
                let fields = schema
                    .get_type(name)
                    .map(|o| &o.fields)
                    .or_else(|| schema.get_interface(name).map(|i| &i.fields));
                match fields {
                    Some(fields) => Resolved::Many(
                        fields
                            .values()
                            .filter(|f| include_deprecated || !f.is_deprecated())
                            .map(Node::Field)
                            .collect(),
                    ),
                    None => Resolved::Leaf(Value::Null),
                }
            }
            "interfaces" => match schema.get_type(name) {
                Some(object) => Resolved::Many(
                    object
                        .interfaces
                        .iter()
                        .map(|i| Node::Type(TypeRef::named(i.as_str())))
                        .collect(),
                ),
                None if kind == Some(TypeKind::Interface) => Resolved::Many(Vec::new()),
                None => Resolved::Leaf(Value::Null),
            },
            "possibleTypes" => match kind {
                Some(TypeKind::Interface | TypeKind::Union) => Resolved::Many(
                    schema
                        .possible_types(name)
                        .into_iter()
                        .map(|t| Node::Type(TypeRef::named(t)))
                        .collect(),
                ),
                _ => Resolved::Leaf(Value::Null),
            },
            "enumValues" => match schema.get_enum(name) {
                Some(e) => Resolved::Many(
                    e.values
                        .iter()
                        .filter(|v| include_deprecated || v.deprecation_reason.is_none())
                        .map(Node::EnumValue)
                        .collect(),
                ),
                None => Resolved::Leaf(Value::Null),
            },
            "inputFields" => match schema.get_input_type(name) {
                Some(input) => Resolved::Many(input.fields.values().map(Node::InputValue).collect()),
                None => Resolved::Leaf(Value::Null),
            },
            _ => Resolved::Leaf(Value::Null),
        }
    }

    fn description(&self, name: &str) -> Option<String> {
        let schema = self.schema;
        schema
            .get_type(name)
            .and_then(|t| t.description.clone())
            .or_else(|| schema.get_interface(name).and_then(|t| t.description.clone()))
            .or_else(|| schema.get_union(name).and_then(|t| t.description.clone()))
            .or_else(|| schema.get_enum(name).and_then(|t| t.description.clone()))
            .or_else(|| schema.get_input_type(name).and_then(|t| t.description.clone()))
            .or_else(|| schema.get_scalar(name).and_then(|t| t.description))
    }
}

fn typename(node: &Node<'_>) -> &'static str {
    match node {
        Node::Schema => "__Schema",
        Node::Type(_) => "__Type",
        Node::Field(_) => "__Field",
        Node::InputValue(_) => "__InputValue",
        Node::EnumValue(_) => "__EnumValue",
        Node::Directive(_) => "__Directive",
    }
}
