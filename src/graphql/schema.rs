//! Schema model built from SDL
//!
//! The schema is parsed once at startup and read concurrently afterwards.
//! Only the scalar table sits behind a lock, because scalar marshalers may be
//! registered after construction.

use crate::core::error::SchemaError;
use crate::graphql::value::literal_to_json;
use graphql_parser::schema::{
    self as ast, Definition, Directive, InputValue, Type, TypeDefinition, TypeExtension,
    parse_schema,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Default reason reported for `@deprecated` without an explicit reason
pub const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

const BUILTIN_SCALARS: [(&str, &str); 5] = [
    ("Int", "The `Int` scalar type represents non-fractional signed whole numeric values."),
    ("Float", "The `Float` scalar type represents signed double-precision fractional values."),
    ("String", "The `String` scalar type represents textual data, represented as UTF-8 character sequences."),
    ("Boolean", "The `Boolean` scalar type represents `true` or `false`."),
    ("ID", "The `ID` scalar type represents a unique identifier."),
];

// =============================================================================
// Type references
// =============================================================================

/// A named type wrapped in any number of list/non-null modifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        TypeRef::NonNull(Box::new(inner))
    }

    /// Name of the innermost named type
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// Whether a list appears anywhere in the wrapping
    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::Named(_) => false,
            TypeRef::List(_) => true,
            TypeRef::NonNull(inner) => inner.is_list(),
        }
    }

    fn from_ast(ty: &Type<'_, String>) -> Self {
        match ty {
            Type::NamedType(name) => TypeRef::Named(name.clone()),
            Type::ListType(inner) => TypeRef::list(TypeRef::from_ast(inner)),
            Type::NonNullType(inner) => TypeRef::non_null(TypeRef::from_ast(inner)),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

// =============================================================================
// Relational metadata
// =============================================================================

/// How a relation field reaches its target table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    HasOne,
    HasMany,
    BelongsTo,
    ManyToMany,
}

impl RelationKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "hasOne" => Some(RelationKind::HasOne),
            "hasMany" => Some(RelationKind::HasMany),
            "belongsTo" => Some(RelationKind::BelongsTo),
            "manyToMany" => Some(RelationKind::ManyToMany),
            _ => None,
        }
    }

    /// Relations that yield several target rows per source row
    pub fn is_to_many(self) -> bool {
        matches!(self, RelationKind::HasMany | RelationKind::ManyToMany)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationKind::HasOne => "hasOne",
            RelationKind::HasMany => "hasMany",
            RelationKind::BelongsTo => "belongsTo",
            RelationKind::ManyToMany => "manyToMany",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Definitions
// =============================================================================

/// An argument or input-object field
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDefinition {
    pub name: String,
    pub description: Option<String>,
    pub value_type: TypeRef,
    pub default_value: Option<Value>,
}

impl InputValueDefinition {
    fn from_ast(value: &InputValue<'_, String>) -> Self {
        Self {
            name: value.name.clone(),
            description: value.description.clone(),
            value_type: TypeRef::from_ast(&value.value_type),
            default_value: value.default_value.as_ref().map(literal_to_json),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub description: Option<String>,
    pub field_type: TypeRef,
    pub arguments: Vec<InputValueDefinition>,
    /// `@sql(column:)`
    pub sql_column: Option<String>,
    /// `@sql(table:)`
    pub sql_table: Option<String>,
    /// `@sql(relation:)`
    pub sql_relation: Option<RelationKind>,
    /// Reason from `@deprecated`, if deprecated
    pub deprecation_reason: Option<String>,
}

impl FieldDefinition {
    pub fn is_deprecated(&self) -> bool {
        self.deprecation_reason.is_some()
    }

    pub fn argument(&self, name: &str) -> Option<&InputValueDefinition> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: IndexMap<String, FieldDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, InputValueDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueDefinition {
    pub name: String,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<EnumValueDefinition>,
}

/// Serializes a custom scalar's resolved value into its response form
pub trait ScalarMarshaler: Send + Sync {
    fn serialize(&self, value: &Value) -> anyhow::Result<Value>;
}

#[derive(Clone)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
    pub marshaler: Option<Arc<dyn ScalarMarshaler>>,
}

impl fmt::Debug for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarType")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("marshaler", &self.marshaler.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveDefinition {
    pub name: String,
    pub description: Option<String>,
    pub locations: Vec<String>,
    pub arguments: Vec<InputValueDefinition>,
    pub repeatable: bool,
}

/// The kind of a named type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl TypeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeKind::Scalar => "SCALAR",
            TypeKind::Object => "OBJECT",
            TypeKind::Interface => "INTERFACE",
            TypeKind::Union => "UNION",
            TypeKind::Enum => "ENUM",
            TypeKind::InputObject => "INPUT_OBJECT",
        }
    }
}

// =============================================================================
// Schema
// =============================================================================

/// Typed catalog of everything an SDL document declares
pub struct Schema {
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    objects: HashMap<String, ObjectType>,
    interfaces: HashMap<String, InterfaceType>,
    unions: HashMap<String, UnionType>,
    inputs: HashMap<String, InputType>,
    enums: HashMap<String, EnumType>,
    scalars: RwLock<HashMap<String, ScalarType>>,
    directives: Vec<DirectiveDefinition>,
    /// Named types in declaration order, built-in scalars last
    type_order: Vec<String>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("query_type", &self.query_type)
            .field("mutation_type", &self.mutation_type)
            .field("subscription_type", &self.subscription_type)
            .field("types", &self.type_order)
            .finish()
    }
}

impl Schema {
    /// Parse SDL into a schema
    ///
    /// Either the whole document is accepted or an error is returned; no
    /// partially built schema is ever exposed.
    pub fn parse(sdl: &str) -> Result<Self, SchemaError> {
        let document = parse_schema::<String>(sdl).map_err(|e| SchemaError::Parse {
            message: e.to_string(),
        })?;
        SchemaBuilder::default().build(&document)
    }

    pub fn query_type(&self) -> Option<&str> {
        self.query_type.as_deref()
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    pub fn subscription_type(&self) -> Option<&str> {
        self.subscription_type.as_deref()
    }

    /// Object type by name
    pub fn get_type(&self, name: &str) -> Option<&ObjectType> {
        self.objects.get(name)
    }

    pub fn get_interface(&self, name: &str) -> Option<&InterfaceType> {
        self.interfaces.get(name)
    }

    pub fn get_union(&self, name: &str) -> Option<&UnionType> {
        self.unions.get(name)
    }

    pub fn get_input_type(&self, name: &str) -> Option<&InputType> {
        self.inputs.get(name)
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumType> {
        self.enums.get(name)
    }

    pub fn get_scalar(&self, name: &str) -> Option<ScalarType> {
        let scalars = self.scalars.read().unwrap_or_else(|e| e.into_inner());
        scalars.get(name).cloned()
    }

    /// Attach a marshaler to a scalar, declaring the scalar if needed
    pub fn register_scalar(&self, name: &str, marshaler: Arc<dyn ScalarMarshaler>) {
        let mut scalars = self.scalars.write().unwrap_or_else(|e| e.into_inner());
        scalars
            .entry(name.to_string())
            .and_modify(|s| s.marshaler = Some(marshaler.clone()))
            .or_insert_with(|| ScalarType {
                name: name.to_string(),
                description: None,
                marshaler: Some(marshaler),
            });
    }

    pub fn directives(&self) -> &[DirectiveDefinition] {
        &self.directives
    }

    /// Names of all named types in declaration order
    pub fn type_names(&self) -> Vec<String> {
        let mut names = self.type_order.clone();
        let scalars = self.scalars.read().unwrap_or_else(|e| e.into_inner());
        let mut late: Vec<&String> = scalars
            .keys()
            .filter(|name| !self.type_order.contains(name))
            .collect();
        late.sort();
        names.extend(late.into_iter().cloned());
        names
    }

    pub fn type_kind(&self, name: &str) -> Option<TypeKind> {
        if self.objects.contains_key(name) {
            Some(TypeKind::Object)
        } else if self.interfaces.contains_key(name) {
            Some(TypeKind::Interface)
        } else if self.unions.contains_key(name) {
            Some(TypeKind::Union)
        } else if self.enums.contains_key(name) {
            Some(TypeKind::Enum)
        } else if self.inputs.contains_key(name) {
            Some(TypeKind::InputObject)
        } else if self.get_scalar(name).is_some() {
            Some(TypeKind::Scalar)
        } else {
            None
        }
    }

    /// Field definition on an object or interface type
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
        if let Some(object) = self.objects.get(type_name) {
            return object.fields.get(field_name);
        }
        self.interfaces
            .get(type_name)
            .and_then(|iface| iface.fields.get(field_name))
    }

    /// Whether a fragment on `condition` applies to values of `type_name`
    pub fn type_satisfies(&self, type_name: &str, condition: &str) -> bool {
        if type_name == condition {
            return true;
        }
        if let Some(object) = self.objects.get(type_name)
            && object.interfaces.iter().any(|i| i == condition)
        {
            return true;
        }
        self.unions
            .get(condition)
            .is_some_and(|u| u.types.iter().any(|t| t == type_name))
    }

    /// Object types an interface or union can resolve to
    pub fn possible_types(&self, abstract_type: &str) -> Vec<&str> {
        if let Some(union) = self.unions.get(abstract_type) {
            return union.types.iter().map(String::as_str).collect();
        }
        self.type_order
            .iter()
            .filter_map(|name| self.objects.get(name))
            .filter(|o| o.interfaces.iter().any(|i| i == abstract_type))
            .map(|o| o.name.as_str())
            .collect()
    }

    /// Object types in declaration order
    pub fn object_types(&self) -> impl Iterator<Item = &ObjectType> {
        self.type_order.iter().filter_map(|name| self.objects.get(name))
    }
}

// =============================================================================
// Construction
// =============================================================================

#[derive(Default)]
struct SchemaBuilder {
    schema_roots: Option<(Option<String>, Option<String>, Option<String>)>,
    objects: HashMap<String, ObjectType>,
    interfaces: HashMap<String, InterfaceType>,
    unions: HashMap<String, UnionType>,
    inputs: HashMap<String, InputType>,
    enums: HashMap<String, EnumType>,
    scalars: HashMap<String, ScalarType>,
    directives: Vec<DirectiveDefinition>,
    type_order: Vec<String>,
    seen: HashSet<String>,
}

impl SchemaBuilder {
    fn build(mut self, document: &ast::Document<'_, String>) -> Result<Schema, SchemaError> {
        for definition in &document.definitions {
            match definition {
                Definition::SchemaDefinition(def) => {
                    self.schema_roots = Some((
                        def.query.clone(),
                        def.mutation.clone(),
                        def.subscription.clone(),
                    ));
                }
                Definition::TypeDefinition(def) => self.add_type(def)?,
                Definition::DirectiveDefinition(def) => {
                    self.directives.push(DirectiveDefinition {
                        name: def.name.clone(),
                        description: def.description.clone(),
                        locations: def.locations.iter().map(|l| l.as_str().to_string()).collect(),
                        arguments: def.arguments.iter().map(InputValueDefinition::from_ast).collect(),
                        repeatable: def.repeatable,
                    });
                }
                Definition::TypeExtension(_) => {}
            }
        }

        // Extensions apply after every base definition is known.
        for definition in &document.definitions {
            if let Definition::TypeExtension(ext) = definition {
                self.apply_extension(ext)?;
            }
        }

        self.add_builtins();
        self.check_references()?;

        let (query_type, mutation_type, subscription_type) = match self.schema_roots.take() {
            Some(roots) => roots,
            None => (
                self.objects.contains_key("Query").then(|| "Query".to_string()),
                self.objects.contains_key("Mutation").then(|| "Mutation".to_string()),
                self.objects
                    .contains_key("Subscription")
                    .then(|| "Subscription".to_string()),
            ),
        };
        for root in [&query_type, &mutation_type, &subscription_type]
            .into_iter()
            .flatten()
        {
            if !self.objects.contains_key(root) {
                return Err(SchemaError::UnknownType {
                    name: root.clone(),
                    referenced_by: "schema definition".to_string(),
                });
            }
        }

        Ok(Schema {
            query_type,
            mutation_type,
            subscription_type,
            objects: self.objects,
            interfaces: self.interfaces,
            unions: self.unions,
            inputs: self.inputs,
            enums: self.enums,
            scalars: RwLock::new(self.scalars),
            directives: self.directives,
            type_order: self.type_order,
        })
    }

    fn declare(&mut self, name: &str) -> Result<(), SchemaError> {
        if !self.seen.insert(name.to_string()) {
            return Err(SchemaError::DuplicateType {
                name: name.to_string(),
            });
        }
        self.type_order.push(name.to_string());
        Ok(())
    }

    fn add_type(&mut self, def: &TypeDefinition<'_, String>) -> Result<(), SchemaError> {
        match def {
            TypeDefinition::Scalar(s) => {
                self.declare(&s.name)?;
                self.scalars.insert(
                    s.name.clone(),
                    ScalarType {
                        name: s.name.clone(),
                        description: s.description.clone(),
                        marshaler: None,
                    },
                );
            }
            TypeDefinition::Object(o) => {
                self.declare(&o.name)?;
                let fields = build_fields(&o.name, &o.fields)?;
                self.objects.insert(
                    o.name.clone(),
                    ObjectType {
                        name: o.name.clone(),
                        description: o.description.clone(),
                        interfaces: o.implements_interfaces.clone(),
                        fields,
                    },
                );
            }
            TypeDefinition::Interface(i) => {
                self.declare(&i.name)?;
                let fields = build_fields(&i.name, &i.fields)?;
                self.interfaces.insert(
                    i.name.clone(),
                    InterfaceType {
                        name: i.name.clone(),
                        description: i.description.clone(),
                        fields,
                    },
                );
            }
            TypeDefinition::Union(u) => {
                self.declare(&u.name)?;
                self.unions.insert(
                    u.name.clone(),
                    UnionType {
                        name: u.name.clone(),
                        description: u.description.clone(),
                        types: u.types.clone(),
                    },
                );
            }
            TypeDefinition::Enum(e) => {
                self.declare(&e.name)?;
                let values = e
                    .values
                    .iter()
                    .map(|v| EnumValueDefinition {
                        name: v.name.clone(),
                        description: v.description.clone(),
                        deprecation_reason: deprecation_reason(&v.directives),
                    })
                    .collect();
                self.enums.insert(
                    e.name.clone(),
                    EnumType {
                        name: e.name.clone(),
                        description: e.description.clone(),
                        values,
                    },
                );
            }
            TypeDefinition::InputObject(i) => {
                self.declare(&i.name)?;
                let fields = i
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), InputValueDefinition::from_ast(f)))
                    .collect();
                self.inputs.insert(
                    i.name.clone(),
                    InputType {
                        name: i.name.clone(),
                        description: i.description.clone(),
                        fields,
                    },
                );
            }
        }
        Ok(())
    }

    fn apply_extension(&mut self, ext: &TypeExtension<'_, String>) -> Result<(), SchemaError> {
        if let TypeExtension::Object(o) = ext {
            let fields = build_fields(&o.name, &o.fields)?;
            let target = self
                .objects
                .get_mut(&o.name)
                .ok_or_else(|| SchemaError::UnknownType {
                    name: o.name.clone(),
                    referenced_by: "type extension".to_string(),
                })?;
            target.interfaces.extend(o.implements_interfaces.iter().cloned());
            target.fields.extend(fields);
        }
        Ok(())
    }

    fn add_builtins(&mut self) {
        for (name, description) in BUILTIN_SCALARS {
            if !self.scalars.contains_key(name) {
                self.seen.insert(name.to_string());
                self.type_order.push(name.to_string());
                self.scalars.insert(
                    name.to_string(),
                    ScalarType {
                        name: name.to_string(),
                        description: Some(description.to_string()),
                        marshaler: None,
                    },
                );
            }
        }

        let if_arg = |description: &str| InputValueDefinition {
            name: "if".to_string(),
            description: Some(description.to_string()),
            value_type: TypeRef::non_null(TypeRef::named("Boolean")),
            default_value: None,
        };
        let builtins = [
            DirectiveDefinition {
                name: "skip".to_string(),
                description: Some("Directs the executor to skip this field or fragment when the `if` argument is true.".to_string()),
                locations: vec!["FIELD".into(), "FRAGMENT_SPREAD".into(), "INLINE_FRAGMENT".into()],
                arguments: vec![if_arg("Skipped when true.")],
                repeatable: false,
            },
            DirectiveDefinition {
                name: "include".to_string(),
                description: Some("Directs the executor to include this field or fragment only when the `if` argument is true.".to_string()),
                locations: vec!["FIELD".into(), "FRAGMENT_SPREAD".into(), "INLINE_FRAGMENT".into()],
                arguments: vec![if_arg("Included when true.")],
                repeatable: false,
            },
            DirectiveDefinition {
                name: "deprecated".to_string(),
                description: Some("Marks an element of a GraphQL schema as no longer supported.".to_string()),
                locations: vec!["FIELD_DEFINITION".into(), "ENUM_VALUE".into()],
                arguments: vec![InputValueDefinition {
                    name: "reason".to_string(),
                    description: None,
                    value_type: TypeRef::named("String"),
                    default_value: Some(Value::String(DEFAULT_DEPRECATION_REASON.to_string())),
                }],
                repeatable: false,
            },
        ];
        for builtin in builtins {
            if !self.directives.iter().any(|d| d.name == builtin.name) {
                self.directives.push(builtin);
            }
        }
    }

    fn check_references(&self) -> Result<(), SchemaError> {
        let known = |name: &str| self.seen.contains(name);
        let missing = |name: &str, referenced_by: String| SchemaError::UnknownType {
            name: name.to_string(),
            referenced_by,
        };

        let field_sets = self
            .objects
            .values()
            .map(|o| (&o.name, &o.fields))
            .chain(self.interfaces.values().map(|i| (&i.name, &i.fields)));
        for (type_name, fields) in field_sets {
            for field in fields.values() {
                let referenced_by = format!("{}.{}", type_name, field.name);
                if !known(field.field_type.named_type()) {
                    return Err(missing(field.field_type.named_type(), referenced_by));
                }
                for arg in &field.arguments {
                    if !known(arg.value_type.named_type()) {
                        return Err(missing(arg.value_type.named_type(), referenced_by));
                    }
                }
            }
        }
        for object in self.objects.values() {
            for iface in &object.interfaces {
                if !self.interfaces.contains_key(iface) {
                    return Err(missing(iface, object.name.clone()));
                }
            }
        }
        for union in self.unions.values() {
            for member in &union.types {
                if !self.objects.contains_key(member) {
                    return Err(missing(member, union.name.clone()));
                }
            }
        }
        for input in self.inputs.values() {
            for field in input.fields.values() {
                if !known(field.value_type.named_type()) {
                    return Err(missing(
                        field.value_type.named_type(),
                        format!("{}.{}", input.name, field.name),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn build_fields(
    type_name: &str,
    fields: &[ast::Field<'_, String>],
) -> Result<IndexMap<String, FieldDefinition>, SchemaError> {
    let mut out = IndexMap::with_capacity(fields.len());
    for field in fields {
        let mut definition = FieldDefinition {
            name: field.name.clone(),
            description: field.description.clone(),
            field_type: TypeRef::from_ast(&field.field_type),
            arguments: field.arguments.iter().map(InputValueDefinition::from_ast).collect(),
            sql_column: None,
            sql_table: None,
            sql_relation: None,
            deprecation_reason: deprecation_reason(&field.directives),
        };

        if let Some(sql) = field.directives.iter().find(|d| d.name == "sql") {
            definition.sql_column = string_argument(sql, "column");
            definition.sql_table = string_argument(sql, "table");
            if let Some(relation) = string_argument(sql, "relation") {
                let kind = RelationKind::parse(&relation).ok_or_else(|| {
                    SchemaError::InvalidDirective {
                        location: format!("{}.{}", type_name, field.name),
                        message: format!(
                            "unknown relation '{}', expected hasOne, hasMany, belongsTo or manyToMany",
                            relation
                        ),
                    }
                })?;
                definition.sql_relation = Some(kind);
            }
        }

        out.insert(field.name.clone(), definition);
    }
    Ok(out)
}

fn string_argument(directive: &Directive<'_, String>, name: &str) -> Option<String> {
    directive
        .arguments
        .iter()
        .find(|(arg, _)| arg == name)
        .and_then(|(_, value)| match literal_to_json(value) {
            Value::String(s) => Some(s),
            _ => None,
        })
}

fn deprecation_reason(directives: &[Directive<'_, String>]) -> Option<String> {
    directives
        .iter()
        .find(|d| d.name == "deprecated")
        .map(|d| {
            string_argument(d, "reason").unwrap_or_else(|| DEFAULT_DEPRECATION_REASON.to_string())
        })
}
