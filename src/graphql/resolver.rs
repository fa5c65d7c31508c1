//! Resolvers and default field resolution

use crate::core::naming::snake_case;
use crate::graphql::collector::{SelectedField, SelectionSet};
use crate::graphql::context::RequestContext;
use crate::graphql::response::ResponsePath;
use crate::graphql::schema::TypeRef;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// What a resolver knows about the field it is resolving
#[derive(Debug, Clone)]
pub struct ResolveInfo {
    pub field: SelectedField,
    pub parent_type: String,
    /// Declared type of the field, if the schema knows the field
    pub return_type: Option<TypeRef>,
    pub path: ResponsePath,
    pub operation_name: Option<String>,
}

impl ResolveInfo {
    pub fn new(field: SelectedField, parent_type: impl Into<String>, return_type: Option<TypeRef>) -> Self {
        Self {
            field,
            parent_type: parent_type.into(),
            return_type,
            path: ResponsePath::root(),
            operation_name: None,
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field.name
    }

    pub fn response_key(&self) -> &str {
        self.field.response_key()
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.field.arguments
    }

    pub fn selections(&self) -> Option<&SelectionSet> {
        self.field.selections.as_deref()
    }
}

/// Input of one resolver invocation
#[derive(Clone)]
pub struct ResolveParams {
    pub info: ResolveInfo,
    /// Completed value of the parent object (the root value for root fields)
    pub parent: Value,
    pub context: Arc<RequestContext>,
}

impl ResolveParams {
    pub fn args(&self) -> &Map<String, Value> {
        self.info.arguments()
    }

    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.info.arguments().get(name)
    }
}

impl fmt::Debug for ResolveParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveParams")
            .field("info", &self.info)
            .field("parent", &self.parent)
            .field("request_id", &self.context.request_id)
            .finish()
    }
}

/// Produces the raw value of a field
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, params: ResolveParams) -> Result<Value>;
}

/// Adapter turning an async closure into a [`Resolver`]
pub struct FnResolver<F>(F);

/// Wrap an async closure as a resolver
///
/// ```rust,ignore
/// builder.resolver("Query", "me", resolver_fn(|params| async move {
///     Ok(json!({"id": params.context.request_id.to_string()}))
/// }));
/// ```
pub fn resolver_fn<F, Fut>(f: F) -> FnResolver<F>
where
    F: Fn(ResolveParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    FnResolver(f)
}

#[async_trait]
impl<F, Fut> Resolver for FnResolver<F>
where
    F: Fn(ResolveParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn resolve(&self, params: ResolveParams) -> Result<Value> {
        (self.0)(params).await
    }
}

/// Resolvers keyed by `(parent type, field name)`, fixed once built
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<(String, String), Arc<dyn Resolver>>,
}

impl ResolverRegistry {
    pub fn insert(&mut self, type_name: &str, field_name: &str, resolver: Arc<dyn Resolver>) {
        self.resolvers
            .insert((type_name.to_string(), field_name.to_string()), resolver);
    }

    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&Arc<dyn Resolver>> {
        self.resolvers
            .get(&(type_name.to_string(), field_name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

/// Computes a field from its parent value
pub type ComputedField = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// How a field without a resolver reads its value off the parent
#[derive(Clone, Default)]
pub struct FieldBindings {
    tags: HashMap<(String, String), String>,
    computed: HashMap<(String, String), ComputedField>,
}

impl FieldBindings {
    /// Read `type_name.field_name` from the parent's `key` entry
    pub fn bind_key(&mut self, type_name: &str, field_name: &str, key: &str) {
        self.tags
            .insert((type_name.to_string(), field_name.to_string()), key.to_string());
    }

    /// Compute `type_name.field_name` from the whole parent value
    pub fn bind_computed<F>(&mut self, type_name: &str, field_name: &str, f: F)
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.computed
            .insert((type_name.to_string(), field_name.to_string()), Arc::new(f));
    }

    /// Default resolution
    ///
    /// Tries the parent's entry named like the field, then the bound key (or
    /// the snake_case form of the field name), then a computed property.
    /// Anything else resolves to `null`.
    pub fn resolve(&self, type_name: &str, field_name: &str, parent: &Value) -> Result<Value> {
        let key = (type_name.to_string(), field_name.to_string());

        if let Value::Object(map) = parent {
            if let Some(value) = map.get(field_name) {
                return Ok(value.clone());
            }
            let tag = self
                .tags
                .get(&key)
                .cloned()
                .unwrap_or_else(|| snake_case(field_name));
            if let Some(value) = map.get(&tag) {
                return Ok(value.clone());
            }
        }

        match self.computed.get(&key) {
            Some(compute) => compute(parent),
            None => Ok(Value::Null),
        }
    }
}
