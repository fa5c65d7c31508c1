//! Field resolution and value completion

use super::Executor;
use crate::core::error::ExecutionError;
use crate::graphql::collector::{SelectedField, SelectionSet};
use crate::graphql::context::RequestContext;
use crate::graphql::extension::{FieldEndpoint, FieldNext};
use crate::graphql::introspection::Introspector;
use crate::graphql::resolver::{ResolveInfo, ResolveParams};
use crate::graphql::response::{CancelSignal, GraphQLError, Location, ResponsePath};
use crate::graphql::schema::{TypeKind, TypeRef};
use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// State shared by every field of one operation
pub(super) struct ExecutionState {
    context: Arc<RequestContext>,
    operation_name: Option<String>,
    errors: Mutex<Vec<GraphQLError>>,
}

impl ExecutionState {
    pub(super) fn new(context: Arc<RequestContext>, operation_name: Option<String>) -> Self {
        Self {
            context,
            operation_name,
            errors: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn into_errors(self) -> Vec<GraphQLError> {
        self.errors.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, err: &ExecutionError, path: ResponsePath, location: Location) {
        tracing::debug!(
            request_id = %self.context.request_id,
            path = %path,
            code = err.error_code(),
            error = %err,
            "field error"
        );
        let mut errors = self.errors.lock().unwrap_or_else(|e| e.into_inner());
        errors.push(GraphQLError::from_field(err, path, location));
    }

    /// Fails once the request is cancelled or past its deadline
    fn check_interrupted(&self) -> Result<(), ExecutionError> {
        if self.context.is_cancelled() {
            Err(ExecutionError::Cancelled)
        } else if self.context.is_expired() {
            Err(ExecutionError::Timeout)
        } else {
            Ok(())
        }
    }

    /// Race a resolver against the request's deadline and cancel signal
    async fn guard<F>(&self, resolution: F) -> Result<Value, ExecutionError>
    where
        F: Future<Output = anyhow::Result<Value>>,
    {
        let deadline = self.context.deadline();
        let mut cancel = self.context.cancel_signal();
        tokio::select! {
            biased;
            result = resolution => result.map_err(ExecutionError::from),
            _ = wait_cancelled(&mut cancel) => Err(ExecutionError::Cancelled),
            _ = wait_deadline(deadline) => Err(ExecutionError::Timeout),
        }
    }
}

async fn wait_cancelled(signal: &mut Option<CancelSignal>) {
    match signal {
        Some(signal) => signal.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Element type of a list type, looking through non-null wrappers
fn item_type(field_type: &TypeRef) -> &TypeRef {
    match field_type {
        TypeRef::NonNull(inner) => item_type(inner),
        TypeRef::List(inner) => inner,
        TypeRef::Named(_) => field_type,
    }
}

impl Executor {
    /// Execute a selection set against one parent value, depth first
    pub(super) fn execute_selection_set<'a>(
        &'a self,
        state: &'a ExecutionState,
        selections: &'a SelectionSet,
        type_name: &'a str,
        parent: &'a Value,
        path: &'a ResponsePath,
    ) -> BoxFuture<'a, Map<String, Value>> {
        async move {
            self.execute_selection_set_impl(state, selections, type_name, parent, path)
                .await
        }
        .boxed()
    }

    async fn execute_selection_set_impl(
        &self,
        state: &ExecutionState,
        selections: &SelectionSet,
        type_name: &str,
        parent: &Value,
        path: &ResponsePath,
    ) -> Map<String, Value> {
        let runtime_type = self.runtime_type(type_name, parent);
        let mut result = Map::new();

        for field in selections.iter() {
            let applies = field
                .type_condition
                .as_deref()
                .is_none_or(|condition| self.schema.type_satisfies(&runtime_type, condition));
            if !applies {
                continue;
            }

            let key = field.response_key();
            let field_path = path.with_key(key);
            let value = match self
                .execute_field(state, field, &runtime_type, parent, &field_path)
                .await
            {
                Ok(value) => value,
                Err(err) => {
                    state.record(&err, field_path, field.location);
                    Value::Null
                }
            };
            result.insert(key.to_string(), value);
        }

        if selections.typename {
            result.insert("__typename".to_string(), Value::String(runtime_type));
        }
        result
    }

    async fn execute_field(
        &self,
        state: &ExecutionState,
        field: &SelectedField,
        parent_type: &str,
        parent: &Value,
        path: &ResponsePath,
    ) -> Result<Value, ExecutionError> {
        state.check_interrupted()?;

        match field.name.as_str() {
            "__schema" => {
                return Ok(Introspector::new(&self.schema).schema(field.selections.as_deref()));
            }
            "__type" => {
                let name = field
                    .argument("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                return Ok(Introspector::new(&self.schema)
                    .type_by_name(name, field.selections.as_deref()));
            }
            _ => {}
        }

        let definition = self.schema.field(parent_type, &field.name).ok_or_else(|| {
            ExecutionError::UnknownField {
                type_name: parent_type.to_string(),
                field: field.name.clone(),
            }
        })?;

        let params = ResolveParams {
            info: ResolveInfo {
                field: field.clone(),
                parent_type: parent_type.to_string(),
                return_type: Some(definition.field_type.clone()),
                path: path.clone(),
                operation_name: state.operation_name.clone(),
            },
            parent: parent.clone(),
            context: state.context.clone(),
        };
        let endpoint = match self.resolvers.get(parent_type, &field.name) {
            Some(resolver) => FieldEndpoint::Resolver(resolver.as_ref()),
            None => FieldEndpoint::Default(&self.bindings),
        };

        let raw = state
            .guard(FieldNext::new(&self.field_middleware, endpoint).run(params))
            .await?;
        self.complete_value(state, field, &definition.field_type, raw, path)
            .await
    }

    /// Shape a resolved value after the field's declared type and sub-selection
    fn complete_value<'a>(
        &'a self,
        state: &'a ExecutionState,
        field: &'a SelectedField,
        field_type: &'a TypeRef,
        value: Value,
        path: &'a ResponsePath,
    ) -> BoxFuture<'a, Result<Value, ExecutionError>> {
        async move {
            match (value, field.selections.as_deref()) {
                (Value::Null, _) => Ok(Value::Null),
                (Value::Array(items), _) => {
                    let element_type = item_type(field_type);
                    let mut completed = Vec::with_capacity(items.len());
                    for (index, item) in items.into_iter().enumerate() {
                        let item_path = path.with_index(index);
                        match self
                            .complete_value(state, field, element_type, item, &item_path)
                            .await
                        {
                            Ok(value) => completed.push(value),
                            Err(err) => {
                                state.record(&err, item_path, field.location);
                                completed.push(Value::Null);
                            }
                        }
                    }
                    Ok(Value::Array(completed))
                }
                (value @ Value::Object(_), Some(selections)) => {
                    let data = self
                        .execute_selection_set(state, selections, field_type.named_type(), &value, path)
                        .await;
                    Ok(Value::Object(data))
                }
                (leaf, _) => self.serialize_leaf(field_type.named_type(), leaf),
            }
        }
        .boxed()
    }

    /// Run a registered scalar marshaler over a leaf value
    fn serialize_leaf(&self, type_name: &str, value: Value) -> Result<Value, ExecutionError> {
        match self.schema.get_scalar(type_name).and_then(|scalar| scalar.marshaler) {
            Some(marshaler) => marshaler
                .serialize(&value)
                .map_err(|e| ExecutionError::Scalar {
                    scalar: type_name.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(value),
        }
    }

    /// Concrete type of a value declared as `declared`
    ///
    /// Abstract types resolve through the value's `__typename`.
    fn runtime_type(&self, declared: &str, value: &Value) -> String {
        match self.schema.type_kind(declared) {
            Some(TypeKind::Interface | TypeKind::Union) => value
                .get("__typename")
                .and_then(Value::as_str)
                .filter(|concrete| self.schema.type_satisfies(concrete, declared))
                .unwrap_or(declared)
                .to_string(),
            _ => declared.to_string(),
        }
    }
}
