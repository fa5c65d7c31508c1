//! Request preparation and operation orchestration

use super::Executor;
use super::field_resolver::ExecutionState;
use crate::core::error::QueryError;
use crate::graphql::collector::{Fragments, SelectionSet, collect_fields};
use crate::graphql::context::RequestContext;
use crate::graphql::extension::{OperationInfo, OperationKind, OperationNext};
use crate::graphql::response::{Request, Response, ResponsePath};
use crate::graphql::value::{Variables, literal_to_json};
use futures::future::FutureExt;
use graphql_parser::query::{
    Definition, Document, OperationDefinition, SelectionSet as AstSelectionSet, VariableDefinition,
    parse_query,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::time::Instant;

/// An operation whose root selection has been collected
pub(super) struct PreparedOperation {
    pub name: Option<String>,
    pub kind: OperationKind,
    pub root_type: String,
    pub selection: SelectionSet,
}

impl Executor {
    /// Execute one request
    ///
    /// Request-level failures (parse errors, operation selection, unsupported
    /// operation kinds) produce a response without `data`. Field failures are
    /// reported in `errors` next to partial data.
    pub async fn execute(&self, request: Request) -> Response {
        let deadline = request
            .deadline
            .or_else(|| self.default_timeout.map(|timeout| Instant::now() + timeout));
        let ctx = Arc::new(
            RequestContext::with_loaders(request.extensions.clone(), self.loaders.clone())
                .with_deadline(deadline)
                .with_cancel(request.cancel.clone()),
        );

        let response = match self.prepare(&request) {
            Ok(operation) => self.run_operation(&ctx, &request, operation).await,
            Err(err) => {
                tracing::debug!(request_id = %ctx.request_id, error = %err, "request rejected");
                Response::from_errors(vec![err.into()])
            }
        };

        if ctx.is_cancelled() {
            tracing::warn!(request_id = %ctx.request_id, "request cancelled during execution");
        } else if ctx.is_expired() {
            tracing::warn!(request_id = %ctx.request_id, "request deadline exceeded");
        }

        let response = self.finish(&ctx, response);
        tracing::debug!(
            request_id = %ctx.request_id,
            errors = response.errors.len(),
            elapsed_ms = ctx.started.elapsed().as_millis() as u64,
            "request finished"
        );
        response
    }

    /// Parse, pick the operation, apply variable defaults and collect the root selection
    pub(super) fn prepare(&self, request: &Request) -> Result<PreparedOperation, QueryError> {
        let document = self.document(&request.query)?;
        let operation = select_operation(&document, request.operation_name.as_deref())?;

        let (kind, name, variable_definitions, selection_set) = match operation {
            OperationDefinition::SelectionSet(set) => (OperationKind::Query, None, &[][..], set),
            OperationDefinition::Query(q) => (
                OperationKind::Query,
                q.name.clone(),
                q.variable_definitions.as_slice(),
                &q.selection_set,
            ),
            OperationDefinition::Mutation(m) => (
                OperationKind::Mutation,
                m.name.clone(),
                m.variable_definitions.as_slice(),
                &m.selection_set,
            ),
            OperationDefinition::Subscription(_) => {
                return Err(QueryError::UnsupportedOperation {
                    kind: OperationKind::Subscription.to_string(),
                });
            }
        };

        let root_type = match kind {
            OperationKind::Query => self.schema.query_type(),
            OperationKind::Mutation => self.schema.mutation_type(),
            OperationKind::Subscription => self.schema.subscription_type(),
        }
        .ok_or_else(|| QueryError::MissingRootType {
            kind: kind.to_string(),
        })?
        .to_string();

        let variables = with_defaults(&request.variables, variable_definitions);
        let selection = collect_root(&self.schema, &document, selection_set, &root_type, &variables);

        Ok(PreparedOperation {
            name,
            kind,
            root_type,
            selection,
        })
    }

    async fn run_operation(
        &self,
        ctx: &Arc<RequestContext>,
        request: &Request,
        operation: PreparedOperation,
    ) -> Response {
        let info = OperationInfo {
            name: operation.name.clone(),
            kind: operation.kind,
            query: request.query.clone(),
            root_fields: operation.selection.keys().map(String::from).collect(),
        };
        tracing::debug!(
            request_id = %ctx.request_id,
            operation = ?info.name,
            kind = %info.kind,
            fields = info.root_fields.len(),
            "executing operation"
        );

        let executor = self;
        let operation = &operation;
        let root_value = &request.root_value;
        let endpoint = move || {
            async move {
                let state = ExecutionState::new(ctx.clone(), operation.name.clone());
                let data = executor
                    .execute_selection_set(
                        &state,
                        &operation.selection,
                        &operation.root_type,
                        root_value,
                        &ResponsePath::root(),
                    )
                    .await;
                Response {
                    data: Some(Value::Object(data)),
                    errors: state.into_errors(),
                    extensions: Map::new(),
                }
            }
            .boxed()
        };

        OperationNext::new(&self.operation_interceptors, &endpoint)
            .run(ctx, &info)
            .await
    }

    fn finish(&self, ctx: &RequestContext, mut response: Response) -> Response {
        for data in &self.extension_data {
            if let Some(value) = data.data(ctx) {
                response.extensions.insert(data.name().to_string(), value);
            }
        }
        self.response_interceptors
            .iter()
            .fold(response, |response, interceptor| interceptor.intercept_response(ctx, response))
    }

    /// Parse a query, reusing the document parsed for identical text earlier
    fn document(&self, query: &str) -> Result<Arc<Document<'static, String>>, QueryError> {
        {
            let cache = self.documents.read().unwrap_or_else(|e| e.into_inner());
            if let Some(document) = cache.get(query) {
                tracing::trace!("parsed document cache hit");
                return Ok(document.clone());
            }
        }

        let document = parse_query::<String>(query)
            .map_err(|e| QueryError::Parse {
                message: e
                    .to_string()
                    .trim_start_matches("query parse error: ")
                    .trim()
                    .to_string(),
            })?
            .into_static();
        let document = Arc::new(document);

        let mut cache = self.documents.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(query.to_string(), document.clone());
        Ok(document)
    }
}

/// Pick the operation to run
///
/// Without a name the document must hold exactly one operation.
pub(super) fn select_operation<'d>(
    document: &'d Document<'static, String>,
    name: Option<&str>,
) -> Result<&'d OperationDefinition<'static, String>, QueryError> {
    let operations: Vec<_> = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Operation(op) => Some(op),
            Definition::Fragment(_) => None,
        })
        .collect();

    match name {
        Some(name) => operations
            .into_iter()
            .find(|op| operation_name(op) == Some(name))
            .ok_or_else(|| QueryError::UnknownOperation {
                name: name.to_string(),
            }),
        None => match operations.as_slice() {
            [] => Err(QueryError::NoOperation),
            [op] => Ok(*op),
            many => Err(QueryError::OperationNameRequired { count: many.len() }),
        },
    }
}

fn operation_name<'d>(operation: &'d OperationDefinition<'static, String>) -> Option<&'d str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(q) => q.name.as_deref(),
        OperationDefinition::Mutation(m) => m.name.as_deref(),
        OperationDefinition::Subscription(s) => s.name.as_deref(),
    }
}

/// Request variables, with declared defaults filling the missing ones
fn with_defaults(provided: &Variables, definitions: &[VariableDefinition<'static, String>]) -> Variables {
    let mut variables = provided.clone();
    for definition in definitions {
        if variables.contains_key(&definition.name) {
            continue;
        }
        if let Some(default) = &definition.default_value {
            variables.insert(definition.name.clone(), literal_to_json(default));
        }
    }
    variables
}

fn collect_root(
    schema: &crate::graphql::schema::Schema,
    document: &Document<'static, String>,
    selection_set: &AstSelectionSet<'static, String>,
    root_type: &str,
    variables: &Variables,
) -> SelectionSet {
    let fragments: Fragments<'_, 'static> = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Fragment(fragment) => Some((fragment.name.clone(), fragment)),
            Definition::Operation(_) => None,
        })
        .collect();
    collect_fields(schema, selection_set, root_type, variables, &fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::schema::Schema;
    use serde_json::json;

    fn parse(query: &str) -> Document<'static, String> {
        parse_query::<String>(query).unwrap().into_static()
    }

    fn executor() -> Executor {
        let schema = Schema::parse(
            "type User { id: ID! name: String }
             type Query { users(limit: Int): [User!]! me: User }
             type Mutation { rename(name: String!): User }",
        )
        .unwrap();
        Executor::builder(Arc::new(schema)).build()
    }

    #[test]
    fn test_select_single_anonymous_operation() {
        let doc = parse("{ me { id } }");
        let op = select_operation(&doc, None).unwrap();
        assert!(matches!(op, OperationDefinition::SelectionSet(_)));
    }

    #[test]
    fn test_select_operation_requires_name_when_ambiguous() {
        let doc = parse("query A { me { id } } query B { users { id } }");
        assert!(matches!(
            select_operation(&doc, None),
            Err(QueryError::OperationNameRequired { count: 2 })
        ));
        assert_eq!(operation_name(select_operation(&doc, Some("B")).unwrap()), Some("B"));
        assert!(matches!(
            select_operation(&doc, Some("C")),
            Err(QueryError::UnknownOperation { .. })
        ));
    }

    #[test]
    fn test_fragment_only_document_has_no_operation() {
        let doc = parse("fragment F on User { id }");
        assert!(matches!(select_operation(&doc, None), Err(QueryError::NoOperation)));
    }

    #[test]
    fn test_variable_defaults() {
        let doc = parse("query Q($limit: Int = 10, $name: String) { users(limit: $limit) { id } }");
        let OperationDefinition::Query(q) = select_operation(&doc, None).unwrap() else {
            panic!("expected a query");
        };

        let vars = with_defaults(&Map::new(), &q.variable_definitions);
        assert_eq!(vars.get("limit"), Some(&json!(10)));
        assert!(!vars.contains_key("name"));

        let mut provided = Map::new();
        provided.insert("limit".into(), json!(3));
        let vars = with_defaults(&provided, &q.variable_definitions);
        assert_eq!(vars.get("limit"), Some(&json!(3)));
    }

    #[test]
    fn test_prepare_collects_against_root_type() {
        let executor = executor();
        let prepared = executor
            .prepare(&Request::new("mutation { rename(name: \"x\") { id } }"))
            .unwrap();
        assert_eq!(prepared.kind, OperationKind::Mutation);
        assert_eq!(prepared.root_type, "Mutation");
        assert_eq!(prepared.selection.keys().collect::<Vec<_>>(), vec!["rename"]);
    }

    #[test]
    fn test_prepare_rejects_subscriptions() {
        let executor = executor();
        let err = executor
            .prepare(&Request::new("subscription { me { id } }"))
            .err()
            .unwrap();
        assert!(matches!(err, QueryError::UnsupportedOperation { .. }));
    }

    #[test]
    fn test_documents_are_cached() {
        let executor = executor();
        executor.prepare(&Request::new("{ me { id } }")).unwrap();
        executor.prepare(&Request::new("{ me { id } }")).unwrap();
        assert_eq!(executor.cached_documents(), 1);
        assert!(matches!(
            executor.prepare(&Request::new("{ me { ")),
            Err(QueryError::Parse { .. })
        ));
        assert_eq!(executor.cached_documents(), 1);
    }
}
