//! Integration tests for the executor: error isolation, interruption,
//! middleware, data loaders and introspection

use anyhow::anyhow;
use serde_json::{Value, json};
use sqlgraph::graphql::{CancelSignal, LoadError, OperationKind, OperationNext};
use sqlgraph::prelude::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// =============================================================================
// Fixtures
// =============================================================================

const SDL: &str = r#"
    scalar DateTime

    interface Node { id: ID! }

    type User implements Node {
        id: ID!
        name: String!
        createdAt: DateTime
        posts(limit: Int): [Post!]! @sql(relation: "hasMany")
    }

    type Post implements Node {
        id: ID!
        title: String
        authorId: ID
        author: User
    }

    union SearchResult = User | Post

    type Query {
        users(limit: Int): [User!]!
        search: [SearchResult!]!
        slow: String
        other: String
    }

    type Mutation { rename(id: ID!, name: String!): User }
"#;

fn schema() -> Arc<Schema> {
    Arc::new(Schema::parse(SDL).unwrap())
}

fn users() -> Value {
    json!([
        {"id": "1", "name": "Ada", "created_at": "2024-01-01"},
        {"id": "2", "name": "Grace", "created_at": "2024-02-01"}
    ])
}

fn base_builder() -> ExecutorBuilder {
    Executor::builder(schema())
        .resolver("Query", "users", resolver_fn(|_| async { Ok(users()) }))
        .resolver(
            "User",
            "posts",
            resolver_fn(|params| async move {
                match params.parent["id"].as_str() {
                    Some("1") => Err(anyhow!("posts store unavailable")),
                    _ => Ok(json!([{"id": "10", "title": "Compilers", "authorId": "2"}])),
                }
            }),
        )
}

// =============================================================================
// Error isolation
// =============================================================================

#[tokio::test]
async fn test_field_error_is_isolated_to_its_path() {
    let executor = base_builder().build();
    let response = executor
        .execute(Request::new("{ users { id name posts { title } } }"))
        .await;

    let data = response.data.clone().unwrap();
    assert_eq!(data["users"][0]["posts"], Value::Null);
    assert_eq!(data["users"][0]["name"], "Ada");
    assert_eq!(data["users"][1]["posts"], json!([{"title": "Compilers"}]));

    assert_eq!(response.errors.len(), 1);
    let error = &response.errors[0];
    assert_eq!(error.message, "posts store unavailable");
    assert_eq!(serde_json::to_value(&error.path).unwrap(), json!(["users", 0, "posts"]));
    assert_eq!(error.locations.len(), 1);
    assert_eq!(error.locations[0].line, 1);
    assert_eq!(error.extensions.as_ref().unwrap()["code"], "RESOLVER_ERROR");
}

#[tokio::test]
async fn test_parse_error_omits_data() {
    let executor = base_builder().build();
    let response = executor.execute(Request::new("{ users { id ")).await;

    assert!(response.data.is_none());
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].path.is_none());
    assert!(response.to_json().get("data").is_none());
}

#[tokio::test]
async fn test_unknown_field_is_a_field_error() {
    let executor = base_builder().build();
    let response = executor.execute(Request::new("{ users { id nope } }")).await;

    assert_eq!(response.data.unwrap()["users"][0]["id"], "1");
    assert_eq!(response.errors[0].message, r#"Cannot query field "nope" on type "User""#);
}

#[tokio::test]
async fn test_operation_name_required_with_several_operations() {
    let executor = base_builder().build();
    let query = "query A { users { id } } query B { users { name } }";

    let ambiguous = executor.execute(Request::new(query)).await;
    assert!(ambiguous.data.is_none());

    let named = executor.execute(Request::new(query).operation_name("B")).await;
    assert_eq!(named.data.unwrap(), json!({"users": [{"name": "Ada"}, {"name": "Grace"}]}));
}

// =============================================================================
// Variables, mutations and abstract types
// =============================================================================

#[tokio::test]
async fn test_variables_and_defaults_reach_resolvers() {
    let executor = Executor::builder(schema())
        .resolver(
            "Query",
            "users",
            resolver_fn(|params| async move {
                let limit = params.arg("limit").and_then(Value::as_u64).unwrap_or(0) as usize;
                Ok(Value::Array(users().as_array().unwrap()[..limit].to_vec()))
            }),
        )
        .build();

    let query = "query Users($n: Int = 1) { users(limit: $n) { name } }";
    let defaulted = executor.execute(Request::new(query)).await;
    assert_eq!(defaulted.data.unwrap()["users"], json!([{"name": "Ada"}]));

    let explicit = executor.execute(Request::new(query).variable("n", json!(2))).await;
    assert_eq!(explicit.data.unwrap()["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_mutation_root() {
    let executor = Executor::builder(schema())
        .resolver(
            "Mutation",
            "rename",
            resolver_fn(|params| async move {
                Ok(json!({"id": params.arg("id").cloned(), "name": params.arg("name").cloned()}))
            }),
        )
        .build();

    let response = executor
        .execute(Request::new(r#"mutation { rename(id: "1", name: "Ada L.") { id name } }"#))
        .await;
    assert!(response.is_ok());
    assert_eq!(response.data.unwrap(), json!({"rename": {"id": "1", "name": "Ada L."}}));
}

#[tokio::test]
async fn test_union_members_resolve_through_typename() {
    let executor = Executor::builder(schema())
        .resolver(
            "Query",
            "search",
            resolver_fn(|_| async {
                Ok(json!([
                    {"__typename": "User", "id": "1", "name": "Ada"},
                    {"__typename": "Post", "id": "10", "title": "Compilers"}
                ]))
            }),
        )
        .build();

    let response = executor
        .execute(Request::new(
            "{ search { __typename ... on User { name } ... on Post { title } } }",
        ))
        .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.data.unwrap()["search"],
        json!([
            {"name": "Ada", "__typename": "User"},
            {"title": "Compilers", "__typename": "Post"}
        ])
    );
}

#[tokio::test]
async fn test_default_resolution_reads_snake_case_keys_and_scalars() {
    struct SlashDates;
    impl sqlgraph::graphql::ScalarMarshaler for SlashDates {
        fn serialize(&self, value: &Value) -> anyhow::Result<Value> {
            Ok(json!(value.as_str().unwrap_or_default().replace('-', "/")))
        }
    }

    let schema = schema();
    schema.register_scalar("DateTime", Arc::new(SlashDates));
    let executor = Executor::builder(schema)
        .resolver("Query", "users", resolver_fn(|_| async { Ok(users()) }))
        .build();

    let response = executor.execute(Request::new("{ users { createdAt } }")).await;
    assert_eq!(
        response.data.unwrap()["users"],
        json!([{"createdAt": "2024/01/01"}, {"createdAt": "2024/02/01"}])
    );
}

// =============================================================================
// Deadlines and cancellation
// =============================================================================

fn slow_builder() -> ExecutorBuilder {
    Executor::builder(schema())
        .resolver(
            "Query",
            "slow",
            resolver_fn(|_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(json!("done"))
            }),
        )
        .resolver("Query", "other", resolver_fn(|_| async { Ok(json!("fast")) }))
}

#[tokio::test]
async fn test_deadline_nulls_interrupted_and_pending_fields() {
    let executor = slow_builder().build();
    let response = executor
        .execute(Request::new("{ slow other }").timeout(Duration::from_millis(20)))
        .await;

    assert_eq!(response.data.unwrap(), json!({"slow": null, "other": null}));
    let codes: Vec<&Value> = response
        .errors
        .iter()
        .map(|e| &e.extensions.as_ref().unwrap()["code"])
        .collect();
    assert_eq!(codes, vec!["TIMEOUT", "TIMEOUT"]);
    assert_eq!(serde_json::to_value(&response.errors[1].path).unwrap(), json!(["other"]));
}

#[tokio::test]
async fn test_default_timeout_applies_without_request_deadline() {
    let executor = slow_builder().default_timeout(Duration::from_millis(20)).build();
    let response = executor.execute(Request::new("{ slow }")).await;

    assert_eq!(response.data.unwrap(), json!({"slow": null}));
    assert_eq!(response.errors[0].extensions.as_ref().unwrap()["code"], "TIMEOUT");
}

#[tokio::test]
async fn test_cancellation_interrupts_resolution() {
    let executor = slow_builder().build();
    let (handle, signal): (CancelHandle, CancelSignal) = CancelSignal::new();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });

    let response = executor
        .execute(Request::new("{ slow other }").cancel_signal(signal))
        .await;
    assert_eq!(response.data.unwrap(), json!({"slow": null, "other": null}));
    assert!(response
        .errors
        .iter()
        .all(|e| e.extensions.as_ref().unwrap()["code"] == "CANCELLED"));
}

// =============================================================================
// Middleware contract
// =============================================================================

struct RecordingInterceptor {
    seen: Arc<Mutex<Vec<(Option<String>, OperationKind, Vec<String>)>>>,
}

#[async_trait]
impl OperationInterceptor for RecordingInterceptor {
    async fn intercept_operation(
        &self,
        ctx: &RequestContext,
        operation: &OperationInfo,
        next: OperationNext<'_>,
    ) -> Response {
        self.seen.lock().unwrap().push((
            operation.name.clone(),
            operation.kind,
            operation.root_fields.clone(),
        ));
        next.run(ctx, operation).await
    }
}

struct DenyMutations;

#[async_trait]
impl OperationInterceptor for DenyMutations {
    async fn intercept_operation(
        &self,
        ctx: &RequestContext,
        operation: &OperationInfo,
        next: OperationNext<'_>,
    ) -> Response {
        if operation.kind == OperationKind::Mutation {
            return Response::from_errors(vec![GraphQLError::new("mutations are disabled")]);
        }
        next.run(ctx, operation).await
    }
}

struct Stamp;

impl ResponseInterceptor for Stamp {
    fn intercept_response(&self, _ctx: &RequestContext, mut response: Response) -> Response {
        response.extensions.insert("stamped".to_string(), json!(true));
        response
    }
}

struct RequestIdExtension;

impl ExtensionData for RequestIdExtension {
    fn name(&self) -> &str {
        "requestId"
    }

    fn data(&self, ctx: &RequestContext) -> Option<Value> {
        Some(json!(ctx.request_id.to_string()))
    }
}

struct ShoutNames;

#[async_trait]
impl FieldMiddleware for ShoutNames {
    async fn call(&self, params: ResolveParams, next: FieldNext<'_>) -> anyhow::Result<Value> {
        let is_name = params.info.field.name == "name";
        let value = next.run(params).await?;
        Ok(match value {
            Value::String(s) if is_name => Value::String(s.to_uppercase()),
            other => other,
        })
    }
}

#[tokio::test]
async fn test_interceptors_and_extensions() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let executor = base_builder()
        .operation_interceptor(RecordingInterceptor { seen: seen.clone() })
        .operation_interceptor(DenyMutations)
        .response_interceptor(Stamp)
        .extension_data(RequestIdExtension)
        .build();

    let response = executor
        .execute(Request::new("query Names { users { name } }"))
        .await;
    assert!(response.is_ok());
    assert_eq!(response.extensions["stamped"], json!(true));
    assert!(response.extensions["requestId"].is_string());
    assert_eq!(
        seen.lock().unwrap()[0],
        (Some("Names".to_string()), OperationKind::Query, vec!["users".to_string()])
    );

    let denied = executor
        .execute(Request::new(r#"mutation { rename(id: "1", name: "x") { id } }"#))
        .await;
    assert!(denied.data.is_none());
    assert_eq!(denied.errors[0].message, "mutations are disabled");
    assert_eq!(denied.extensions["stamped"], json!(true));
}

#[tokio::test]
async fn test_response_interceptors_see_request_failures() {
    let executor = base_builder().response_interceptor(Stamp).build();
    let response = executor.execute(Request::new("{")).await;
    assert!(response.data.is_none());
    assert_eq!(response.extensions["stamped"], json!(true));
}

#[tokio::test]
async fn test_field_middleware_wraps_every_field() {
    let executor = base_builder().field_middleware(ShoutNames).build();
    let response = executor.execute(Request::new("{ users { id name } }")).await;
    assert_eq!(
        response.data.unwrap()["users"],
        json!([{"id": "1", "name": "ADA"}, {"id": "2", "name": "GRACE"}])
    );
}

// =============================================================================
// Data loaders
// =============================================================================

struct UserBatch {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl BatchLoad<String, Value> for UserBatch {
    async fn load(&self, keys: &[String]) -> Vec<Result<Value, LoadError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        keys.iter()
            .map(|id| match id.as_str() {
                "2" => Ok(json!({"id": "2", "name": "Grace"})),
                other => Err(LoadError::new(format!("no user {}", other))),
            })
            .collect()
    }
}

#[tokio::test]
async fn test_data_loader_is_request_scoped_and_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = Executor::builder(schema())
        .resolver(
            "Query",
            "users",
            resolver_fn(|_| async {
                Ok(json!([{"id": "2", "name": "Grace", "posts": [
                    {"id": "10", "authorId": "2"},
                    {"id": "11", "authorId": "2"},
                    {"id": "12", "authorId": "9"}
                ]}]))
            }),
        )
        .resolver(
            "Post",
            "author",
            resolver_fn(|params| async move {
                let loader = params
                    .context
                    .loader::<String, Value>("users")
                    .ok_or_else(|| anyhow!("users loader missing"))?;
                let id = params.parent["authorId"].as_str().unwrap_or_default().to_string();
                Ok(loader.load(id).await?)
            }),
        )
        .data_loader::<String, Value>(
            "users",
            Arc::new(UserBatch { calls: calls.clone() }),
            DataLoaderConfig::default(),
        )
        .build();

    let query = "{ users { posts { id author { name } } } }";
    let response = executor.execute(Request::new(query)).await;
    let posts = &response.data.unwrap()["users"][0]["posts"];
    assert_eq!(posts[0]["author"]["name"], "Grace");
    assert_eq!(posts[1]["author"]["name"], "Grace");
    assert_eq!(posts[2]["author"], Value::Null);
    assert_eq!(response.errors[0].message, "no user 9");
    assert_eq!(
        serde_json::to_value(&response.errors[0].path).unwrap(),
        json!(["users", 0, "posts", 2, "author"])
    );
    // "2" was cached after the first post
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    executor.execute(Request::new(query)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

// =============================================================================
// Introspection
// =============================================================================

#[tokio::test]
async fn test_introspection_through_executor() {
    let executor = base_builder().build();
    let response = executor
        .execute(Request::new(
            r#"{ __schema { queryType { name } mutationType { name } }
                 __type(name: "Node") { kind possibleTypes { name } }
                 __typename }"#,
        ))
        .await;

    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.data.unwrap(),
        json!({
            "__schema": {"queryType": {"name": "Query"}, "mutationType": {"name": "Mutation"}},
            "__type": {"kind": "INTERFACE", "possibleTypes": [{"name": "User"}, {"name": "Post"}]},
            "__typename": "Query"
        })
    );
}

// =============================================================================
// Converter inside a resolver
// =============================================================================

#[tokio::test]
async fn test_resolver_compiles_its_selection_to_sql() {
    let schema = schema();
    let converter = Arc::new(
        SqlConverter::from_schema(schema.clone(), Arc::new(PostgresDialect)).pluralize_tables(true),
    );
    let executor = Executor::builder(schema)
        .resolver(
            "Query",
            "users",
            resolver_fn(move |params| {
                let converter = converter.clone();
                async move {
                    let select = converter.convert_to_select(&params.info)?;
                    Ok(json!([{"id": "1", "name": select.sql}]))
                }
            }),
        )
        .build();

    let response = executor
        .execute(Request::new("{ users { id name posts(limit: 2) { title } } }"))
        .await;
    let sql = response.data.unwrap()["users"][0]["name"].as_str().unwrap().to_string();
    assert_eq!(
        sql,
        "SELECT u.\"id\", u.\"name\", p.\"title\" AS \"p_title\"\n\
         FROM \"users\" u\n\
         LEFT JOIN LATERAL (\n    \
         SELECT \"title\"\n    \
         FROM \"posts\"\n    \
         WHERE \"user_id\" = u.\"id\"\n    \
         LIMIT 2\n\
         ) p ON TRUE"
    );
}
