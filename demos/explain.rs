//! Explain example: compile GraphQL selections to SQL without a database
//!
//! Run with `RUST_LOG=sqlgraph=debug cargo run --example explain` to see the
//! converter and executor logs.

use sqlgraph::prelude::*;
use tracing_subscriber::EnvFilter;

const SDL: &str = r#"
    scalar DateTime

    type User {
        id: ID!
        name: String!
        createdAt: DateTime
        posts(limit: Int, orderBy: PostOrder, where: PostWhere): [Post!]!
    }

    type Post {
        id: ID!
        title: String
        author: User
        tags: [Tag!]!
    }

    type Tag { id: ID! label: String }

    input PostOrder { field: String direction: String }
    input PostWhere { title: String }

    type Query { users(where: UserWhere, limit: Int = 10): [User!]! }
    type Mutation { renameUser(id: ID!, name: String!): User }
    input UserWhere { name: String }
"#;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🚀 sqlgraph explain example\n");

    // Mapping config: relations, naming and execution limits
    let config = MappingConfig::default_config();
    let schema = Arc::new(Schema::parse(SDL)?);
    config.register_scalars(&schema);
    let converter = Arc::new(SqlConverter::from_config(schema.clone(), &config)?);

    let select_converter = converter.clone();
    let mutation_converter = converter.clone();
    let executor = Executor::builder(schema)
        .execution_config(&config.execution)
        .resolver(
            "Query",
            "users",
            resolver_fn(move |params| {
                let converter = select_converter.clone();
                async move {
                    let select = converter.convert_to_select(&params.info)?.ensure_valid()?;
                    println!("📋 {}\n", params.info.field_name());
                    println!("{}\n", select.sql);
                    println!("   params: {:?}\n", select.params);
                    Ok(json!([]))
                }
            }),
        )
        .resolver(
            "Mutation",
            "renameUser",
            resolver_fn(move |params| {
                let converter = mutation_converter.clone();
                async move {
                    let mut set = serde_json::Map::new();
                    set.insert("name".to_string(), params.arg("name").cloned().unwrap_or_default());
                    let filter = json!({"id": params.arg("id").cloned().unwrap_or_default()});
                    let update = converter.convert_to_update("User", &set, &filter, &["id", "name"])?;
                    println!("📋 {} ({})\n", params.info.field_name(), update.kind);
                    println!("{}\n", update.sql);
                    println!("   params: {:?}\n", update.params);
                    Ok(Value::Null)
                }
            }),
        )
        .build();

    let queries = [
        r#"{ users(where: {name: {_ilike: "a%"}}) { id name } }"#,
        r#"{ users(limit: 5) { id posts(limit: 3, orderBy: {field: "title"}) { id title } } }"#,
        r#"query Recent($since: String = "2024-01-01") {
             users(where: {createdAt: {_gte: $since}}, limit: 2) { name createdAt }
           }"#,
        r#"mutation { renameUser(id: 7, name: "Ada") { id } }"#,
    ];

    for query in queries {
        let response = executor.execute(Request::new(query)).await;
        for error in &response.errors {
            println!("❌ {}", error.message);
        }
    }

    println!("✅ Done");
    Ok(())
}
