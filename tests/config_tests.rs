//! Integration tests for loading mapping configuration from disk

use sqlgraph::config::{JoinType, ScalarKind};
use sqlgraph::prelude::*;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
database:
  dialect: postgresql
naming:
  pluralize_tables: true
models:
  User: accounts
fields:
  User.fullName: display_name
relations:
  User.posts:
    type: hasMany
    table: articles
    foreignKey: owner_id
    references: id
  Post.tags:
    type: manyToMany
    table: tags
    foreignKey: id
    references: id
    joinType: left
    through: { table: article_tags, sourceKey: article_id, targetKey: tag_id }
scalars:
  DateTime: { kind: string }
execution:
  timeout_ms: 1500
  dataloader: { max_batch: 25, batch_delay_ms: 2 }
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(CONFIG);
    let config = MappingConfig::from_yaml_file(file.path()).unwrap();

    assert!(config.naming.pluralize_tables);
    assert_eq!(config.models["User"], "accounts");
    assert_eq!(config.fields["User.fullName"], "display_name");
    assert_eq!(config.relations["Post.tags"].join_type, JoinType::Left);
    assert_eq!(config.scalars["DateTime"].kind, ScalarKind::String);
    assert_eq!(config.execution.timeout(), Some(Duration::from_millis(1500)));

    let loader = config.execution.dataloader.to_config();
    assert_eq!(loader.max_batch, 25);
    assert_eq!(loader.delay, Duration::from_millis(2));
}

#[test]
fn test_missing_file_reports_path() {
    let err = MappingConfig::from_yaml_file("/definitely/not/here.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::Io { ref path, .. } if path == "/definitely/not/here.yaml"));
    assert!(err.to_string().contains("/definitely/not/here.yaml"));
}

#[test]
fn test_malformed_yaml_is_a_parse_error() {
    let file = write_config("models: [not, a, map");
    assert!(matches!(
        MappingConfig::from_yaml_file(file.path()),
        Err(ConfigError::Yaml(_))
    ));
}

#[test]
fn test_invalid_relation_is_rejected() {
    let file = write_config(
        "relations:\n  User.posts: { type: hasMany, table: posts, foreignKey: user_id, through: { table: x, sourceKey: a, targetKey: b } }\n",
    );
    let err = MappingConfig::from_yaml_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(err.to_string().contains("through"));
}

#[test]
fn test_converter_from_loaded_config() {
    let file = write_config(CONFIG);
    let config = MappingConfig::from_yaml_file(file.path()).unwrap();
    let schema = Arc::new(
        Schema::parse(
            r#"
            scalar DateTime
            type User { id: ID! fullName: String posts: [Post!]! }
            type Post { id: ID! title: String tags: [Tag!]! }
            type Tag { id: ID! label: String }
            type Query { users: [User!]! }
            "#,
        )
        .unwrap(),
    );
    assert_eq!(config.register_scalars(&schema), 1);

    let converter = SqlConverter::from_config(schema, &config).unwrap();
    assert_eq!(converter.table_name("User"), "accounts");
    assert_eq!(converter.table_name("Post"), "posts");
    assert_eq!(converter.column_name("User", "fullName"), "display_name");

    let posts = converter.join_config("User", "posts").unwrap();
    assert_eq!(posts.target_table, "articles");
    assert_eq!(posts.source_column, "id");
    assert_eq!(posts.target_column, "owner_id");

    let tags = converter.join_config("Post", "tags").unwrap();
    assert_eq!(tags.through.as_ref().unwrap().table, "article_tags");
    assert!(converter.join_config("Tag", "label").is_none());
}

#[tokio::test]
async fn test_executor_takes_timeout_from_config() {
    let file = write_config(CONFIG);
    let mut config = MappingConfig::from_yaml_file(file.path()).unwrap();
    config.execution.timeout_ms = Some(10);

    let schema = Arc::new(Schema::parse("type Query { slow: String }").unwrap());
    let executor = Executor::builder(schema)
        .execution_config(&config.execution)
        .resolver(
            "Query",
            "slow",
            resolver_fn(|_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(json!("late"))
            }),
        )
        .build();

    let response = executor.execute(Request::new("{ slow }")).await;
    assert_eq!(response.data.unwrap(), json!({"slow": null}));
    assert_eq!(response.errors[0].extensions.as_ref().unwrap()["code"], "TIMEOUT");
}
