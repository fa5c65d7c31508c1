//! End-to-end SQL generation: GraphQL text → collected selection → SQL

use graphql_parser::query::{Definition, OperationDefinition, parse_query};
use serde_json::{Map, json};
use sqlgraph::converter::SelectResult;
use sqlgraph::graphql::collector::{Fragments, collect_fields};
use sqlgraph::graphql::value::Variables;
use sqlgraph::prelude::*;

const SDL: &str = r#"
    type User {
        id: ID!
        name: String!
        email: String @sql(column: "email_address")
        posts(where: PostWhere, limit: Int, offset: Int, orderBy: PostOrder): [Post!]! @sql(relation: "hasMany")
        profile: Profile @sql(relation: "hasOne", table: "user_profiles")
    }

    type Profile { id: ID! bio: String }

    type Post {
        id: ID!
        title: String
        published: Boolean
        author: User @sql(relation: "belongsTo")
    }

    input PostWhere { title: String }
    input PostOrder { field: String direction: String }
    input UserWhere { name: String }

    type Query {
        users(where: UserWhere, limit: Int, offset: Int, orderBy: [PostOrder!]): [User!]!
        posts(limit: Int = 50): [Post!]!
    }
"#;

fn schema() -> Arc<Schema> {
    Arc::new(Schema::parse(SDL).unwrap())
}

fn converter() -> SqlConverter {
    SqlConverter::from_schema(schema(), Arc::new(PostgresDialect)).pluralize_tables(true)
}

/// Convert the first root field of `query`
fn select(converter: &SqlConverter, query: &str, variables: Variables) -> Result<SelectResult, ConversionError> {
    let schema = converter.schema();
    let doc = parse_query::<String>(query).unwrap().into_static();
    let Some(Definition::Operation(operation)) = doc.definitions.first() else {
        panic!("expected an operation");
    };
    let set = match operation {
        OperationDefinition::SelectionSet(set) => set,
        OperationDefinition::Query(q) => &q.selection_set,
        _ => panic!("expected a query"),
    };
    let root = collect_fields(schema, set, "Query", &variables, &Fragments::new());
    let field = root.iter().next().unwrap().clone();
    let return_type = schema.field("Query", &field.name).map(|f| f.field_type.clone());
    converter.convert_to_select(&ResolveInfo::new(field, "Query", return_type))
}

#[test]
fn test_users_with_limited_posts() {
    let result = select(&converter(), "{ users { id name posts(limit: 2) { title } } }", Variables::new()).unwrap();

    assert_eq!(
        result.sql,
        "SELECT u.\"id\", u.\"name\", p.\"title\" AS \"p_title\"\n\
         FROM \"users\" u\n\
         LEFT JOIN LATERAL (\n    \
         SELECT \"title\"\n    \
         FROM \"posts\"\n    \
         WHERE \"user_id\" = u.\"id\"\n    \
         LIMIT 2\n\
         ) p ON TRUE"
    );
    assert!(result.params.is_empty());
    assert!(result.findings.is_empty());
}

#[test]
fn test_filter_params_follow_placeholder_order() {
    let result = select(
        &converter(),
        r#"query($min: Int) {
            users(where: {_and: [{id: {_gt: $min}}, {id: {_lt: 100}}], name: {_neq: null}}, limit: 10, offset: 20) { id }
        }"#,
        serde_json::from_value(json!({"min": 18})).unwrap(),
    )
    .unwrap();

    assert_eq!(
        result.sql,
        "SELECT u.\"id\"\n\
         FROM \"users\" u\n\
         WHERE u.\"id\" > $1 AND u.\"id\" < $2 AND u.\"name\" IS NOT NULL\n\
         LIMIT 10 OFFSET 20"
    );
    assert_eq!(result.params, vec![SqlValue::Integer(18), SqlValue::Integer(100)]);
}

#[test]
fn test_lateral_arguments_bind_before_root_filter() {
    let result = select(
        &converter(),
        r#"{ users(where: {name: "Ada"}) {
            posts(where: {published: true}, orderBy: {field: "title", direction: "DESC"}, limit: 3, offset: 1) { id title }
        } }"#,
        Variables::new(),
    )
    .unwrap();

    assert_eq!(
        result.sql,
        "SELECT p.\"id\" AS \"p_id\", p.\"title\" AS \"p_title\"\n\
         FROM \"users\" u\n\
         LEFT JOIN LATERAL (\n    \
         SELECT \"id\", \"title\"\n    \
         FROM \"posts\"\n    \
         WHERE \"user_id\" = u.\"id\" AND \"published\" = $1\n    \
         ORDER BY \"title\" DESC\n    \
         LIMIT 3\n    \
         OFFSET 1\n\
         ) p ON TRUE\n\
         WHERE u.\"name\" = $2"
    );
    assert_eq!(result.params, vec![SqlValue::Boolean(true), SqlValue::from("Ada")]);
}

#[test]
fn test_to_one_relations_and_column_overrides() {
    let result = select(
        &converter(),
        "{ users { email profile { bio } } }",
        Variables::new(),
    )
    .unwrap();
    assert_eq!(
        result.sql,
        "SELECT u.\"email_address\", p.\"bio\" AS \"p_bio\"\n\
         FROM \"users\" u\n\
         LEFT JOIN \"user_profiles\" p ON u.\"id\" = p.\"user_id\""
    );

    let posts = select(&converter(), "{ posts { title author { name } } }", Variables::new()).unwrap();
    assert_eq!(
        posts.sql,
        "SELECT p.\"title\", a.\"name\" AS \"a_name\"\n\
         FROM \"posts\" p\n\
         LEFT JOIN \"users\" a ON p.\"author_id\" = a.\"id\"\n\
         LIMIT 50"
    );
}

#[test]
fn test_same_relation_twice_is_collision_free() {
    let query = r#"{ users { id
        drafts: posts(where: {published: false}) { title }
        published: posts(where: {published: true}) { title }
    } }"#;
    let first = select(&converter(), query, Variables::new()).unwrap();
    let second = select(&converter(), query, Variables::new()).unwrap();

    assert_eq!(first.sql, second.sql);
    assert!(first.sql.starts_with(
        "SELECT u.\"id\", d.\"title\" AS \"d_title\", p.\"title\" AS \"p_title\"\n"
    ));
    assert!(first.sql.contains(") d ON TRUE"));
    assert!(first.sql.contains(") p ON TRUE"));
    assert_eq!(first.params, vec![SqlValue::Boolean(false), SqlValue::Boolean(true)]);
}

#[test]
fn test_nested_relation_inside_lateral_is_left_out() {
    let result = select(
        &converter(),
        "{ users { posts { title author { name } } } }",
        Variables::new(),
    )
    .unwrap();
    assert!(result.sql.contains("SELECT \"title\"\n"));
    assert!(!result.sql.contains("a_name"));
}

#[test]
fn test_malformed_arguments_fail() {
    let err = select(&converter(), r#"{ users(orderBy: {direction: "DESC"}) { id } }"#, Variables::new()).unwrap_err();
    assert!(matches!(err, ConversionError::InvalidArgument { ref argument, .. } if argument == "orderBy"));

    let err = select(&converter(), r#"{ users(where: {name: {_sounds_like: "x"}}) { id } }"#, Variables::new()).unwrap_err();
    assert!(matches!(err, ConversionError::InvalidArgument { ref argument, .. } if argument == "where"));

    let err = select(&converter(), "{ users(limit: -1) { id } }", Variables::new()).unwrap_err();
    assert!(matches!(err, ConversionError::InvalidArgument { ref argument, .. } if argument == "limit"));
}

#[test]
fn test_config_overrides_schema_relations() {
    let config = MappingConfig::from_yaml_str(
        r#"
models:
  User: accounts
fields:
  User.name: display_name
relations:
  User.posts: { type: hasMany, table: articles, foreignKey: owner_id, joinType: inner }
"#,
    )
    .unwrap();
    let converter = SqlConverter::from_config(schema(), &config).unwrap();

    let result = select(&converter, "{ users { name posts { title } } }", Variables::new()).unwrap();
    assert_eq!(
        result.sql,
        "SELECT u.\"display_name\", p.\"title\" AS \"p_title\"\n\
         FROM \"accounts\" u\n\
         CROSS JOIN LATERAL (\n    \
         SELECT \"title\"\n    \
         FROM \"articles\"\n    \
         WHERE \"owner_id\" = u.\"id\"\n\
         ) p"
    );
}

#[test]
fn test_mutations_use_mapped_names() {
    let converter = converter().map_type_to_table("User", "accounts");
    let mut input = Map::new();
    input.insert("name".to_string(), json!("Ada"));
    input.insert("email".to_string(), json!("ada@example.com"));

    let insert = converter.convert_to_insert("User", &input, &["id"]).unwrap();
    assert_eq!(
        insert.sql,
        "INSERT INTO \"accounts\" (\"name\", \"email_address\")\nVALUES ($1, $2)\nRETURNING \"id\""
    );

    let update = converter
        .convert_to_update("User", &input, &json!({"id": {"_in": [1, 2]}}), &[])
        .unwrap();
    assert_eq!(
        update.sql,
        "UPDATE \"accounts\" u\nSET \"name\" = $1, \"email_address\" = $2\nWHERE u.\"id\" = ANY($3)"
    );
    assert_eq!(update.params[2], SqlValue::Array(vec![SqlValue::Integer(1), SqlValue::Integer(2)]));

    let delete = converter
        .convert_to_delete("User", &json!({"_not": {"email": {"_ilike": "%@example.com"}}}), &["id"])
        .unwrap();
    assert_eq!(
        delete.sql,
        "DELETE FROM \"accounts\" u\nWHERE NOT (u.\"email_address\" ILIKE $1)\nRETURNING \"id\""
    );
}
