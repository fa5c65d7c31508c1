//! # sqlgraph
//!
//! A GraphQL selection compiler that lowers queries to parameterized SQL,
//! plus a tree-walking executor to run them.
//!
//! ## Features
//!
//! - **Schema Model**: SDL parsing with `@sql(table, column, relation)` mapping directives
//! - **Field Collection**: fragments, `@skip`/`@include` and field merging into a selection tree
//! - **SQL Generation**: PostgreSQL SELECT/INSERT/UPDATE/DELETE with numbered placeholders
//! - **Relations**: to-one joins and to-many `LEFT JOIN LATERAL` subqueries
//! - **Execution**: per-field error isolation, deadlines, cancellation and introspection
//! - **Middleware**: operation interceptors, response interceptors and field middleware
//! - **Batching**: request-scoped data loaders
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sqlgraph::prelude::*;
//!
//! let schema = Arc::new(Schema::parse(SDL)?);
//! let converter = Arc::new(
//!     SqlConverter::from_schema(schema.clone(), Arc::new(PostgresDialect)).pluralize_tables(true),
//! );
//!
//! let executor = Executor::builder(schema)
//!     .resolver("Query", "users", resolver_fn(move |params| {
//!         let converter = converter.clone();
//!         async move {
//!             let select = converter.convert_to_select(&params.info)?;
//!             fetch_rows(&select.sql, &select.params).await
//!         }
//!     }))
//!     .build();
//!
//! let response = executor.execute(Request::new("{ users { id name } }")).await;
//! ```

pub mod config;
pub mod converter;
pub mod core;
pub mod graphql;
pub mod sql;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Errors ===
    pub use crate::core::{
        ConfigError, ConversionError, ExecutionError, QueryError, SchemaError, SqlGraphError,
        SqlGraphResult, SqlValue,
    };

    // === Schema & Execution ===
    pub use crate::graphql::{
        BatchLoad, CancelHandle, DataLoader, DataLoaderConfig, Executor, ExecutorBuilder,
        ExtensionData, FieldBindings, FieldMiddleware, FieldNext, GraphQLError, OperationInfo,
        OperationInterceptor, OperationNext, RequestContext, ResolveInfo, ResolveParams, Resolver,
        Request, Response, ResponseInterceptor, Schema, SelectedField, SelectionSet, TypeRef,
        resolver_fn,
    };

    // === SQL ===
    pub use crate::converter::{JoinConfig, MutationResult, SelectResult, SqlConverter};
    pub use crate::sql::{Dialect, PostgresDialect, dialect_for_name};

    // === Config ===
    pub use crate::config::MappingConfig;

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;
}
