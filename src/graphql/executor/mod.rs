//! GraphQL executor
//!
//! An [`Executor`] is assembled once through [`ExecutorBuilder`] and is
//! immutable afterwards; it can serve any number of concurrent requests.

mod core;
mod field_resolver;

use crate::config::ExecutionConfig;
use crate::graphql::dataloader::{BatchLoad, DataLoaderConfig, DataLoaderFactories};
use crate::graphql::extension::{
    ExtensionData, FieldMiddleware, OperationInterceptor, ResponseInterceptor,
};
use crate::graphql::resolver::{FieldBindings, Resolver, ResolverRegistry};
use crate::graphql::schema::Schema;
use graphql_parser::query::Document;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Parsed documents keyed by query text
type DocumentCache = RwLock<HashMap<String, Arc<Document<'static, String>>>>;

/// Executes GraphQL requests against a [`Schema`]
pub struct Executor {
    schema: Arc<Schema>,
    resolvers: ResolverRegistry,
    bindings: FieldBindings,
    field_middleware: Vec<Arc<dyn FieldMiddleware>>,
    operation_interceptors: Vec<Arc<dyn OperationInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    extension_data: Vec<Arc<dyn ExtensionData>>,
    loaders: Arc<DataLoaderFactories>,
    default_timeout: Option<Duration>,
    documents: DocumentCache,
}

impl Executor {
    pub fn builder(schema: Arc<Schema>) -> ExecutorBuilder {
        ExecutorBuilder::new(schema)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Number of distinct query texts parsed so far
    pub fn cached_documents(&self) -> usize {
        self.documents
            .read()
            .map(|cache| cache.len())
            .unwrap_or_else(|e| e.into_inner().len())
    }
}

/// Builder for [`Executor`]
pub struct ExecutorBuilder {
    schema: Arc<Schema>,
    resolvers: ResolverRegistry,
    bindings: FieldBindings,
    field_middleware: Vec<Arc<dyn FieldMiddleware>>,
    operation_interceptors: Vec<Arc<dyn OperationInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    extension_data: Vec<Arc<dyn ExtensionData>>,
    loaders: DataLoaderFactories,
    default_timeout: Option<Duration>,
}

impl ExecutorBuilder {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            resolvers: ResolverRegistry::default(),
            bindings: FieldBindings::default(),
            field_middleware: Vec::new(),
            operation_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
            extension_data: Vec::new(),
            loaders: DataLoaderFactories::default(),
            default_timeout: None,
        }
    }

    /// Register the resolver of `type_name.field_name`
    pub fn resolver(mut self, type_name: &str, field_name: &str, resolver: impl Resolver + 'static) -> Self {
        if self.schema.field(type_name, field_name).is_none() {
            tracing::warn!(
                type_name = %type_name,
                field = %field_name,
                "registering resolver for a field the schema does not declare"
            );
        }
        self.resolvers.insert(type_name, field_name, Arc::new(resolver));
        self
    }

    /// Replace the default field bindings
    pub fn bindings(mut self, bindings: FieldBindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Read `type_name.field_name` from a differently named parent entry
    pub fn bind_key(mut self, type_name: &str, field_name: &str, key: &str) -> Self {
        self.bindings.bind_key(type_name, field_name, key);
        self
    }

    /// Middleware runs in registration order, the first one outermost
    pub fn field_middleware(mut self, middleware: impl FieldMiddleware + 'static) -> Self {
        self.field_middleware.push(Arc::new(middleware));
        self
    }

    pub fn operation_interceptor(mut self, interceptor: impl OperationInterceptor + 'static) -> Self {
        self.operation_interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn response_interceptor(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.response_interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn extension_data(mut self, data: impl ExtensionData + 'static) -> Self {
        self.extension_data.push(Arc::new(data));
        self
    }

    /// Make a request-scoped data loader available as `ctx.loader(name)`
    pub fn data_loader<K, V>(
        mut self,
        name: &str,
        batch_fn: Arc<dyn BatchLoad<K, V>>,
        config: DataLoaderConfig,
    ) -> Self
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.loaders.register(name, batch_fn, config);
        self
    }

    /// Deadline applied to requests that do not carry their own
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Apply the `execution` section of a mapping config
    pub fn execution_config(mut self, config: &ExecutionConfig) -> Self {
        if let Some(timeout) = config.timeout() {
            self.default_timeout = Some(timeout);
        }
        self
    }

    pub fn build(self) -> Executor {
        tracing::debug!(
            resolvers = self.resolvers.len(),
            middleware = self.field_middleware.len(),
            interceptors = self.operation_interceptors.len(),
            "executor built"
        );
        Executor {
            schema: self.schema,
            resolvers: self.resolvers,
            bindings: self.bindings,
            field_middleware: self.field_middleware,
            operation_interceptors: self.operation_interceptors,
            response_interceptors: self.response_interceptors,
            extension_data: self.extension_data,
            loaders: Arc::new(self.loaders),
            default_timeout: self.default_timeout,
            documents: RwLock::new(HashMap::new()),
        }
    }
}
